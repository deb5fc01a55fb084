pub mod message;
pub mod parser;

pub use message::{Coord, FIELD_SIZE, Impact, Message, Origin, RowCounts};
pub use parser::{ParseError, format_message, parse_message};
