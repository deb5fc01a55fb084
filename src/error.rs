//! Error types shared by the transport, session and game layers.

use thiserror::Error;

use crate::mode::ConfigError;
use crate::proto::ParseError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Opening the device failed or the device went away.
    #[error("{port}: {reason}")]
    Connection { port: String, reason: String },

    #[error("timeout while waiting for data from device")]
    Timeout,

    #[error("serial I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Parse(#[from] ParseError),

    #[error("protocol mismatch: {0}")]
    Protocol(String),

    #[error("interrupted")]
    Interrupted,
}

/// Fieldless view of [`Error`], cheap to copy into per-round results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Connection,
    Timeout,
    Io,
    Protocol,
    Interrupted,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Timeout => ErrorKind::Timeout,
            Error::Io(_) => ErrorKind::Io,
            Error::Parse(_) | Error::Protocol(_) => ErrorKind::Protocol,
            Error::Interrupted => ErrorKind::Interrupted,
        }
    }

    /// Timeouts and protocol mismatches only spoil the current round.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Timeout | ErrorKind::Protocol)
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }

    pub(crate) fn connection(port: &str, reason: impl ToString) -> Self {
        Error::Connection {
            port: port.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config => 2,
            ErrorKind::Connection | ErrorKind::Io => 3,
            ErrorKind::Timeout => 4,
            ErrorKind::Protocol => 5,
            ErrorKind::Interrupted => 130,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_kinds() {
        assert!(Error::Timeout.is_recoverable());
        assert!(Error::Protocol("x".into()).is_recoverable());
        assert!(Error::Parse(ParseError::Empty).is_recoverable());
        assert!(!Error::Interrupted.is_recoverable());
        assert!(!Error::connection("/dev/null", "gone").is_recoverable());
        assert!(!Error::Io(std::io::ErrorKind::Other.into()).is_recoverable());
    }

    #[test]
    fn exit_codes_are_distinct_per_cause() {
        let config = Error::Config(ConfigError::ConflictingModes).exit_code();
        let conn = Error::connection("COM23", "no such device").exit_code();
        let timeout = Error::Timeout.exit_code();
        let interrupted = Error::Interrupted.exit_code();
        assert_eq!(config, 2);
        assert_eq!(conn, 3);
        assert_eq!(timeout, 4);
        assert_eq!(interrupted, 130);
        assert_eq!(Error::Io(std::io::ErrorKind::Other.into()).exit_code(), conn);
    }
}
