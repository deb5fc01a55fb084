// src/proto/parser.rs
use thiserror::Error;

use super::message::{Coord, FIELD_SIZE, Impact, Message, Origin, RowCounts};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("missing HD_/DH_ prefix: {0}")]
    MissingOrigin(String),
    #[error("unknown tag: {0}")]
    UnknownTag(String),
    #[error("invalid coordinates: {0}")]
    BadCoord(String),
    #[error("expected {expected} digits, got: {got}")]
    BadDigits { expected: usize, got: String },
    #[error("START reply without a name")]
    MissingName,
}

/// Public API: serialize a message to a line, without the CRLF terminator.
pub fn format_message(origin: Origin, msg: &Message) -> String {
    use Message::*;
    let mut out = String::from(match origin {
        Origin::Host => "HD_",
        Origin::Device => "DH_",
    });

    match msg {
        // ---- Handshake
        Start { name: None } => out.push_str("START"),
        Start { name: Some(name) } => {
            out.push_str("START_");
            out.push_str(name);
        }
        Checksum(counts) => {
            out.push_str("CS_");
            out.push_str(&counts.to_string());
        }

        // ---- Play
        Fire(c) => {
            out.push_str(&format!("BOOM_{}_{}", c.row, c.col));
        }
        Report(Impact::Hit) => out.push_str("BOOM_H"),
        Report(Impact::Miss) => out.push_str("BOOM_M"),

        // ---- Game over
        Reveal { row, cells } => {
            out.push_str(&format!("SF{row}D"));
            out.extend(cells.iter().map(|&c| char::from(b'0' + c)));
        }
    }

    out
}

/// Public API: parse a line (CR/LF tolerated) into its origin and message.
pub fn parse_message(line: &str) -> Result<(Origin, Message), ParseError> {
    let s = line.trim_matches(|c| c == '\r' || c == '\n' || c == ' ');
    if s.is_empty() {
        return Err(ParseError::Empty);
    }

    let (origin, body) = if let Some(body) = s.strip_prefix("HD_") {
        (Origin::Host, body)
    } else if let Some(body) = s.strip_prefix("DH_") {
        (Origin::Device, body)
    } else {
        return Err(ParseError::MissingOrigin(s.to_string()));
    };

    Ok((origin, parse_body(body)?))
}

fn parse_body(body: &str) -> Result<Message, ParseError> {
    use Message::*;

    // ---- Handshake
    if body == "START" {
        return Ok(Start { name: None });
    }
    if let Some(name) = body.strip_prefix("START_") {
        if name.is_empty() {
            return Err(ParseError::MissingName);
        }
        return Ok(Start {
            name: Some(name.to_string()),
        });
    }
    if let Some(digits) = body.strip_prefix("CS_") {
        return Ok(Checksum(RowCounts(req_digits(digits)?)));
    }

    // ---- Play
    match body {
        "BOOM_H" => return Ok(Report(Impact::Hit)),
        "BOOM_M" => return Ok(Report(Impact::Miss)),
        _ => {}
    }
    if let Some(xy) = body.strip_prefix("BOOM_") {
        return req_coord(xy).map(Fire);
    }

    // ---- Game over: SF<row>D<cells>
    if let Some(rest) = body.strip_prefix("SF")
        && let Some((row, cells)) = rest.split_once('D')
    {
        let row = req_index(row).ok_or_else(|| ParseError::BadCoord(row.to_string()))?;
        return Ok(Reveal {
            row,
            cells: req_digits(cells)?,
        });
    }

    Err(ParseError::UnknownTag(body.to_string()))
}

/* ---------- helpers ---------- */

fn req_index(s: &str) -> Option<u8> {
    match s.as_bytes() {
        [d @ b'0'..=b'9'] if ((d - b'0') as usize) < FIELD_SIZE => Some(d - b'0'),
        _ => None,
    }
}

fn req_coord(s: &str) -> Result<Coord, ParseError> {
    let bad = || ParseError::BadCoord(s.to_string());
    let (row, col) = s.split_once('_').ok_or_else(bad)?;
    let row = req_index(row).ok_or_else(bad)?;
    let col = req_index(col).ok_or_else(bad)?;
    Ok(Coord::new(row, col))
}

fn req_digits(s: &str) -> Result<[u8; FIELD_SIZE], ParseError> {
    let bad = || ParseError::BadDigits {
        expected: FIELD_SIZE,
        got: s.to_string(),
    };
    if s.len() != FIELD_SIZE || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let mut out = [0u8; FIELD_SIZE];
    for (slot, b) in out.iter_mut().zip(s.bytes()) {
        *slot = b - b'0';
    }
    Ok(out)
}

/* ---------- tests ---------- */
