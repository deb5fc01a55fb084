use std::fmt;

/// Side length of the square playing field.
pub const FIELD_SIZE: usize = 10;

/// Who sent a line: `HD_` host-to-device or `DH_` device-to-host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Host,
    Device,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // ---- Handshake ----
    /// The host starts without a name, the device answers with one.
    Start { name: Option<String> },
    Checksum(RowCounts),

    // ---- Play ----
    Fire(Coord),
    Report(Impact),

    // ---- Game over ----
    Reveal { row: u8, cells: [u8; FIELD_SIZE] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub row: u8,
    pub col: u8,
}

impl Coord {
    pub fn new(row: u8, col: u8) -> Self {
        debug_assert!((row as usize) < FIELD_SIZE && (col as usize) < FIELD_SIZE);
        Self { row, col }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impact {
    Hit,
    Miss,
}

/// Number of ship cells in each row, as announced in `CS` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts(pub [u8; FIELD_SIZE]);

impl RowCounts {
    pub fn total(&self) -> usize {
        self.0.iter().map(|&c| c as usize).sum()
    }

    /// Counts the non-zero cells of each revealed row.
    pub fn from_rows(rows: &[[u8; FIELD_SIZE]; FIELD_SIZE]) -> Self {
        let mut counts = [0u8; FIELD_SIZE];
        for (count, row) in counts.iter_mut().zip(rows) {
            *count = row.iter().filter(|&&c| c != 0).count() as u8;
        }
        Self(counts)
    }
}

impl fmt::Display for RowCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|c| write!(f, "{c}"))
    }
}
