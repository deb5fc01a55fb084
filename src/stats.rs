use std::fmt;

use crate::error::ErrorKind;
use crate::session::{ExchangeResult, Verdict};

/// Running score of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub played: u64,
    pub won: u64,
    pub lost: u64,
    /// Rounds that ended in an error, timeouts included.
    pub aborted: u64,
    pub timeouts: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl Tally {
    pub fn record(&mut self, result: &ExchangeResult) {
        self.played += 1;
        self.bytes_sent += result.bytes_sent;
        self.bytes_received += result.bytes_received;
        match (result.verdict, result.error) {
            (Some(Verdict::Won), _) => self.won += 1,
            (Some(Verdict::Lost), _) => self.lost += 1,
            (None, Some(ErrorKind::Timeout)) => {
                self.aborted += 1;
                self.timeouts += 1;
            }
            (None, _) => self.aborted += 1,
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "played {} (we won/we lost/aborted): {} {} {}",
            self.played, self.won, self.lost, self.aborted
        )
    }
}
