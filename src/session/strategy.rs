//! Round sequencing policies, one per operation mode.

use std::io::Write;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};
use crate::session::{ExchangeResult, Verdict};
use crate::stats::Tally;

/// Decides how many rounds a session plays and what a failed round means.
pub trait RoundStrategy {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Asked before every round, including the first.
    fn wants_round(&mut self, tally: &Tally) -> bool;

    fn round_finished(&mut self, result: &ExchangeResult, _tally: &Tally) -> Result<()> {
        report(result);
        Ok(())
    }

    /// Called with a timeout or protocol error. Returning it ends the session.
    fn round_failed(&mut self, err: Error) -> Result<()> {
        log_failure(&err);
        Ok(())
    }

    /// Delay between two rounds.
    fn pause(&self) -> Option<Duration> {
        None
    }

    fn finish(&mut self, _tally: &Tally) -> Result<()> {
        Ok(())
    }
}

/// Normal mode: keep playing until interrupted.
pub struct Continuous {
    pause: Duration,
}

impl Continuous {
    pub fn new(pause: Duration) -> Self {
        Self { pause }
    }
}

impl RoundStrategy for Continuous {
    fn wants_round(&mut self, _tally: &Tally) -> bool {
        true
    }

    fn pause(&self) -> Option<Duration> {
        Some(self.pause)
    }
}

/// Single mode: one round, and its failure is the session's failure.
#[derive(Default)]
pub struct SingleShot {
    last: Option<ExchangeResult>,
}

impl SingleShot {
    pub fn last_result(&self) -> Option<&ExchangeResult> {
        self.last.as_ref()
    }
}

impl RoundStrategy for SingleShot {
    fn wants_round(&mut self, tally: &Tally) -> bool {
        tally.played == 0
    }

    fn round_finished(&mut self, result: &ExchangeResult, _tally: &Tally) -> Result<()> {
        report(result);
        self.last = Some(result.clone());
        Ok(())
    }

    fn round_failed(&mut self, err: Error) -> Result<()> {
        log_failure(&err);
        Err(err)
    }
}

/// Tournament mode: a fixed number of rounds with a progress bar on `out`.
pub struct Tournament<W: Write> {
    rounds: u32,
    out: W,
}

impl<W: Write> Tournament<W> {
    pub fn new(rounds: u32, out: W) -> Self {
        Self { rounds, out }
    }

    /// `0---------1---------2...|`, one column per round.
    fn scale(&self) -> String {
        let mut s: String = (0..self.rounds)
            .map(|i| {
                if i % 10 == 0 {
                    char::from(b'0' + ((i / 10) % 10) as u8)
                } else {
                    '-'
                }
            })
            .collect();
        s.push('|');
        s
    }
}

impl<W: Write> RoundStrategy for Tournament<W> {
    fn start(&mut self) -> Result<()> {
        let scale = self.scale();
        writeln!(self.out, "{scale}")?;
        Ok(())
    }

    fn wants_round(&mut self, tally: &Tally) -> bool {
        tally.played < u64::from(self.rounds)
    }

    fn round_finished(&mut self, result: &ExchangeResult, _tally: &Tally) -> Result<()> {
        report(result);
        let mark = match result.verdict {
            Some(Verdict::Won) => 'w',
            Some(Verdict::Lost) => 'l',
            None => 'a',
        };
        write!(self.out, "{mark}")?;
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self, tally: &Tally) -> Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "TOURNAMENT RESULT: {tally}")?;
        self.out.flush()?;
        Ok(())
    }
}

fn report(result: &ExchangeResult) {
    if result.succeeded {
        log::info!(
            "game over, we {} ({} bytes sent, {} received)",
            if result.verdict == Some(Verdict::Won) { "won" } else { "lost" },
            result.bytes_sent,
            result.bytes_received
        );
    } else if let Some(kind) = result.error {
        log::debug!(
            "round aborted ({:?}), last line {:?}",
            kind,
            String::from_utf8_lossy(&result.payload)
        );
    }
}

fn log_failure(err: &Error) {
    match err.kind() {
        ErrorKind::Timeout => log::warn!("device did not answer in time, is it connected?"),
        _ => log::error!("{}, will reset the game state", err),
    }
}
