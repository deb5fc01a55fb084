//! Drives rounds against the device and owns the link for the whole run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Error, ErrorKind, Result};
use crate::link::Link;
use crate::port::Transport;
use crate::stats::Tally;

pub mod strategy;

pub use strategy::{Continuous, RoundStrategy, SingleShot, Tournament};

const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Won,
    Lost,
}

/// Outcome of one round, reported to the strategy and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResult {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Last line received during the round.
    pub payload: Vec<u8>,
    pub succeeded: bool,
    pub error: Option<ErrorKind>,
    pub verdict: Option<Verdict>,
}

/// One complete request/response sequence over the link.
pub trait Exchange {
    fn exchange<T: Transport>(&mut self, link: &mut Link<T>) -> Result<Verdict>;
}

pub struct Session<T: Transport> {
    link: Link<T>,
    running: Arc<AtomicBool>,
    tally: Tally,
}

impl<T: Transport> Session<T> {
    pub fn new(link: Link<T>, running: Arc<AtomicBool>) -> Self {
        Self {
            link,
            running,
            tally: Tally::default(),
        }
    }

    /// Play rounds until the strategy is done or a fatal error occurs.
    /// The link is closed on every path out of this function.
    pub fn run<E, S>(mut self, exchange: &mut E, strategy: &mut S) -> Result<Tally>
    where
        E: Exchange,
        S: RoundStrategy + ?Sized,
    {
        let outcome = self.drive(exchange, strategy);
        self.link.close();
        match outcome {
            Ok(()) => Ok(self.tally),
            Err(e) => {
                log::debug!("session ended after {}: {}", self.tally, e);
                Err(e)
            }
        }
    }

    fn drive<E, S>(&mut self, exchange: &mut E, strategy: &mut S) -> Result<()>
    where
        E: Exchange,
        S: RoundStrategy + ?Sized,
    {
        strategy.start()?;
        while strategy.wants_round(&self.tally) {
            if self.tally.played > 0
                && let Some(pause) = strategy.pause()
            {
                log::debug!("waiting {:?}", pause);
                self.sleep(pause)?;
            }
            self.check_running()?;

            let (result, failure) = self.round(exchange)?;
            self.tally.record(&result);
            strategy.round_finished(&result, &self.tally)?;
            if let Some(err) = failure {
                strategy.round_failed(err)?;
            }
        }
        strategy.finish(&self.tally)
    }

    /// Fatal errors come back as `Err`; recoverable ones ride along with the result.
    fn round<E: Exchange>(&mut self, exchange: &mut E) -> Result<(ExchangeResult, Option<Error>)> {
        let sent = self.link.bytes_sent();
        let received = self.link.bytes_received();

        let outcome = exchange.exchange(&mut self.link);

        let mut result = ExchangeResult {
            bytes_sent: self.link.bytes_sent() - sent,
            bytes_received: self.link.bytes_received() - received,
            payload: self.link.last_line().to_vec(),
            succeeded: false,
            error: None,
            verdict: None,
        };
        match outcome {
            Ok(verdict) => {
                result.succeeded = true;
                result.verdict = Some(verdict);
                Ok((result, None))
            }
            Err(e) if e.is_recoverable() => {
                self.link.discard_pending()?;
                result.error = Some(e.kind());
                Ok((result, Some(e)))
            }
            Err(e) => Err(e),
        }
    }

    fn check_running(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Interrupted)
        }
    }

    fn sleep(&self, total: Duration) -> Result<()> {
        let start = Instant::now();
        while let Some(left) = total.checked_sub(start.elapsed()) {
            if left.is_zero() {
                break;
            }
            self.check_running()?;
            std::thread::sleep(left.min(SLEEP_SLICE));
        }
        Ok(())
    }
}
