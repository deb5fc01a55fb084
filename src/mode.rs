//! Turns parsed command line flags into the immutable run configuration.

use std::time::Duration;

use log::LevelFilter;
use thiserror::Error;

use crate::cli::Cli;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("conflicting mode flags: --single and --tournament are mutually exclusive")]
    ConflictingModes,
    #[error("serial device must not be empty")]
    EmptyPort,
    #[error("baud rate must be positive")]
    ZeroBaud,
    #[error("timeout must be positive (use --notimeout to disable it)")]
    ZeroTimeout,
    #[error("a tournament needs at least one round")]
    ZeroRounds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub port: String,
    pub baud_rate: u32,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Play games until interrupted.
    Normal,
    /// Play exactly one game.
    Single,
    /// Play a fixed number of games and report the score.
    Tournament { rounds: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub device: DeviceConfig,
    pub mode: OperationMode,
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn log_level(&self) -> LevelFilter {
        if self.device.verbose {
            LevelFilter::Debug
        } else if matches!(self.mode, OperationMode::Tournament { .. }) {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }
}

pub fn resolve(cli: &Cli) -> Result<RunConfig, ConfigError> {
    let mode = match (cli.single, cli.tournament) {
        (true, true) => return Err(ConfigError::ConflictingModes),
        (true, false) => OperationMode::Single,
        (false, true) => {
            if cli.rounds == 0 {
                return Err(ConfigError::ZeroRounds);
            }
            OperationMode::Tournament { rounds: cli.rounds }
        }
        (false, false) => OperationMode::Normal,
    };

    if cli.ser_dev.trim().is_empty() {
        return Err(ConfigError::EmptyPort);
    }
    if cli.baud == 0 {
        return Err(ConfigError::ZeroBaud);
    }

    let timeout = if cli.notimeout {
        None
    } else if cli.timeout_ms == 0 {
        return Err(ConfigError::ZeroTimeout);
    } else {
        Some(Duration::from_millis(cli.timeout_ms))
    };

    Ok(RunConfig {
        device: DeviceConfig {
            port: cli.ser_dev.clone(),
            baud_rate: cli.baud,
            timeout,
            verbose: cli.verbose,
        },
        mode,
        seed: cli.seed,
    })
}
