use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

mod cli;
mod error;
mod game;
mod link;
#[cfg(test)]
mod mock;
mod mode;
mod port;
mod proto;
mod session;
mod stats;

use game::Battleship;
use link::Link;
use mode::{ConfigError, DeviceConfig, OperationMode, RunConfig};
use port::SerialTransport;
use session::{Continuous, Session, SingleShot, Tournament};

/// Pause between games in normal mode.
const GAME_PAUSE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let args = cli::Cli::parse();
    let config = match mode::resolve(&args) {
        Ok(config) => config,
        Err(e) => return usage_error(e),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level().as_str()),
    )
    .init();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            let code = e.downcast_ref::<error::Error>().map_or(1, error::Error::exit_code);
            ExitCode::from(code)
        }
    }
}

/// Report a bad flag combination the way clap reports its own errors.
fn usage_error(e: ConfigError) -> ExitCode {
    let kind = match e {
        ConfigError::ConflictingModes => clap::error::ErrorKind::ArgumentConflict,
        _ => clap::error::ErrorKind::ValueValidation,
    };
    let _ = cli::Cli::command().error(kind, &e).print();
    ExitCode::from(error::Error::from(e).exit_code())
}

fn run(config: RunConfig) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received interrupt, shutting down");
        r.store(false, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    log::info!("Starting protocol on {}", config.device.port);
    let transport = open_transport(&config.device, Arc::clone(&running))?;
    let link = Link::new(transport, config.device.timeout);
    let session = Session::new(link, running);
    let mut game = Battleship::new(config.seed);

    let tally = match config.mode {
        OperationMode::Normal => session.run(&mut game, &mut Continuous::new(GAME_PAUSE)),
        OperationMode::Single => {
            let mut single = SingleShot::default();
            let tally = session.run(&mut game, &mut single);
            if let Some(last) = single.last_result() {
                log::debug!("last line: {}", String::from_utf8_lossy(&last.payload));
            }
            tally
        }
        OperationMode::Tournament { rounds } => {
            session.run(&mut game, &mut Tournament::new(rounds, io::stdout()))
        }
    }?;

    log::info!(
        "{} ({} timeouts, {} bytes sent, {} received)",
        tally,
        tally.timeouts,
        tally.bytes_sent,
        tally.bytes_received
    );
    Ok(())
}

/// The connection error already names the port.
fn open_transport(device: &DeviceConfig, running: Arc<AtomicBool>) -> Result<SerialTransport> {
    SerialTransport::open(device, running).context("opening serial device")
}
