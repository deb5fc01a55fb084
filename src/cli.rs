use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "schiff",
    about = "Battleship game host talking to a device over a serial line",
    after_help = "Ein Schiff im Hafen ist sicher, doch dafür werden Schiffe nicht gebaut"
)]
pub struct Cli {
    /// Serial device, e.g. /dev/ttyUSB0 with Linux, COM23 with Windows
    pub ser_dev: String,
    /// Debug logging, including every line on the wire
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
    /// Play a single game, then exit
    #[arg(short, long, default_value_t = false)]
    pub single: bool,
    /// Wait for the device forever instead of timing out
    #[arg(short, long, default_value_t = false)]
    pub notimeout: bool,
    /// Play a fixed number of games and print the score
    #[arg(short, long, default_value_t = false)]
    pub tournament: bool,
    /// Baud rate
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Receive timeout in milliseconds (ignored with --notimeout)
    #[arg(long, default_value_t = 2_000)]
    pub timeout_ms: u64,
    /// Number of games in tournament mode
    #[arg(long, default_value_t = 100)]
    pub rounds: u32,
    /// Seed for field placement and fire order
    #[arg(long)]
    pub seed: Option<u64>,
}
