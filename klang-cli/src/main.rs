use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "klang")]
#[command(about = "Sound-card control diagnostics", long_about = None)]
struct Cli {
    /// Card index to open
    #[arg(short, long, default_value = "0", global = true)]
    card: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show card information
    Info,

    /// List control elements
    Elements,

    /// Read one element value
    Read {
        /// Element numid
        numid: u32,
    },

    /// List PCM, raw MIDI, and hwdep devices
    Devices,

    /// Subscribe to change events and print them
    Monitor,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info => commands::info(cli.card),
        Commands::Elements => commands::elements(cli.card),
        Commands::Read { numid } => commands::read(cli.card, numid),
        Commands::Devices => commands::devices(cli.card),
        Commands::Monitor => commands::monitor(cli.card),
    }
}
