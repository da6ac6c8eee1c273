use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Command-line launcher for the bundled Freescape and Eye of the Beholder
/// engines.
#[derive(Parser, Debug)]
#[command(about = "Detect, configure and run games", version)]
pub struct Cli {
    /// JSON config file holding the configured targets
    #[arg(long, default_value = "svm.json", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the compiled-in engines and the games they know
    ListEngines,
    /// Scan a directory for known games
    Detect {
        path: PathBuf,
        /// Print the detection report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Detect the game in a directory and add it as a target
    Add { path: PathBuf },
    /// List the occupied save slots of a target
    ListSaves { target: String },
    /// Delete one save slot of a target
    RemoveSave { target: String, slot: u32 },
    /// Print the effective key bindings of a target
    Keymaps { target: String },
    /// Run a configured target
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    pub target: String,

    /// JSON input script replayed on a virtual clock
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Save slot restored before the first frame
    #[arg(long)]
    pub save_slot: Option<u32>,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Path to write the run summary and final engine status as JSON
    #[arg(long)]
    pub state_json: Option<PathBuf>,
}
