//! CLI argument definitions for prisma.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "prisma")]
#[command(about = "osu!mania memory reader and timing bot", version)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Execution engine library (overrides the config file)
    #[arg(long, value_name = "FILE")]
    pub engine: Option<PathBuf>,

    /// Observe only; never start the engine
    #[arg(long)]
    pub no_bot: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve every memory signature and print the address table
    Scan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one snapshot of the game state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a beatmap offline and print the resulting session
    Parse {
        /// Path to a .osu file
        file: PathBuf,
        /// Playback speed (1.5 for DT/NC, 0.75 for HT)
        #[arg(long, default_value = "1.0")]
        speed: f64,
        /// Declared key count (defaults to the file's CircleSize)
        #[arg(long)]
        cs: Option<f32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
