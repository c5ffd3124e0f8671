mod cli;
mod commands;
mod config;
mod console;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("prisma=info".parse()?)
                .add_directive("prisma_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Some(Command::Scan { json }) => commands::scan::run(json),
        Some(Command::Status { json }) => {
            let config = config::load(&args.config)?;
            commands::status::run(&config, json)
        }
        Some(Command::Parse {
            file,
            speed,
            cs,
            json,
        }) => commands::parse::run(&file, speed, cs, json),
        None => {
            let mut config = config::load(&args.config)?;
            if let Some(engine) = args.engine {
                config.engine_path = engine;
            }
            if args.no_bot {
                config.bot_enabled = false;
            }
            commands::tracking::run(config, args.no_bot)
        }
    }
}
