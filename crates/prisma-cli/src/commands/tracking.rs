//! Main tracking mode command.

use std::sync::Arc;

use anyhow::{Context, Result};
use prisma_core::engine::{ExecutionEngine, LibraryEngine, NullEngine};
use prisma_core::process::SystemProcessProvider;
use prisma_core::{BotConfig, Controller, ShutdownSignal};
use tracing::info;

use crate::console::ConsoleSink;

/// Run the main tracking mode
pub fn run(config: BotConfig, observe_only: bool) -> Result<()> {
    println!("prisma v{}", env!("CARGO_PKG_VERSION"));

    let engine: Arc<dyn ExecutionEngine> = if observe_only {
        info!("Observe-only mode; the engine is never started");
        Arc::new(NullEngine)
    } else {
        let engine = LibraryEngine::load(&config.engine_path).with_context(|| {
            format!(
                "Could not load the execution engine from {}",
                config.engine_path.display()
            )
        })?;
        Arc::new(engine)
    };

    let shutdown = setup_shutdown_handler()?;
    let mut controller = Controller::new(
        SystemProcessProvider,
        engine,
        &config,
        Arc::new(ConsoleSink::new()),
        Arc::clone(&shutdown),
    );

    println!("Waiting for osu!... (Press Ctrl+C to quit)");
    controller.run();

    println!("Shutdown complete.");
    Ok(())
}

/// Setup graceful shutdown handler with Ctrl+C
fn setup_shutdown_handler() -> Result<Arc<ShutdownSignal>> {
    let shutdown = Arc::new(ShutdownSignal::new());

    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!("\nShutting down...");
        shutdown_ctrlc.trigger();
    })?;

    Ok(shutdown)
}
