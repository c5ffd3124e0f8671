pub mod parse;
pub mod scan;
pub mod status;
pub mod tracking;

use anyhow::{Context, Result};
use prisma_core::process::ProcessHandle;

/// Open the running game, failing with a hint when access is denied.
pub(crate) fn open_game() -> Result<ProcessHandle> {
    println!("Searching for osu!...");
    let process = ProcessHandle::find_and_open()
        .context("osu! must be running (try running as Administrator if it is)")?;
    println!("Found process (PID: {})", process.pid);
    Ok(process)
}
