//! Scan command implementation.

use anyhow::Result;
use prisma_core::offset::{BaseAddressTable, PatternName};

use super::open_game;

/// Run the scan command
pub fn run(json: bool) -> Result<()> {
    let process = open_game()?;

    let mut table = BaseAddressTable::new();
    let summary = table.scan_all(&process);

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!();
    println!("=== Signatures ===");
    for name in PatternName::all() {
        match table.get(name) {
            Some(address) => println!("  {:<12} 0x{:08X}", name.as_str(), address),
            None => println!("  {:<12} not found", name.as_str()),
        }
    }
    println!();
    println!(
        "Resolved {}/{} in {:.2}s{}",
        summary.resolved,
        summary.total,
        summary.elapsed.as_secs_f64(),
        if summary.is_usable() {
            ""
        } else {
            " (limited functionality)"
        }
    );

    Ok(())
}
