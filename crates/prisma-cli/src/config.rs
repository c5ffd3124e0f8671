//! TOML config file loading.
//!
//! ```toml
//! [bot]
//! offset = 30
//! timing_shift = 0
//! engine = "main.dll"
//!
//! [osu]
//! songs_dir = "C:/osu!/Songs"
//!
//! [keybinds]
//! mode_7k = "S,D,F,J,K,L,H"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use prisma_core::BotConfig;
use prisma_core::config::{Keybinds, MAX_KEYBIND_KEYS};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    bot: BotSection,
    osu: OsuSection,
    keybinds: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BotSection {
    offset: Option<i32>,
    timing_shift: Option<i32>,
    engine: Option<PathBuf>,
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OsuSection {
    songs_dir: Option<PathBuf>,
}

/// Load `path`, falling back to defaults when the file does not exist.
pub fn load(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(BotConfig::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn parse(content: &str) -> Result<BotConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    let defaults = BotConfig::default();

    Ok(BotConfig {
        offset: file.bot.offset.unwrap_or(defaults.offset),
        timing_shift: file.bot.timing_shift.unwrap_or(defaults.timing_shift),
        songs_dir: file.osu.songs_dir.filter(|dir| !dir.as_os_str().is_empty()),
        keybinds: parse_keybinds(&file.keybinds),
        engine_path: file.bot.engine.unwrap_or(defaults.engine_path),
        bot_enabled: file.bot.enabled.unwrap_or(defaults.bot_enabled),
    })
}

/// Parse `mode_<N>k = "A,B,C"` entries into virtual-key codes.
///
/// An entry with any invalid key is skipped as a whole.
pub fn parse_keybinds(entries: &BTreeMap<String, String>) -> Keybinds {
    let mut keybinds = Keybinds::new();

    for (name, value) in entries {
        let Some(keys) = name
            .strip_prefix("mode_")
            .and_then(|rest| rest.strip_suffix(['k', 'K']))
            .and_then(|count| count.parse::<usize>().ok())
        else {
            continue;
        };

        let value = value.trim();
        if value.is_empty() || value.starts_with(';') {
            continue;
        }
        let value = value
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .unwrap_or(value);

        let mut codes = Vec::new();
        for key in value.split(',').map(|k| k.trim().to_uppercase()) {
            match virtual_key(&key) {
                Some(code) => codes.push(code),
                None => {
                    warn!("Invalid key '{}' in {}, skipping this keybind", key, name);
                    codes.clear();
                    break;
                }
            }
        }
        if codes.is_empty() {
            continue;
        }

        if keys > MAX_KEYBIND_KEYS {
            warn!(
                "{}K exceeds maximum of {} keys, skipping",
                keys, MAX_KEYBIND_KEYS
            );
            continue;
        }
        info!("Loaded custom keybind for {}K: {}", keys, value);
        keybinds.insert(keys, codes);
    }

    keybinds
}

/// Letter keys share their virtual-key code with the uppercase ASCII value.
fn virtual_key(key: &str) -> Option<u16> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase() as u16),
        _ => None,
    }
}
