use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::error::Result;
use crate::process::Pattern;

/// Structures located by signature scanning.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, IntoStaticStr, Serialize,
)]
pub enum PatternName {
    Base,
    PlayTime,
    Status,
    ChatChecker,
    SkinData,
    MenuMods,
    Rulesets,
}

impl PatternName {
    /// Textual signature and post-match offset.
    pub fn signature(&self) -> (&'static str, i64) {
        match self {
            PatternName::Base => ("F8 01 74 04 83 65", 0),
            PatternName::PlayTime => ("5E 5F 5D C3 A1 ?? ?? ?? ?? 89 ?? 04", 0),
            PatternName::Status => ("48 83 F8 04 73 1E", -0x4),
            PatternName::ChatChecker => ("8B CE 83 3D ?? ?? ?? ?? 00 75 ?? 80", 0x4),
            PatternName::SkinData => ("74 2C 85 FF 75 28 A1 ?? ?? ?? ?? 8D 15", 0),
            PatternName::MenuMods => ("C8 FF ?? ?? ?? ?? ?? 81 0D ?? ?? ?? ?? ?? 08 00 00", 0x9),
            PatternName::Rulesets => ("7D 15 A1 ?? ?? ?? ?? 85 C0", 0),
        }
    }

    pub fn pattern(&self) -> Result<Pattern> {
        let (text, offset) = self.signature();
        Pattern::parse(text, offset)
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn all() -> impl Iterator<Item = PatternName> {
        Self::iter()
    }
}

impl std::fmt::Display for PatternName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
