//! Byte signatures with wildcard positions.
//!
//! A [`Pattern`] is parsed from the usual textual form (`"F8 01 74 ?? 83"`)
//! and matched against memory buffers. Matching pre-locates the first
//! mandatory byte with `memchr` and only verifies the remaining positions
//! at those candidates.

use memchr::memchr;

use crate::error::{Error, Result};

/// Signature bytes plus a parallel mask (`true` = must match) and a signed
/// offset applied to the address of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<u8>,
    mask: Vec<bool>,
    offset: i64,
}

impl Pattern {
    pub fn new(bytes: Vec<u8>, mask: Vec<bool>, offset: i64) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidPattern("empty pattern".to_string()));
        }
        if bytes.len() != mask.len() {
            return Err(Error::InvalidPattern(format!(
                "mask length {} does not match pattern length {}",
                mask.len(),
                bytes.len()
            )));
        }
        Ok(Self {
            bytes,
            mask,
            offset,
        })
    }

    /// Parse space separated hex bytes; `??` (or `?`) is a wildcard.
    ///
    /// ```
    /// use prisma_core::process::Pattern;
    ///
    /// let pattern = Pattern::parse("7D 15 A1 ?? ?? ?? ?? 85 C0", 0).unwrap();
    /// assert_eq!(pattern.len(), 9);
    /// assert_eq!(pattern.find_in(&[0x00, 0x7D, 0x15, 0xA1, 1, 2, 3, 4, 0x85, 0xC0]), Some(1));
    /// ```
    pub fn parse(text: &str, offset: i64) -> Result<Self> {
        let mut bytes = Vec::new();
        let mut mask = Vec::new();

        for token in text.split_whitespace() {
            if token.chars().all(|c| c == '?') {
                bytes.push(0);
                mask.push(false);
            } else {
                let byte = u8::from_str_radix(token, 16).map_err(|_| {
                    Error::InvalidPattern(format!("invalid byte '{}' in '{}'", token, text))
                })?;
                bytes.push(byte);
                mask.push(true);
            }
        }

        Self::new(bytes, mask, offset)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Masked comparison at `pos`.
    pub fn matches_at(&self, buffer: &[u8], pos: usize) -> bool {
        let Some(window) = buffer.get(pos..pos + self.bytes.len()) else {
            return false;
        };
        self.bytes
            .iter()
            .zip(&self.mask)
            .zip(window)
            .all(|((&expected, &must_match), &actual)| !must_match || expected == actual)
    }

    /// First position in `buffer` where the pattern matches.
    pub fn find_in(&self, buffer: &[u8]) -> Option<usize> {
        if self.bytes.len() > buffer.len() {
            return None;
        }
        let last_start = buffer.len() - self.bytes.len();

        let Some(anchor) = self.mask.iter().position(|&m| m) else {
            // All wildcards
            return Some(0);
        };
        let anchor_byte = self.bytes[anchor];

        let mut pos = 0;
        while pos <= last_start {
            let found = memchr(anchor_byte, &buffer[pos + anchor..=last_start + anchor])?;
            let candidate = pos + found;
            if self.matches_at(buffer, candidate) {
                return Some(candidate);
            }
            pos = candidate + 1;
        }
        None
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text: Vec<String> = self
            .bytes
            .iter()
            .zip(&self.mask)
            .map(|(b, &m)| if m { format!("{:02X}", b) } else { "??".to_string() })
            .collect();
        write!(f, "{}", text.join(" "))
    }
}
