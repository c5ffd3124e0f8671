use serde::Serialize;

use crate::error::Result;
use crate::game::layout::{gameplay, hp_bar, score};
use crate::process::ReadMemory;

/// Live performance counters. Only meaningful while playing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameplayData {
    pub player_name: String,
    pub score: i32,
    pub combo: u16,
    pub max_combo: u16,
    /// 0.0..=1.0
    pub accuracy: f64,
    /// 0.0..=1.0
    pub hp: f64,
    /// 0.0..=1.0
    pub hp_smooth: f64,
    pub hit_300: u16,
    pub hit_100: u16,
    pub hit_50: u16,
    pub hit_miss: u16,
    pub hit_geki: u16,
    pub hit_katu: u16,
}

impl GameplayData {
    /// Read counters starting from the active ruleset object.
    ///
    /// Fails when any pointer of the chain is missing; individual counters
    /// fall back to zero.
    pub fn read<R: ReadMemory + ?Sized>(reader: &R, ruleset: u64) -> Result<Self> {
        let base = reader.read_ptr(ruleset + gameplay::GAMEPLAY_BASE)?;
        let score_base = reader.read_ptr(base + gameplay::SCORE_BASE)?;
        let hp_base = reader.read_ptr(base + gameplay::HP_BAR_BASE)?;

        let count = |offset: u64| reader.read_u16(score_base + offset).unwrap_or(0);
        let health = |offset: u64| {
            let raw = reader.read_f64(hp_base + offset).unwrap_or(0.0);
            (raw / hp_bar::MAX).clamp(0.0, 1.0)
        };

        // Missing accuracy means "not computed yet"
        let accuracy = reader
            .read_ptr(base + gameplay::ACCURACY)
            .and_then(|ptr| reader.read_f64(ptr + gameplay::ACCURACY_VALUE))
            .map(|raw| raw / 100.0)
            .unwrap_or(1.0);

        Ok(Self {
            player_name: reader
                .read_string_ptr(score_base + score::PLAYER_NAME)
                .unwrap_or_default(),
            score: reader.read_i32(ruleset + gameplay::SCORE).unwrap_or(0),
            combo: count(score::COMBO),
            max_combo: count(score::MAX_COMBO),
            accuracy,
            hp: health(hp_bar::CURRENT),
            hp_smooth: health(hp_bar::SMOOTH),
            hit_300: count(score::HIT_300),
            hit_100: count(score::HIT_100),
            hit_50: count(score::HIT_50),
            hit_miss: count(score::HIT_MISS),
            hit_geki: count(score::HIT_GEKI),
            hit_katu: count(score::HIT_KATU),
        })
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockMemoryBuilder;

    // ruleset 0x1000, gameplay 0x1200, score 0x1400, hp bar 0x1600, accuracy 0x1700
    fn builder() -> MockMemoryBuilder {
        MockMemoryBuilder::new()
            .with_size(0x800)
            .write_u32(gameplay::GAMEPLAY_BASE as usize, 0x1200)
            .write_i32(gameplay::SCORE as usize, 987_654)
            .write_u32(0x200 + gameplay::SCORE_BASE as usize, 0x1400)
            .write_u32(0x200 + gameplay::HP_BAR_BASE as usize, 0x1600)
            .write_u16(0x400 + score::HIT_300 as usize, 812)
            .write_u16(0x400 + score::HIT_100 as usize, 31)
            .write_u16(0x400 + score::HIT_MISS as usize, 4)
            .write_u16(0x400 + score::HIT_GEKI as usize, 1500)
            .write_u16(0x400 + score::COMBO as usize, 250)
            .write_u16(0x400 + score::MAX_COMBO as usize, 600)
            .write_u32(0x400 + score::PLAYER_NAME as usize, 0x1500)
            .write_managed_string(0x500, "peppy")
            .write_f64(0x600 + hp_bar::CURRENT as usize, 150.0)
            .write_f64(0x600 + hp_bar::SMOOTH as usize, 250.0)
    }

    #[test]
    fn test_read_gameplay() {
        let reader = builder()
            .write_u32(0x200 + gameplay::ACCURACY as usize, 0x1700)
            .write_f64(0x700 + gameplay::ACCURACY_VALUE as usize, 97.5)
            .build();

        let data = GameplayData::read(&reader, 0x1000).unwrap();
        assert_eq!(data.player_name, "peppy");
        assert_eq!(data.score, 987_654);
        assert_eq!(data.hit_300, 812);
        assert_eq!(data.hit_100, 31);
        assert_eq!(data.hit_miss, 4);
        assert_eq!(data.hit_geki, 1500);
        assert_eq!(data.combo, 250);
        assert_eq!(data.max_combo, 600);
        assert_eq!(data.hp, 0.75);
        // Clamped to 1.0
        assert_eq!(data.hp_smooth, 1.0);
        assert!((data.accuracy - 0.975).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_defaults_to_full() {
        let reader = builder().build();
        let data = GameplayData::read(&reader, 0x1000).unwrap();
        assert_eq!(data.accuracy, 1.0);
    }

    #[test]
    fn test_missing_chain_is_absence() {
        let reader = MockMemoryBuilder::new().with_size(0x200).build();
        assert!(GameplayData::read(&reader, 0x1000).is_err());
    }

    #[test]
    fn test_is_dead() {
        let data = GameplayData::default();
        assert!(data.is_dead());
        let alive = GameplayData {
            hp: 0.1,
            ..Default::default()
        };
        assert!(!alive.is_dead());
    }
}
