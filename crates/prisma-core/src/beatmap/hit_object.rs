use serde::Serialize;

/// Object-type bit marking a hold note.
pub const HOLD_BIT: i32 = 1 << 7;

/// One note as handed to the execution engine.
///
/// Times are in track milliseconds already divided by the playback speed.
/// The layout is shared with the engine's C ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HitObject {
    pub x: i32,
    pub y: i32,
    pub timestamp: i32,
    pub object_type: i32,
    /// Equal to `timestamp` for regular notes
    pub end_time: i32,
}

impl HitObject {
    pub fn is_hold(&self) -> bool {
        self.object_type & HOLD_BIT != 0
    }

    /// Time in the game's own (unscaled) clock domain.
    pub fn original_time(&self, speed_multiplier: f64) -> i32 {
        (self.timestamp as f64 * speed_multiplier) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_bit() {
        let note = HitObject {
            x: 64,
            y: 192,
            timestamp: 1000,
            object_type: 128,
            end_time: 1500,
        };
        assert!(note.is_hold());
        assert!(!HitObject { object_type: 1, ..note }.is_hold());
    }

    #[test]
    fn test_original_time() {
        let note = HitObject {
            x: 0,
            y: 0,
            timestamp: 666,
            object_type: 1,
            end_time: 666,
        };
        assert_eq!(note.original_time(1.5), 999);
        assert_eq!(note.original_time(1.0), 666);
    }

    #[test]
    fn test_c_layout() {
        assert_eq!(std::mem::size_of::<HitObject>(), 20);
    }
}
