//! At-most-one engine run at a time.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::engine::ExecutionEngine;
use crate::error::Result;
use crate::session::BeatmapSession;
use crate::timing::defaults;

const JOIN_POLL: Duration = Duration::from_millis(5);

/// Everything one engine run needs.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub session: Arc<BeatmapSession>,
    pub start_index: usize,
    /// Clock reading the run is aligned to
    pub audio_time: i32,
    pub offset: i32,
    pub timing_shift: i32,
    pub custom_keys: Option<Vec<u16>>,
}

impl RunRequest {
    /// Clock reading in the speed-adjusted note domain.
    pub fn time_adjustment(&self) -> i32 {
        (self.audio_time as f64 / self.session.speed_multiplier) as i32
    }
}

/// Owns the engine thread.
pub struct EngineRunner {
    engine: Arc<dyn ExecutionEngine>,
    running: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stop_timeout: Duration,
}

impl EngineRunner {
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            engine,
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(None),
            stop_timeout: defaults::STOP_TIMEOUT,
        }
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_offset(&self, offset: i32) -> Result<()> {
        self.engine.set_offset(offset)
    }

    pub fn set_timing_shift(&self, shift: i32) -> Result<()> {
        self.engine.set_timing_shift(shift)
    }

    /// Start a run. Returns `Ok(false)` when a run is already active or
    /// there is nothing to play from `start_index`.
    pub fn start(&self, request: RunRequest) -> Result<bool> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(false);
        }

        let session = Arc::clone(&request.session);
        if request.start_index >= session.notes.len() {
            info!("No notes to play from index {}", request.start_index);
            self.running.store(false, Ordering::SeqCst);
            return Ok(false);
        }

        let prepared = self
            .engine
            .set_offset(request.offset)
            .and_then(|_| self.engine.set_timing_shift(request.timing_shift))
            .and_then(|_| self.engine.set_stop(false));
        if let Err(e) = prepared {
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let adjustment = request.time_adjustment();
        if request.start_index == 0 {
            info!(
                "Engine started at {} ms ({} notes, {}K)",
                request.audio_time,
                session.notes.len(),
                session.keys
            );
        } else {
            info!(
                "Engine resumed at note {} ({} ms)",
                request.start_index, request.audio_time
            );
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let engine = Arc::clone(&self.engine);
        let running = Arc::clone(&self.running);
        let current = Arc::clone(&self.generation);

        let handle = thread::Builder::new()
            .name("engine".to_string())
            .spawn(move || {
                let notes = &session.notes[request.start_index..];
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    engine.click_hit_objects(
                        notes,
                        adjustment,
                        true,
                        request.offset,
                        session.keys as i32,
                        request.custom_keys.as_deref(),
                    )
                }));

                match outcome {
                    Ok(Ok(())) => info!("Engine run completed"),
                    Ok(Err(e)) => error!("Engine run failed: {}", e),
                    Err(_) => error!("Engine run panicked"),
                }

                if let Err(e) = engine.set_stop(false) {
                    warn!("Failed to clear engine stop flag: {}", e);
                }
                // A stop that timed out may already have handed the slot on
                if current.load(Ordering::SeqCst) == generation {
                    running.store(false, Ordering::SeqCst);
                }
            });

        match handle {
            Ok(handle) => {
                *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                Ok(true)
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Raise the stop flag and wait for the run to end, at most the stop
    /// timeout. Returns false when nothing was running.
    pub fn stop(&self) -> bool {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if !self.is_running() {
            if let Some(handle) = handle.filter(JoinHandle::is_finished) {
                let _ = handle.join();
            }
            return false;
        }

        if let Err(e) = self.engine.set_stop(true) {
            warn!("Failed to raise engine stop flag: {}", e);
        }

        if let Some(handle) = handle {
            let deadline = Instant::now() + self.stop_timeout;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(JOIN_POLL);
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!(
                    "Engine did not stop within {:?}; continuing",
                    self.stop_timeout
                );
            }
        }

        if let Err(e) = self.engine.set_stop(false) {
            warn!("Failed to clear engine stop flag: {}", e);
        }
        // Orphan any run that ignored the flag
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        true
    }
}

impl Drop for EngineRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::{HitObject, LaneReport};
    use crate::engine::MockEngine;

    fn session(count: usize, speed: f64) -> Arc<BeatmapSession> {
        let notes: Vec<HitObject> = (0..count as i32)
            .map(|i| HitObject {
                x: 64,
                y: 192,
                timestamp: 1000 + i * 100,
                object_type: 1,
                end_time: 1000 + i * 100,
            })
            .collect();
        Arc::new(BeatmapSession {
            identifier: "set/map.osu".to_string(),
            map_id: 1,
            title: "A - B".to_string(),
            difficulty: "4K".to_string(),
            path: "map.osu".into(),
            keys: 4,
            lane_positions: vec![64],
            first_hit_time: 1000,
            first_hit_time_original: 1000,
            notes,
            mods: "NM".to_string(),
            speed_multiplier: speed,
            lanes: LaneReport {
                declared_keys: 4,
                observed_keys: 4,
                keys: 4,
                lane_positions: vec![64],
                remapped: false,
            },
        })
    }

    fn request(session: Arc<BeatmapSession>, start_index: usize) -> RunRequest {
        RunRequest {
            session,
            start_index,
            audio_time: 990,
            offset: 30,
            timing_shift: 5,
            custom_keys: None,
        }
    }

    fn wait_until(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_time_adjustment() {
        assert_eq!(request(session(1, 1.5), 0).time_adjustment(), 660);
        assert_eq!(request(session(1, 1.0), 0).time_adjustment(), 990);
    }

    #[test]
    fn test_second_start_is_noop() {
        let engine = MockEngine::blocking();
        let runner = EngineRunner::new(Arc::new(engine.clone()));
        let session = session(3, 1.0);

        assert!(runner.start(request(Arc::clone(&session), 0)).unwrap());
        assert!(!runner.start(request(Arc::clone(&session), 0)).unwrap());
        wait_until(|| engine.active_runs() == 1);

        assert!(runner.stop());
        assert!(!runner.is_running());
        assert_eq!(engine.runs().len(), 1);
        assert_eq!(engine.max_concurrent_runs(), 1);
        assert!(!engine.is_stop_raised());
    }

    #[test]
    fn test_start_applies_settings() {
        let engine = MockEngine::new();
        let runner = EngineRunner::new(Arc::new(engine.clone()));

        assert!(runner.start(request(session(3, 1.0), 1)).unwrap());
        wait_until(|| !runner.is_running());

        let runs = engine.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].note_count, 2);
        assert_eq!(runs[0].first_timestamp, Some(1100));
        assert_eq!(runs[0].offset, 30);
        assert_eq!(runs[0].keys, 4);
        assert_eq!(engine.offset(), 30);
        assert_eq!(engine.timing_shift(), 5);
    }

    #[test]
    fn test_start_past_end_is_noop() {
        let engine = MockEngine::new();
        let runner = EngineRunner::new(Arc::new(engine.clone()));
        assert!(!runner.start(request(session(2, 1.0), 2)).unwrap());
        assert!(!runner.is_running());
        assert!(engine.runs().is_empty());
    }

    #[test]
    fn test_failed_run_frees_slot() {
        let engine = MockEngine::failing();
        let runner = EngineRunner::new(Arc::new(engine.clone()));
        assert!(runner.start(request(session(2, 1.0), 0)).unwrap());
        wait_until(|| !runner.is_running());
        assert!(!runner.is_running());
        assert!(runner.start(request(session(2, 1.0), 0)).unwrap());
    }

    #[test]
    fn test_stop_when_idle() {
        let runner = EngineRunner::new(Arc::new(MockEngine::new()));
        assert!(!runner.stop());
    }
}
