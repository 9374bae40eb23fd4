use std::time::{Duration, Instant};

/// Frame time that corresponds to an update rate of 1.0.
pub const REFERENCE_FRAME_MS: f32 = 16.0;

/// Frame timing: per-frame update rate and a frame rate measured once per second.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    window_start: Instant,
    frames_in_window: u32,
    frame_ms: f32,
    fps: f32,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            last_frame: now,
            window_start: now,
            frames_in_window: 0,
            frame_ms: REFERENCE_FRAME_MS,
            fps: 0.0,
        }
    }

    /// Mark the end of a frame and return the update rate for the next one.
    pub fn tick(&mut self, now: Instant) -> f32 {
        self.frames_in_window += 1;
        let window = now.saturating_duration_since(self.window_start);
        if window >= Duration::from_secs(1) {
            let secs = window.as_secs_f32();
            self.fps = self.frames_in_window as f32 / secs;
            self.frame_ms = 1000.0 * secs / self.frames_in_window as f32;
            tracing::trace!(fps = self.fps, frame_ms = self.frame_ms, "frame rate");
            self.window_start = now;
            self.frames_in_window = 0;
        }
        self.last_frame = now;
        self.rate()
    }

    /// Update rate scaled so a 16 ms frame advances motion by 1.0.
    pub fn rate(&self) -> f32 {
        self.frame_ms / REFERENCE_FRAME_MS
    }

    pub fn frame_ms(&self) -> f32 {
        self.frame_ms
    }

    /// Frames per second over the last full one-second window; 0 until one has elapsed.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn since_last_frame(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_frame)
    }
}
