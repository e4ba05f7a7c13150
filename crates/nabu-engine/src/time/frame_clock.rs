use std::time::{Duration, Instant};

/// Weight of the newest frame in the smoothed frame time.
const SMOOTHING: f32 = 0.1;

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Exponential moving average of `dt`; steadier for display and stats.
    pub smoothed_dt: f32,

    pub now: Instant,

    pub frame_index: u64,
}

impl FrameTime {
    /// Frames per second derived from the smoothed frame time.
    pub fn fps(&self) -> f32 {
        if self.smoothed_dt > 0.0 { 1.0 / self.smoothed_dt } else { 0.0 }
    }
}

/// Per-window frame clock.
///
/// Delta time is clamped: a lower bound keeps tight loops from producing zero
/// steps, an upper bound keeps a debugger pause or a minimized window from
/// producing one huge camera jump.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    smoothed_dt: Option<f32>,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            smoothed_dt: None,
            dt_min,
            dt_max,
        }
    }

    /// Restarts the baseline, e.g. after the window was hidden.
    pub fn reset(&mut self) {
        self.last = Instant::now();
        self.smoothed_dt = None;
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max)
            .as_secs_f32();
        self.last = now;

        let smoothed_dt = match self.smoothed_dt {
            Some(prev) => prev + (dt - prev) * SMOOTHING,
            None => dt,
        };
        self.smoothed_dt = Some(smoothed_dt);

        let ft = FrameTime {
            dt,
            smoothed_dt,
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
