//! Frame timing and delta time.
//!
//! The host loop owns a [`Time`], calls [`Time::tick`] once per frame, and
//! feeds [`Time::delta_secs`] into [`Scene::update`](crate::scene::Scene::update).
//! A wall-clock `Time` measures real frame durations; a fixed-step one hands
//! back the same delta every tick, which makes full simulations replayable
//! bit for bit.

use std::time::{Duration, Instant};

#[derive(Clone, Copy)]
enum Clock {
    /// Measure real durations between ticks.
    Wall { frame_start: Instant },
    /// Report a constant step regardless of real time.
    Fixed { step: Duration },
}

/// Frame clock. Ticked by the host loop, read by everything else.
#[derive(Clone, Copy)]
pub struct Time {
    clock: Clock,
    /// Duration of the previous frame.
    delta: Duration,
    /// Total time accrued across all ticks.
    elapsed: Duration,
    frame_count: u64,
}

impl Time {
    /// A wall-clock timer. The first tick's delta spans from construction.
    pub fn new() -> Self {
        Self {
            clock: Clock::Wall {
                frame_start: Instant::now(),
            },
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// A deterministic timer that reports `step` seconds on every tick.
    ///
    /// # Panics
    ///
    /// Panics if `step` is not a positive, finite number of seconds.
    pub fn fixed(step: f32) -> Self {
        assert!(
            step.is_finite() && step > 0.0,
            "fixed timestep must be positive, got {step}"
        );
        Self {
            clock: Clock::Fixed {
                step: Duration::from_secs_f32(step),
            },
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Advance to the next frame. Call once per iteration of the host loop,
    /// before reading [`Time::delta_secs`].
    pub fn tick(&mut self) {
        self.delta = match &mut self.clock {
            Clock::Wall { frame_start } => {
                let now = Instant::now();
                let delta = now - *frame_start;
                *frame_start = now;
                delta
            }
            Clock::Fixed { step } => *step,
        };
        self.elapsed += self.delta;
        self.frame_count += 1;
    }

    /// Duration of the previous frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Delta time in seconds (f32), the form `Scene::update` takes.
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Total time accrued across all ticks.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Total accrued time in seconds (f32).
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Number of ticks so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_the_same_delta_every_tick() {
        let mut time = Time::fixed(1.0 / 60.0);
        assert_eq!(time.delta_secs(), 0.0); // nothing elapsed before first tick
        for _ in 0..120 {
            time.tick();
            assert_eq!(time.delta(), Duration::from_secs_f32(1.0 / 60.0));
        }
        assert_eq!(time.frame_count(), 120);
        assert!((time.elapsed_secs() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn wall_clock_accrues_real_time() {
        let mut time = Time::new();
        std::thread::sleep(Duration::from_millis(2));
        time.tick();
        assert!(time.delta() >= Duration::from_millis(2));
        assert_eq!(time.frame_count(), 1);
        assert_eq!(time.elapsed(), time.delta());
    }

    #[test]
    #[should_panic(expected = "fixed timestep must be positive")]
    fn zero_step_is_rejected() {
        Time::fixed(0.0);
    }
}
