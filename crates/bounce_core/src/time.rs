use std::time::{Duration, Instant};

/// Frame clock. Ticked once per redraw by the window runner.
#[derive(Debug, Clone)]
pub struct Time {
    last_update: Instant,
    delta: Duration,
}

impl Default for Time {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            last_update: now,
            delta: Duration::ZERO,
        }
    }
}

impl Time {
    /// Called by the engine loop once per frame
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Advances the clock to an explicit instant. Instants earlier than the
    /// previous update yield a zero delta.
    pub fn update_at(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.last_update);
        self.last_update = now;
    }

    /// Forgets the time spent before the first frame (window creation, shader
    /// compilation) so the first delta stays small.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_update = now;
        self.delta = Duration::ZERO;
    }

    /// Returns time in seconds since last frame (e.g., 0.016 for 60fps)
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn delta_tracks_consecutive_updates() {
        let mut time = Time::default();
        let start = time.last_update;

        time.update_at(start + Duration::from_millis(16));
        assert_relative_eq!(time.delta_seconds(), 0.016, epsilon = 1e-6);

        time.update_at(start + Duration::from_millis(48));
        assert_relative_eq!(time.delta_seconds(), 0.032, epsilon = 1e-6);
    }

    #[test]
    fn going_backwards_is_a_zero_delta() {
        let mut time = Time::default();
        let start = time.last_update;
        time.update_at(start + Duration::from_millis(10));
        time.update_at(start);
        assert_eq!(time.delta_seconds(), 0.0);
    }
}
