//! Frame clock: raw timestamps in, bounded delta-time out

use crate::consts::MAX_DT;

/// Clamp a raw delta to `[0, MAX_DT]`; non-finite input yields 0
#[inline]
pub fn clamp_dt(dt: f64) -> f32 {
    if !dt.is_finite() {
        return 0.0;
    }
    (dt as f32).clamp(0.0, MAX_DT)
}

/// Converts host timestamps (seconds) into step deltas
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a timestamp and return the clamped delta since the previous one.
    /// The first sample yields zero.
    pub fn sample(&mut self, now_secs: f64) -> f32 {
        let dt = match self.last {
            Some(last) => now_secs - last,
            None => 0.0,
        };
        if now_secs.is_finite() {
            self.last = Some(now_secs);
        }
        clamp_dt(dt)
    }

    /// Forget the previous timestamp (e.g. after a restart)
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.sample(12.5), 0.0);
        assert!((clock.sample(12.516) - 0.016).abs() < 1e-4);
    }

    #[test]
    fn stall_is_clamped() {
        let mut clock = FrameClock::new();
        clock.sample(1.0);
        assert_eq!(clock.sample(9.0), MAX_DT);
    }

    #[test]
    fn backwards_and_nan_are_zero() {
        let mut clock = FrameClock::new();
        clock.sample(5.0);
        assert_eq!(clock.sample(4.0), 0.0);
        assert_eq!(clock.sample(f64::NAN), 0.0);
        assert_eq!(clamp_dt(f64::INFINITY), 0.0);
    }
}
