//! Minimum-interval gate for incoming samples

use std::time::Duration;

/// Default spacing between accepted samples
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(50);

/// Accepts a sample only when at least `interval` has passed since the last
/// accepted one. Time is read from sample timestamps, not the wall clock.
#[derive(Debug, Clone)]
pub struct SampleThrottle {
    interval_ms: f64,
    last_accepted_ms: Option<f64>,
}

impl SampleThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_secs_f64() * 1000.0,
            last_accepted_ms: None,
        }
    }

    /// Returns true and records the timestamp if the sample may pass
    pub fn admit(&mut self, timestamp_ms: f64) -> bool {
        match self.last_accepted_ms {
            Some(last) if timestamp_ms - last < self.interval_ms => false,
            _ => {
                self.last_accepted_ms = Some(timestamp_ms);
                true
            }
        }
    }

    /// Forget the last accepted sample; the next one always passes
    pub fn reset(&mut self) {
        self.last_accepted_ms = None;
    }

    pub fn last_accepted_ms(&self) -> Option<f64> {
        self.last_accepted_ms
    }
}

impl Default for SampleThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_samples_inside_window() {
        let mut throttle = SampleThrottle::default();
        assert!(throttle.admit(100.0));
        assert!(!throttle.admit(120.0));
        assert!(!throttle.admit(149.9));
        assert!(throttle.admit(150.0));
        assert_eq!(throttle.last_accepted_ms(), Some(150.0));
    }

    #[test]
    fn test_accepted_samples_are_spaced() {
        let mut throttle = SampleThrottle::new(Duration::from_millis(50));
        let mut accepted = Vec::new();
        for i in 0..200 {
            let ts = i as f64 * 7.0;
            if throttle.admit(ts) {
                accepted.push(ts);
            }
        }
        for pair in accepted.windows(2) {
            assert!(pair[1] - pair[0] >= 50.0);
        }
    }

    #[test]
    fn test_reset_admits_next_sample() {
        let mut throttle = SampleThrottle::default();
        assert!(throttle.admit(1000.0));
        throttle.reset();
        assert!(throttle.admit(1001.0));
    }
}
