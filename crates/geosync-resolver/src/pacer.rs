use std::time::Duration;

/// Fixed-interval throttle: one pause after every external call.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    pauses: u64,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, pauses: 0 }
    }

    pub fn pause(&mut self) {
        self.pauses += 1;
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
    }

    pub fn pauses(&self) -> u64 {
        self.pauses
    }

    /// Lower bound on wall time for `calls` lookups.
    pub fn estimate(&self, calls: usize) -> Duration {
        self.interval.saturating_mul(calls.min(u32::MAX as usize) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_with_calls() {
        let p = Pacer::new(Duration::from_millis(1000));
        assert_eq!(p.estimate(90), Duration::from_secs(90));
    }

    #[test]
    fn zero_interval_counts_without_sleeping() {
        let mut p = Pacer::new(Duration::ZERO);
        p.pause();
        p.pause();
        assert_eq!(p.pauses(), 2);
    }
}
