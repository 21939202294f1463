use std::time::Duration;

use log::info;
use rand::Rng;

/// Uniformly random pause between two bounds, inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min),
            max: Duration::from_secs(max),
        }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Same range stretched by `factor`, used for growing backoff.
    pub fn scaled(&self, factor: u32) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }

    pub async fn pause(&self) -> Duration {
        let delay = self.sample();
        if !delay.is_zero() {
            info!("Waiting {:.1} seconds...", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
        delay
    }
}
