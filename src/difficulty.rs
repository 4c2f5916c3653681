use std::time::Duration;

use crate::config::GameConfig;

/// Shrinks the spawn delay by a fixed step down to a floor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyClock {
    min_delay: Duration,
    step: Duration,
}

impl DifficultyClock {
    pub fn new(min_delay: Duration, step: Duration) -> Self {
        Self { min_delay, step }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.delay_step_ms),
        )
    }

    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_sub(self.step).max(self.min_delay)
    }
}
