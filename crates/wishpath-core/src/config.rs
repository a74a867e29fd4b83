//! Engine configuration.

use std::time::Duration;

/// Tuning knobs for a coordinator and its reload controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Quiet period after a confirmed completion change before the tree is
    /// refetched. Each new completion change restarts the window.
    pub reload_debounce: Duration,
    /// Buffer size of the notification side channel. Slow subscribers that
    /// fall further behind than this lose the oldest messages.
    pub notification_capacity: usize,
}

impl CoordinatorConfig {
    pub const DEFAULT_RELOAD_DEBOUNCE: Duration = Duration::from_millis(500);
    pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 64;

    pub fn with_reload_debounce(mut self, debounce: Duration) -> Self {
        self.reload_debounce = debounce;
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            reload_debounce: Self::DEFAULT_RELOAD_DEBOUNCE,
            notification_capacity: Self::DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.reload_debounce, Duration::from_millis(500));
        assert_eq!(config.notification_capacity, 64);
    }

    #[test]
    fn override_debounce() {
        let config = CoordinatorConfig::default().with_reload_debounce(Duration::ZERO);
        assert_eq!(config.reload_debounce, Duration::ZERO);
    }
}
