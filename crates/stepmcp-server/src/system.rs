//! Process start time and uptime

use chrono::{DateTime, Duration, Local};

/// Records when the server started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock {
    started: DateTime<Local>,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl SystemClock {
    /// Capture the current time as the start time.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Local::now(),
        }
    }

    /// When the clock was started.
    #[must_use]
    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    /// Time elapsed since start. Never negative.
    #[must_use]
    pub fn up_time(&self) -> Duration {
        (Local::now() - self.started).max(Duration::zero())
    }

    /// Current local time.
    #[must_use]
    pub fn now() -> DateTime<Local> {
        Local::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_time_is_non_negative() {
        let clock = SystemClock::start();
        assert!(clock.up_time() >= Duration::zero());
        assert!(SystemClock::now() >= clock.started());
    }
}
