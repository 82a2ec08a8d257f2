use chrono::{DateTime, Utc};

/// Source of timestamps for badge unlock times, certificates and the
/// analytics `sessionStart`.
///
/// Services take a `Clock` by value so tests can pin every timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Wall-clock time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Always reports `at`.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Milliseconds since the Unix epoch, the unit of `sessionStart`.
    #[must_use]
    pub fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// [`FIXED_TEST_TIMESTAMP`] as a `DateTime<Utc>`.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0).unwrap_or_default()
}

/// A `Clock` pinned to [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fixed_clock_reports_session_start_in_millis() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), fixed_now());
        assert_eq!(clock.now_millis(), FIXED_TEST_TIMESTAMP * 1000);

        let later = Clock::fixed(fixed_now() + Duration::seconds(30));
        assert_eq!(later.now_millis(), (FIXED_TEST_TIMESTAMP + 30) * 1000);
    }

    #[test]
    fn default_clock_follows_wall_time() {
        let clock = Clock::default_clock();
        assert!(clock.now() > fixed_now());
    }
}
