use chrono::{DateTime, TimeDelta, Utc};

/// Hands out strictly increasing write timestamps at microsecond precision,
/// even when the wall clock stalls or steps backwards.
#[derive(Debug, Default)]
pub struct WriteClock {
    last: Option<DateTime<Utc>>,
}

impl WriteClock {
    pub fn starting_after(last: Option<DateTime<Utc>>) -> Self {
        Self { last }
    }

    pub fn stamp(&mut self) -> DateTime<Utc> {
        self.stamp_at(Utc::now())
    }

    fn stamp_at(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now);
        let stamp = match self.last {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_repeats_or_goes_back() {
        let base = DateTime::from_timestamp_micros(1_000_000).unwrap();
        let mut clock = WriteClock::default();

        let first = clock.stamp_at(base);
        let same_instant = clock.stamp_at(base);
        let earlier = clock.stamp_at(base - TimeDelta::seconds(5));

        assert!(first < same_instant);
        assert!(same_instant < earlier);
        assert_eq!(earlier - first, TimeDelta::microseconds(2));
    }

    #[test]
    fn resumes_after_persisted_timestamp() {
        let persisted = Utc::now() + TimeDelta::hours(1);
        let mut clock = WriteClock::starting_after(Some(persisted));
        assert!(clock.stamp() > persisted);
    }
}
