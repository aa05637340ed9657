use std::cell::Cell;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

/// Source of "now" for every operation that stamps or compares time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// The current calendar day in the local time zone
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }

    fn tomorrow(&self) -> NaiveDate {
        self.today() + Duration::days(1)
    }
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        FixedClock {
            now: Cell::new(now),
        }
    }

    /// A clock set to the given local wall-clock time.
    /// Falls back to UTC when the local time is ambiguous or skipped.
    pub fn at_local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let now = Local
            .with_ymd_and_hms(year, month, day, hour, minute, 0)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| {
                Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
                    .single()
                    .unwrap_or_default()
            });
        FixedClock::new(now)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.advance(Duration::minutes(minutes));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Start of the given local day, as an instant
pub fn local_midnight(day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Whole minutes between two instants, rounded to nearest
pub fn rounded_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let ms = (to - from).num_milliseconds();
    (ms as f64 / 60_000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::at_local(2025, 5, 14, 9, 0);
        let start = clock.now();
        clock.advance_minutes(30);
        assert_eq!(clock.now() - start, Duration::minutes(30));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 5, 14).unwrap());
        assert_eq!(clock.tomorrow(), NaiveDate::from_ymd_opt(2025, 5, 15).unwrap());
    }

    #[test]
    fn rounding_is_to_nearest_minute() {
        let t0 = Utc.with_ymd_and_hms(2025, 5, 14, 9, 0, 0).unwrap();
        assert_eq!(rounded_minutes(t0, t0 + Duration::seconds(29)), 0);
        assert_eq!(rounded_minutes(t0, t0 + Duration::seconds(30)), 1);
        assert_eq!(rounded_minutes(t0, t0 + Duration::seconds(24 * 60 + 40)), 25);
    }

    #[test]
    fn local_midnight_is_start_of_day() {
        let day = NaiveDate::from_ymd_opt(2025, 5, 14).unwrap();
        let midnight = local_midnight(day);
        assert_eq!(midnight.with_timezone(&Local).date_naive(), day);
        let before = midnight - Duration::seconds(1);
        assert_ne!(before.with_timezone(&Local).date_naive(), day);
    }
}
