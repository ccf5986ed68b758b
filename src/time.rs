use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// Where the current time comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MillisProvider {
    /// Real wall-clock time
    #[default]
    System,
    /// A constant instant, for deterministic tests
    Fixed(i64),
}

impl MillisProvider {
    pub fn millis(self) -> i64 {
        match self {
            MillisProvider::System => Utc::now().timestamp_millis(),
            MillisProvider::Fixed(millis) => millis,
        }
    }
}

/// Time source handed to anything that needs "now".
///
/// Clones share the installed provider: installing a fixed or system
/// provider through one handle is seen by every other handle, on every
/// thread, on its next `now()`. There is no ordering between a swap and
/// reads racing it, so multi-step operations should call `now()` once and
/// reuse the value.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    provider: Arc<RwLock<MillisProvider>>,
}

impl Clock {
    /// Clock backed by the system wall clock
    pub fn system() -> Self {
        Self::default()
    }

    /// Clock frozen at `millis`
    pub fn fixed(millis: i64) -> Self {
        Self {
            provider: Arc::new(RwLock::new(MillisProvider::Fixed(millis))),
        }
    }

    /// Current instant in milliseconds since the Unix epoch
    pub fn now(&self) -> i64 {
        self.provider().millis()
    }

    /// The currently installed provider
    pub fn provider(&self) -> MillisProvider {
        *self.provider.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn install_fixed(&self, millis: i64) {
        self.install(MillisProvider::Fixed(millis));
    }

    pub fn install_system(&self) {
        self.install(MillisProvider::System);
    }

    fn install(&self, provider: MillisProvider) {
        let mut guard = self.provider.write().unwrap_or_else(PoisonError::into_inner);
        *guard = provider;
        tracing::trace!(?provider, "clock provider installed");
    }
}

/// Render a timestamp for logs: human readable in debug builds, the raw
/// number in release builds
pub fn print_timestamp(millis: i64) -> String {
    format_timestamp(millis, cfg!(debug_assertions))
}

fn format_timestamp(millis: i64, human: bool) -> String {
    if !human {
        return millis.to_string();
    }
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt
            .with_timezone(&chrono::Local)
            .format("%a %b %d %H:%M:%S %:z %Y")
            .to_string(),
        None => millis.to_string(),
    }
}

/// 00:00:00.000 of the day containing `millis` in `tz`
pub fn start_of_day<Tz: TimeZone>(millis: i64, tz: &Tz) -> i64 {
    at_time_of_day(millis, tz, 0, NaiveTime::MIN)
}

/// 23:59:59.999 of the day containing `millis` in `tz`
pub fn end_of_day<Tz: TimeZone>(millis: i64, tz: &Tz) -> i64 {
    end_of_day_plus(millis, tz, 0)
}

/// 12:00:00.000 of the day containing `millis` in `tz`
pub fn noon<Tz: TimeZone>(millis: i64, tz: &Tz) -> i64 {
    noon_plus(millis, tz, 0)
}

pub(crate) fn end_of_day_plus<Tz: TimeZone>(millis: i64, tz: &Tz, days: i64) -> i64 {
    at_time_of_day(millis, tz, days, NaiveTime::MIN - TimeDelta::milliseconds(1))
}

pub(crate) fn noon_plus<Tz: TimeZone>(millis: i64, tz: &Tz, days: i64) -> i64 {
    at_time_of_day(millis, tz, days, NaiveTime::MIN + TimeDelta::hours(12))
}

fn at_time_of_day<Tz: TimeZone>(millis: i64, tz: &Tz, days: i64, time: NaiveTime) -> i64 {
    let Some(utc) = DateTime::<Utc>::from_timestamp_millis(millis) else {
        return millis;
    };
    let date: NaiveDate = utc.with_timezone(tz).date_naive();
    let Some(date) = date.checked_add_signed(TimeDelta::days(days)) else {
        return millis;
    };
    local_millis(tz, date.and_time(time))
}

fn local_millis<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> i64 {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.timestamp_millis(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp_millis(),
        // Inside a DST gap: step past it
        LocalResult::None => tz
            .from_local_datetime(&(naive + TimeDelta::hours(1)))
            .earliest()
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_else(|| naive.and_utc().timestamp_millis()),
    }
}
