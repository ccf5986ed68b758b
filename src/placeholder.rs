//! Late-bound time macros.
//!
//! Filters embed these tokens in the SQL they generate and in the default
//! values they stamp onto new tasks. A token stays symbolic until the query
//! runs or the task is created, and is then resolved against the instant
//! captured at that moment.

use chrono::TimeZone;
use std::fmt;
use std::str::FromStr;

use crate::time;

const ONE_WEEK_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Now,
    EndOfDay,
    Noon,
    EndOfDayYesterday,
    NoonYesterday,
    EndOfDayTomorrow,
    NoonTomorrow,
    EndOfDayNextWeek,
    NoonNextWeek,
}

impl Placeholder {
    pub const ALL: [Placeholder; 9] = [
        Placeholder::Now,
        Placeholder::EndOfDay,
        Placeholder::Noon,
        Placeholder::EndOfDayYesterday,
        Placeholder::NoonYesterday,
        Placeholder::EndOfDayTomorrow,
        Placeholder::NoonTomorrow,
        Placeholder::EndOfDayNextWeek,
        Placeholder::NoonNextWeek,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Now => "NOW()",
            Placeholder::EndOfDay => "EOD()",
            Placeholder::Noon => "NOON()",
            Placeholder::EndOfDayYesterday => "EOD_YESTERDAY()",
            Placeholder::NoonYesterday => "NOON_YESTERDAY()",
            Placeholder::EndOfDayTomorrow => "EOD_TOMORROW()",
            Placeholder::NoonTomorrow => "NOON_TOMORROW()",
            Placeholder::EndOfDayNextWeek => "EOD_NEXT_WEEK()",
            Placeholder::NoonNextWeek => "NOON_NEXT_WEEK()",
        }
    }

    pub fn from_token(token: &str) -> Option<Placeholder> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }

    /// Concrete millisecond value of this macro at `now`, in `tz`
    pub fn resolve<Tz: TimeZone>(self, now: i64, tz: &Tz) -> i64 {
        match self {
            Placeholder::Now => now,
            Placeholder::EndOfDay => time::end_of_day_plus(now, tz, 0),
            Placeholder::Noon => time::noon_plus(now, tz, 0),
            Placeholder::EndOfDayYesterday => time::end_of_day_plus(now, tz, -1),
            Placeholder::NoonYesterday => time::noon_plus(now, tz, -1),
            Placeholder::EndOfDayTomorrow => time::end_of_day_plus(now, tz, 1),
            Placeholder::NoonTomorrow => time::noon_plus(now, tz, 1),
            Placeholder::EndOfDayNextWeek => time::end_of_day_plus(now, tz, ONE_WEEK_DAYS),
            Placeholder::NoonNextWeek => time::noon_plus(now, tz, ONE_WEEK_DAYS),
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Placeholder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s.trim()).ok_or_else(|| format!("Unknown placeholder: {}", s))
    }
}

/// Substitute every placeholder token in a generated predicate with its
/// value at `now`
pub fn replace_for_query<Tz: TimeZone>(sql: &str, now: i64, tz: &Tz) -> String {
    Placeholder::ALL
        .into_iter()
        .fold(sql.to_string(), |acc, placeholder| {
            if acc.contains(placeholder.token()) {
                acc.replace(placeholder.token(), &placeholder.resolve(now, tz).to_string())
            } else {
                acc
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const INSTANT: i64 = 1_700_000_000_000;

    #[test]
    fn test_tokens_round_trip() {
        for placeholder in Placeholder::ALL {
            assert_eq!(Placeholder::from_token(placeholder.token()), Some(placeholder));
        }
        assert_eq!(Placeholder::from_token("EOD"), None);
        assert_eq!("NOON()".parse::<Placeholder>(), Ok(Placeholder::Noon));
        assert!("later".parse::<Placeholder>().is_err());
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Placeholder::Now.resolve(INSTANT, &Utc), INSTANT);
        assert_eq!(Placeholder::EndOfDay.resolve(INSTANT, &Utc), 1_700_006_399_999);
        assert_eq!(Placeholder::Noon.resolve(INSTANT, &Utc), 1_699_963_200_000);
        assert_eq!(
            Placeholder::NoonNextWeek.resolve(INSTANT, &Utc),
            1_699_963_200_000 + 7 * 86_400_000
        );
    }

    #[test]
    fn test_noon_and_end_of_day_share_a_date() {
        let noon = Placeholder::Noon.resolve(INSTANT, &Utc);
        let eod = Placeholder::EndOfDay.resolve(INSTANT, &Utc);
        assert!(noon < eod);
        assert!(eod - noon < 86_400_000);
    }

    #[test]
    fn test_replace_for_query() {
        let sql = "WHERE (tasks.dueDate<=EOD() AND tasks.hideUntil<=NOW() AND tasks.x>EOD_YESTERDAY())";
        let replaced = replace_for_query(sql, INSTANT, &Utc);
        assert_eq!(
            replaced,
            "WHERE (tasks.dueDate<=1700006399999 AND tasks.hideUntil<=1700000000000 AND tasks.x>1699919999999)"
        );
    }

    #[test]
    fn test_replace_is_late_bound() {
        let sql = "dueDate<=EOD()";
        let today = replace_for_query(sql, INSTANT, &Utc);
        let tomorrow = replace_for_query(sql, INSTANT + 86_400_000, &Utc);
        assert_ne!(today, tomorrow);
    }
}
