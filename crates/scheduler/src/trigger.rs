//! When the next automatic backup fires

use crate::error::{Result, SchedulerError};
use chrono::{DateTime, LocalResult, TimeZone};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Periodic trigger for automatic backups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Once a day at local midnight
    DailyAtMidnight,
    /// Fixed interval from the previous attempt
    Every(Duration),
}

impl Trigger {
    /// Delay from `now` until the next fire
    ///
    /// Fails when the next midnight does not exist on the local clock
    /// (a DST jump over 00:00).
    pub fn delay_from<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Duration> {
        match self {
            Trigger::Every(interval) => {
                if interval.is_zero() {
                    return Err(SchedulerError::Schedule("interval must be positive".into()));
                }
                Ok(*interval)
            }
            Trigger::DailyAtMidnight => {
                let tomorrow = now
                    .date_naive()
                    .succ_opt()
                    .ok_or_else(|| SchedulerError::Schedule("date out of range".into()))?;
                let midnight = tomorrow
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| SchedulerError::Schedule("invalid midnight".into()))?;

                let next = match now.timezone().from_local_datetime(&midnight) {
                    LocalResult::Single(t) => t,
                    LocalResult::Ambiguous(earliest, _) => earliest,
                    LocalResult::None => {
                        return Err(SchedulerError::Schedule(format!(
                            "{} does not exist in the local time zone",
                            midnight
                        )))
                    }
                };

                (next - now.clone())
                    .to_std()
                    .map_err(|e| SchedulerError::Schedule(e.to_string()))
            }
        }
    }
}

impl FromStr for Trigger {
    type Err = String;

    /// `midnight` or a whole number of seconds
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("midnight") {
            return Ok(Trigger::DailyAtMidnight);
        }
        match s.parse::<u64>() {
            Ok(0) => Err("interval must be at least one second".to_string()),
            Ok(secs) => Ok(Trigger::Every(Duration::from_secs(secs))),
            Err(_) => Err(format!(
                "invalid trigger '{}' (expected 'midnight' or seconds)",
                s
            )),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::DailyAtMidnight => write!(f, "midnight"),
            Trigger::Every(d) => write!(f, "{}", d.as_secs()),
        }
    }
}
