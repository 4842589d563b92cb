//! Work-day schedule used to skip runs on days off.

use crate::config::Config;
use crate::errors::AutomationError;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub work_days: Vec<Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            work_days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu],
            start: NaiveTime::from_hms_opt(8, 30, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
        }
    }
}

impl Schedule {
    /// Reads `WORK_DAYS` (ISO weekday numbers, Monday = 1), `WORK_START_TIME`
    /// and `WORK_END_TIME` (`HH:MM`).
    pub fn from_config(config: &Config) -> Result<Self, AutomationError> {
        let defaults = Self::default();
        let work_days = match config.get_opt("WORK_DAYS") {
            Some(raw) => parse_work_days(&raw)?,
            None => defaults.work_days,
        };
        let start = match config.get_opt("WORK_START_TIME") {
            Some(raw) => parse_time("WORK_START_TIME", &raw)?,
            None => defaults.start,
        };
        let end = match config.get_opt("WORK_END_TIME") {
            Some(raw) => parse_time("WORK_END_TIME", &raw)?,
            None => defaults.end,
        };
        Ok(Self {
            work_days,
            start,
            end,
        })
    }

    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        self.work_days.contains(&date.weekday())
    }
}

fn parse_work_days(raw: &str) -> Result<Vec<Weekday>, AutomationError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let day: u32 = part.parse().map_err(|_| invalid_day(part))?;
            match day {
                1 => Ok(Weekday::Mon),
                2 => Ok(Weekday::Tue),
                3 => Ok(Weekday::Wed),
                4 => Ok(Weekday::Thu),
                5 => Ok(Weekday::Fri),
                6 => Ok(Weekday::Sat),
                7 => Ok(Weekday::Sun),
                _ => Err(invalid_day(part)),
            }
        })
        .collect()
}

fn invalid_day(part: &str) -> AutomationError {
    AutomationError::InvalidArgument(format!(
        "WORK_DAYS entries must be 1 (Monday) to 7 (Sunday), got '{part}'"
    ))
}

fn parse_time(key: &str, raw: &str) -> Result<NaiveTime, AutomationError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
        AutomationError::InvalidArgument(format!("{key} must be HH:MM, got '{raw}'"))
    })
}
