//! # Observation days and target instants
//!
//! Requested observation days are identified by an [`ObservationKey`] (year + Julian
//! day, canonical form `YYYYDDD`). A [`TargetInstant`] adds an optional time of day to
//! a key and resolves to a UTC [`Epoch`].
//!
//! User input for days comes in three shapes, captured by [`DaySpec`]:
//!
//! ```text
//! "123"          -> DaySpec::Single(123)
//! "120-125"      -> DaySpec::Range { start: 120, end: 125 }   (inclusive)
//! "120,122,130"  -> DaySpec::List(vec![120, 122, 130])
//! ```
//!
//! [`DaySpec::keys`] resolves any of them once into an ordered, de-duplicated sequence
//! of keys; nothing downstream deals with the raw forms.
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use hifitime::{is_gregorian_valid, Epoch};
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cloudcorr_errors::CloudCorrError;
use crate::constants::{DEFAULT_HOUR, DEFAULT_MINUTE};
use crate::reporting::{Warning, WarningSink};

static KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{3})$").expect("valid key regex"));
static DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,3})\s*$").expect("valid day regex"));
static DAY_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,3})\s*-\s*(\d{1,3})\s*$").expect("valid day range regex")
});
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2}):(\d{2})\s*$").expect("valid time regex"));

pub fn is_leap_year(year: i32) -> bool {
    is_gregorian_valid(year, 2, 29, 0, 0, 0, 0)
}

/// Length of `month` in `year`; zero for a month outside `1..=12`.
pub fn days_in_month(year: i32, month: u8) -> u32 {
    (28..=31u8)
        .rev()
        .find(|day| is_gregorian_valid(year, month, *day, 0, 0, 0, 0))
        .map_or(0, u32::from)
}

pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Serialise an [`Epoch`] through its `Display` form.
pub(crate) fn serialize_epoch<S: serde::Serializer>(
    epoch: &Epoch,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(epoch)
}

/// A single observation day.
///
/// Ordering follows the calendar. The canonical string form is `YYYYDDD`, e.g.
/// `2020100` for the 100th day of 2020.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ObservationKey {
    year: i32,
    day_of_year: u32,
}

impl ObservationKey {
    /// Build a key, checking that `day_of_year` exists in `year`.
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::DayOutOfRange`] for day 0, day > 366, or day 366 of a
    ///   non-leap year.
    pub fn new(year: i32, day_of_year: u32) -> Result<Self, CloudCorrError> {
        if !(1..=9999).contains(&year) || day_of_year == 0 || day_of_year > days_in_year(year)
        {
            return Err(CloudCorrError::DayOutOfRange {
                year,
                day: day_of_year,
            });
        }
        Ok(ObservationKey { year, day_of_year })
    }

    /// Parse the canonical `YYYYDDD` form.
    pub fn parse(s: &str) -> Result<Self, CloudCorrError> {
        let caps = KEY_RE
            .captures(s.trim())
            .ok_or_else(|| CloudCorrError::InvalidKey(s.to_string()))?;
        let year = caps[1]
            .parse::<i32>()
            .map_err(|_| CloudCorrError::InvalidKey(s.to_string()))?;
        let day = caps[2]
            .parse::<u32>()
            .map_err(|_| CloudCorrError::InvalidKey(s.to_string()))?;
        ObservationKey::new(year, day)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn day_of_year(&self) -> u32 {
        self.day_of_year
    }

    /// Zero-padded three-digit Julian day (`"007"`).
    pub fn julian_day(&self) -> String {
        format!("{:03}", self.day_of_year)
    }

    /// Calendar month and day of this key.
    pub fn month_day(&self) -> (u8, u8) {
        let mut remaining = self.day_of_year;
        for month in 1..=12u8 {
            let length = days_in_month(self.year, month);
            if remaining <= length {
                // bounded by days_in_month
                return (month, remaining as u8);
            }
            remaining -= length;
        }
        // day_of_year is validated against days_in_year at construction
        (12, 31)
    }

    /// UTC epoch of this day at the given time of day.
    pub fn epoch_at(&self, time_of_day: TimeOfDay) -> Epoch {
        let (month, day) = self.month_day();
        Epoch::from_gregorian_utc(
            self.year,
            month,
            day,
            time_of_day.hour,
            time_of_day.minute,
            0,
            0,
        )
    }
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:03}", self.year, self.day_of_year)
    }
}

impl FromStr for ObservationKey {
    type Err = CloudCorrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObservationKey::parse(s)
    }
}

impl From<ObservationKey> for String {
    fn from(key: ObservationKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ObservationKey {
    type Error = CloudCorrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ObservationKey::parse(&value)
    }
}

/// Hour and minute of a day, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, CloudCorrError> {
        if hour > 23 || minute > 59 {
            return Err(CloudCorrError::InvalidTimeOfDay(format!(
                "{hour:02}:{minute:02}"
            )));
        }
        Ok(TimeOfDay { hour, minute })
    }

    /// The default target time when none is supplied.
    pub fn noon() -> Self {
        TimeOfDay {
            hour: DEFAULT_HOUR,
            minute: DEFAULT_MINUTE,
        }
    }

    /// Parse `"HH:MM"`.
    pub fn parse(s: &str) -> Result<Self, CloudCorrError> {
        let caps = TIME_RE
            .captures(s)
            .ok_or_else(|| CloudCorrError::InvalidTimeOfDay(s.to_string()))?;
        let hour = caps[1]
            .parse::<u8>()
            .map_err(|_| CloudCorrError::InvalidTimeOfDay(s.to_string()))?;
        let minute = caps[2]
            .parse::<u8>()
            .map_err(|_| CloudCorrError::InvalidTimeOfDay(s.to_string()))?;
        TimeOfDay::new(hour, minute)
    }

    /// Decode the packed `HHMM` integer form used by the granule time layer
    /// (`1035` -> 10:35, `905` -> 09:05).
    pub fn from_hhmm(packed: u32) -> Result<Self, CloudCorrError> {
        let hour = u8::try_from(packed / 100)
            .map_err(|_| CloudCorrError::InvalidTimeOfDay(packed.to_string()))?;
        // packed % 100 < 100 always fits
        TimeOfDay::new(hour, (packed % 100) as u8)
            .map_err(|_| CloudCorrError::InvalidTimeOfDay(packed.to_string()))
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = CloudCorrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TimeOfDay::parse(&value)
    }
}

/// A requested observation instant: a day plus an optional time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetInstant {
    pub key: ObservationKey,
    pub time_of_day: Option<TimeOfDay>,
}

impl TargetInstant {
    /// Target at an explicit time of day.
    pub fn at(key: ObservationKey, time_of_day: TimeOfDay) -> Self {
        TargetInstant {
            key,
            time_of_day: Some(time_of_day),
        }
    }

    /// Target from user input. When `time_of_day` is `None` the target falls back to
    /// noon and a [`Warning::DefaultTimeOfDay`] is emitted.
    pub fn new(
        key: ObservationKey,
        time_of_day: Option<TimeOfDay>,
        sink: &dyn WarningSink,
    ) -> Self {
        if time_of_day.is_none() {
            sink.warn(Warning::DefaultTimeOfDay {
                applied: TimeOfDay::noon(),
                count: 1,
            });
        }
        TargetInstant { key, time_of_day }
    }

    pub fn effective_time_of_day(&self) -> TimeOfDay {
        self.time_of_day.unwrap_or_else(TimeOfDay::noon)
    }

    /// The UTC instant every candidate is compared against.
    pub fn epoch(&self) -> Epoch {
        self.key.epoch_at(self.effective_time_of_day())
    }
}

impl fmt::Display for TargetInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.effective_time_of_day())
    }
}

/// The accepted shapes of a day request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaySpec {
    Single(u32),
    /// Inclusive on both ends.
    Range { start: u32, end: u32 },
    List(Vec<u32>),
}

impl DaySpec {
    /// Parse `"123"`, `"120-125"` or `"120,122,130"`.
    pub fn parse(s: &str) -> Result<Self, CloudCorrError> {
        if let Some(caps) = DAY_RE.captures(s) {
            return Ok(DaySpec::Single(parse_day(&caps[1], s)?));
        }
        if let Some(caps) = DAY_RANGE_RE.captures(s) {
            return Ok(DaySpec::Range {
                start: parse_day(&caps[1], s)?,
                end: parse_day(&caps[2], s)?,
            });
        }
        if s.contains(',') {
            let days = s
                .split(',')
                .map(|part| {
                    DAY_RE
                        .captures(part)
                        .ok_or_else(|| CloudCorrError::InvalidDaySpec(s.to_string()))
                        .and_then(|caps| parse_day(&caps[1], s))
                })
                .collect::<Result<Vec<u32>, CloudCorrError>>()?;
            return Ok(DaySpec::List(days));
        }
        Err(CloudCorrError::InvalidDaySpec(s.to_string()))
    }

    /// Resolve into the ordered sequence of keys for `year`.
    ///
    /// Duplicated days keep their first position.
    pub fn keys(&self, year: i32) -> Result<Vec<ObservationKey>, CloudCorrError> {
        let days: Vec<u32> = match self {
            DaySpec::Single(day) => vec![*day],
            DaySpec::Range { start, end } => {
                if start > end {
                    return Err(CloudCorrError::InvalidDaySpec(format!("{start}-{end}")));
                }
                (*start..=*end).collect()
            }
            DaySpec::List(days) => days.clone(),
        };

        days.into_iter()
            .unique()
            .map(|day| ObservationKey::new(year, day))
            .collect()
    }

    /// Resolve into target instants, warning once if the time of day is defaulted.
    pub fn targets(
        &self,
        year: i32,
        time_of_day: Option<TimeOfDay>,
        sink: &dyn WarningSink,
    ) -> Result<Vec<TargetInstant>, CloudCorrError> {
        let keys = self.keys(year)?;
        if time_of_day.is_none() {
            sink.warn(Warning::DefaultTimeOfDay {
                applied: TimeOfDay::noon(),
                count: keys.len(),
            });
        }
        Ok(keys
            .into_iter()
            .map(|key| TargetInstant { key, time_of_day })
            .collect())
    }
}

impl FromStr for DaySpec {
    type Err = CloudCorrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DaySpec::parse(s)
    }
}

fn parse_day(digits: &str, whole: &str) -> Result<u32, CloudCorrError> {
    digits
        .parse::<u32>()
        .map_err(|_| CloudCorrError::InvalidDaySpec(whole.to_string()))
}
