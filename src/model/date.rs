// File: ./src/model/date.rs
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
/// Human readable form used by older data files (`Mon Jun 03 2024`).
const DISPLAY_DATE_FORMAT: &str = "%a %b %d %Y";
const CLOCK_FORMAT: &str = "%H:%M";

// --- DATE KEY ---

/// Canonical identifier of a calendar day.
///
/// Always serialized as ISO-8601 (`YYYY-MM-DD`), which keeps map keys stable
/// across locales and makes their ordering chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.0.year(),
            month: self.0.month(),
        }
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.0.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Derived display string. Not authoritative, never used as a key.
    pub fn display_string(&self) -> String {
        self.0.format(DISPLAY_DATE_FORMAT).to_string()
    }

    /// Parses either the canonical ISO form or the legacy display form.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        let s = s.trim();
        NaiveDate::parse_from_str(s, ISO_DATE_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(s, DISPLAY_DATE_FORMAT))
            .ok()
            .map(Self)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(ISO_DATE_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| {
            anyhow::anyhow!("Invalid date '{}'. Expected YYYY-MM-DD", s)
        })
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct DateKeyVisitor;

impl Visitor<'_> for DateKeyVisitor {
    type Value = DateKey;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a date as YYYY-MM-DD")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<DateKey, E> {
        let key = DateKey::parse_lenient(v)
            .ok_or_else(|| E::custom(format!("invalid date key '{}'", v)))?;
        if NaiveDate::parse_from_str(v.trim(), ISO_DATE_FORMAT).is_err() {
            log::info!("Migrating legacy date key '{}' to {}", v, key);
        }
        Ok(key)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(DateKeyVisitor)
    }
}

// --- CLOCK TIME ---

/// A time of day with minute precision, serialized as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Accepts `HH:MM` and `HH:MM:SS`; seconds are dropped.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let time = NaiveTime::parse_from_str(s, CLOCK_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()?;
        Self::from_hm(time.hour(), time.minute())
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CLOCK_FORMAT))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ClockTime::parse(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid time '{}', expected HH:MM", s)))
    }
}

// --- YEAR / MONTH ---

/// A calendar month, used for month slices (export, grid markers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    /// 1-based.
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is validated on construction, day 1 always exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn days_in_month(&self) -> u32 {
        let next = self.next().first_day();
        next.signed_duration_since(self.first_day()).num_days() as u32
    }

    /// Number of blank cells before day 1 in a Monday-first week grid.
    pub fn leading_blank_days(&self) -> u32 {
        self.first_day().weekday().num_days_from_monday()
    }

    pub fn contains(&self, key: &DateKey) -> bool {
        key.year_month() == *self
    }

    pub fn days(&self) -> impl Iterator<Item = DateKey> + '_ {
        (1..=self.days_in_month())
            .filter_map(move |day| DateKey::from_ymd(self.year, self.month, day))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first_day().format("%B %Y"))
    }
}
