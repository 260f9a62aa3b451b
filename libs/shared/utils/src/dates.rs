//! Calendar-day and timestamp conversions for the portal API.
//!
//! The API speaks in UTC calendar days (`YYYY-MM-DD`) and ISO-8601
//! timestamps. Every conversion between what a user picks and what goes on
//! the wire lives here so that no caller slices strings by hand.

use chrono::{
    DateTime, Datelike, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc,
};

pub const API_DAY_FORMAT: &str = "%Y-%m-%d";

/// Source of "now" so date rules can be tested against a fixed day.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The user's current calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Clock pinned to midnight UTC of `day`.
    pub fn on(day: NaiveDate) -> Self {
        Self(utc_midnight(day))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Wire form of a picked day. Days are carried as `NaiveDate` end to end, so
/// the Y/M/D the user picked is the one sent.
pub fn format_api_day(day: NaiveDate) -> String {
    day.format(API_DAY_FORMAT).to_string()
}

pub fn utc_midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Parse a day as the API returns it. Full timestamps are reduced to their
/// UTC calendar day.
pub fn parse_api_day(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, API_DAY_FORMAT) {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| format!("Invalid date: {}", raw))
}

/// Parse a slot start time. Full timestamps are taken as-is (naive ones as
/// UTC); bare `HH:MM[:SS]` times are anchored to `day` in UTC.
pub fn parse_slot(raw: &str, day: NaiveDate) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .map(|time| day.and_time(time).and_utc())
        .ok_or_else(|| format!("Invalid slot time: {}", raw))
}

/// Booking query window: today through the same day next month.
///
/// Days that do not exist next month clamp to its last day
/// (Jan 31 → Feb 28/29).
pub fn availability_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = today
        .checked_add_months(Months::new(1))
        .unwrap_or(today);
    (today, end)
}

/// First and last day of the month containing `day`.
pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(day);
    (first, last)
}

/// Appointment instant from the picked day and a slot's UTC time-of-day.
pub fn booking_timestamp(day: NaiveDate, slot: DateTime<Utc>) -> DateTime<Utc> {
    day.and_time(slot.time()).and_utc()
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
