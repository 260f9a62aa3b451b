use std::collections::BTreeSet;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use shared_utils::dates;

// ==============================================================================
// SERVICES & FEES
// ==============================================================================

/// A monetary amount in whole cents.
///
/// The API sends fees either as JSON numbers or as decimal strings
/// (`"20.00"`); both are rounded to the nearest cent on the way in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fee(i64);

impl Fee {
    pub const ZERO: Fee = Fee(0);

    pub fn from_cents(cents: i64) -> Self {
        Fee(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Fee::ZERO);
        }
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Self::from_amount)
            .ok_or_else(|| format!("Invalid fee: {}", raw))
    }

    /// Largest cent value an `f64` still holds exactly.
    const MAX_EXACT_CENTS: f64 = 9_007_199_254_740_991.0;

    fn from_amount(amount: f64) -> Option<Self> {
        let cents = (amount * 100.0).round();
        (cents.is_finite() && cents.abs() <= Self::MAX_EXACT_CENTS).then(|| Fee(cents as i64))
    }

    pub fn as_amount(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// Two decimals, no currency symbol: `15.50`.
impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Fee {
    type Output = Fee;

    fn add(self, rhs: Fee) -> Fee {
        Fee(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Fee {
    fn sum<I: Iterator<Item = Fee>>(iter: I) -> Fee {
        iter.fold(Fee::ZERO, Add::add)
    }
}

impl Serialize for Fee {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_amount())
    }
}

impl<'de> Deserialize<'de> for Fee {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Fee::ZERO),
            Value::Number(n) => n
                .as_f64()
                .and_then(Fee::from_amount)
                .ok_or_else(|| serde::de::Error::custom(format!("Invalid fee: {}", n))),
            Value::String(s) => Fee::parse(&s).map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!("Invalid fee: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub fee: Fee,
}

/// A service attached to an existing appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentService {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// Days with at least one open slot inside a query window.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityCalendar {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    days: BTreeSet<NaiveDate>,
}

impl AvailabilityCalendar {
    pub fn new(window_start: NaiveDate, window_end: NaiveDate, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            window_start,
            window_end,
            days: days.into_iter().collect(),
        }
    }

    /// Build from API day strings, dropping any that do not parse.
    pub fn parse<S: AsRef<str>>(
        window_start: NaiveDate,
        window_end: NaiveDate,
        raw_days: impl IntoIterator<Item = S>,
    ) -> Self {
        let days = raw_days.into_iter().filter_map(|raw| {
            dates::parse_api_day(raw.as_ref())
                .map_err(|e| warn!("Skipping availability day: {}", e))
                .ok()
        });
        Self::new(window_start, window_end, days)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.days.contains(&day)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// A bookable start time as offered by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub raw: String,
    pub starts_at: DateTime<Utc>,
}

/// Bookable start times for one doctor on one day, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSet {
    pub date: NaiveDate,
    slots: Vec<Slot>,
}

impl SlotSet {
    pub fn new(date: NaiveDate, mut slots: Vec<Slot>) -> Self {
        slots.sort_by_key(|slot| slot.starts_at);
        slots.dedup_by_key(|slot| slot.starts_at);
        Self { date, slots }
    }

    /// Build from API slot strings, dropping any that do not parse.
    pub fn parse<S: AsRef<str>>(date: NaiveDate, raw_slots: impl IntoIterator<Item = S>) -> Self {
        let slots = raw_slots
            .into_iter()
            .filter_map(|raw| {
                let raw = raw.as_ref();
                match dates::parse_slot(raw, date) {
                    Ok(starts_at) => Some(Slot { raw: raw.to_string(), starts_at }),
                    Err(e) => {
                        warn!("Skipping slot: {}", e);
                        None
                    }
                }
            })
            .collect();
        Self::new(date, slots)
    }

    pub fn find(&self, starts_at: DateTime<Utc>) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.starts_at == starts_at)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Cancelled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub doctor_id: Uuid,
    pub appointment_time: DateTime<Utc>,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub appointment_time: String,
    pub service_ids: Vec<Uuid>,
}

// ==============================================================================
// RESPONSE PAYLOADS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct DaysPayload {
    pub days: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlotsPayload {
    pub slots: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServicesPayload {
    pub services: Vec<Service>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppointmentServicesPayload {
    pub services: Vec<AppointmentService>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookingPayload {
    pub booking: Appointment,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppointmentPayload {
    pub appointment: Appointment,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppointmentsPayload {
    pub appointments: Vec<Appointment>,
}
