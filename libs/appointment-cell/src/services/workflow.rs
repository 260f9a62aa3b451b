//! Appointment booking workflow.
//!
//! Drives one booking from doctor selection to submission:
//!
//! ```text
//! Idle -> SelectingDate -> SelectingSlot -> SelectingServices -> Submitting
//! ```
//!
//! Every network call is split into a `begin_*` step that updates local
//! state and hands out a ticket, and an `apply_*`/`finish_*` step that takes
//! the response back. A response is only applied while its ticket is still
//! current, so a slow reply for an earlier doctor or date can never
//! overwrite a newer selection. Drivers that do not need overlapping
//! requests can use the awaiting `select_*`/`submit` methods instead.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use doctor_cell::models::Doctor;
use shared_models::error::ApiError;
use shared_utils::dates::{self, Clock};

use crate::error::BookingError;
use crate::models::{
    Appointment, AvailabilityCalendar, BookAppointmentRequest, Fee, Service, Slot, SlotSet,
};
use crate::services::api::AppointmentApi;
use crate::services::pricing;

pub const AVAILABILITY_ALERT: &str = "Failed to load available dates. Please try again.";
pub const SERVICES_ALERT: &str = "Failed to load services. Please try again.";
pub const SLOTS_ALERT: &str = "Failed to load available time slots. Please try again.";
pub const BOOKING_ALERT: &str = "Failed to book appointment. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
    NotRequested,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::NotRequested
    }
}

impl<T> Loadable<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Loadable::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Loadable::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStage {
    Idle,
    SelectingDate,
    SelectingSlot,
    SelectingServices,
    Submitting,
}

/// Selections made so far. Discarded on cancel and after a successful booking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub doctor: Option<Doctor>,
    pub date: Option<NaiveDate>,
    pub slot: Option<Slot>,
    pub service_ids: Vec<Uuid>,
}

impl BookingDraft {
    /// First missing selection, in workflow order.
    pub fn missing(&self) -> Option<&'static str> {
        if self.doctor.is_none() {
            Some("doctor")
        } else if self.date.is_none() {
            Some("date")
        } else if self.slot.is_none() {
            Some("time slot")
        } else if self.service_ids.is_empty() {
            Some("service")
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoctorTicket {
    seq: u64,
    pub doctor_id: Uuid,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTicket {
    seq: u64,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTicket {
    seq: u64,
    pub request: BookAppointmentRequest,
}

pub struct BookingWorkflow {
    api: Arc<dyn AppointmentApi>,
    clock: Arc<dyn Clock>,
    draft: BookingDraft,
    calendar: Loadable<AvailabilityCalendar>,
    catalog: Loadable<Vec<Service>>,
    slots: Loadable<SlotSet>,
    last_seq: u64,
    doctor_seq: u64,
    slot_seq: u64,
    submit_seq: Option<u64>,
    alerts: Vec<String>,
}

impl BookingWorkflow {
    pub fn new(api: Arc<dyn AppointmentApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            clock,
            draft: BookingDraft::default(),
            calendar: Loadable::NotRequested,
            catalog: Loadable::NotRequested,
            slots: Loadable::NotRequested,
            last_seq: 0,
            doctor_seq: 0,
            slot_seq: 0,
            submit_seq: None,
            alerts: Vec::new(),
        }
    }

    pub fn stage(&self) -> BookingStage {
        if self.draft.doctor.is_none() {
            BookingStage::Idle
        } else if self.submit_seq.is_some() {
            BookingStage::Submitting
        } else if self.draft.slot.is_some() {
            BookingStage::SelectingServices
        } else if self.draft.date.is_some() {
            BookingStage::SelectingSlot
        } else {
            BookingStage::SelectingDate
        }
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn calendar(&self) -> &Loadable<AvailabilityCalendar> {
        &self.calendar
    }

    pub fn catalog(&self) -> &Loadable<Vec<Service>> {
        &self.catalog
    }

    pub fn slots(&self) -> &Loadable<SlotSet> {
        &self.slots
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Hand pending user-facing alerts to the front end.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    // ==========================================================================
    // DOCTOR
    // ==========================================================================

    /// Start a booking with `doctor`, discarding every earlier selection.
    pub fn begin_doctor(&mut self, doctor: Doctor) -> DoctorTicket {
        let (window_start, window_end) = dates::availability_window(self.clock.today());

        self.reset();
        let seq = self.next_seq();
        self.doctor_seq = seq;

        info!("Booking started with doctor {}", doctor.id);

        let ticket = DoctorTicket {
            seq,
            doctor_id: doctor.id,
            window_start,
            window_end,
        };

        self.draft.doctor = Some(doctor);
        self.calendar = Loadable::Loading;
        self.catalog = Loadable::Loading;

        ticket
    }

    /// Returns `false` when the response belongs to a superseded selection.
    pub fn apply_calendar(
        &mut self,
        ticket: DoctorTicket,
        result: Result<AvailabilityCalendar, ApiError>,
    ) -> bool {
        if !self.is_current_doctor(&ticket) {
            warn!("Discarding availability for doctor {} from a superseded selection", ticket.doctor_id);
            return false;
        }

        match result {
            Ok(calendar) => {
                debug!("Doctor {} has {} available days", ticket.doctor_id, calendar.len());
                self.calendar = Loadable::Loaded(calendar);
            }
            Err(e) => {
                error!("Error fetching available dates: {}", e);
                self.calendar = Loadable::Failed(e.to_string());
                self.alerts.push(AVAILABILITY_ALERT.to_string());
            }
        }
        true
    }

    pub fn apply_catalog(&mut self, ticket: DoctorTicket, result: Result<Vec<Service>, ApiError>) -> bool {
        if !self.is_current_doctor(&ticket) {
            warn!("Discarding service catalog from a superseded selection");
            return false;
        }

        match result {
            Ok(services) => {
                debug!("Loaded {} services", services.len());
                self.catalog = Loadable::Loaded(services);
            }
            Err(e) => {
                error!("Error fetching services: {}", e);
                self.catalog = Loadable::Failed(e.to_string());
                self.alerts.push(SERVICES_ALERT.to_string());
            }
        }
        true
    }

    /// Select a doctor and load their availability and the service catalog
    /// concurrently. Failures are recorded per fetch and raised as alerts.
    pub async fn select_doctor(&mut self, doctor: Doctor) {
        let ticket = self.begin_doctor(doctor);
        let api = Arc::clone(&self.api);

        let (calendar, catalog) = tokio::join!(
            api.doctor_availability(ticket.doctor_id, ticket.window_start, ticket.window_end),
            api.service_catalog(),
        );

        self.apply_calendar(ticket, calendar);
        self.apply_catalog(ticket, catalog);
    }

    fn is_current_doctor(&self, ticket: &DoctorTicket) -> bool {
        ticket.seq == self.doctor_seq && self.doctor_id() == Some(ticket.doctor_id)
    }

    fn doctor_id(&self) -> Option<Uuid> {
        self.draft.doctor.as_ref().map(|doctor| doctor.id)
    }

    // ==========================================================================
    // DATE & SLOT
    // ==========================================================================

    /// The draft is frozen while a booking request is out.
    fn check_not_submitting(&self) -> Result<(), BookingError> {
        if self.submit_seq.is_some() {
            return Err(BookingError::SubmissionInFlight);
        }
        Ok(())
    }

    fn check_date(&self, date: NaiveDate) -> Result<(), BookingError> {
        if self.draft.doctor.is_none() {
            return Err(BookingError::NoDoctorSelected);
        }
        if date < self.clock.today() {
            return Err(BookingError::DateInPast(date));
        }
        let calendar = self.calendar.loaded().ok_or(BookingError::AvailabilityNotLoaded)?;
        if !calendar.contains(date) {
            return Err(BookingError::DateUnavailable(date));
        }
        Ok(())
    }

    pub fn is_date_selectable(&self, date: NaiveDate) -> bool {
        self.check_date(date).is_ok()
    }

    /// Days the picker should offer: available and not in the past.
    pub fn selectable_dates(&self) -> Vec<NaiveDate> {
        let today = self.clock.today();
        self.calendar
            .loaded()
            .map(|calendar| calendar.days().filter(|day| *day >= today).collect())
            .unwrap_or_default()
    }

    /// Pick a day. The previous slot is dropped immediately, before the new
    /// day's slots arrive.
    pub fn begin_date(&mut self, date: NaiveDate) -> Result<SlotTicket, BookingError> {
        self.check_not_submitting()?;
        self.check_date(date)?;
        let doctor_id = self.doctor_id().ok_or(BookingError::NoDoctorSelected)?;

        self.draft.date = Some(date);
        self.draft.slot = None;
        self.slots = Loadable::Loading;

        let seq = self.next_seq();
        self.slot_seq = seq;

        debug!("Date {} selected for doctor {}", date, doctor_id);
        Ok(SlotTicket { seq, doctor_id, date })
    }

    /// Returns `false` when a later date selection superseded this one.
    pub fn apply_slots(&mut self, ticket: SlotTicket, result: Result<SlotSet, ApiError>) -> bool {
        let current = ticket.seq == self.slot_seq
            && self.draft.date == Some(ticket.date)
            && self.doctor_id() == Some(ticket.doctor_id);

        if !current {
            warn!("Discarding slots for {} from a superseded date selection", ticket.date);
            return false;
        }

        match result {
            Ok(slots) => {
                debug!("{} slots open on {}", slots.slots().len(), ticket.date);
                self.slots = Loadable::Loaded(slots);
            }
            Err(e) => {
                error!("Error fetching available slots: {}", e);
                self.slots = Loadable::Failed(e.to_string());
                self.alerts.push(SLOTS_ALERT.to_string());
            }
        }
        true
    }

    /// Pick a day and load its slots. Rule violations are returned; fetch
    /// failures land in [`Self::slots`] and the alert queue.
    pub async fn select_date(&mut self, date: NaiveDate) -> Result<(), BookingError> {
        let ticket = self.begin_date(date)?;
        let result = self.api.doctor_slots(ticket.doctor_id, ticket.date).await;
        self.apply_slots(ticket, result);
        Ok(())
    }

    pub fn select_slot(&mut self, starts_at: DateTime<Utc>) -> Result<(), BookingError> {
        self.check_not_submitting()?;
        if self.draft.date.is_none() {
            return Err(BookingError::NoDateSelected);
        }

        let slot = self.slots
            .loaded()
            .and_then(|set| set.find(starts_at))
            .cloned()
            .ok_or_else(|| BookingError::SlotUnavailable(dates::format_timestamp(starts_at)))?;

        debug!("Slot {} selected", slot.raw);
        self.draft.slot = Some(slot);
        Ok(())
    }

    // ==========================================================================
    // SERVICES & FEES
    // ==========================================================================

    /// Add or remove a service. Returns whether it is now selected.
    pub fn toggle_service(&mut self, service_id: Uuid) -> Result<bool, BookingError> {
        self.check_not_submitting()?;
        if self.draft.slot.is_none() {
            return Err(BookingError::SlotNotSelected);
        }

        let catalog = self.catalog.loaded().ok_or(BookingError::CatalogUnavailable)?;
        if !catalog.iter().any(|service| service.id == service_id) {
            return Err(BookingError::UnknownService(service_id));
        }

        match self.draft.service_ids.iter().position(|id| *id == service_id) {
            Some(index) => {
                self.draft.service_ids.remove(index);
                Ok(false)
            }
            None => {
                self.draft.service_ids.push(service_id);
                Ok(true)
            }
        }
    }

    pub fn total(&self) -> Fee {
        self.catalog
            .loaded()
            .map(|catalog| pricing::total_fee(catalog, &self.draft.service_ids))
            .unwrap_or(Fee::ZERO)
    }

    /// Total of the selected services with two decimals, `"0.00"` when empty.
    pub fn total_fee(&self) -> String {
        self.total().to_string()
    }

    // ==========================================================================
    // SUBMISSION
    // ==========================================================================

    pub fn can_submit(&self) -> bool {
        self.submit_seq.is_none() && self.draft.is_complete()
    }

    pub fn begin_submit(&mut self) -> Result<SubmitTicket, BookingError> {
        if self.submit_seq.is_some() {
            return Err(BookingError::SubmissionInFlight);
        }
        if let Some(missing) = self.draft.missing() {
            return Err(BookingError::Incomplete(missing));
        }

        let (Some(doctor), Some(date), Some(slot)) =
            (self.draft.doctor.as_ref(), self.draft.date, self.draft.slot.as_ref())
        else {
            return Err(BookingError::Incomplete("doctor"));
        };

        let appointment_time = dates::booking_timestamp(date, slot.starts_at);
        let request = BookAppointmentRequest {
            doctor_id: doctor.id,
            appointment_time: dates::format_timestamp(appointment_time),
            service_ids: self.draft.service_ids.clone(),
        };

        let seq = self.next_seq();
        self.submit_seq = Some(seq);

        Ok(SubmitTicket { seq, request })
    }

    /// Success clears the draft; failure keeps it so the user can retry.
    pub fn finish_submit(
        &mut self,
        ticket: SubmitTicket,
        result: Result<Appointment, ApiError>,
    ) -> Result<Appointment, BookingError> {
        if self.submit_seq != Some(ticket.seq) {
            warn!("Booking response arrived after the workflow moved on");
            return result.map_err(BookingError::Api);
        }
        self.submit_seq = None;

        match result {
            Ok(appointment) => {
                info!(
                    "Appointment {} booked with doctor {} at {}",
                    appointment.id, ticket.request.doctor_id, ticket.request.appointment_time
                );
                self.reset();
                Ok(appointment)
            }
            Err(e) => {
                error!("Error booking appointment: {}", e);
                self.alerts.push(BOOKING_ALERT.to_string());
                Err(BookingError::Api(e))
            }
        }
    }

    pub async fn submit(&mut self) -> Result<Appointment, BookingError> {
        let ticket = self.begin_submit()?;
        let result = self.api.book_appointment(ticket.request.clone()).await;
        self.finish_submit(ticket, result)
    }

    /// Close the booking. Responses still in flight will be discarded.
    pub fn cancel(&mut self) {
        if let Some(doctor_id) = self.doctor_id() {
            info!("Booking with doctor {} cancelled", doctor_id);
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.draft = BookingDraft::default();
        self.calendar = Loadable::NotRequested;
        self.catalog = Loadable::NotRequested;
        self.slots = Loadable::NotRequested;
        self.doctor_seq = 0;
        self.slot_seq = 0;
        self.submit_seq = None;
    }

    fn next_seq(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }
}
