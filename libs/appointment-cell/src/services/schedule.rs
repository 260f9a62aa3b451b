use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_api_client::{require_token, PortalClient};
use shared_models::auth::SessionProvider;
use shared_models::error::ApiError;
use shared_utils::dates::{format_api_day, month_bounds};

use crate::models::{
    Appointment, AppointmentPayload, AppointmentService, AppointmentServicesPayload,
    AppointmentStatus, AppointmentsPayload, AvailabilityCalendar, DaysPayload,
};

/// Appointments can be edited from now until this many days ahead.
pub const EDIT_WINDOW_DAYS: i64 = 7;

/// The signed-in doctor's side of the calendar.
pub struct ScheduleService {
    client: Arc<PortalClient>,
    session: Arc<dyn SessionProvider>,
}

impl ScheduleService {
    pub fn new(client: Arc<PortalClient>, session: Arc<dyn SessionProvider>) -> Self {
        Self { client, session }
    }

    /// Days in the month containing `day` that have at least one appointment.
    pub async fn month_calendar(&self, day: NaiveDate) -> Result<AvailabilityCalendar, ApiError> {
        let token = require_token(self.session.as_ref())?;
        let (month_start, month_end) = month_bounds(day);
        debug!("Fetching doctor calendar {} to {}", month_start, month_end);

        let payload: DaysPayload = self.client
            .get(
                "/doctor/calendar",
                Some(&token),
                &[
                    ("monthStart", format_api_day(month_start)),
                    ("monthEnd", format_api_day(month_end)),
                ],
            )
            .await?;

        Ok(AvailabilityCalendar::parse(month_start, month_end, payload.days))
    }

    /// Appointments on `day`, earliest first.
    pub async fn appointments_on(&self, day: NaiveDate) -> Result<Vec<Appointment>, ApiError> {
        let token = require_token(self.session.as_ref())?;

        let payload: AppointmentsPayload = self.client
            .get("/doctor/appointments", Some(&token), &[("date", format_api_day(day))])
            .await?;

        let mut appointments = payload.appointments;
        appointments.sort_by_key(|appointment| appointment.appointment_time);
        debug!("{} appointments on {}", appointments.len(), day);
        Ok(appointments)
    }

    pub async fn appointment_services(&self, appointment_id: Uuid) -> Result<Vec<AppointmentService>, ApiError> {
        let token = require_token(self.session.as_ref())?;
        let path = format!("/appointments/services/{}", appointment_id);

        let payload: AppointmentServicesPayload = self.client
            .get(&path, Some(&token), &[])
            .await?;

        Ok(payload.services)
    }

    pub async fn cancel(&self, appointment: &Appointment) -> Result<Appointment, ApiError> {
        self.update_status(appointment, AppointmentStatus::Cancelled).await
    }

    pub async fn complete(&self, appointment: &Appointment) -> Result<Appointment, ApiError> {
        self.update_status(appointment, AppointmentStatus::Completed).await
    }

    async fn update_status(&self, appointment: &Appointment, status: AppointmentStatus) -> Result<Appointment, ApiError> {
        validate_transition(appointment.status, status)?;
        let token = require_token(self.session.as_ref())?;
        let action = match status {
            AppointmentStatus::Cancelled => "cancel",
            AppointmentStatus::Completed => "complete",
            AppointmentStatus::Scheduled => {
                return Err(ApiError::Validation("Appointments cannot be rescheduled here".to_string()));
            }
        };
        let path = format!("/appointments/{}/{}", appointment.id, action);

        let payload: AppointmentPayload = self.client
            .request(Method::POST, &path, Some(&token), &[], None)
            .await?;

        info!("Appointment {} marked {}", appointment.id, payload.appointment.status);
        Ok(payload.appointment)
    }
}

/// Only scheduled appointments move, and only to a terminal status.
pub fn validate_transition(current: AppointmentStatus, next: AppointmentStatus) -> Result<(), ApiError> {
    match (current, next) {
        (AppointmentStatus::Scheduled, AppointmentStatus::Cancelled)
        | (AppointmentStatus::Scheduled, AppointmentStatus::Completed) => Ok(()),
        _ => {
            warn!("Invalid status transition attempted: {} -> {}", current, next);
            Err(ApiError::Validation(format!("Appointment is already {}", current)))
        }
    }
}

pub fn is_within_edit_window(appointment_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    appointment_time >= now && appointment_time <= now + Duration::days(EDIT_WINDOW_DAYS)
}
