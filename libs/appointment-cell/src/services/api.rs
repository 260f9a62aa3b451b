use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_api_client::{require_token, PortalClient};
use shared_models::auth::SessionProvider;
use shared_models::error::ApiError;
use shared_utils::dates::format_api_day;

use crate::models::{
    Appointment, AvailabilityCalendar, BookAppointmentRequest, BookingPayload, DaysPayload,
    Service, ServicesPayload, SlotSet, SlotsPayload,
};

/// The four portal calls the booking workflow depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentApi: Send + Sync {
    async fn doctor_availability(
        &self,
        doctor_id: Uuid,
        month_start: NaiveDate,
        month_end: NaiveDate,
    ) -> Result<AvailabilityCalendar, ApiError>;

    async fn doctor_slots(&self, doctor_id: Uuid, date: NaiveDate) -> Result<SlotSet, ApiError>;

    async fn service_catalog(&self) -> Result<Vec<Service>, ApiError>;

    async fn book_appointment(&self, request: BookAppointmentRequest) -> Result<Appointment, ApiError>;
}

pub struct HttpAppointmentApi {
    client: Arc<PortalClient>,
    session: Arc<dyn SessionProvider>,
}

impl HttpAppointmentApi {
    pub fn new(client: Arc<PortalClient>, session: Arc<dyn SessionProvider>) -> Self {
        Self { client, session }
    }
}

#[async_trait]
impl AppointmentApi for HttpAppointmentApi {
    async fn doctor_availability(
        &self,
        doctor_id: Uuid,
        month_start: NaiveDate,
        month_end: NaiveDate,
    ) -> Result<AvailabilityCalendar, ApiError> {
        let token = require_token(self.session.as_ref())?;
        debug!("Fetching availability for doctor {} ({} to {})", doctor_id, month_start, month_end);

        let payload: DaysPayload = self.client
            .get(
                "/appointments/calendar",
                Some(&token),
                &[
                    ("doctorId", doctor_id.to_string()),
                    ("monthStart", format_api_day(month_start)),
                    ("monthEnd", format_api_day(month_end)),
                ],
            )
            .await?;

        Ok(AvailabilityCalendar::parse(month_start, month_end, payload.days))
    }

    async fn doctor_slots(&self, doctor_id: Uuid, date: NaiveDate) -> Result<SlotSet, ApiError> {
        let token = require_token(self.session.as_ref())?;
        debug!("Fetching slots for doctor {} on {}", doctor_id, date);

        let payload: SlotsPayload = self.client
            .get(
                "/appointments/slots",
                Some(&token),
                &[
                    ("doctorId", doctor_id.to_string()),
                    ("date", format_api_day(date)),
                ],
            )
            .await?;

        Ok(SlotSet::parse(date, payload.slots))
    }

    async fn service_catalog(&self) -> Result<Vec<Service>, ApiError> {
        let token = require_token(self.session.as_ref())?;

        let payload: ServicesPayload = self.client
            .get("/services", Some(&token), &[])
            .await?;

        Ok(payload.services)
    }

    async fn book_appointment(&self, request: BookAppointmentRequest) -> Result<Appointment, ApiError> {
        let token = require_token(self.session.as_ref())?;
        debug!("Booking doctor {} at {}", request.doctor_id, request.appointment_time);

        let payload: BookingPayload = self.client
            .send_json(Method::POST, "/appointments", Some(&token), json!(request))
            .await?;

        Ok(payload.booking)
    }
}
