use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::ApiError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("No doctor selected")]
    NoDoctorSelected,

    #[error("Availability for the selected doctor has not loaded")]
    AvailabilityNotLoaded,

    #[error("Date {0} is in the past")]
    DateInPast(NaiveDate),

    #[error("Date {0} has no open slots")]
    DateUnavailable(NaiveDate),

    #[error("No date selected")]
    NoDateSelected,

    #[error("Slot {0} is not offered for the selected date")]
    SlotUnavailable(String),

    #[error("Select a time slot before choosing services")]
    SlotNotSelected,

    #[error("Service catalog is not available")]
    CatalogUnavailable,

    #[error("Service {0} is not in the catalog")]
    UnknownService(Uuid),

    #[error("Booking is incomplete: {0}")]
    Incomplete(&'static str),

    #[error("A booking is already being submitted")]
    SubmissionInFlight,

    #[error(transparent)]
    Api(#[from] ApiError),
}
