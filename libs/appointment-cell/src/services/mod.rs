pub mod api;
pub mod pricing;
pub mod schedule;
pub mod workflow;

pub use api::{AppointmentApi, HttpAppointmentApi};
pub use schedule::ScheduleService;
pub use workflow::{BookingDraft, BookingStage, BookingWorkflow, Loadable};
