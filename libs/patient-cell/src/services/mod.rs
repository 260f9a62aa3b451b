pub mod patient;
pub mod record;

pub use patient::PatientService;
pub use record::RecordService;
