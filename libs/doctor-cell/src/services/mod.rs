pub mod doctor;
pub mod matching;

pub use doctor::DoctorService;
pub use matching::DepartmentMatchingService;
