pub mod dates;
pub mod jwt;
pub mod test_utils;

pub use dates::{Clock, FixedClock, SystemClock};
