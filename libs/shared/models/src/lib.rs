pub mod auth;
pub mod error;

pub use auth::{Role, Session, SessionProvider, StaticToken, User};
pub use error::ApiError;
