pub mod portal;

pub use portal::PortalClient;
pub use portal::require_token;
