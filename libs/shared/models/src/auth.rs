use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Option<String>,
    pub exp: Option<i64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub iat: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Doctor,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
    #[serde(default)]
    pub assigned_doctor_id: Option<Uuid>,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An authenticated caller: the bearer token and the user it was issued to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Source of the caller's credentials for outgoing API calls.
///
/// Services take this as an injected dependency so they never reach for
/// ambient global state.
pub trait SessionProvider: Send + Sync {
    /// Bearer token for the current session, `None` when signed out or expired.
    fn token(&self) -> Option<String>;

    fn current_user(&self) -> Option<User>;
}

/// Fixed token with no user attached. Used when a token is handed in directly.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl SessionProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }

    fn current_user(&self) -> Option<User> {
        None
    }
}
