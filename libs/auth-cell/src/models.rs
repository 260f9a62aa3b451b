use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared_models::auth::User;
use shared_models::error::ApiError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserPayload {
    pub user: User,
}

/// `GET /user/profile` returns the account and, for patients, their record.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub user: User,
    #[serde(default)]
    pub record: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfilePayload {
    pub user: Profile,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.current_password.is_empty() {
            return Err(ApiError::Validation("Current password is required".to_string()));
        }
        if self.new_password != self.confirm_password {
            return Err(ApiError::Validation("New passwords do not match".to_string()));
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ApiError::Validation(format!(
                "New password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessagePayload {
    pub message: String,
}
