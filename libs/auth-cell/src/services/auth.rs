use std::sync::Arc;

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use shared_api_client::{require_token, PortalClient};
use shared_models::auth::{Session, User};
use shared_models::error::ApiError;

use crate::models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessagePayload, Profile,
    ProfilePayload, RegisterRequest, UpdateProfileRequest, UserPayload,
};
use crate::session::SessionStore;

pub struct AuthService {
    client: Arc<PortalClient>,
    session: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(client: Arc<PortalClient>, session: Arc<SessionStore>) -> Self {
        Self { client, session }
    }

    pub fn session(&self) -> Arc<SessionStore> {
        Arc::clone(&self.session)
    }

    /// Sign in and make the returned token the active session.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation("Email and password are required".to_string()));
        }

        debug!("Logging in {}", email);

        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        let response: LoginResponse = self.client
            .send_json(Method::POST, "/auth/login", None, json!(request))
            .await?;

        let user = response.user.clone();
        self.session.establish(Session {
            token: response.token,
            user: response.user,
        });

        info!("Logged in as {} ({:?})", user.email, user.role);
        Ok(user)
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User, ApiError> {
        if request.name.trim().is_empty() || request.email.trim().is_empty() {
            return Err(ApiError::Validation("Name and email are required".to_string()));
        }

        debug!("Registering account for {}", request.email);

        let payload: UserPayload = self.client
            .send_json(Method::POST, "/auth/register", None, json!(request))
            .await?;

        Ok(payload.user)
    }

    pub fn logout(&self) {
        self.session.clear();
    }

    pub async fn profile(&self) -> Result<Profile, ApiError> {
        let token = require_token(self.session.as_ref())?;

        let payload: ProfilePayload = self.client
            .get("/user/profile", Some(&token), &[])
            .await?;

        Ok(payload.user)
    }

    /// Update the display name (and photo URL, when one is already hosted).
    pub async fn update_profile(&self, request: UpdateProfileRequest) -> Result<User, ApiError> {
        if request.name.trim().is_empty() {
            return Err(ApiError::Validation("Name cannot be empty".to_string()));
        }

        let token = require_token(self.session.as_ref())?;

        let payload: UserPayload = self.client
            .send_json(Method::PATCH, "/user/profile", Some(&token), json!(request))
            .await?;

        let updated = payload.user.clone();
        self.session.update_user(move |user| *user = updated);

        info!("Profile updated for {}", payload.user.id);
        Ok(payload.user)
    }

    pub async fn change_password(&self, request: ChangePasswordRequest) -> Result<String, ApiError> {
        request.validate()?;

        let token = require_token(self.session.as_ref())?;

        let payload: MessagePayload = self.client
            .send_json(
                Method::PATCH,
                "/user/profile/password",
                Some(&token),
                json!({
                    "currentPassword": request.current_password,
                    "newPassword": request.new_password,
                }),
            )
            .await?;

        info!("Password changed");
        Ok(payload.message)
    }
}
