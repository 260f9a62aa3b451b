use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, Session, User};

pub struct TestConfig {
    pub jwt_secret: String,
    pub api_base_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-signing-must-be-long-enough".to_string(),
            api_base_url: "http://localhost:3223".to_string(),
        }
    }
}

impl TestConfig {
    /// Config aimed at a mock server, e.g. `wiremock::MockServer::uri()`.
    pub fn for_server(uri: impl Into<String>) -> Self {
        Self {
            api_base_url: uri.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        let mut config = AppConfig::with_base_url(self.api_base_url.clone());
        config.request_timeout_secs = 5;
        config
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub assigned_doctor_id: Option<Uuid>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", Role::User)
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: email.to_string(),
            role,
            assigned_doctor_id: None,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, Role::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::User)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn with_assigned_doctor(mut self, doctor_id: Uuid) -> Self {
        self.assigned_doctor_id = Some(doctor_id);
        self
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            profile_photo_url: None,
            assigned_doctor_id: self.assigned_doctor_id,
            department_id: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.to_user()).unwrap_or(Value::Null)
    }

    /// Session holding a freshly signed 24h token.
    pub fn session(&self, secret: &str) -> Session {
        Session {
            token: JwtTestUtils::create_test_token(self, secret, Some(24)),
            user: self.to_user(),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Response bodies shaped like the portal API's `{ "data": ... }` envelope.
pub struct MockPortalResponses;

impl MockPortalResponses {
    pub fn envelope(data: Value) -> Value {
        json!({ "data": data })
    }

    pub fn login_response(user: &TestUser, token: &str) -> Value {
        Self::envelope(json!({
            "user": user.to_json(),
            "token": token
        }))
    }

    pub fn doctor(id: Uuid, name: &str, department_id: Uuid) -> Value {
        json!({
            "id": id,
            "name": name,
            "email": format!("{}@clinic.example", name.to_lowercase().replace(' ', ".")),
            "role": "doctor",
            "department_id": department_id,
            "profile_photo_url": null
        })
    }

    pub fn department(id: Uuid, name: &str) -> Value {
        json!({ "id": id, "name": name })
    }

    pub fn service(id: Uuid, name: &str, fee: Value) -> Value {
        json!({ "id": id, "name": name, "fee": fee })
    }

    pub fn availability_response(days: &[&str]) -> Value {
        Self::envelope(json!({ "days": days }))
    }

    pub fn slots_response(slots: &[&str]) -> Value {
        Self::envelope(json!({ "slots": slots }))
    }

    pub fn services_response(services: Vec<Value>) -> Value {
        Self::envelope(json!({ "services": services }))
    }

    pub fn appointment(user_id: Uuid, doctor_id: Uuid, appointment_time: &str, status: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "doctor_id": doctor_id,
            "appointment_time": appointment_time,
            "status": status,
            "created_at": "2025-06-01T00:00:00Z",
            "updated_at": "2025-06-01T00:00:00Z"
        })
    }

    pub fn booking_response(user_id: Uuid, doctor_id: Uuid, appointment_time: &str) -> Value {
        Self::envelope(json!({
            "booking": Self::appointment(user_id, doctor_id, appointment_time, "scheduled")
        }))
    }

    pub fn medical_record(user_id: Uuid) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "data": {
                "bloodType": "O+",
                "allergies": ["penicillin"],
                "medications": [],
                "conditions": ["asthma"],
                "emergencyContact": {
                    "name": "Sam Contact",
                    "phone": "+353 1 555 0100",
                    "relationship": "sibling"
                }
            },
            "last_edited_by": null,
            "created_at": "2025-01-01T00:00:00Z",
            "last_edited_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str) -> Value {
        json!({ "error": message })
    }
}
