use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::auth::SessionProvider;
use shared_models::error::ApiError;

/// Success bodies arrive as `{ "data": ... }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

pub struct PortalClient {
    client: Client,
    base_url: String,
}

impl PortalClient {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        if config.api_base_url.trim().is_empty() {
            return Err(ApiError::Config("API base URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::Unauthorized("Token contains invalid characters".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Send a request and unwrap the `data` field of the response.
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(auth_token)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&bytes);
            error!("API error ({}): {}", status, message.as_deref().unwrap_or("<no message>"));
            return Err(ApiError::from_status(status.as_u16(), message));
        }

        let envelope: Envelope<T> = serde_json::from_slice(&bytes).map_err(|e| {
            error!("Failed to decode response from {}: {}", url, e);
            ApiError::Decode(e.to_string())
        })?;

        Ok(envelope.data)
    }

    pub async fn get<T>(
        &self,
        path: &str,
        auth_token: Option<&str>,
        query: &[(&str, String)],
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, auth_token, query, None).await
    }

    pub async fn send_json<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Value,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request(method, path, auth_token, &[], Some(body)).await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// Token of the current session, or an authorization error without
/// touching the network.
pub fn require_token(session: &dyn SessionProvider) -> Result<String, ApiError> {
    session.token().ok_or_else(ApiError::missing_session)
}

/// Pull the server's message out of an error body. The API sends
/// `{ "error": "..." }`; some gateways nest it as `{ "error": { "message": ... } }`.
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Object(obj) => obj.get("message").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(br#"{"error":"Slot taken"}"#).as_deref(), Some("Slot taken"));
        assert_eq!(
            error_message(br#"{"error":{"message":"Bad token","code":"401"}}"#).as_deref(),
            Some("Bad token")
        );
        assert_eq!(error_message(b"<html>502</html>"), None);
        assert_eq!(error_message(br#"{"message":"nope"}"#), None);
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        let config = AppConfig::with_base_url("");
        assert!(matches!(PortalClient::new(&config), Err(ApiError::Config(_))));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = AppConfig::with_base_url("http://localhost:3223/");
        let client = PortalClient::new(&config).unwrap();
        assert_eq!(client.get_base_url(), "http://localhost:3223");
    }
}
