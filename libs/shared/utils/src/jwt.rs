use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;
use shared_models::auth::JwtClaims;

/// Decode the claims segment of a JWT.
///
/// The portal API signs tokens with a secret the client never sees, so the
/// signature is not checked here; the server remains the authority. This is
/// only used to read `exp` so an expired session can be dropped locally.
pub fn decode_claims(token: &str) -> Result<JwtClaims, String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let claims_json = match URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('=')) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(e) => {
            debug!("Failed to decode claims: {}", e);
            return Err("Invalid claims encoding".to_string());
        }
    };

    serde_json::from_str(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        "Invalid claims format".to_string()
    })
}

/// Expiry instant of a token, if it carries one.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    decode_claims(token)
        .ok()
        .and_then(|claims| claims.exp)
        .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
}

/// Opaque tokens (not a JWT) and tokens without `exp` never expire locally.
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    match expires_at(token) {
        Some(exp) => {
            let expired = exp <= now;
            if expired {
                debug!("Token expired at {} (now: {})", exp, now);
            }
            expired
        }
        None => false,
    }
}
