//! Session context
//!
//! The session is an explicit value handed to the components that need it
//! (notably the booking coordinator), never ambient global state.

use serde::{Deserialize, Serialize};
use shared::models::User;

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Authenticated session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub token: String,
    pub user: User,
    /// Token expiry (Unix timestamp), if the token carries one
    pub expires_at: Option<u64>,
    pub logged_in_at: u64,
}

impl SessionContext {
    /// Create a session from a login response token and user record
    pub fn new(token: impl Into<String>, user: User) -> Self {
        let token = token.into();
        let expires_at = Self::parse_jwt_exp(&token);
        Self {
            token,
            user,
            expires_at,
            logged_in_at: unix_now(),
        }
    }

    /// Parse the expiry time (Unix timestamp) out of a JWT token
    pub fn parse_jwt_exp(token: &str) -> Option<u64> {
        // JWT format: header.payload.signature
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return None;
        }

        use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
        let payload_bytes = URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
        let payload_str = String::from_utf8(payload_bytes).ok()?;

        let payload: serde_json::Value = serde_json::from_str(&payload_str).ok()?;
        payload.get("exp")?.as_u64()
    }

    /// Whether the token has expired
    ///
    /// Tokens without a parseable expiry are treated as unexpired; the
    /// remote service is the final authority and will answer 401.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => unix_now() > expires_at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::UserRole;

    fn test_user() -> User {
        User {
            id: "u1".to_string(),
            name: "Test".to_string(),
            surname: "User".to_string(),
            email: "test@example.com".to_string(),
            role: UserRole::User,
            phone: None,
            default_outlet_id: None,
        }
    }

    /// Build an unsigned JWT with the given payload JSON
    fn jwt_with_payload(payload: &str) -> String {
        use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{}.{}.sig", header, body)
    }

    #[test]
    fn test_parse_jwt_exp() {
        let token = jwt_with_payload(r#"{"sub":"u1","exp":1999999999}"#);
        assert_eq!(SessionContext::parse_jwt_exp(&token), Some(1999999999));
    }

    #[test]
    fn test_parse_jwt_exp_missing() {
        let token = jwt_with_payload(r#"{"sub":"u1"}"#);
        assert_eq!(SessionContext::parse_jwt_exp(&token), None);
    }

    #[test]
    fn test_opaque_token_is_not_expired() {
        let session = SessionContext::new("opaque-token", test_user());
        assert_eq!(session.expires_at, None);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_expired_token() {
        let token = jwt_with_payload(r#"{"exp":1000}"#);
        let session = SessionContext::new(token, test_user());
        assert_eq!(session.expires_at, Some(1000));
        assert!(session.is_expired());
    }

    #[test]
    fn test_future_token_is_valid() {
        let future = unix_now() + 3600;
        let token = jwt_with_payload(&format!(r#"{{"exp":{}}}"#, future));
        let session = SessionContext::new(token, test_user());
        assert!(!session.is_expired());
    }
}
