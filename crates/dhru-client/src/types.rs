//! Shared types for the compatibility client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Credential field names accepted by a particular provider deployment.
///
/// Deployments disagree on what the username and API key fields are called;
/// a working pair is discovered by probing and then reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMap {
    pub user_field: &'static str,
    pub key_field: &'static str,
}

/// Where credentials are placed for widget-dialect calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPlacement {
    AuthorizationBearer,
    XApiKey,
    BodyApiKey,
    SessionCookie,
}

impl AuthPlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthPlacement::AuthorizationBearer => "authorization_bearer",
            AuthPlacement::XApiKey => "x_api_key",
            AuthPlacement::BodyApiKey => "body_api_key",
            AuthPlacement::SessionCookie => "session_cookie",
        }
    }
}

/// What the client has learned about the provider deployment so far.
///
/// Shared process-wide between clones of the client; once an endpoint or
/// field map worked it is not re-probed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Discovery {
    pub endpoint: Option<String>,
    pub field_map: Option<FieldMap>,
}

/// Outcome of a probed action-API request.
///
/// Carries the raw body plus which endpoint, action name, and field map
/// produced it, so callers can report what actually worked.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub status: StatusCode,
    pub text: String,
    pub endpoint: String,
    pub action: String,
    pub field_map: FieldMap,
}

impl ProviderReply {
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }
}

/// Outcome of a widget-dialect call made while probing auth placements.
#[derive(Debug, Clone)]
pub struct WidgetReply {
    pub status: StatusCode,
    pub body: serde_json::Value,
    pub placement: AuthPlacement,
}

impl WidgetReply {
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }
}

/// One entry of the diagnostic probe matrix.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub name: &'static str,
    pub url: String,
    pub method: &'static str,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub body_snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_placement_deserializes_from_snake_case() {
        let p: AuthPlacement = serde_json::from_str("\"authorization_bearer\"").unwrap();
        assert_eq!(p, AuthPlacement::AuthorizationBearer);

        let p: AuthPlacement = serde_json::from_str("\"x_api_key\"").unwrap();
        assert_eq!(p, AuthPlacement::XApiKey);

        let p: AuthPlacement = serde_json::from_str("\"body_api_key\"").unwrap();
        assert_eq!(p, AuthPlacement::BodyApiKey);
    }

    #[test]
    fn field_map_serializes_field_names() {
        let map = FieldMap {
            user_field: "email",
            key_field: "apikey",
        };
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("\"user_field\":\"email\""));
        assert!(json.contains("\"key_field\":\"apikey\""));
    }
}
