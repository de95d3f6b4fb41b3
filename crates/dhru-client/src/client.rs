//! Probing HTTP client for DHRU-style provider deployments.

use crate::error::DhruError;
use crate::redact;
use crate::types::*;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Endpoint paths tried against the base URL, in order.
const ENDPOINT_PATHS: [&str; 3] = ["/api/index.php", "/api/index", "/api"];

/// Username field spellings seen in the wild.
const USER_FIELD_CANDIDATES: [&str; 3] = ["username", "user", "email"];

/// API key field spellings seen in the wild.
const KEY_FIELD_CANDIDATES: [&str; 4] = ["apiaccesskey", "api_key", "apikey", "key"];

const ACCEPT_ANY_JSON: &str = "application/json, text/plain, */*";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for an undocumented DHRU/GSM-IMEI reseller API.
///
/// The provider contract varies per deployment, so the client discovers a
/// working endpoint path and credential field names by probing and caches
/// the result. Clones share the discovery state, which makes it
/// process-wide when one client is handed around an application.
///
/// The API key is held as a `SecretString` so it cannot leak through
/// `Debug` output; redacted previews of provider bodies come from
/// [`DhruClient::preview`].
#[derive(Clone)]
pub struct DhruClient {
    http: Client,
    base_url: String,
    username: String,
    api_key: SecretString,
    session_cookie: Option<String>,
    discovery: Arc<RwLock<Discovery>>,
}

impl DhruClient {
    /// Create a new client. `base_url` may carry trailing slashes.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DhruError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("unlock-relay/0.1")
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http,
            base_url,
            username: username.into(),
            api_key: SecretString::new(api_key.into()),
            session_cookie: None,
            discovery: Arc::new(RwLock::new(Discovery::default())),
        })
    }

    /// Attach a panel session cookie for the `session_cookie` auth placement.
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        if !cookie.is_empty() {
            self.session_cookie = Some(cookie);
        }
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current discovery state (endpoint and field map, if any worked yet).
    pub async fn discovery(&self) -> Discovery {
        self.discovery.read().await.clone()
    }

    /// Forget everything learned about the deployment.
    pub async fn reset_discovery(&self) {
        *self.discovery.write().await = Discovery::default();
    }

    /// Redacted, length-capped preview of a provider body, safe to return
    /// to API consumers.
    pub fn preview(&self, text: &str) -> String {
        redact::safe_preview(
            text,
            &[self.api_key.expose_secret().as_str(), self.username.as_str()],
        )
    }

    /// Find the action-API endpoint for this deployment.
    ///
    /// Candidates are probed with an `accountinfo` request; the first one
    /// that does not 404 wins and is cached. Transport errors skip to the
    /// next candidate.
    #[instrument(skip(self))]
    pub async fn detect_endpoint(&self) -> Result<String, DhruError> {
        if let Some(endpoint) = self.discovery.read().await.endpoint.clone() {
            return Ok(endpoint);
        }

        let form = [
            ("username", self.username.as_str()),
            ("apiaccesskey", self.api_key.expose_secret().as_str()),
            ("action", "accountinfo"),
        ];

        let mut last_error = None;
        for path in ENDPOINT_PATHS {
            let candidate = format!("{}{}", self.base_url, path);
            match self.post_form(&candidate, &form).await {
                Ok((status, _)) if status != StatusCode::NOT_FOUND => {
                    debug!(endpoint = %candidate, %status, "provider endpoint detected");
                    self.discovery.write().await.endpoint = Some(candidate.clone());
                    return Ok(candidate);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(endpoint = %candidate, error = %e, "endpoint probe failed");
                    last_error = Some(e);
                }
            }
        }

        Err(DhruError::EndpointNotFound { source: last_error })
    }

    /// Run an action-API request, probing action names in order.
    ///
    /// The first successful reply wins. If no action succeeds, the first
    /// non-404 provider reply is returned so the caller can surface the
    /// provider's real status and body.
    #[instrument(skip(self, params), fields(actions = ?action_candidates))]
    pub async fn request(
        &self,
        action_candidates: &[&str],
        params: &[(&str, &str)],
    ) -> Result<ProviderReply, DhruError> {
        let endpoint = self.detect_endpoint().await?;

        let mut fallback = None;
        for action in action_candidates {
            let reply = self
                .request_with_field_map(&endpoint, action, params)
                .await?;
            if reply.ok() {
                return Ok(reply);
            }
            if fallback.is_none() {
                fallback = Some(reply);
            }
        }

        fallback.ok_or(DhruError::NoUsableResponse)
    }

    /// Probe credential field-name pairs for one action.
    ///
    /// A previously discovered pair is moved to the front of both candidate
    /// lists. 2xx caches the pair; the first non-404 failure is kept as the
    /// fallback reply when nothing succeeds.
    async fn request_with_field_map(
        &self,
        endpoint: &str,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<ProviderReply, DhruError> {
        let (user_fields, key_fields) = self.field_candidates().await;

        let mut first_non_404: Option<ProviderReply> = None;
        let mut last_error: Option<reqwest::Error> = None;

        for &user_field in &user_fields {
            for &key_field in &key_fields {
                let mut form: Vec<(&str, &str)> = vec![
                    (user_field, self.username.as_str()),
                    (key_field, self.api_key.expose_secret().as_str()),
                    ("action", action),
                ];
                form.extend_from_slice(params);

                match self.post_form(endpoint, &form).await {
                    Ok((status, text)) => {
                        let field_map = FieldMap {
                            user_field,
                            key_field,
                        };
                        let reply = ProviderReply {
                            status,
                            text,
                            endpoint: endpoint.to_string(),
                            action: action.to_string(),
                            field_map,
                        };

                        if status.is_success() {
                            debug!(
                                user_field,
                                key_field, action, "credential field map discovered"
                            );
                            self.discovery.write().await.field_map = Some(field_map);
                            return Ok(reply);
                        }

                        if status != StatusCode::NOT_FOUND && first_non_404.is_none() {
                            first_non_404 = Some(reply);
                        }
                    }
                    Err(e) => last_error = Some(e),
                }
            }
        }

        if let Some(reply) = first_non_404 {
            return Ok(reply);
        }

        match last_error {
            Some(e) => Err(DhruError::Http(e)),
            None => Err(DhruError::NoUsableResponse),
        }
    }

    /// POST a form to a widget-dialect path with the given auth placement.
    ///
    /// Non-2xx replies become [`DhruError::Api`] carrying the parsed body,
    /// or `{"raw": <text>}` when the body was not JSON.
    #[instrument(skip(self, fields))]
    pub async fn post_widget(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        placement: AuthPlacement,
    ) -> Result<serde_json::Value, DhruError> {
        let reply = self.widget_call(path, fields, placement).await?;
        if !reply.ok() {
            return Err(DhruError::Api {
                status: reply.status.as_u16(),
                body: reply.body,
            });
        }
        Ok(reply.body)
    }

    /// Try auth placements in order against a widget path.
    ///
    /// The first 2xx reply wins; otherwise the last reply is returned with
    /// the placement that produced it, so callers can report what was
    /// tried. All-transport-failure yields the last error.
    #[instrument(skip(self, fields), fields(placements = placements.len()))]
    pub async fn probe_auth_placements(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        placements: &[AuthPlacement],
    ) -> Result<WidgetReply, DhruError> {
        let mut last_reply: Option<WidgetReply> = None;
        let mut last_error: Option<DhruError> = None;

        for placement in placements {
            match self.widget_call(path, fields, *placement).await {
                Ok(reply) => {
                    if reply.ok() {
                        debug!(placement = placement.as_str(), "auth placement accepted");
                        return Ok(reply);
                    }
                    last_reply = Some(reply);
                }
                Err(e) => last_error = Some(e),
            }
        }

        if let Some(reply) = last_reply {
            return Ok(reply);
        }
        Err(last_error.unwrap_or(DhruError::NoUsableResponse))
    }

    async fn widget_call(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        placement: AuthPlacement,
    ) -> Result<WidgetReply, DhruError> {
        let url = format!("{}{}", self.base_url, path);

        let mut form: Vec<(&str, &str)> = fields.to_vec();
        let mut request = self.http.post(&url).header(ACCEPT, ACCEPT_ANY_JSON);

        match placement {
            AuthPlacement::AuthorizationBearer => {
                request = request.bearer_auth(self.api_key.expose_secret());
            }
            AuthPlacement::XApiKey => {
                request = request.header("X-API-KEY", self.api_key.expose_secret().as_str());
            }
            AuthPlacement::BodyApiKey => {
                form.push(("api_key", self.api_key.expose_secret().as_str()));
            }
            AuthPlacement::SessionCookie => match &self.session_cookie {
                Some(cookie) => request = request.header(COOKIE, cookie.as_str()),
                None => warn!("session_cookie placement selected but no cookie configured"),
            },
        }

        let response = request.form(&form).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body = crate::normalize::parse_json(&text).unwrap_or_else(|| json!({ "raw": text }));

        Ok(WidgetReply {
            status,
            body,
            placement,
        })
    }

    /// Run the fixed diagnostic probe matrix against the deployment.
    ///
    /// Individual probe failures become redacted snippets rather than
    /// errors; the matrix always completes.
    pub async fn run_probe_matrix(&self, service_details_path: &str) -> Vec<ProbeResult> {
        let api_key = self.api_key.expose_secret().as_str();
        let balance_form = vec![("action", "balance"), ("api_key", api_key)];
        let details_form = vec![("serviceid", "TEST"), ("chosen", "1"), ("charge", "0")];

        let mut results = Vec::new();
        results.push(self.run_probe("GET_api", "GET", "/api", None, false).await);
        results.push(
            self.run_probe("GET_api_slash", "GET", "/api/", None, false)
                .await,
        );
        results.push(
            self.run_probe("GET_api_index", "GET", "/api/index.php", None, false)
                .await,
        );
        results.push(
            self.run_probe(
                "POST_api_balance",
                "POST",
                "/api",
                Some(&balance_form),
                true,
            )
            .await,
        );
        results.push(
            self.run_probe(
                "POST_api_index_balance",
                "POST",
                "/api/index.php",
                Some(&balance_form),
                true,
            )
            .await,
        );
        results.push(
            self.run_probe(
                "POST_widget_service_details",
                "POST",
                service_details_path,
                Some(&details_form),
                true,
            )
            .await,
        );
        results
    }

    async fn run_probe(
        &self,
        name: &'static str,
        method: &'static str,
        path: &str,
        form: Option<&Vec<(&str, &str)>>,
        bearer: bool,
    ) -> ProbeResult {
        let url = format!("{}{}", self.base_url, path);

        let mut request = match method {
            "POST" => self.http.post(&url),
            _ => self.http.get(&url),
        };
        request = request.header(ACCEPT, ACCEPT_ANY_JSON);
        if bearer {
            request = request.bearer_auth(self.api_key.expose_secret());
        }
        if let Some(form) = form {
            request = request.form(form);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                let text = response.text().await.unwrap_or_default();
                ProbeResult {
                    name,
                    url,
                    method,
                    status: Some(status),
                    content_type,
                    body_snippet: self.snippet(&text),
                }
            }
            Err(e) => ProbeResult {
                name,
                url,
                method,
                status: None,
                content_type: None,
                body_snippet: self.snippet(&format!("request error: {e}")),
            },
        }
    }

    fn snippet(&self, text: &str) -> String {
        redact::scrub_auth_artifacts(
            text,
            &[self.api_key.expose_secret().as_str(), self.username.as_str()],
        )
    }

    /// Candidate field names with any discovered pair moved to the front.
    async fn field_candidates(&self) -> (Vec<&'static str>, Vec<&'static str>) {
        let cached = self.discovery.read().await.field_map;

        let mut users: Vec<&'static str> = USER_FIELD_CANDIDATES.to_vec();
        let mut keys: Vec<&'static str> = KEY_FIELD_CANDIDATES.to_vec();

        if let Some(map) = cached {
            users.retain(|f| *f != map.user_field);
            users.insert(0, map.user_field);
            keys.retain(|f| *f != map.key_field);
            keys.insert(0, map.key_field);
        }

        (users, keys)
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<(StatusCode, String), reqwest::Error> {
        let response = self
            .http
            .post(url)
            .header(ACCEPT, ACCEPT_ANY_JSON)
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }
}
