use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::oauth::profile::ProfileKind;

/// Client registration and endpoint layout for one authorization server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2Config {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub redirect_url: String,
    pub base_url: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoke_token_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_timeout_ms: Option<u64>,
    #[serde(default)]
    pub profile: ProfileKind,
}

impl OAuth2Config {
    pub fn new(
        base_url: impl Into<String>,
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            scopes: Vec::new(),
            redirect_url: redirect_url.into(),
            base_url: base_url.into(),
            authorization_endpoint: authorization_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            refresh_token_endpoint: None,
            revoke_token_endpoint: None,
            authorization_timeout_ms: None,
            profile: ProfileKind::default(),
        }
    }

    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_refresh_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.refresh_token_endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_revoke_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.revoke_token_endpoint = Some(endpoint.into());
        self
    }

    /// Bound the wait for the user. Sub-millisecond remainders round up so a
    /// non-zero timeout never becomes zero.
    #[must_use]
    pub fn with_authorization_timeout(mut self, timeout: Duration) -> Self {
        let mut millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if Duration::from_millis(millis) < timeout {
            millis = millis.saturating_add(1);
        }
        self.authorization_timeout_ms = Some(millis);
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: ProfileKind) -> Self {
        self.profile = profile;
        self
    }

    /// Value of the `scope` query parameter: scopes joined with `+`.
    pub fn scope(&self) -> String {
        self.scopes.join("+")
    }

    pub fn authorization_timeout(&self) -> Option<Duration> {
        self.authorization_timeout_ms.map(Duration::from_millis)
    }

    pub fn authorization_url(&self) -> String {
        resolve_endpoint(&self.base_url, &self.authorization_endpoint)
    }

    pub fn token_url(&self) -> String {
        resolve_endpoint(&self.base_url, &self.token_endpoint)
    }

    /// Refresh requests go to the token endpoint unless a dedicated one is set.
    pub fn refresh_url(&self) -> String {
        let endpoint = self
            .refresh_token_endpoint
            .as_deref()
            .unwrap_or(&self.token_endpoint);
        resolve_endpoint(&self.base_url, endpoint)
    }

    pub fn revoke_url(&self) -> Option<String> {
        self.revoke_token_endpoint
            .as_deref()
            .map(|endpoint| resolve_endpoint(&self.base_url, endpoint))
    }
}

/// Join an endpoint onto the base URL; absolute endpoints are used as-is.
pub fn resolve_endpoint(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let base = base_url.trim_end_matches('/');
    let path = endpoint.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
