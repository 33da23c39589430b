use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::OAuth2Config;
use crate::error::CodeflowError;
use crate::oauth::claims::{decode_claims, OpenIdClaim};
use crate::oauth::presenter::AuthorizationPresenter;
use crate::oauth::profile::ProviderProfile;
use crate::oauth::redirect::extract_code;
use crate::oauth::session::{Session, SessionStore};
use crate::oauth::state::{
    AuthorizationSignal, AuthorizationState, AuthorizationStateMachine, LifecycleHandle,
};
use crate::oauth::token::TokenGrant;
use crate::transport::{HttpTransport, ResponseBody};

/// Outcome of a successful [`OAuth2Module::login`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResult {
    pub access_token: String,
    /// Claims from the ID token, when one was issued and could be decoded.
    pub claims: Option<OpenIdClaim>,
}

/// Authorization-code grant client for one authorization server.
///
/// Operations that may involve the user return `Ok(None)` when the user
/// abandoned the external authorization (the app was resumed without a
/// redirect). That is a cancellation, not an error.
#[derive(Debug)]
pub struct OAuth2Module {
    config: OAuth2Config,
    profile: ProviderProfile,
    transport: Arc<dyn HttpTransport>,
    session: Arc<dyn SessionStore>,
    presenter: Arc<dyn AuthorizationPresenter>,
    authorization: Arc<AuthorizationStateMachine>,
}

impl OAuth2Module {
    pub fn new(
        config: OAuth2Config,
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionStore>,
        presenter: Arc<dyn AuthorizationPresenter>,
    ) -> Self {
        let profile = ProviderProfile::for_kind(config.profile);
        Self {
            config,
            profile,
            transport,
            session,
            presenter,
            authorization: Arc::new(AuthorizationStateMachine::new()),
        }
    }

    /// Override the profile named in the config.
    #[must_use]
    pub fn with_profile(mut self, profile: ProviderProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    pub fn session(&self) -> Session {
        self.session.snapshot()
    }

    pub fn authorization_state(&self) -> AuthorizationState {
        self.authorization.state()
    }

    /// Handle for reporting redirect and app-resume events.
    pub fn lifecycle(&self) -> LifecycleHandle {
        LifecycleHandle::new(self.authorization.clone())
    }

    /// A valid access token is held.
    pub fn is_authorized(&self) -> bool {
        self.session.snapshot().is_access_token_valid()
    }

    /// Build the URL of the authorization page.
    pub fn authorization_url(&self) -> Result<String, CodeflowError> {
        let redirect_uri: String =
            url::form_urlencoded::byte_serialize(self.config.redirect_url.as_bytes()).collect();
        let mut url = format!(
            "{}?scope={}&redirect_uri={}&client_id={}&response_type=code",
            self.config.authorization_url(),
            self.config.scope(),
            redirect_uri,
            self.config.client_id,
        );
        for (key, value) in self.profile.extra_params(&self.config.scopes) {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }

        url::Url::parse(&url).map_err(|e| {
            CodeflowError::ConfigurationError(format!("invalid authorization URL '{url}': {e}"))
        })?;
        Ok(url)
    }

    /// Send the user to the authorization page and wait for the code.
    ///
    /// Returns `Ok(None)` when the app is resumed without a redirect.
    pub async fn request_authorization_code(&self) -> Result<Option<String>, CodeflowError> {
        let url = self.authorization_url()?;
        // Dropping `pending` on any early return (or when this future is
        // cancelled) abandons the request.
        let mut pending = self.authorization.begin_request()?;

        self.presenter.present(&url).await?;

        let received = match self.config.authorization_timeout() {
            Some(timeout) => match tokio::time::timeout(timeout, pending.signal()).await {
                Ok(received) => received,
                Err(_) => return Err(CodeflowError::AuthorizationTimeout(timeout)),
            },
            None => pending.signal().await,
        };
        drop(pending);

        match received {
            Ok(AuthorizationSignal::Redirected(payload)) => {
                self.presenter.dismiss().await;
                extract_code(&payload).map(Some)
            }
            Ok(AuthorizationSignal::Resumed) => {
                tracing::debug!("authorization abandoned: app resumed without redirect");
                Ok(None)
            }
            // Observers dropped without a signal.
            Err(_) => Ok(None),
        }
    }

    /// Exchange an authorization code for tokens. The response object is
    /// returned untouched; [`login`](Self::login) interprets it.
    pub async fn exchange_authorization_code_for_access_token(
        &self,
        code: &str,
    ) -> Result<Map<String, Value>, CodeflowError> {
        let mut params = vec![
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        match self
            .transport
            .post_form(&self.config.token_url(), &params)
            .await?
        {
            ResponseBody::Object(map) => Ok(map),
            other => Err(CodeflowError::ProtocolError(format!(
                "token endpoint returned a non-object body ({})",
                other.kind()
            ))),
        }
    }

    /// Trade the held refresh token for a new token response.
    pub async fn refresh_access_token(&self) -> Result<ResponseBody, CodeflowError> {
        let refresh_token = self.session.snapshot().refresh_token.ok_or_else(|| {
            CodeflowError::ProtocolError("no refresh token to refresh with".to_string())
        })?;

        let mut params = vec![
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        self.transport
            .post_form(&self.config.refresh_url(), &params)
            .await
    }

    /// Make sure an access token is available.
    ///
    /// A still-valid token comes back as `Text`; a refresh or a completed
    /// authorization comes back as the raw token response.
    pub async fn request_access(&self) -> Result<Option<ResponseBody>, CodeflowError> {
        let session = self.session.snapshot();
        if session.is_access_token_valid() {
            if let Some(token) = session.access_token {
                return Ok(Some(ResponseBody::Text(token)));
            }
        }

        if session.is_refresh_token_valid() {
            match self.refresh_access_token().await {
                Ok(body) => return Ok(Some(body)),
                Err(e) => {
                    tracing::debug!("Token refresh failed, authorizing again: {e}");
                }
            }
        }

        let Some(code) = self.request_authorization_code().await? else {
            return Ok(None);
        };
        let response = self
            .exchange_authorization_code_for_access_token(&code)
            .await?;
        Ok(Some(ResponseBody::Object(response)))
    }

    /// Log the user in and return the access token with any ID-token claims.
    pub async fn login(&self) -> Result<Option<LoginResult>, CodeflowError> {
        let Some(response) = self.request_access().await? else {
            return Ok(None);
        };

        match response {
            ResponseBody::Object(map) => {
                let grant = TokenGrant::from_map(&map)?;
                // Always overwrite: some providers rotate the refresh token
                // on every use.
                self.session.save_access_token(
                    &grant.access_token,
                    grant.refresh_token.as_deref(),
                    grant.expires_in.as_deref(),
                    grant.refresh_expires_in.as_deref(),
                )?;

                let claims = grant.id_token.as_deref().and_then(|id_token| {
                    decode_claims(id_token)
                        .map_err(|e| tracing::warn!("Ignoring undecodable ID token: {e}"))
                        .ok()
                });

                Ok(Some(LoginResult {
                    access_token: grant.access_token,
                    claims,
                }))
            }
            ResponseBody::Text(access_token) => Ok(Some(LoginResult {
                access_token,
                claims: None,
            })),
            other => Err(CodeflowError::UnexpectedResponseShape(format!(
                "expected a token object or bare token, got {}",
                other.kind()
            ))),
        }
    }

    /// Revoke the held tokens and clear the session.
    ///
    /// Returns `Ok(None)` without touching the network when no access token
    /// is held.
    pub async fn revoke_access(&self) -> Result<Option<ResponseBody>, CodeflowError> {
        let session = self.session.snapshot();
        if !session.has_access_token() {
            return Ok(None);
        }

        let revoke_url = self.config.revoke_url().ok_or_else(|| {
            CodeflowError::ConfigurationError("no revoke token endpoint configured".to_string())
        })?;

        let mut params = vec![("client_id", self.config.client_id.as_str())];
        if let Some(refresh_token) = session.refresh_token.as_deref() {
            params.push(("refresh_token", refresh_token));
        }

        let response = self.transport.post_form(&revoke_url, &params).await?;
        self.session.clear_tokens()?;
        Ok(Some(response))
    }
}
