use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::sync::mpsc;

use codeflow::{
    AuthorizationPresenter, CodeflowError, InMemorySession, OAuth2Config, OAuth2Module,
    ReqwestTransport,
};

#[allow(dead_code)]
pub const REDIRECT_URL: &str = "org.example.app://oauth2Callback";

/// Config pointing every endpoint at a mock server.
#[allow(dead_code)]
pub fn mock_config(server_uri: &str) -> OAuth2Config {
    OAuth2Config::new(server_uri, "oauth2/auth", "oauth2/token", "test-client", REDIRECT_URL)
        .with_scopes(["openid", "profile"])
        .with_revoke_token_endpoint("oauth2/token/revoke")
}

/// Presenter standing in for the browser: forwards each URL it is asked to
/// show so the test can play the user.
#[allow(dead_code)]
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelPresenter {
    #[allow(dead_code)]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl AuthorizationPresenter for ChannelPresenter {
    async fn present(&self, url: &str) -> Result<(), CodeflowError> {
        self.tx
            .send(url.to_string())
            .map_err(|e| CodeflowError::PresentationError(e.to_string()))
    }
}

/// Module backed by the real reqwest transport and an in-memory session.
#[allow(dead_code)]
pub fn mock_module(
    config: OAuth2Config,
    session: Arc<InMemorySession>,
) -> (Arc<OAuth2Module>, mpsc::UnboundedReceiver<String>) {
    let (presenter, urls) = ChannelPresenter::new();
    let module = OAuth2Module::new(
        config,
        Arc::new(ReqwestTransport::new().unwrap()),
        session,
        presenter,
    );
    (Arc::new(module), urls)
}

/// Unsigned compact token carrying `payload`.
#[allow(dead_code)]
pub fn id_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

/// Write `config` to a temp dir and return the dir with the file path.
#[allow(dead_code)]
pub fn temp_config(config: &OAuth2Config) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("codeflow.json");
    std::fs::write(&path, serde_json::to_string_pretty(config).unwrap()).unwrap();
    (dir, path)
}
