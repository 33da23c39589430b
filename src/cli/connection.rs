use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use url::Host;

use crate::config::OAuth2Config;
use crate::error::CodeflowError;
use crate::oauth::{BrowserPresenter, FileSession, OAuth2Module};
use crate::transports::ReqwestTransport;

/// Wire the default collaborators around a config: reqwest transport, system
/// browser, and the per-client session file.
pub fn build_module(
    config: OAuth2Config,
    session_file: Option<&str>,
) -> Result<OAuth2Module, CodeflowError> {
    let session = match session_file {
        Some(path) => FileSession::open(path),
        None => FileSession::for_client(&config.client_id),
    };
    tracing::debug!("using session file {}", session.path().display());

    let transport = ReqwestTransport::new()?;
    Ok(OAuth2Module::new(
        config,
        Arc::new(transport),
        Arc::new(session),
        Arc::new(BrowserPresenter),
    ))
}

/// Address the loopback listener must bind so the redirect reaches it.
///
/// The host comes from the redirect URL, which has to point at the local
/// machine. The port is `port_override` when given, otherwise the redirect
/// URL's port.
pub fn loopback_addr(
    config: &OAuth2Config,
    port_override: Option<u16>,
) -> Result<SocketAddr, CodeflowError> {
    let redirect = url::Url::parse(&config.redirect_url).map_err(|e| {
        CodeflowError::ConfigurationError(format!(
            "invalid redirect URL '{}': {e}",
            config.redirect_url
        ))
    })?;

    let ip: IpAddr = match redirect.host() {
        Some(Host::Domain("localhost")) => Ipv4Addr::LOCALHOST.into(),
        Some(Host::Ipv4(ip)) if ip.is_loopback() => ip.into(),
        Some(Host::Ipv6(ip)) if ip.is_loopback() => ip.into(),
        _ => {
            return Err(CodeflowError::ConfigurationError(format!(
                "redirect URL '{}' must point at localhost for CLI login",
                config.redirect_url
            )))
        }
    };

    let port = port_override
        .or_else(|| redirect.port_or_known_default())
        .ok_or_else(|| {
            CodeflowError::ConfigurationError(format!(
                "redirect URL '{}' has no port",
                config.redirect_url
            ))
        })?;
    Ok(SocketAddr::new(ip, port))
}

/// Default wait for the user to finish in the browser.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Extra time the loopback listener waits past the login timeout, so the
/// module's own timeout decides the outcome.
pub const LISTENER_GRACE: Duration = Duration::from_secs(2);

/// How long the loopback listener waits for a login bounded by `login_timeout`.
pub fn listener_timeout(login_timeout: Duration) -> Duration {
    login_timeout.saturating_add(LISTENER_GRACE)
}
