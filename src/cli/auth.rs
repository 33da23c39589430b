use std::io::IsTerminal;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::load_config;
use crate::error::CodeflowError;
use crate::oauth::{decode_claims, listen_for_redirect};

use super::connection::{build_module, listener_timeout, loopback_addr, DEFAULT_LOGIN_TIMEOUT};
use super::output::{print_claims, print_login_result, print_session};

/// Options shared by the commands that talk to the authorization server.
#[derive(Debug, Clone, Default)]
pub struct CommonOptions {
    pub config: Option<String>,
    pub session_file: Option<String>,
    pub json: bool,
}

pub fn run_url(opts: &CommonOptions) -> Result<(), CodeflowError> {
    let config = load_config(opts.config.as_deref())?;
    let module = build_module(config, opts.session_file.as_deref())?;
    println!("{}", module.authorization_url()?);
    Ok(())
}

pub async fn run_login(
    opts: &CommonOptions,
    port: Option<u16>,
    timeout: Option<Duration>,
) -> Result<(), CodeflowError> {
    let config = load_config(opts.config.as_deref())?;
    let timeout = timeout
        .or_else(|| config.authorization_timeout())
        .unwrap_or(DEFAULT_LOGIN_TIMEOUT);
    let config = config.with_authorization_timeout(timeout);

    let addr = loopback_addr(&config, port)?;
    let module = build_module(config, opts.session_file.as_deref())?;

    // Bind before the browser opens so the redirect cannot race the listener.
    let listener = TcpListener::bind(addr).await?;
    let lifecycle = module.lifecycle();
    let redirect_task = tokio::spawn(async move {
        match listen_for_redirect(listener, listener_timeout(timeout)).await {
            Ok(target) => {
                lifecycle.redirect_received(target);
            }
            Err(e) => {
                tracing::warn!("No redirect received: {e}");
                lifecycle.app_resumed();
            }
        }
    });

    let outcome = module.login().await;
    redirect_task.abort();

    match outcome? {
        Some(result) => {
            print_login_result(&result, opts.json, std::io::stdout().is_terminal());
            Ok(())
        }
        None => {
            eprintln!("Authorization was abandoned before it completed");
            Ok(())
        }
    }
}

pub async fn run_revoke(opts: &CommonOptions) -> Result<(), CodeflowError> {
    let config = load_config(opts.config.as_deref())?;
    let module = build_module(config, opts.session_file.as_deref())?;
    match module.revoke_access().await? {
        Some(_) => println!("Access revoked"),
        None => println!("Not logged in; nothing to revoke"),
    }
    Ok(())
}

pub fn run_status(opts: &CommonOptions) -> Result<(), CodeflowError> {
    let config = load_config(opts.config.as_deref())?;
    let module = build_module(config, opts.session_file.as_deref())?;
    print_session(&module.session(), opts.json);
    Ok(())
}

pub fn run_decode(token: &str) -> Result<(), CodeflowError> {
    let claims = decode_claims(token.trim())?;
    print_claims(&claims);
    Ok(())
}
