use colored::Colorize;

use crate::error::CodeflowError;
use crate::oauth::{LoginResult, OpenIdClaim, Session};

pub fn print_login_result(result: &LoginResult, json: bool, is_tty: bool) {
    if json {
        let value = serde_json::json!({
            "accessToken": result.access_token,
            "claims": result.claims.as_ref().map(OpenIdClaim::as_map),
        });
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        return;
    }

    let label = if is_tty {
        "Logged in".green().bold().to_string()
    } else {
        "Logged in".to_string()
    };
    match result.claims.as_ref().and_then(display_name) {
        Some(who) => println!("{label} as {who}"),
        None => println!("{label}"),
    }
    println!("Access token: {}", result.access_token);
    if let Some(claims) = &result.claims {
        print_claims(claims);
    }
}

pub fn print_claims(claims: &OpenIdClaim) {
    println!(
        "{}",
        serde_json::to_string_pretty(claims.as_map()).unwrap_or_default()
    );
}

pub fn print_session(session: &Session, json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(session).unwrap_or_default());
        return;
    }
    if !session.has_access_token() {
        println!("Not logged in");
        return;
    }
    let state = if session.is_access_token_valid() {
        "valid"
    } else {
        "expired"
    };
    println!("Access token: {state}");
    if let Some(at) = session.access_token_expires_at {
        println!("  expires: {}", at.to_rfc3339());
    }
    match (&session.refresh_token, session.refresh_token_expires_at) {
        (Some(_), Some(at)) => println!("Refresh token: held, expires {}", at.to_rfc3339()),
        (Some(_), None) => println!("Refresh token: held"),
        (None, _) => println!("Refresh token: none"),
    }
}

pub fn print_error(err: &CodeflowError, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&err.to_json()).unwrap_or_default());
    } else {
        eprintln!("Error: {err}");
    }
}

fn display_name(claims: &OpenIdClaim) -> Option<&str> {
    claims
        .preferred_username()
        .or_else(|| claims.email())
        .or_else(|| claims.name())
        .or_else(|| claims.sub())
}
