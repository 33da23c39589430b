use std::path::PathBuf;

use crate::error::CodeflowError;

use super::types::OAuth2Config;

/// Expand environment variable references in a string.
///
/// Supported syntaxes:
/// - `${VAR}` - replaced with env var value; error if unset
/// - `${VAR:-fallback}` - env var value, or fallback if unset or empty
/// - `$env:VAR` - same as `${VAR}`
pub fn expand_env_vars(input: &str) -> Result<String, CodeflowError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if let Some(braced) = tail.strip_prefix('{') {
            let end = braced.find('}').ok_or_else(|| {
                env_error(format!("Unclosed variable reference: ${{{braced}"))
            })?;
            let expr = &braced[..end];
            match expr.split_once(":-") {
                Some((name, fallback)) => match std::env::var(name) {
                    Ok(val) if !val.is_empty() => result.push_str(&val),
                    _ => result.push_str(fallback),
                },
                None => result.push_str(&lookup(expr)?),
            }
            rest = &braced[end + 1..];
        } else if let Some(named) = tail.strip_prefix("env:") {
            let len = named
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(named.len());
            if len == 0 {
                return Err(env_error("Empty variable name in $env: reference".into()));
            }
            result.push_str(&lookup(&named[..len])?);
            rest = &named[len..];
        } else {
            // Not a recognized pattern, keep the '$'
            result.push('$');
            rest = tail;
        }
    }
    result.push_str(rest);

    Ok(result)
}

/// Expand environment variables in the string fields that commonly carry
/// secrets or deployment-specific hosts.
pub fn expand_oauth2_config(config: &mut OAuth2Config) -> Result<(), CodeflowError> {
    config.client_id = expand_env_vars(&config.client_id)?;
    if let Some(ref mut secret) = config.client_secret {
        *secret = expand_env_vars(secret)?;
    }
    config.base_url = expand_env_vars(&config.base_url)?;
    config.redirect_url = expand_env_vars(&config.redirect_url)?;
    Ok(())
}

fn lookup(name: &str) -> Result<String, CodeflowError> {
    std::env::var(name)
        .map_err(|_| env_error(format!("Environment variable '{name}' is not set")))
}

fn env_error(detail: String) -> CodeflowError {
    CodeflowError::ConfigError {
        path: PathBuf::from("<env>"),
        detail,
    }
}
