use std::path::{Path, PathBuf};

use crate::error::CodeflowError;

use super::env::expand_oauth2_config;
use super::types::OAuth2Config;

pub const CONFIG_ENV_VAR: &str = "CODEFLOW_CONFIG";

/// Candidate config files in precedence order (highest first).
///
/// Precedence:
/// 1. `--config` CLI flag
/// 2. `CODEFLOW_CONFIG` env var
/// 3. `./config/codeflow.json` (project-level)
/// 4. `~/.codeflow/codeflow.json` (home-level)
pub fn config_candidates(cli_config: Option<&str>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = cli_config {
        candidates.push(PathBuf::from(path));
    }
    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        candidates.push(PathBuf::from(env_path));
    }
    candidates.push(PathBuf::from("./config/codeflow.json"));
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".codeflow").join("codeflow.json"));
    }

    candidates
}

/// Read and parse one config file, then expand environment references.
pub fn load_config_file(path: &Path) -> Result<OAuth2Config, CodeflowError> {
    let content = std::fs::read_to_string(path).map_err(|e| CodeflowError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Cannot read file: {e}"),
    })?;

    let mut config: OAuth2Config =
        serde_json::from_str(&content).map_err(|e| CodeflowError::ConfigError {
            path: path.to_path_buf(),
            detail: format!("Invalid JSON: {e}"),
        })?;

    expand_oauth2_config(&mut config)?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Load the first config file that exists.
///
/// An explicit `--config` path that does not exist is an error rather than
/// silently falling through to lower-precedence files.
pub fn load_config(cli_config: Option<&str>) -> Result<OAuth2Config, CodeflowError> {
    if let Some(path) = cli_config {
        return load_config_file(Path::new(path));
    }

    let candidates = config_candidates(None);
    let found = candidates.iter().find(|p| p.exists()).ok_or_else(|| {
        CodeflowError::ConfigError {
            path: candidates.last().cloned().unwrap_or_default(),
            detail: format!("No config file found (set {CONFIG_ENV_VAR} or pass --config)"),
        }
    })?;
    load_config_file(found)
}
