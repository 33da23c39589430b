use std::path::{Path, PathBuf};

use crate::error::CodeflowError;
use crate::oauth::session::{InMemorySession, Session, SessionStore};

/// Default location of the persisted session for a client.
pub fn session_path(client_id: &str) -> PathBuf {
    let base = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codeflow")
        .join(sanitize(client_id));
    base.join("session.json")
}

// Client ids are free-form; keep them from escaping the cache directory.
fn sanitize(client_id: &str) -> String {
    client_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Session mirrored to a JSON file on every write.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    memory: InMemorySession,
}

impl FileSession {
    /// Open the session at `path`, starting empty when the file is missing
    /// or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = load_session(&path).unwrap_or_default();
        Self {
            path,
            memory: InMemorySession::with_session(session),
        }
    }

    pub fn for_client(client_id: &str) -> Self {
        Self::open(session_path(client_id))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSession {
    fn snapshot(&self) -> Session {
        self.memory.snapshot()
    }

    fn replace(&self, session: Session) -> Result<(), CodeflowError> {
        write_session(&self.path, &session)?;
        self.memory.replace(session)
    }
}

fn load_session(path: &Path) -> Option<Session> {
    let data = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&data) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!("Ignoring unreadable session file {}: {e}", path.display());
            None
        }
    }
}

fn write_session(path: &Path, session: &Session) -> Result<(), CodeflowError> {
    if session == &Session::default() {
        return match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        };
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(session).map_err(|e| {
        CodeflowError::ProtocolError(format!("Failed to serialize session: {e}"))
    })?;
    std::fs::write(path, data)?;
    Ok(())
}
