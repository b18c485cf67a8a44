//! Session persistence.
//!
//! A session is the pair of credentials the backend hands out at login: the
//! short-lived access token and the refresh credential the server sets as a
//! cookie. Stores are injected into the [`crate::AuthClient`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ClientError, Result};

/// Credentials held between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Where a session lives between runs.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Session>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Session> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.save(&Session::default())
    }
}

/// JSON file store, used by the CLI to keep a login across runs.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Session> {
        if !self.path.exists() {
            return Ok(Session::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Session::default());
        }
        serde_json::from_str(&raw).map_err(|e| {
            ClientError::Storage(format!(
                "Corrupt session file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("parkwatch_session_{}_{}", name, std::process::id()))
            .join("session.json")
    }

    #[test]
    fn file_store_persists_and_clears() {
        let path = temp_path("persist");
        let store = FileSessionStore::new(&path);
        assert!(store.load().unwrap().is_empty());

        let session = Session::new("access-1", Some("refresh-1".to_string()));
        store.save(&session).unwrap();
        assert_eq!(FileSessionStore::new(&path).load().unwrap(), session);

        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let result = FileSessionStore::new(&path).load();
        assert!(matches!(result, Err(ClientError::Storage(_))));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
