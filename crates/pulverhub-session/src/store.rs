//! Persisted session storage.
//!
//! The console keeps exactly two values between runs, the bearer token
//! and the username, stored together as one small JSON file. The file
//! is rewritten whenever the gateway rotates the token and removed
//! entirely on logout.

use std::path::{Path, PathBuf};

use tokio::fs;

use pulverhub_core::{AppError, AppResult};
use pulverhub_entity::StoredSession;

/// File-backed store for the persisted session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// Location of the session file.
    path: PathBuf,
}

impl SessionStore {
    /// Creates a store over the given session file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The session file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted session, if any.
    ///
    /// A missing file means "not logged in". An unreadable file is
    /// treated the same way after a warning; the next login rewrites it.
    pub async fn load(&self) -> AppResult<Option<StoredSession>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::with_source(
                    pulverhub_core::error::ErrorKind::Session,
                    format!("Failed to read session file {}", self.path.display()),
                    e,
                ));
            }
        };

        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("Session file is corrupt, treating as logged out: {e}");
                Ok(None)
            }
        }
    }

    /// Returns the stored bearer token, if any.
    pub async fn token(&self) -> AppResult<Option<String>> {
        Ok(self.load().await?.map(|session| session.token))
    }

    /// Persists a session, creating parent directories as needed.
    pub async fn save(&self, session: &StoredSession) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::internal(format!("Failed to create {}: {e}", parent.display())))?;
        }

        let raw = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, raw)
            .await
            .map_err(|e| AppError::internal(format!("Failed to write session file: {e}")))?;
        Ok(())
    }

    /// Replaces the stored token, keeping the username.
    ///
    /// Called by the gateway after a successful refresh, so reading
    /// through the gateway can overwrite the persisted token.
    pub async fn set_token(&self, token: &str) -> AppResult<()> {
        let Some(mut session) = self.load().await? else {
            return Err(AppError::session("No session to update"));
        };
        session.token = token.to_string();
        self.save(&session).await
    }

    /// Removes the persisted session entirely (logout).
    pub async fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::internal(format!("Failed to clear session: {e}"))),
        }
    }
}
