//! Persisted player session.
//!
//! The durable analogue of a logged-in browser session: one JSON record
//! (`{id, name}`) at a fixed path. Presence means "already authenticated";
//! absence gates the whole client behind the login flow. The password is
//! never written anywhere.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::api::Player;
use crate::error::ClientError;

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted player record. `Ok(None)` means no session exists
    /// and the caller must run the login flow and do nothing else.
    pub fn load(&self) -> Result<Option<Player>, ClientError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.store_error(e)),
        };
        let player: Player =
            serde_json::from_str(&text).map_err(|e| self.store_error(e))?;
        Ok(Some(player))
    }

    /// Persist the record as the durable session. Subsequent launches treat
    /// its presence as already-authenticated.
    pub fn save(&self, player: &Player) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.store_error(e))?;
            }
        }
        let json = serde_json::to_string_pretty(player).map_err(|e| self.store_error(e))?;
        std::fs::write(&self.path, json).map_err(|e| self.store_error(e))?;
        info!(player_id = player.id, name = %player.name, "session saved");
        Ok(())
    }

    /// Destroy the session record. Missing-file is not an error, so clearing
    /// twice is harmless.
    pub fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.store_error(e)),
        }
    }

    fn store_error(&self, err: impl std::fmt::Display) -> ClientError {
        ClientError::SessionStore {
            path: self.path.display().to_string(),
            detail: err.to_string(),
        }
    }
}
