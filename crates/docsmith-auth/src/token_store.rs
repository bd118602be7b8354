//! Durable storage for the single credential record
//!
//! [`FileTokenStore`] writes the credential to a sibling temporary file and
//! renames it into place, so readers observe either the previous record or
//! the new one, never a partial write.

use crate::types::{Credential, PersistenceError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Persistence backend for the credential record
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the stored credential, `None` when nothing has been persisted
    async fn load(&self) -> Result<Option<Credential>, PersistenceError>;

    /// Replace the stored credential
    async fn save(&self, credential: &Credential) -> Result<(), PersistenceError>;

    /// Delete the stored credential, returning whether one existed
    async fn clear(&self) -> Result<bool, PersistenceError>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// JSON file backed token store
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "credential".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.clone(),
            source,
        }
    }

    async fn write_atomically(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let temp_path = self.temp_path();
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&temp_path)
            .await
            .map_err(|e| self.write_error(e))?;

        // A leftover temp file keeps its old mode; tighten it before writing
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.write_error(e))?;
        }

        file.write_all(bytes).await.map_err(|e| self.write_error(e))?;
        file.sync_all().await.map_err(|e| self.write_error(e))?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(self.write_error(e));
        }

        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<Credential>, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No credential file at {}", self.path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let credential =
            serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(credential))
    }

    async fn save(&self, credential: &Credential) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(credential).map_err(PersistenceError::Encode)?;

        let _guard = self.write_lock.lock().await;
        self.write_atomically(&bytes).await?;

        debug!("Credential written to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<bool, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Deleted credential file {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.write_error(e)),
        }
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// In-process token store
#[derive(Default)]
pub struct MemoryTokenStore {
    credential: RwLock<Option<Credential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a credential already stored
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<Credential>, PersistenceError> {
        Ok(self.credential.read().await.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<(), PersistenceError> {
        *self.credential.write().await = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<bool, PersistenceError> {
        Ok(self.credential.write().await.take().is_some())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
