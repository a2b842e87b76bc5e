//! Persistent storage for the session token.
//!
//! The platform keychain is a host concern; `TokenStore` is the seam. A
//! single token lives under a fixed `(service, account)` namespace.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

pub const TOKEN_SERVICE: &str = "com.cycleai.tracker";
pub const TOKEN_ACCOUNT: &str = "jwt_token";

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("token store unavailable: {0}")]
    Unavailable(String),
}

/// Store, retrieve and delete the one session token.
///
/// Retrieval failures read as "no token"; callers treat a missing token and
/// an unreadable one the same way.
pub trait TokenStore: Send + Sync {
    fn store_token(&self, token: &str) -> Result<(), TokenStoreError>;

    fn retrieve_token(&self) -> Option<String>;

    fn delete_token(&self) -> Result<(), TokenStoreError>;
}

/// Process-local store keyed by `(service, account)`.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded with `token`, as if a previous session had stored it.
    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        store.insert(token);
        store
    }

    fn key() -> (String, String) {
        (TOKEN_SERVICE.to_string(), TOKEN_ACCOUNT.to_string())
    }

    fn insert(&self, token: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key(), token.to_string());
    }
}

impl TokenStore for MemoryTokenStore {
    fn store_token(&self, token: &str) -> Result<(), TokenStoreError> {
        self.insert(token);
        Ok(())
    }

    fn retrieve_token(&self) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&Self::key())
            .cloned()
    }

    fn delete_token(&self) -> Result<(), TokenStoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&Self::key());
        Ok(())
    }
}

/// File-backed store at `<root>/<service>/<account>`.
///
/// On unix the file is created with mode 0600.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(TOKEN_SERVICE).join(TOKEN_ACCOUNT),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn store_token(&self, token: &str) -> Result<(), TokenStoreError> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| TokenStoreError::Unavailable("token path has no parent".to_string()))?;
        std::fs::create_dir_all(dir)?;
        write_private(&self.path, token.as_bytes())?;
        Ok(())
    }

    fn retrieve_token(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) => None,
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read stored token");
                None
            }
        }
    }

    fn delete_token(&self) -> Result<(), TokenStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    std::fs::write(path, contents)
}
