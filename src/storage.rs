use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::fs;
use uuid::Uuid;

use crate::error::ApiError;

// --- Upload Policy ---

/// File extensions accepted for article images, lowercase with the dot.
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Maximum accepted image size: 5 MiB.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Request body ceiling for the multipart submit route. Set well above
/// MAX_UPLOAD_BYTES so an oversized image reaches the validator and gets a
/// 413 from the policy check instead of the transport cutting the stream.
pub const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

/// validate_upload
///
/// Enforces the upload policy on a declared filename and size. Returns the
/// normalized (lowercase, dot-prefixed) extension on acceptance.
///
/// Policy order mirrors the submission flow: type first, then size.
pub fn validate_upload(filename: &str, size: usize) -> Result<String, ApiError> {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::UnsupportedMediaType(
            "only images are allowed (.png, .jpg, .jpeg)".to_string(),
        ));
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge(
            "image exceeds the 5 MiB upload limit".to_string(),
        ));
    }

    Ok(extension)
}

/// storage_name
///
/// Generates a collision-resistant storage filename for an accepted upload:
/// millisecond timestamp, a random UUID, and the validated extension. The
/// client-supplied name never reaches the filesystem.
pub fn storage_name(extension: &str) -> String {
    format!("{}-{}{}", Utc::now().timestamp_millis(), Uuid::new_v4(), extension)
}

// --- StorageService Contract ---

/// StorageService
///
/// Defines the abstract contract for all interactions with the file storage
/// layer. This trait allows us to swap the concrete implementation—from the
/// real disk-backed client (LocalStorageClient) in production to the
/// in-memory Mock (MockStorageService) during testing—without affecting the
/// calling handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Persists `bytes` under `name` in the storage area and returns the
    /// relative reference ("uploads/<name>") recorded on the article and
    /// later rewritten into a public URL.
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, String>;

    /// Removes a previously stored file by its relative reference. Used as
    /// compensating cleanup when the database insert after an upload fails.
    async fn remove(&self, path: &str) -> Result<(), String>;
}

/// StorageState
///
/// The concrete type used to share the storage service access across the
/// application state.
pub type StorageState = Arc<dyn StorageService>;

// --- The Real Implementation (Local Disk) ---

/// LocalStorageClient
///
/// Disk-backed storage under a configured root directory. The same directory
/// is mounted read-only at `/uploads` by the router, which is what makes the
/// returned relative references publicly fetchable.
#[derive(Debug, Clone)]
pub struct LocalStorageClient {
    root: PathBuf,
}

impl LocalStorageClient {
    pub fn new(root: &str) -> Self {
        Self {
            root: PathBuf::from(root),
        }
    }

    /// Maps a relative reference back to the on-disk path. Only the final
    /// path segment is honored, so a reference can never escape the root.
    fn resolve(&self, path: &str) -> PathBuf {
        let basename = path.rsplit('/').next().unwrap_or(path);
        self.root.join(basename)
    }
}

#[async_trait]
impl StorageService for LocalStorageClient {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, String> {
        // Idempotent: covers first boot and a root removed at runtime.
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| format!("failed to create storage root: {e}"))?;

        let target = self.root.join(name);
        fs::write(&target, bytes)
            .await
            .map_err(|e| format!("failed to write {}: {e}", target.display()))?;

        tracing::debug!("stored upload at {}", target.display());
        Ok(format!("uploads/{name}"))
    }

    async fn remove(&self, path: &str) -> Result<(), String> {
        let target = self.resolve(path);
        fs::remove_file(&target)
            .await
            .map_err(|e| format!("failed to remove {}: {e}", target.display()))
    }
}

// --- The Mock Implementation (For Unit Tests) ---

/// MockStorageService
///
/// A mock implementation of `StorageService` used exclusively for unit and
/// integration testing. Records every store/remove call so tests can assert
/// on the upload pipeline without touching the filesystem.
#[derive(Clone)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    /// Names passed to `store`, in call order.
    pub stored: Arc<Mutex<Vec<String>>>,
    /// References passed to `remove`, in call order.
    pub removed: Arc<Mutex<Vec<String>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            stored: Arc::new(Mutex::new(Vec::new())),
            removed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }
}

impl Default for MockStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn store(&self, name: &str, _bytes: &[u8]) -> Result<String, String> {
        if self.should_fail {
            return Err("mock storage error: simulation requested".to_string());
        }
        self.stored.lock().unwrap().push(name.to_string());
        Ok(format!("uploads/{name}"))
    }

    async fn remove(&self, path: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("mock storage error: simulation requested".to_string());
        }
        self.removed.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
