//! # File I/O Module
//!
//! Handles measurement-book file operations with safety features:
//! - **Atomic saves**: Write to .tmp, sync, rename to prevent corruption
//! - **File locking**: Prevent concurrent edits on shared drives
//! - **Version validation**: Ensure schema compatibility
//! - **Legacy tolerance**: Books from early releases (flat layout, split
//!   work metadata) load and migrate transparently
//!
//! ## File Format
//!
//! Books are saved as `.vbk` (volume book) files containing JSON.
//! Lock files use `.vbk.lock` extension with metadata about who holds the lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use volbook_core::book::MeasurementBook;
//! use volbook_core::file_io::{load_book, save_book, FileLock};
//! use std::path::Path;
//!
//! let book = MeasurementBook::new("Canal desilting", "Crate");
//! let path = Path::new("site.vbk");
//!
//! // Acquire lock before saving
//! let lock = FileLock::acquire(path, "engineer@company.com").unwrap();
//!
//! // Save with atomic write
//! save_book(&book, path).unwrap();
//!
//! // Lock is released when dropped
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::book::{BookMetadata, MeasurementBook, MeasurementRow, SCHEMA_VERSION};
use crate::errors::{BookError, BookResult};

/// Lock file metadata stored in .vbk.lock files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    /// When the lock was acquired
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

/// Get the hostname of the current machine
fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// File lock guard that releases the lock when dropped.
///
/// Uses both:
/// 1. OS-level file locking (via fs2) for process safety
/// 2. .lock file with metadata for user visibility
pub struct FileLock {
    /// Path to the main book file
    book_path: PathBuf,
    /// Path to the lock file
    lock_path: PathBuf,
    /// The underlying file handle (keeps OS lock)
    _lock_file: File,
    /// Lock metadata
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a book file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the .vbk book file
    /// * `user_id` - Identifier for the user acquiring the lock
    ///
    /// # Returns
    ///
    /// * `Ok(FileLock)` - Lock acquired successfully
    /// * `Err(BookError::FileLocked)` - Another process holds the lock
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> BookResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        // Check if lock file exists and contains valid lock info
        if lock_path.exists() {
            if let Ok(existing) = read_lock_info(&lock_path) {
                // Check if the lock is stale (process no longer running)
                if !is_lock_stale(&existing) {
                    return Err(BookError::file_locked(
                        path.display().to_string(),
                        format!("{} ({})", existing.user_id, existing.machine),
                        existing.locked_at.to_rfc3339(),
                    ));
                }
                // Lock is stale, we can take it over
            }
        }

        // Create/open the lock file
        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| {
                BookError::file_error("create lock", lock_path.display().to_string(), e.to_string())
            })?;

        // Try to acquire exclusive OS-level lock (non-blocking)
        lock_file.try_lock_exclusive().map_err(|_| {
            BookError::file_locked(
                path.display().to_string(),
                "another process".to_string(),
                "unknown".to_string(),
            )
        })?;

        // Write lock info to the file using the same handle
        let lock_json = serde_json::to_string_pretty(&info).map_err(|e| {
            BookError::SerializationError {
                reason: e.to_string(),
            }
        })?;

        lock_file.write_all(lock_json.as_bytes()).map_err(|e| {
            BookError::file_error("write lock", lock_path.display().to_string(), e.to_string())
        })?;

        lock_file.sync_all().map_err(|e| {
            BookError::file_error("sync lock", lock_path.display().to_string(), e.to_string())
        })?;

        Ok(FileLock {
            book_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Check if a file is locked without acquiring the lock.
    ///
    /// Returns `Some(LockInfo)` if locked, `None` if available.
    pub fn check(path: &Path) -> Option<LockInfo> {
        let lock_path = lock_path_for(path);
        if lock_path.exists() {
            if let Ok(info) = read_lock_info(&lock_path) {
                if !is_lock_stale(&info) {
                    return Some(info);
                }
            }
        }
        None
    }

    /// Get the path to the book file
    pub fn book_path(&self) -> &Path {
        &self.book_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Remove the lock file
        let _ = fs::remove_file(&self.lock_path);
        // OS lock is released when _lock_file is dropped
    }
}

/// Get the lock file path for a book file
fn lock_path_for(book_path: &Path) -> PathBuf {
    let mut lock_path = book_path.to_path_buf();
    let extension = lock_path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

/// Read lock info from a lock file
fn read_lock_info(lock_path: &Path) -> BookResult<LockInfo> {
    let mut file = File::open(lock_path).map_err(|e| {
        BookError::file_error("read lock", lock_path.display().to_string(), e.to_string())
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| {
        BookError::file_error("read lock", lock_path.display().to_string(), e.to_string())
    })?;

    serde_json::from_str(&contents).map_err(|e| BookError::SerializationError {
        reason: e.to_string(),
    })
}

/// Check if a lock is stale (the process that created it is no longer running)
fn is_lock_stale(info: &LockInfo) -> bool {
    // Check if it's our machine
    if let Some(our_machine) = hostname() {
        if info.machine == our_machine {
            // Same machine - check if process is still running
            #[cfg(windows)]
            {
                use std::process::Command;
                let output = Command::new("tasklist")
                    .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                    .output();
                if let Ok(output) = output {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    // If PID not found, lock is stale
                    if stdout.contains("No tasks") || !stdout.contains(&info.pid.to_string()) {
                        return true;
                    }
                }
            }
            #[cfg(unix)]
            {
                if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                    return true;
                }
            }
        }
    }

    // If lock is more than 24 hours old, consider it stale
    let age = Utc::now() - info.locked_at;
    if age.num_hours() > 24 {
        return true;
    }

    false
}

/// On-disk form accepted by [`load_book`]: the current nested layout, or the
/// flat layout written by early releases.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredBook {
    Current(MeasurementBook),
    Legacy(LegacyBook),
}

/// Flat legacy layout. Early books split the work metadata into a work name
/// and a site location; those merge into `work_info` on load, joined by a
/// newline.
#[derive(Deserialize)]
struct LegacyBook {
    #[serde(default, alias = "workInfo")]
    work_info: Option<String>,
    #[serde(default, alias = "workName")]
    work_name: Option<String>,
    #[serde(default, alias = "siteLocation")]
    site_location: Option<String>,
    #[serde(default, alias = "workType")]
    work_type: Option<String>,
    #[serde(default)]
    rows: Vec<MeasurementRow>,
}

impl LegacyBook {
    fn into_book(self) -> MeasurementBook {
        // Split metadata takes precedence when either half is present
        let work_info = if self.work_name.is_some() || self.site_location.is_some() {
            [self.work_name, self.site_location]
                .into_iter()
                .flatten()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            self.work_info.unwrap_or_default()
        };

        let now = Utc::now();
        MeasurementBook {
            meta: BookMetadata {
                version: SCHEMA_VERSION.to_string(),
                work_info,
                work_type: self.work_type.unwrap_or_default(),
                created: now,
                modified: now,
            },
            rows: self.rows,
        }
    }
}

/// Save a book to a file with atomic write semantics.
///
/// The save process:
/// 1. Serialize book to JSON
/// 2. Write to a temporary file (.tmp)
/// 3. Sync to disk (fsync)
/// 4. Rename .tmp to .vbk (atomic on most filesystems)
///
/// This prevents corruption if the process is interrupted during write.
pub fn save_book(book: &MeasurementBook, path: &Path) -> BookResult<()> {
    // Serialize to JSON
    let json = serde_json::to_string_pretty(book).map_err(|e| BookError::SerializationError {
        reason: e.to_string(),
    })?;

    // Create temp file path
    let tmp_path = path.with_extension("vbk.tmp");

    // Write to temp file
    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        BookError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        BookError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    // Sync to disk
    tmp_file.sync_all().map_err(|e| {
        BookError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    // Atomic rename
    fs::rename(&tmp_path, path).map_err(|e| {
        // Clean up temp file if rename fails
        let _ = fs::remove_file(&tmp_path);
        BookError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// Load a book from a file.
///
/// Accepts both the current schema and the legacy flat layout (which is
/// migrated in memory; the next save writes the current schema).
///
/// # Returns
///
/// * `Ok(MeasurementBook)` - Successfully loaded book
/// * `Err(BookError::VersionMismatch)` - File version is incompatible
/// * `Err(BookError::SerializationError)` - Invalid JSON
/// * `Err(BookError::FileError)` - I/O error
pub fn load_book(path: &Path) -> BookResult<MeasurementBook> {
    // Read file contents
    let mut file = File::open(path)
        .map_err(|e| BookError::file_error("open", path.display().to_string(), e.to_string()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| BookError::file_error("read", path.display().to_string(), e.to_string()))?;

    // Parse JSON, tolerating the legacy layout
    let stored: StoredBook =
        serde_json::from_str(&contents).map_err(|e| BookError::SerializationError {
            reason: format!("Invalid JSON in {}: {}", path.display(), e),
        })?;

    let book = match stored {
        StoredBook::Current(book) => {
            // Validate schema version (legacy books predate versioning)
            validate_version(&book.meta.version)?;
            book
        }
        StoredBook::Legacy(legacy) => legacy.into_book(),
    };

    Ok(book)
}

/// Load a book, returning whether it's read-only due to a lock.
///
/// # Returns
///
/// * `Ok((MeasurementBook, None))` - Loaded successfully, no lock
/// * `Ok((MeasurementBook, Some(LockInfo)))` - Loaded, but another user has the lock
/// * `Err(_)` - Failed to load
pub fn load_book_with_lock_check(path: &Path) -> BookResult<(MeasurementBook, Option<LockInfo>)> {
    let book = load_book(path)?;
    let lock_info = FileLock::check(path);
    Ok((book, lock_info))
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> BookResult<()> {
    // Parse semver-style versions
    let file_parts: Vec<u32> = file_version
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(BookError::VersionMismatch {
            file_version: file_version.to_string(),
            expected_version: SCHEMA_VERSION.to_string(),
        });
    }

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(BookError::VersionMismatch {
            file_version: file_version.to_string(),
            expected_version: SCHEMA_VERSION.to_string(),
        });
    }

    // For 0.x versions, minor version must also match (breaking changes allowed)
    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 {
        if file_parts[1] > current_parts[1] {
            // File is newer than we support
            return Err(BookError::VersionMismatch {
                file_version: file_version.to_string(),
                expected_version: SCHEMA_VERSION.to_string(),
            });
        }
    }

    Ok(())
}
