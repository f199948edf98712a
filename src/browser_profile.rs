//! Throwaway Chrome profile directories
//!
//! Every audit browser gets a UUID-named profile so concurrent runs never
//! contend on Chrome's SingletonLock.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// RAII wrapper for a Chrome profile directory
///
/// Removes the directory on drop unless `into_path()` is called.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl BrowserProfile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            cleanup_on_drop: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the profile and keep its directory on disk
    pub fn into_path(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            info!("BrowserProfile cleanup: removing {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!(
                    "Failed to cleanup profile directory {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// Create a unique profile directory named `<prefix>_<uuid>` under the temp dir
pub fn create_unique_profile_with_prefix(prefix: &str) -> Result<BrowserProfile> {
    create_unique_profile_in(&std::env::temp_dir(), prefix)
}

/// Create a unique profile directory named `<prefix>_<uuid>` under `parent`
pub fn create_unique_profile_in(parent: &Path, prefix: &str) -> Result<BrowserProfile> {
    let path = parent.join(format!("{}_{}", prefix, Uuid::new_v4()));

    debug!(
        "Creating unique Chrome profile with prefix '{}': {}",
        prefix,
        path.display()
    );

    // create_dir, not create_dir_all: an existing directory is a collision
    std::fs::create_dir(&path)
        .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;

    Ok(BrowserProfile::new(path))
}
