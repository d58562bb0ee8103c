//! # Builder for SyncConfig
//!
//! Fluent construction of [`SyncConfig`] values.
//!
//! # Example
//!
//! ```
//! use timelapse_engine::SyncConfig;
//!
//! let config = SyncConfig::builder()
//!     .remote_folder("timelapse")
//!     .download_dir("/srv/timelapse")
//!     .extension("mp4")
//!     .delete_after_download(true)
//!     .build();
//!
//! assert!(config.matches_extension("print.mp4"));
//! ```

use std::path::PathBuf;

use crate::SyncConfig;

/// Builder for creating SyncConfig instances
#[derive(Debug, Clone)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Create a new builder with default configuration values
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    pub fn remote_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.remote_folder = folder.into();
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.download_dir = dir.into();
        self
    }

    /// Set the extension to fetch. A leading dot is accepted and dropped.
    pub fn extension(mut self, extension: impl AsRef<str>) -> Self {
        self.config.extension = extension.as_ref().trim_start_matches('.').to_owned();
        self
    }

    pub fn delete_after_download(mut self, delete: bool) -> Self {
        self.config.delete_after_download = delete;
        self
    }

    /// Set the read buffer size. Zero keeps the current value.
    pub fn chunk_size(mut self, size: usize) -> Self {
        if size > 0 {
            self.config.chunk_size = size;
        }
        self
    }

    /// Build the SyncConfig instance
    pub fn build(self) -> SyncConfig {
        self.config
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
