use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 990;
pub const DEFAULT_USER: &str = "bblp";
pub const DEFAULT_REMOTE_FOLDER: &str = "timelapse";
pub const DEFAULT_EXTENSION: &str = "avi";
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Where and how to log in to the printer
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: DEFAULT_USER.to_owned(),
            password: password.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }
}

// Keep the access code out of logs
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

/// Configuration of one synchronisation run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Folder on the printer holding the recordings
    pub remote_folder: String,

    /// Local directory receiving the downloads
    pub download_dir: PathBuf,

    /// Extension (without the dot) of the files to fetch
    pub extension: String,

    /// Remove the remote copy once the local one is complete
    pub delete_after_download: bool,

    /// Read buffer size for a transfer
    pub chunk_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_folder: DEFAULT_REMOTE_FOLDER.to_owned(),
            download_dir: PathBuf::from(DEFAULT_REMOTE_FOLDER),
            extension: DEFAULT_EXTENSION.to_owned(),
            delete_after_download: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SyncConfig {
    pub fn builder() -> crate::builder::SyncConfigBuilder {
        crate::builder::SyncConfigBuilder::new()
    }

    /// Whether a remote name carries the configured extension.
    /// Matching is case-sensitive.
    pub fn matches_extension(&self, name: &str) -> bool {
        name.strip_suffix(self.extension.as_str())
            .and_then(|stem| stem.strip_suffix('.'))
            .is_some()
    }
}

impl fmt::Display for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "remote_folder={}, download_dir={}, extension=.{}, delete_after_download={}",
            self.remote_folder,
            self.download_dir.display(),
            self.extension,
            self.delete_after_download
        )
    }
}
