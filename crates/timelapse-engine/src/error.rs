use suppaftp::types::FtpError;

// Errors reported by a remote store
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The server answered a name listing with "file unavailable" (550).
    #[error("No files found")]
    NoFiles,

    #[error("Server rejected command with status {code}: {message}")]
    Rejected { code: u32, message: String },

    #[error("FTP error: {0}")]
    Ftp(#[from] FtpError),

    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end a run. Each one maps to a non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("FTP connection to {host}:{port} failed: {source}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: RemoteError,
    },

    #[error("{0} not found on FTP server")]
    DirectoryNotFound(String),

    #[error("Listing failed: {0}")]
    Listing(#[source] RemoteError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single file. Never escalates past the file it belongs to.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Size query failed: {0}")]
    Size(#[source] RemoteError),

    #[error("Transfer failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Transfer ended after {written} of {expected} bytes")]
    Incomplete { expected: u64, written: u64 },

    #[error("Local write failed: {0}")]
    Io(#[from] std::io::Error),
}
