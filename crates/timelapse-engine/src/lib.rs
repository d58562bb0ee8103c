//! # Timelapse engine
//!
//! Fetches timelapse recordings from a Bambu printer's implicit FTPS server.
//!
//! A run scans the local download directory, opens an authenticated session
//! with a protected data channel, lists the printer's timelapse folder and
//! downloads every video not yet present locally, one file at a time.
//! A failing file is logged and skipped; only connection and listing
//! failures end the run with an error.

pub mod builder;
pub mod config;
pub mod downloader;
pub mod error;
pub mod ftp;
pub mod local;
pub mod progress;
pub mod remote;
pub mod task;
pub mod tls;

#[cfg(test)]
mod test_utils;

pub use builder::SyncConfigBuilder;
pub use config::{ConnectionConfig, SyncConfig};
pub use downloader::{Downloader, SyncReport, plan_downloads};
pub use error::{RemoteError, SyncError, TransferError};
pub use ftp::{FtpsSession, connect_implicit_tls};
pub use local::LocalFileSet;
pub use progress::{OnProgress, ProgressEvent};
pub use remote::RemoteStore;
pub use task::{DownloadTask, TaskState};

/// Run a complete download against the printer described by `connection`.
pub fn run(
    connection: &ConnectionConfig,
    config: SyncConfig,
    on_progress: Option<OnProgress>,
) -> Result<SyncReport, SyncError> {
    let local = LocalFileSet::scan(&config.download_dir)?;

    let session = FtpsSession::connect(connection)?;
    let mut downloader = Downloader::new(session, config);
    if let Some(on_progress) = on_progress {
        downloader = downloader.with_progress(on_progress);
    }

    let result = downloader.sync(&local);
    downloader.close();
    result
}
