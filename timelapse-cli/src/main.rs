use std::process::ExitCode;

use clap::Parser;
use timelapse_engine::{ConnectionConfig, SyncConfig, SyncError, SyncReport};
use tracing::{debug, error, info};

mod cli;
mod error;
mod logging;
mod utils;

use cli::CliArgs;
use error::AppError;
use logging::{LogOptions, LoggingHandle};
use utils::progress::ProgressManager;
use utils::{application_dir, format_bytes, login_name, parse_size};

fn main() -> ExitCode {
    // Using parse() instead of try_parse() to let clap handle --help and --version
    let args = CliArgs::parse();

    match bootstrap(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Set up logging and run the download. Errors returned here happen before
/// logging is available; run failures are logged and turned into an exit code.
fn bootstrap(args: CliArgs) -> Result<ExitCode, AppError> {
    let app_dir = application_dir();

    let log_options = LogOptions {
        root: args.log_dir.clone().unwrap_or_else(|| app_dir.join("logs")),
        app_name: env!("CARGO_PKG_NAME").to_owned(),
        user: login_name(),
        max_bytes: parse_size(&args.log_max_size)?,
        backups: args.log_backups,
    };

    // Dropped when this function returns, which flushes the log file
    let logging = LoggingHandle::init(&log_options)?;

    info!(
        "Starting Bambu timelapse downloader v{}",
        env!("CARGO_PKG_VERSION")
    );
    debug!(log_file = %logging.log_file().display(), "Logging initialised");

    let connection = ConnectionConfig::new(args.ip, args.password)
        .with_port(args.port)
        .with_username(args.user);

    let config = SyncConfig::builder()
        .remote_folder(args.ftp_timelapse_folder)
        .download_dir(
            args.download_dir
                .unwrap_or_else(|| app_dir.join("timelapse")),
        )
        .extension(&args.extension)
        .delete_after_download(args.delete_files_from_sd_card_after_download)
        .build();
    debug!(connection = ?connection, "{config}");

    let mut progress_manager = if args.no_progress {
        ProgressManager::new_disabled()
    } else {
        ProgressManager::new()
    };

    let result = timelapse_engine::run(
        &connection,
        config,
        Some(Box::new(move |event| progress_manager.handle_event(event))),
    );

    Ok(ExitCode::from(exit_status(&result)))
}

/// Log the outcome of a run and pick the process exit status for it.
/// Files that failed individually do not fail the run.
fn exit_status(result: &Result<SyncReport, SyncError>) -> u8 {
    match result {
        Ok(report) => {
            if report.downloaded() > 0 {
                info!(
                    "Downloaded {} in {} file(s).",
                    format_bytes(report.bytes_written()),
                    report.downloaded()
                );
            }
            0
        }
        Err(e) => {
            match e {
                SyncError::Connection { .. } => error!("FTP connection failed, error: \"{e}\""),
                // Already reported while listing
                SyncError::DirectoryNotFound(_) => {}
                _ => error!("Program failed: {e}"),
            }
            1
        }
    }
}
