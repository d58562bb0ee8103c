//! Console and rotating file logging.
//!
//! Log files live under `<root>/<YYYY>/<MM>/<YYYYMMDD>_<app>_<user>.log` and
//! are rotated by size, keeping a fixed number of numbered backups.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::level_filters::LevelFilter;
use tracing::subscriber::DefaultGuard;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;

use crate::error::AppError;

const TIME_FORMAT: &str = "[%Y-%m-%d %H:%M:%S]";

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub root: PathBuf,
    pub app_name: String,
    pub user: String,
    pub max_bytes: u64,
    pub backups: usize,
}

impl LogOptions {
    /// Path of the log file for `date`
    pub fn file_path(&self, date: NaiveDate) -> PathBuf {
        let app_name = self.app_name.trim_end_matches(".log");
        self.root
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!(
                "{}_{}_{}.log",
                date.format("%Y%m%d"),
                app_name,
                self.user
            ))
    }
}

/// Installed logging for one run. Dropping it flushes the log file and
/// uninstalls the subscriber.
pub struct LoggingHandle {
    log_file: PathBuf,
    _default: DefaultGuard,
    _worker: WorkerGuard,
}

impl LoggingHandle {
    pub fn init(options: &LogOptions) -> Result<Self, AppError> {
        let log_file = options.file_path(chrono::Local::now().date_naive());
        let writer = RotatingFileWriter::open(&log_file, options.max_bytes, options.backups)
            .map_err(|e| {
                AppError::Initialization(format!(
                    "cannot open log file {}: {e}",
                    log_file.display()
                ))
            })?;
        let (file_writer, worker) = tracing_appender::non_blocking(writer);

        let console_layer = tracing_subscriber::fmt::layer()
            .with_timer(ChronoLocal::new(TIME_FORMAT.to_owned()))
            .with_target(false)
            .with_writer(io::stdout)
            .with_filter(LevelFilter::INFO);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_timer(ChronoLocal::new(TIME_FORMAT.to_owned()))
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(file_writer)
            .with_filter(LevelFilter::DEBUG);

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        // Also routes `log` records from the FTP and TLS crates into the layers
        Ok(Self {
            log_file,
            _default: subscriber.set_default(),
            _worker: worker,
        })
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Appends to a file and rolls it over once it would exceed `max_bytes`.
///
/// On rollover `name.log` becomes `name.log.1`, existing backups shift up by
/// one and the backup beyond `backups` is removed. A zero size or backup
/// count disables rotation.
pub struct RotatingFileWriter {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFileWriter {
    pub fn open(path: &Path, max_bytes: u64, backups: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = Self::open_file(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
            max_bytes,
            backups,
        })
    }

    fn open_file(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn should_rotate(&self, incoming: usize) -> bool {
        self.max_bytes > 0
            && self.backups > 0
            && self.size > 0
            && self.size + incoming as u64 >= self.max_bytes
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        for n in (1..self.backups).rev() {
            let src = self.backup_path(n);
            if src.exists() {
                fs::rename(&src, self.backup_path(n + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = Self::open_file(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_rotate(buf.len()) {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
