use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};

use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{RemoteError, SyncError, TransferError};
use crate::local::LocalFileSet;
use crate::progress::{OnProgress, ProgressEvent};
use crate::remote::{RemoteStore, entry_name};
use crate::task::{DownloadTask, TaskState};

/// Pick the remote files to fetch, in the order the server listed them.
///
/// A file is selected when it carries the configured extension and no local
/// file of the same name exists.
pub fn plan_downloads(
    remote: &[String],
    local: &LocalFileSet,
    config: &SyncConfig,
) -> Vec<DownloadTask> {
    let names: Vec<&String> = remote
        .iter()
        .filter(|name| config.matches_extension(name))
        .filter(|name| !local.contains(name))
        .collect();

    let total = names.len();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            DownloadTask::new(name.clone(), config.download_dir.join(name), i + 1, total)
        })
        .collect()
}

/// Outcome of one run
#[derive(Debug, Default)]
pub struct SyncReport {
    pub tasks: Vec<DownloadTask>,
}

impl SyncReport {
    fn count(&self, predicate: impl Fn(TaskState) -> bool) -> usize {
        self.tasks.iter().filter(|t| predicate(t.state())).count()
    }

    pub fn downloaded(&self) -> usize {
        self.count(TaskState::is_downloaded)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| s == TaskState::SkippedZeroSize)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| s == TaskState::Failed)
    }

    pub fn deleted(&self) -> usize {
        self.count(|s| s == TaskState::Deleted)
    }

    pub fn deletion_failed(&self) -> usize {
        self.count(|s| s == TaskState::DeletionFailed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.tasks
            .iter()
            .filter(|t| t.state().is_downloaded())
            .map(|t| t.bytes_written)
            .sum()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Downloaded {}/{} files ({} bytes), skipped {}, failed {}, deleted from printer {}, deletion failures {}",
            self.downloaded(),
            self.tasks.len(),
            self.bytes_written(),
            self.skipped(),
            self.failed(),
            self.deleted(),
            self.deletion_failed()
        )
    }
}

/// Fetches new recordings from a [`RemoteStore`] into the download directory.
pub struct Downloader<S: RemoteStore> {
    store: S,
    config: SyncConfig,
    on_progress: Option<OnProgress>,
}

impl<S: RemoteStore> Downloader<S> {
    pub fn new(store: S, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: OnProgress) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// List, filter and fetch everything new in the remote folder.
    pub fn sync(&mut self, local: &LocalFileSet) -> Result<SyncReport, SyncError> {
        let remote = self.list_targets()?;
        let tasks = plan_downloads(&remote, local, &self.config);

        if tasks.is_empty() {
            info!("No new .{} files to download.", self.config.extension);
            return Ok(SyncReport::default());
        }

        info!("Found {} files for download.", tasks.len());
        let report = self.run_all(tasks);
        info!("{report}");
        Ok(report)
    }

    /// Enter the remote folder and return its entries.
    ///
    /// A folder the server reports as having no files yields an empty list.
    pub fn list_targets(&mut self) -> Result<Vec<String>, SyncError> {
        let folder = self.config.remote_folder.trim_matches('/').to_owned();

        let root = match self.store.list(None) {
            Ok(entries) => entries,
            Err(RemoteError::NoFiles) => Vec::new(),
            Err(e) => return Err(SyncError::Listing(e)),
        };

        if !root.iter().any(|entry| entry_name(entry) == folder) {
            info!("{folder} not found on FTP server.");
            return Err(SyncError::DirectoryNotFound(folder));
        }

        self.store
            .change_dir(&folder)
            .map_err(SyncError::Listing)?;

        info!("Looking for .{} files to download...", self.config.extension);
        match self.store.list(None) {
            Ok(entries) => Ok(entries
                .iter()
                .map(|entry| entry_name(entry).to_owned())
                .collect()),
            Err(RemoteError::NoFiles) => {
                info!("No files in this directory");
                Ok(Vec::new())
            }
            Err(e) => Err(SyncError::Listing(e)),
        }
    }

    /// Fetch every task in order. Per-file failures are logged and skipped.
    pub fn run_all(&mut self, tasks: Vec<DownloadTask>) -> SyncReport {
        let mut report = SyncReport {
            tasks: Vec::with_capacity(tasks.len()),
        };

        for mut task in tasks {
            self.fetch_one(&mut task);
            debug!(file = %task.name, state = %task.state(), "Task finished");
            report.tasks.push(task);
        }

        report
    }

    /// Drive one task to a terminal state.
    pub fn fetch_one(&mut self, task: &mut DownloadTask) {
        task.advance(TaskState::Sizing);
        let size = match self.store.size(&task.name) {
            Ok(size) => size,
            Err(e) => {
                error!(
                    "Failed to download file {}: {}, continuing...",
                    task.name,
                    TransferError::Size(e)
                );
                task.advance(TaskState::Failed);
                return;
            }
        };
        task.size = Some(size);

        if size == 0 {
            info!(
                "Filesize of file {} is 0, skipping file and continuing...",
                task.name
            );
            task.advance(TaskState::SkippedZeroSize);
            return;
        }

        info!(
            "Starting download {} \"{}\" size: {:.2} MB",
            task.position(),
            task.name,
            size as f64 / 1024.0 / 1024.0
        );
        task.advance(TaskState::Transferring);

        let mut created = false;
        let result = self.transfer(task, size, &mut created);

        if created {
            self.emit(ProgressEvent::TransferFinished {
                name: task.name.clone(),
                success: result.is_ok(),
            });
        }

        if let Err(e) = result {
            if created {
                remove_partial(task);
            }
            error!("Failed to download file {}: {}, continuing...", task.name, e);
            task.advance(TaskState::Failed);
            return;
        }

        task.advance(TaskState::Completed);

        if !self.config.delete_after_download {
            task.advance(TaskState::DeletionSkipped);
            return;
        }

        match self.store.remove(&task.name) {
            Ok(()) => {
                debug!(file = %task.name, "Removed remote copy");
                task.advance(TaskState::Deleted);
            }
            Err(e) => {
                error!(
                    "Failed to delete file {} after download: {}, continuing...",
                    task.name, e
                );
                task.advance(TaskState::DeletionFailed);
            }
        }
    }

    /// Close the remote session. Failures only matter for diagnostics.
    pub fn close(&mut self) {
        if let Err(e) = self.store.close() {
            debug!("Closing FTP session failed: {e}");
        }
    }

    fn transfer(
        &mut self,
        task: &mut DownloadTask,
        size: u64,
        created: &mut bool,
    ) -> Result<(), TransferError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&task.destination)?;
        *created = true;
        let mut writer = BufWriter::new(file);

        self.emit(ProgressEvent::TransferStarted {
            name: task.name.clone(),
            index: task.index,
            total: task.total,
            size,
        });

        let mut reader = self.store.retrieve(&task.name)?;
        let copied = self.copy_chunks(task, &mut reader, &mut writer);
        // The transfer reply must be consumed even after a failed copy
        let finished = self.store.finish_retrieve(reader);
        copied?;
        finished?;

        // A short transfer must never count as a download
        if task.bytes_written != size {
            return Err(TransferError::Incomplete {
                expected: size,
                written: task.bytes_written,
            });
        }

        writer.flush()?;
        let file: File = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    fn copy_chunks(
        &mut self,
        task: &mut DownloadTask,
        reader: &mut dyn Read,
        writer: &mut dyn Write,
    ) -> Result<(), TransferError> {
        let mut buf = vec![0u8; self.config.chunk_size.max(1)];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(RemoteError::Io(e).into()),
            };
            writer.write_all(&buf[..n])?;
            task.bytes_written += n as u64;
            self.emit(ProgressEvent::BytesWritten {
                name: task.name.clone(),
                bytes: task.bytes_written,
            });
        }
    }

    fn emit(&mut self, event: ProgressEvent) {
        if let Some(on_progress) = self.on_progress.as_mut() {
            on_progress(event);
        }
    }
}

fn remove_partial(task: &DownloadTask) {
    match std::fs::remove_file(&task.destination) {
        Ok(()) => debug!(path = %task.destination.display(), "Removed partial download"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Could not remove partial download {}: {}",
            task.destination.display(),
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryStore;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn config_for(dir: &Path) -> SyncConfig {
        SyncConfig::builder()
            .download_dir(dir)
            .chunk_size(64)
            .build()
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_plan_filters_extension_and_local_names() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let remote: Vec<String> = ["d.avi", "a.avi", "notes.txt", "b.avi", "c.AVI"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let local: LocalFileSet = ["a.avi", "notes.txt"].into_iter().collect();

        let tasks = plan_downloads(&remote, &local, &config);

        let planned: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(planned, vec!["d.avi", "b.avi"]);
        assert_eq!(tasks[0].destination, dir.path().join("d.avi"));
        assert_eq!(tasks[1].position(), "[2/2]");
    }

    #[test]
    fn test_sync_downloads_only_new_non_empty_videos() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new("timelapse")
            .with_file("a.avi", vec![7u8; 1000])
            .with_file("b.avi", Vec::new())
            .with_file("c.txt", vec![1u8; 500]);
        let mut downloader = Downloader::new(store, config_for(dir.path()));

        let local = LocalFileSet::scan(dir.path()).unwrap();
        let report = downloader.sync(&local).unwrap();

        assert_eq!(names(dir.path()), vec!["a.avi"]);
        assert_eq!(fs::read(dir.path().join("a.avi")).unwrap(), vec![7u8; 1000]);
        assert_eq!(report.downloaded(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.bytes_written(), 1000);
        assert_eq!(report.tasks[0].state(), TaskState::DeletionSkipped);
        assert_eq!(report.tasks[1].state(), TaskState::SkippedZeroSize);
        assert!(downloader.store().removed.is_empty());
    }

    #[test]
    fn test_existing_local_file_is_not_downloaded_again() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.avi"), b"old").unwrap();
        let store = MemoryStore::new("timelapse").with_file("a.avi", vec![1u8; 300]);
        let mut downloader = Downloader::new(store, config_for(dir.path()));

        let local = LocalFileSet::scan(dir.path()).unwrap();
        let report = downloader.sync(&local).unwrap();

        assert!(report.tasks.is_empty());
        assert_eq!(fs::read(dir.path().join("a.avi")).unwrap(), b"old");
        assert!(downloader.store().retrieved.is_empty());
    }

    #[test]
    fn test_failed_stream_removes_partial_file_and_continues() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new("timelapse")
            .with_file("a.avi", vec![1u8; 1000])
            .with_file("b.avi", vec![2u8; 200])
            .fail_stream_after("a.avi", 300);
        let mut downloader = Downloader::new(store, config_for(dir.path()));

        let report = downloader.sync(&LocalFileSet::default()).unwrap();

        assert_eq!(report.tasks[0].state(), TaskState::Failed);
        assert_eq!(report.tasks[1].state(), TaskState::DeletionSkipped);
        assert_eq!(names(dir.path()), vec!["b.avi"]);
        assert_eq!(report.downloaded(), 1);
        assert_eq!(report.failed(), 1);
        // The transfer reply is collected even when the copy fails
        assert_eq!(downloader.store().finished, vec!["a.avi", "b.avi"]);
    }

    #[test]
    fn test_short_transfer_fails_and_keeps_remote_copy() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new("timelapse")
            .with_file("a.avi", vec![1u8; 300])
            .report_size("a.avi", 1000)
            .with_file("b.avi", vec![2u8; 100]);
        let config = SyncConfig::builder()
            .download_dir(dir.path())
            .delete_after_download(true)
            .build();
        let mut downloader = Downloader::new(store, config);

        let report = downloader.sync(&LocalFileSet::default()).unwrap();

        assert_eq!(report.tasks[0].state(), TaskState::Failed);
        assert_eq!(report.tasks[1].state(), TaskState::Deleted);
        assert_eq!(names(dir.path()), vec!["b.avi"]);
        assert_eq!(downloader.store().removed, vec!["b.avi"]);
        assert_eq!(report.downloaded(), 1);
    }

    #[test]
    fn test_zero_chunk_size_still_reads_whole_file() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new("timelapse").with_file("a.avi", vec![5u8; 100]);
        let config = SyncConfig {
            download_dir: dir.path().to_path_buf(),
            chunk_size: 0,
            delete_after_download: true,
            ..SyncConfig::default()
        };
        let mut downloader = Downloader::new(store, config);

        let report = downloader.sync(&LocalFileSet::default()).unwrap();

        assert_eq!(report.tasks[0].state(), TaskState::Deleted);
        assert_eq!(report.tasks[0].bytes_written, 100);
        assert_eq!(fs::read(dir.path().join("a.avi")).unwrap(), vec![5u8; 100]);
    }

    #[test]
    fn test_failed_size_query_skips_file() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new("timelapse")
            .with_file("a.avi", vec![1u8; 100])
            .with_file("b.avi", vec![2u8; 100])
            .fail_size("a.avi");
        let mut downloader = Downloader::new(store, config_for(dir.path()));

        let report = downloader.sync(&LocalFileSet::default()).unwrap();

        assert_eq!(report.tasks[0].state(), TaskState::Failed);
        assert_eq!(report.tasks[0].size, None);
        assert_eq!(names(dir.path()), vec!["b.avi"]);
    }

    #[test]
    fn test_existing_destination_is_left_untouched() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("a.avi");
        fs::write(&destination, b"keep me").unwrap();
        let store = MemoryStore::new("timelapse").with_file("a.avi", vec![1u8; 100]);
        let mut downloader = Downloader::new(store, config_for(dir.path()));

        let mut task = DownloadTask::new("a.avi", destination.clone(), 1, 1);
        downloader.fetch_one(&mut task);

        assert_eq!(task.state(), TaskState::Failed);
        assert_eq!(fs::read(&destination).unwrap(), b"keep me");
    }

    #[test]
    fn test_delete_after_download() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new("timelapse")
            .with_file("a.avi", vec![1u8; 100])
            .with_file("b.avi", vec![2u8; 100])
            .fail_remove("a.avi");
        let config = SyncConfig::builder()
            .download_dir(dir.path())
            .delete_after_download(true)
            .build();
        let mut downloader = Downloader::new(store, config);

        let report = downloader.sync(&LocalFileSet::default()).unwrap();

        assert_eq!(report.tasks[0].state(), TaskState::DeletionFailed);
        assert_eq!(report.tasks[1].state(), TaskState::Deleted);
        assert_eq!(names(dir.path()), vec!["a.avi", "b.avi"]);
        assert_eq!(report.downloaded(), 2);
        assert_eq!(report.deleted(), 1);
        assert_eq!(report.deletion_failed(), 1);
        assert_eq!(downloader.store().removed, vec!["b.avi"]);
    }

    #[test]
    fn test_missing_folder_is_fatal_and_leaves_directory_alone() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("old.avi"), b"x").unwrap();
        let store = MemoryStore::new("recordings").with_file("a.avi", vec![1u8; 10]);
        let mut downloader = Downloader::new(store, config_for(dir.path()));

        let local = LocalFileSet::scan(dir.path()).unwrap();
        let result = downloader.sync(&local);

        assert!(matches!(result, Err(SyncError::DirectoryNotFound(ref f)) if f == "timelapse"));
        assert_eq!(names(dir.path()), vec!["old.avi"]);
        assert!(downloader.store().cwd.is_none());
    }

    #[test]
    fn test_no_files_reply_is_not_fatal() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new("timelapse").reply_no_files();
        let mut downloader = Downloader::new(store, config_for(dir.path()));

        let report = downloader.sync(&LocalFileSet::default()).unwrap();

        assert!(report.tasks.is_empty());
    }

    #[test]
    fn test_other_listing_errors_are_fatal() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new("timelapse").reject_listing(425);
        let mut downloader = Downloader::new(store, config_for(dir.path()));

        let result = downloader.sync(&LocalFileSet::default());

        assert!(matches!(
            result,
            Err(SyncError::Listing(RemoteError::Rejected { code: 425, .. }))
        ));
    }

    #[test]
    fn test_listing_entries_with_paths_are_normalized() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new("timelapse")
            .with_file("a.avi", vec![1u8; 10])
            .with_path_prefixes();
        let mut downloader = Downloader::new(store, config_for(dir.path()));

        let remote = downloader.list_targets().unwrap();

        assert_eq!(remote, vec!["a.avi"]);
    }

    #[test]
    fn test_progress_tracks_bytes_written() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new("timelapse").with_file("a.avi", vec![3u8; 1000]);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let mut downloader = Downloader::new(store, config_for(dir.path()))
            .with_progress(Box::new(move |event| sink.borrow_mut().push(event)));

        downloader.sync(&LocalFileSet::default()).unwrap();

        let events = events.borrow();
        assert!(matches!(
            events.first(),
            Some(ProgressEvent::TransferStarted { size: 1000, index: 1, total: 1, .. })
        ));
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::TransferFinished { success: true, .. })
        ));

        let written: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::BytesWritten { bytes, .. } => Some(*bytes),
                _ => None,
            })
            .collect();
        // 1000 bytes in 64 byte chunks
        assert_eq!(written.len(), 16);
        assert!(written.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(written.last(), Some(&1000));
    }
}
