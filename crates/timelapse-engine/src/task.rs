use std::fmt;
use std::path::PathBuf;

/// Lifecycle of one file download.
///
/// ```text
/// Pending -> Sizing -> SkippedZeroSize
///                   -> Transferring -> Completed -> Deleted | DeletionFailed | DeletionSkipped
///                   |              \-> Failed
///                   \-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Sizing,
    SkippedZeroSize,
    Transferring,
    Completed,
    Failed,
    Deleted,
    DeletionFailed,
    DeletionSkipped,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::SkippedZeroSize
                | TaskState::Failed
                | TaskState::Deleted
                | TaskState::DeletionFailed
                | TaskState::DeletionSkipped
        )
    }

    /// Whether the local copy of the file is complete in this state
    pub fn is_downloaded(self) -> bool {
        matches!(
            self,
            TaskState::Completed
                | TaskState::Deleted
                | TaskState::DeletionFailed
                | TaskState::DeletionSkipped
        )
    }

    pub fn can_advance_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Sizing)
                | (Sizing, SkippedZeroSize)
                | (Sizing, Transferring)
                | (Sizing, Failed)
                | (Transferring, Completed)
                | (Transferring, Failed)
                | (Completed, Deleted)
                | (Completed, DeletionFailed)
                | (Completed, DeletionSkipped)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Pending => "pending",
            TaskState::Sizing => "sizing",
            TaskState::SkippedZeroSize => "skipped (zero size)",
            TaskState::Transferring => "transferring",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Deleted => "deleted from printer",
            TaskState::DeletionFailed => "deletion failed",
            TaskState::DeletionSkipped => "kept on printer",
        };
        f.write_str(name)
    }
}

/// A remote file paired with its local destination
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub name: String,
    pub destination: PathBuf,
    /// 1-based position in the run
    pub index: usize,
    pub total: usize,
    /// Size reported by the server, once queried
    pub size: Option<u64>,
    pub bytes_written: u64,
    state: TaskState,
}

impl DownloadTask {
    pub fn new(name: impl Into<String>, destination: PathBuf, index: usize, total: usize) -> Self {
        Self {
            name: name.into(),
            destination,
            index,
            total,
            size: None,
            bytes_written: 0,
            state: TaskState::Pending,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Move to `next`. Transitions never go backwards.
    pub(crate) fn advance(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid task transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    /// `[index/total]` label used in logs and progress bars
    pub fn position(&self) -> String {
        format!("[{}/{}]", self.index, self.total)
    }
}
