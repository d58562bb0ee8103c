/// Events emitted while a file is transferred.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A transfer has opened its destination file.
    TransferStarted {
        name: String,
        index: usize,
        total: usize,
        size: u64,
    },
    /// Cumulative bytes written to the destination so far.
    BytesWritten { name: String, bytes: u64 },
    /// The transfer ended, successfully or not.
    TransferFinished { name: String, success: bool },
}

/// A callback function for progress updates.
pub type OnProgress = Box<dyn FnMut(ProgressEvent)>;
