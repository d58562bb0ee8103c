use std::io::Read;

use crate::error::RemoteError;

/// The operations a download run needs from the printer's file server.
///
/// [`crate::FtpsSession`] talks to a real printer; tests drive the
/// downloader with an in-memory implementation.
pub trait RemoteStore {
    /// Name listing of `path`, or of the working directory when `None`.
    ///
    /// An empty or unreadable directory reported by the server as
    /// "file unavailable" yields [`RemoteError::NoFiles`].
    fn list(&mut self, path: Option<&str>) -> Result<Vec<String>, RemoteError>;

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Size in bytes of a file in the working directory.
    fn size(&mut self, name: &str) -> Result<u64, RemoteError>;

    /// Open a binary transfer of `name`. The returned reader must be handed
    /// back to [`RemoteStore::finish_retrieve`] whether or not it was read
    /// to the end.
    fn retrieve(&mut self, name: &str) -> Result<Box<dyn Read>, RemoteError>;

    /// Close the data channel and collect the server's transfer reply.
    fn finish_retrieve(&mut self, reader: Box<dyn Read>) -> Result<(), RemoteError>;

    fn remove(&mut self, name: &str) -> Result<(), RemoteError>;

    /// End the session.
    fn close(&mut self) -> Result<(), RemoteError> {
        Ok(())
    }
}

/// Reduce a listing entry to its final path component.
pub(crate) fn entry_name(entry: &str) -> &str {
    let trimmed = entry.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
