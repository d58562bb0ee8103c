//! In-memory [`RemoteStore`] used by the engine tests.

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read};

use crate::error::RemoteError;
use crate::remote::RemoteStore;

/// A printer file server with one folder held in memory.
pub struct MemoryStore {
    folder: String,
    files: Vec<(String, Vec<u8>)>,
    fail_stream_after: HashMap<String, usize>,
    reported_sizes: HashMap<String, u64>,
    fail_size: HashSet<String>,
    fail_remove: HashSet<String>,
    no_files: bool,
    reject_listing: Option<u32>,
    path_prefixes: bool,
    current: Option<String>,

    pub cwd: Option<String>,
    pub retrieved: Vec<String>,
    pub finished: Vec<String>,
    pub removed: Vec<String>,
}

impl MemoryStore {
    pub fn new(folder: &str) -> Self {
        Self {
            folder: folder.to_owned(),
            files: Vec::new(),
            fail_stream_after: HashMap::new(),
            reported_sizes: HashMap::new(),
            fail_size: HashSet::new(),
            fail_remove: HashSet::new(),
            no_files: false,
            reject_listing: None,
            path_prefixes: false,
            current: None,
            cwd: None,
            retrieved: Vec::new(),
            finished: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn with_file(mut self, name: &str, data: Vec<u8>) -> Self {
        self.files.push((name.to_owned(), data));
        self
    }

    pub fn fail_stream_after(mut self, name: &str, bytes: usize) -> Self {
        self.fail_stream_after.insert(name.to_owned(), bytes);
        self
    }

    /// Answer `SIZE` with `size` regardless of what the transfer serves
    pub fn report_size(mut self, name: &str, size: u64) -> Self {
        self.reported_sizes.insert(name.to_owned(), size);
        self
    }

    pub fn fail_size(mut self, name: &str) -> Self {
        self.fail_size.insert(name.to_owned());
        self
    }

    pub fn fail_remove(mut self, name: &str) -> Self {
        self.fail_remove.insert(name.to_owned());
        self
    }

    /// Answer the folder listing with a 550 reply
    pub fn reply_no_files(mut self) -> Self {
        self.no_files = true;
        self
    }

    pub fn reject_listing(mut self, code: u32) -> Self {
        self.reject_listing = Some(code);
        self
    }

    /// List entries as `/folder` and `folder/name`
    pub fn with_path_prefixes(mut self) -> Self {
        self.path_prefixes = true;
        self
    }

    fn file(&self, name: &str) -> Result<&Vec<u8>, RemoteError> {
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data)
            .ok_or_else(|| RemoteError::Rejected {
                code: 550,
                message: format!("{name}: No such file"),
            })
    }
}

impl RemoteStore for MemoryStore {
    fn list(&mut self, path: Option<&str>) -> Result<Vec<String>, RemoteError> {
        assert!(path.is_none());

        let Some(cwd) = self.cwd.as_ref() else {
            let root = if self.path_prefixes {
                format!("/{}", self.folder)
            } else {
                self.folder.clone()
            };
            return Ok(vec!["model".to_owned(), root]);
        };

        if let Some(code) = self.reject_listing {
            return Err(RemoteError::Rejected {
                code,
                message: "Can't open data connection".to_owned(),
            });
        }
        if self.no_files {
            return Err(RemoteError::NoFiles);
        }

        Ok(self
            .files
            .iter()
            .map(|(name, _)| {
                if self.path_prefixes {
                    format!("{cwd}/{name}")
                } else {
                    name.clone()
                }
            })
            .collect())
    }

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        if path != self.folder {
            return Err(RemoteError::Rejected {
                code: 550,
                message: format!("{path}: No such directory"),
            });
        }
        self.cwd = Some(path.to_owned());
        Ok(())
    }

    fn size(&mut self, name: &str) -> Result<u64, RemoteError> {
        if self.fail_size.contains(name) {
            return Err(RemoteError::Rejected {
                code: 550,
                message: "Could not get file size".to_owned(),
            });
        }
        if let Some(size) = self.reported_sizes.get(name) {
            return Ok(*size);
        }
        self.file(name).map(|data| data.len() as u64)
    }

    fn retrieve(&mut self, name: &str) -> Result<Box<dyn Read>, RemoteError> {
        let data = self.file(name)?.clone();
        self.retrieved.push(name.to_owned());
        self.current = Some(name.to_owned());

        let fail_at = self.fail_stream_after.get(name).copied();
        Ok(Box::new(FlakyReader {
            data: Cursor::new(data),
            fail_at,
        }))
    }

    fn finish_retrieve(&mut self, reader: Box<dyn Read>) -> Result<(), RemoteError> {
        drop(reader);
        if let Some(name) = self.current.take() {
            self.finished.push(name);
        }
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<(), RemoteError> {
        if self.fail_remove.contains(name) {
            return Err(RemoteError::Rejected {
                code: 550,
                message: "Permission denied".to_owned(),
            });
        }
        self.file(name)?;
        self.files.retain(|(n, _)| n != name);
        self.removed.push(name.to_owned());
        Ok(())
    }
}

/// Serves `data` and fails once `fail_at` bytes have been read
struct FlakyReader {
    data: Cursor<Vec<u8>>,
    fail_at: Option<usize>,
}

impl Read for FlakyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(fail_at) = self.fail_at else {
            return self.data.read(buf);
        };

        let served = self.data.position() as usize;
        if served >= fail_at {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "data connection reset",
            ));
        }
        let limit = buf.len().min(fail_at - served);
        self.data.read(&mut buf[..limit])
    }
}
