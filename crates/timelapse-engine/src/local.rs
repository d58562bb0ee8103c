use std::collections::HashSet;
use std::io;
use std::path::Path;

use tracing::debug;

/// Names of the files already present in the download directory.
///
/// Membership is by file name only; sizes and contents are not compared.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSet {
    names: HashSet<String>,
}

impl LocalFileSet {
    /// Create `dir` if needed and collect the names of the regular files in it.
    pub fn scan(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;

        let mut names = HashSet::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            // Follows symlinks; a dangling link still names a local file
            let is_dir = std::fs::metadata(entry.path()).is_ok_and(|meta| meta.is_dir());
            if is_dir {
                continue;
            }
            // Non UTF-8 names can never equal a remote listing entry
            if let Ok(name) = entry.file_name().into_string() {
                names.insert(name);
            }
        }

        debug!(
            dir = %dir.display(),
            count = names.len(),
            "Scanned local download directory"
        );
        Ok(Self { names })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for LocalFileSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}
