//! Directory-backed storage.
//!
//! Each key maps onto one JSON file below the root directory:
//!
//! ```text
//! {root}/
//! ├── issue/operator/op1.json
//! ├── issue/operator/op1/account/acc1.json
//! └── nkey/operator/op1.json
//! ```
//!
//! Writes go through a sibling temp file and a rename, so a concurrent
//! reader never sees a partial value. Directories left empty by a delete
//! are pruned so that listings match the key space; a write racing such a
//! prune recreates its parent.

use std::path::{Path, PathBuf};

use super::{list_prefix, validate_key, Storage};
use crate::crypto::random::random_bytes;
use crate::error::Result;

const FILE_SUFFIX: &str = ".json";

/// Filesystem-backed store rooted at a directory.
///
/// Safe for concurrent use within and across processes at the level of a
/// single key (last rename wins); multi-key updates are not coordinated.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    /// Create a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError::Io` if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{FILE_SUFFIX}"))
    }

    /// Remove now-empty directories between `dir` and the root.
    fn prune_empty_dirs(&self, mut dir: Option<&Path>) {
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            // Fails (and stops the walk) as soon as a directory is non-empty.
            if std::fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

/// Attempts at creating the parent and the temp file before giving up.
const WRITE_ATTEMPTS: usize = 16;

/// Write `data` to a fresh temp file beside `path`.
///
/// A concurrent delete may prune the parent directory (or one being
/// created under it) before the temp file lands, so a missing directory is
/// recreated and the write retried.
fn write_temp(path: &Path, tmp_path: &Path, data: &[u8]) -> Result<()> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let written = match path.parent() {
            Some(parent) => std::fs::create_dir_all(parent),
            None => Ok(()),
        }
        .and_then(|()| std::fs::write(tmp_path, data));
        match written {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && attempt < WRITE_ATTEMPTS => {
                tracing::debug!(path = %path.display(), attempt, "parent pruned during write, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let suffix = u64::from_le_bytes(random_bytes::<8>());
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(format!(".{suffix:016x}.tmp"));
    let tmp_path = PathBuf::from(tmp_name);
    write_temp(path, &tmp_path, data)?;

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

impl Storage for DirectoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        match std::fs::read(self.file_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        write_atomic(&self.file_path(key), value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.file_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        self.prune_empty_dirs(path.parent());
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = list_prefix(prefix);
        let trimmed = prefix.trim_end_matches('/');
        if !trimmed.is_empty() {
            validate_key(trimmed)?;
        }
        let dir = self.root.join(trimmed);

        let read_dir = match std::fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if entry.file_type()?.is_dir() {
                names.push(format!("{name}/"));
            } else if let Some(stem) = name.strip_suffix(FILE_SUFFIX) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
