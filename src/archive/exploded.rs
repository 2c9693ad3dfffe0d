//! Publications stored as a plain directory tree.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use bytes::Bytes;
use tracing::debug;

use super::{Archive, ArchiveEntry, ArchiveError, MutableArchive, clamp_entry_range, relative_path};

/// Directory exposed as an archive.
///
/// Every regular file below the root becomes an entry. Entries are never
/// compressed, and [`Archive::file_path`] points at the file itself.
#[derive(Debug)]
pub struct ExplodedArchive {
    root: PathBuf,
    entries: RwLock<Vec<ArchiveEntry>>,
    closed: AtomicBool,
}

impl ExplodedArchive {
    /// Opens the directory at `root` and snapshots its entries.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::OpenFailed`] if `root` is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ArchiveError::open_failed(root, "not a directory"));
        }
        let entries = scan(&root)?;
        debug!(root = %root.display(), entries = entries.len(), "opened exploded archive");
        Ok(Self {
            root,
            entries: RwLock::new(entries),
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_open(&self) -> Result<(), ArchiveError> {
        if self.closed.load(Ordering::Acquire) {
            Err(ArchiveError::Closed)
        } else {
            Ok(())
        }
    }

    /// Maps an entry path to a location under the root, refusing paths
    /// escaping it.
    fn resolve(&self, path: &str) -> Result<PathBuf, ArchiveError> {
        let relative = Path::new(relative_path(path));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(ArchiveError::entry_not_found(path));
        }
        Ok(self.root.join(relative))
    }
}

fn scan(root: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut entries = Vec::new();
    for entry in jwalk::WalkDir::new(root).sort(true).skip_hidden(false) {
        let entry = entry.map_err(|e| ArchiveError::open_failed(root, e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let length = entry.metadata().ok().map(|m| m.len());
        entries.push(ArchiveEntry {
            path: entry_path(relative),
            length,
            is_compressed: false,
            compressed_length: None,
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn entry_path(relative: &Path) -> String {
    let mut path = String::new();
    for component in relative.components() {
        path.push('/');
        path.push_str(&component.as_os_str().to_string_lossy());
    }
    path
}

impl Archive for ExplodedArchive {
    fn entries(&self) -> Vec<ArchiveEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn entry(&self, path: &str) -> Result<ArchiveEntry, ArchiveError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|entry| entry.path == path)
            .cloned()
            .ok_or_else(|| ArchiveError::entry_not_found(path))
    }

    fn read(&self, path: &str, range: Option<Range<u64>>) -> Result<Bytes, ArchiveError> {
        self.ensure_open()?;
        self.entry(path)?;
        let file_path = self.resolve(path)?;

        let mut file = File::open(&file_path).map_err(|e| ArchiveError::io(path, e))?;
        let length = file.metadata().map_err(|e| ArchiveError::io(path, e))?.len();
        let range = clamp_entry_range(range, length);
        if range.is_empty() {
            return Ok(Bytes::new());
        }

        file.seek(SeekFrom::Start(range.start))
            .map_err(|e| ArchiveError::io(path, e))?;
        let mut data = Vec::new();
        file.take(range.end - range.start)
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::io(path, e))?;
        Ok(Bytes::from(data))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn file_path(&self, path: &str) -> Option<PathBuf> {
        self.entry(path).ok()?;
        self.resolve(path).ok()
    }

    fn as_mutable(&self) -> Option<&dyn MutableArchive> {
        Some(self)
    }
}

impl MutableArchive for ExplodedArchive {
    fn replace(&self, path: &str, data: &[u8], _deflated: bool) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        let file_path = self.resolve(path)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(path, e))?;
        }
        fs::write(&file_path, data).map_err(|e| ArchiveError::io(path, e))?;

        let entry = ArchiveEntry {
            path: path.to_string(),
            length: Some(data.len() as u64),
            is_compressed: false,
            compressed_length: None,
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.binary_search_by(|e| e.path.as_str().cmp(path)) {
            Ok(index) => entries[index] = entry,
            Err(index) => entries.insert(index, entry),
        }
        debug!(path, bytes = data.len(), "replaced exploded archive entry");
        Ok(())
    }
}
