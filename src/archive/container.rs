//! Publications packaged as a zip container.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};
use zip::CompressionMethod;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

use super::{Archive, ArchiveEntry, ArchiveError, MutableArchive, clamp_entry_range, relative_path};

type ZipHandle = zip::ZipArchive<BufReader<File>>;

/// Zip container exposed as an archive, optionally password protected.
///
/// The container stays open until [`Archive::close`]; reads are serialized
/// on the single file handle.
pub struct ZipArchive {
    path: PathBuf,
    password: Option<Vec<u8>>,
    handle: Mutex<Option<ZipHandle>>,
    entries: RwLock<Vec<ArchiveEntry>>,
}

impl fmt::Debug for ZipArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipArchive")
            .field("path", &self.path)
            .field("encrypted", &self.password.is_some())
            .finish_non_exhaustive()
    }
}

impl ZipArchive {
    /// Opens the zip container at `path`.
    ///
    /// When `password` is given, it is checked against the first encrypted
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::OpenFailed`] if the file is not a readable
    /// zip container and [`ArchiveError::InvalidPassword`] if the password
    /// does not decrypt it.
    #[instrument(level = "debug", skip(password), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, password: Option<&str>) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let mut handle = open_handle(&path)?;
        let entries =
            read_entries(&mut handle).map_err(|e| ArchiveError::open_failed(&path, e.to_string()))?;
        let password = password.map(|p| p.as_bytes().to_vec());

        if let Some(password) = &password {
            check_password(&mut handle, &path, password)?;
        }

        debug!(entries = entries.len(), "opened zip archive");
        Ok(Self {
            path,
            password,
            handle: Mutex::new(Some(handle)),
            entries: RwLock::new(entries),
        })
    }

    /// Returns the location of the container.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn map_zip_error(&self, entry: &str, error: ZipError) -> ArchiveError {
        match error {
            ZipError::InvalidPassword => ArchiveError::invalid_password(&self.path),
            error => ArchiveError::zip(entry, error),
        }
    }
}

fn open_handle(path: &Path) -> Result<ZipHandle, ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::open_failed(path, e.to_string()))?;
    zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| ArchiveError::open_failed(path, e.to_string()))
}

fn read_entries(handle: &mut ZipHandle) -> Result<Vec<ArchiveEntry>, ZipError> {
    let mut entries = Vec::with_capacity(handle.len());
    for index in 0..handle.len() {
        let file = handle.by_index_raw(index)?;
        if file.is_dir() {
            continue;
        }
        let is_compressed = file.compression() != CompressionMethod::Stored;
        entries.push(ArchiveEntry {
            path: format!("/{}", file.name()),
            length: Some(file.size()),
            is_compressed,
            compressed_length: is_compressed.then(|| file.compressed_size()),
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn check_password(handle: &mut ZipHandle, path: &Path, password: &[u8]) -> Result<(), ArchiveError> {
    let mut encrypted = None;
    for index in 0..handle.len() {
        let file = handle
            .by_index_raw(index)
            .map_err(|e| ArchiveError::open_failed(path, e.to_string()))?;
        if file.encrypted() {
            encrypted = Some(index);
            break;
        }
    }
    let Some(index) = encrypted else {
        return Ok(());
    };

    match handle.by_index_decrypt(index, password) {
        Ok(mut file) => {
            // Legacy zip encryption only checks one byte of the header, a
            // full read catches the remaining wrong passwords.
            io::copy(&mut file, &mut io::sink())
                .map(|_| ())
                .map_err(|_| ArchiveError::invalid_password(path))
        }
        Err(ZipError::InvalidPassword) => Err(ArchiveError::invalid_password(path)),
        Err(e) => Err(ArchiveError::open_failed(path, e.to_string())),
    }
}

impl Archive for ZipArchive {
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
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = guard.as_mut().ok_or(ArchiveError::Closed)?;
        if !path.starts_with('/') {
            return Err(ArchiveError::entry_not_found(path));
        }

        let name = relative_path(path);
        let file = match &self.password {
            Some(password) => handle.by_name_decrypt(name, password),
            None => handle.by_name(name),
        };
        let mut file = file.map_err(|e| self.map_zip_error(path, e))?;

        let range = clamp_entry_range(range, file.size());
        if range.is_empty() {
            return Ok(Bytes::new());
        }

        // Compressed streams cannot seek, skip the leading bytes instead.
        io::copy(&mut (&mut file).take(range.start), &mut io::sink())
            .map_err(|e| ArchiveError::io(path, e))?;
        let mut data = Vec::new();
        (&mut file)
            .take(range.end - range.start)
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::io(path, e))?;
        Ok(Bytes::from(data))
    }

    fn close(&self) {
        let previous = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!(path = %self.path.display(), "closed zip archive");
        }
    }

    fn as_mutable(&self) -> Option<&dyn MutableArchive> {
        Some(self)
    }
}

impl MutableArchive for ZipArchive {
    /// Rewrites the container with the new entry content.
    ///
    /// Other entries are copied without recompression. The new container is
    /// written next to the old one and atomically moved over it.
    #[instrument(level = "debug", skip(self, data), fields(archive = %self.path.display(), bytes = data.len()))]
    fn replace(&self, path: &str, data: &[u8], deflated: bool) -> Result<(), ArchiveError> {
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = guard.as_mut().ok_or(ArchiveError::Closed)?;
        let name = relative_path(path);

        let directory = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = NamedTempFile::new_in(directory).map_err(|e| ArchiveError::io(path, e))?;
        let mut writer = zip::ZipWriter::new(temp);

        for index in 0..handle.len() {
            let file = handle
                .by_index_raw(index)
                .map_err(|e| ArchiveError::zip(path, e))?;
            if file.name() == name {
                continue;
            }
            writer
                .raw_copy_file(file)
                .map_err(|e| ArchiveError::zip(path, e))?;
        }

        let method = if deflated {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        writer
            .start_file(name, SimpleFileOptions::default().compression_method(method))
            .map_err(|e| ArchiveError::zip(path, e))?;
        writer
            .write_all(data)
            .map_err(|e| ArchiveError::io(path, e))?;
        let temp = writer.finish().map_err(|e| ArchiveError::zip(path, e))?;

        // The previous handle stays usable until the rewritten container is
        // open, so a failed rewrite leaves the archive readable.
        let previous = guard.take();
        let rewritten = temp
            .persist(&self.path)
            .map_err(|e| ArchiveError::io(path, e.error))
            .and_then(|_| {
                let mut reopened = open_handle(&self.path)?;
                let entries =
                    read_entries(&mut reopened).map_err(|e| ArchiveError::zip(path, e))?;
                Ok((reopened, entries))
            });

        match rewritten {
            Ok((reopened, entries)) => {
                *self.entries.write().unwrap_or_else(PoisonError::into_inner) = entries;
                *guard = Some(reopened);
                Ok(())
            }
            Err(error) => {
                warn!(path, %error, "zip rewrite failed, keeping previous container");
                *guard = previous;
                Err(error)
            }
        }
    }
}
