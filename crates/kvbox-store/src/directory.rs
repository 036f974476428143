use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{BackendError, BackendResult};
use crate::traits::StorageBackend;

const SUFFIX: &str = ".entry";
const LONG_SUFFIX: &str = ".long";

/// Longest file name most filesystems accept.
const MAX_FILE_NAME: usize = 255;

/// Longest key, in bytes, stored under its own hex-encoded name. Longer keys
/// are stored under a digest of the key.
pub const MAX_KEY_BYTES: usize = (MAX_FILE_NAME - SUFFIX.len()) / 2;

/// Where a key lives on disk.
enum Location {
    /// `<hex>.entry`, holding the value alone.
    Short(PathBuf),
    /// `<blake3 hex>.long`, holding the hex-encoded key, a newline, then the
    /// value.
    Long { path: PathBuf, header: String },
}

impl Location {
    fn path(&self) -> &Path {
        match self {
            Location::Short(path) => path,
            Location::Long { path, .. } => path,
        }
    }
}

/// One file per key under a directory.
///
/// Keys are hex-encoded into `<hex>.entry` file names, so any key is safe to
/// use as a path component. Keys too long for that get a `<digest>.long`
/// file that records the full key on its first line. Writes go to a
/// temporary file in the same directory which is then renamed over the
/// entry.
#[derive(Debug)]
pub struct DirectoryBackend {
    dir: PathBuf,
}

impl DirectoryBackend {
    pub const NAME: &'static str = "directory";

    /// Open `dir`, creating it if needed.
    ///
    /// Fails if the path exists but is not a directory, or if it is
    /// read-only.
    pub fn open(dir: impl Into<PathBuf>) -> BackendResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let meta = fs::metadata(&dir)?;
        if !meta.is_dir() {
            return Err(BackendError::Unavailable(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(BackendError::Unavailable(format!(
                "{} is read-only",
                dir.display()
            )));
        }
        debug!(dir = %dir.display(), "opened directory backend");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn locate(&self, name: &str) -> Location {
        let encoded = hex::encode(name.as_bytes());
        if name.len() <= MAX_KEY_BYTES {
            return Location::Short(self.dir.join(format!("{encoded}{SUFFIX}")));
        }
        let digest = blake3::hash(name.as_bytes());
        Location::Long {
            path: self.dir.join(format!("{}{LONG_SUFFIX}", digest.to_hex())),
            header: encoded,
        }
    }

    /// Entry files currently present, with their decoded keys.
    fn entries(&self) -> BackendResult<Vec<(String, PathBuf)>> {
        let mut entries = Vec::new();
        for item in fs::read_dir(&self.dir)? {
            let item = item?;
            let path = item.path();
            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            // The empty key maps to the bare `.entry`, which has no stem.
            let key = if let Some(stem) = file_name.strip_suffix(SUFFIX) {
                decode_key(stem)
            } else if file_name.ends_with(LONG_SUFFIX) {
                match read_optional(&path)? {
                    Some(bytes) => split_header(&bytes).and_then(|(header, _)| decode_key(header)),
                    None => continue,
                }
            } else {
                continue;
            };
            match key {
                Some(key) => entries.push((key, path)),
                None => warn!(path = %path.display(), "skipping entry with undecodable name"),
            }
        }
        Ok(entries)
    }

    fn persist(&self, path: &Path, parts: &[&[u8]]) -> BackendResult<()> {
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        for part in parts {
            temp.write_all(part)?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn decode_key(stem: &str) -> Option<String> {
    let bytes = hex::decode(stem).ok()?;
    String::from_utf8(bytes).ok()
}

/// Split a `.long` file into its hex key line and the value bytes.
fn split_header(bytes: &[u8]) -> Option<(&str, &[u8])> {
    let newline = bytes.iter().position(|&b| b == b'\n')?;
    let header = std::str::from_utf8(&bytes[..newline]).ok()?;
    Some((header, &bytes[newline + 1..]))
}

fn read_optional(path: &Path) -> BackendResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn corrupt(path: &Path, reason: impl Into<String>) -> BackendError {
    BackendError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl StorageBackend for DirectoryBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn write(&self, name: &str, value: &str) -> BackendResult<()> {
        match self.locate(name) {
            Location::Short(path) => self.persist(&path, &[value.as_bytes()]),
            Location::Long { path, header } => {
                self.persist(&path, &[header.as_bytes(), b"\n".as_slice(), value.as_bytes()])
            }
        }
    }

    fn read(&self, name: &str) -> BackendResult<Option<String>> {
        let location = self.locate(name);
        let path = location.path();
        let bytes = match read_optional(path)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let value = match &location {
            Location::Short(_) => bytes,
            Location::Long { header, .. } => match split_header(&bytes) {
                Some((found, value)) if found == header => value.to_vec(),
                Some(_) => return Err(corrupt(path, "entry belongs to a different key")),
                None => return Err(corrupt(path, "missing key header")),
            },
        };
        String::from_utf8(value)
            .map(Some)
            .map_err(|e| corrupt(path, e.to_string()))
    }

    fn delete(&self, name: &str) -> BackendResult<()> {
        match fs::remove_file(self.locate(name).path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn supports_delete_all(&self) -> bool {
        true
    }

    /// Swap in a fresh directory, then remove the old one.
    ///
    /// The rename is the commit point: either every entry is gone or none
    /// is.
    fn delete_all(&self) -> BackendResult<()> {
        let graveyard = tempfile::Builder::new()
            .prefix(".kvbox-clear")
            .tempdir_in(parent_dir(&self.dir))?;
        let retired = graveyard.path().join("entries");
        fs::rename(&self.dir, &retired)?;
        fs::create_dir(&self.dir)?;
        if let Err(e) = graveyard.close() {
            warn!(error = %e, "cleared entries but could not remove the old directory");
        }
        Ok(())
    }

    fn enumerate(&self, visit: &mut dyn FnMut(&str)) -> BackendResult<()> {
        for (key, path) in self.entries()? {
            let non_empty = if path.to_str().is_some_and(|p| p.ends_with(LONG_SUFFIX)) {
                read_optional(&path)?
                    .as_deref()
                    .and_then(split_header)
                    .is_some_and(|(_, value)| !value.is_empty())
            } else {
                match fs::metadata(&path) {
                    Ok(meta) => meta.len() > 0,
                    // Removed between listing and visiting.
                    Err(e) if e.kind() == io::ErrorKind::NotFound => false,
                    Err(e) => return Err(e.into()),
                }
            };
            if non_empty {
                visit(&key);
            }
        }
        Ok(())
    }
}
