use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use super::{DurableStore, StoreError};

/// Longest namespace or key accepted by [`FileStore`]
pub const MAX_NAME_LEN: usize = 64;

/// Durable store keeping one file per `namespace/key` under a root directory
///
/// Writes go to a temporary sibling that is synced and renamed over the
/// target, so a reader sees either the old or the new value.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, namespace: &str, key: &str) -> Result<PathBuf, StoreError> {
        check_name(namespace)?;
        check_name(key)?;
        Ok(self.root.join(namespace).join(key))
    }
}

// Names must map onto a single path component.
fn check_name(s: &str) -> Result<(), StoreError> {
    if s.len() > MAX_NAME_LEN {
        return Err(StoreError::KeyTooLong);
    }
    if s.is_empty() || s == "." || s == ".." || s.contains(|c: char| c == '/' || c == '\\') {
        return Err(StoreError::InvalidKey);
    }
    Ok(())
}

fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::Other, "missing parent dir"))?;
    fs::create_dir_all(dir)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    match fs::File::open(dir).and_then(|d| d.sync_all()) {
        Ok(()) => {}
        // Not every platform can sync a directory
        Err(e) => log::debug!("directory sync skipped for {}: {}", dir.display(), e),
    }
    Ok(())
}

impl DurableStore for FileStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        let path = self.path(namespace, key)?;
        let mut file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata()?.len() as usize;
        let dst = buf.get_mut(..len).ok_or(StoreError::BufferTooSmall)?;
        file.read_exact(dst)?;
        Ok(Some(len))
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path(namespace, key)?;
        atomic_write(&path, data)?;
        log::debug!("stored {} bytes at {}/{}", data.len(), namespace, key);
        Ok(())
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StoreError> {
        let path = self.path(namespace, key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
