use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use common::{FileInfo, Tags};
use parking_lot::RwLock;

use crate::error::LibraryError;
use crate::store::TagStore;

/// Tag store kept in memory, for dry runs and tests.
#[derive(Default)]
pub struct MemoryTagStore {
    files: RwLock<HashMap<PathBuf, (SystemTime, Tags)>>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl TagStore for MemoryTagStore {
    fn get_files(&self) -> Result<Vec<FileInfo>, LibraryError> {
        Ok(self
            .files
            .read()
            .iter()
            .map(|(path, (mtime, _))| FileInfo::new(path.clone(), *mtime))
            .collect())
    }

    fn upsert(&self, file: &FileInfo, tags: &Tags) -> Result<(), LibraryError> {
        self.files
            .write()
            .insert(file.path.clone(), (file.mtime, tags.clone()));
        Ok(())
    }

    fn get_tags(&self, path: &Path) -> Result<Option<Tags>, LibraryError> {
        Ok(self.files.read().get(path).map(|(_, tags)| tags.clone()))
    }

    fn remove(&self, path: &Path) -> Result<(), LibraryError> {
        self.files.write().remove(path);
        Ok(())
    }
}
