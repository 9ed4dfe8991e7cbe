mod error;
mod memory;
mod store;
mod sync;
mod walker;

use std::path::{Path, PathBuf};

use common::{FileInfo, Tags};
use metadata::LoftyTagProvider;
use tracing::info;

pub use error::LibraryError;
pub use memory::MemoryTagStore;
pub use store::{RedbTagStore, TagStore};
pub use sync::{sync_files, SyncStats};
pub use walker::{is_audio_file, AudioFileWalker, FilesystemWalker, AUDIO_EXTENSIONS};

/// A music directory bound to its persisted tag index.
#[derive(Clone)]
pub struct Library {
    root: PathBuf,
    store: RedbTagStore,
}

impl Library {
    pub fn open(root: &Path, index_path: &Path) -> Result<Self, LibraryError> {
        let walker = FilesystemWalker::new(root)?;
        let store = RedbTagStore::open(index_path)?;
        info!("Opened index {:?} for {:?}", index_path, walker.root());
        Ok(Self {
            root: walker.root().to_path_buf(),
            store,
        })
    }

    /// Runs one synchronization pass over the whole root.
    pub fn update(&self) -> Result<SyncStats, LibraryError> {
        let walker = FilesystemWalker::new(&self.root)?;
        let provider = LoftyTagProvider::new(&self.root);
        sync_files(&self.store, &provider, &walker)
    }

    pub fn files(&self) -> Result<Vec<FileInfo>, LibraryError> {
        self.store.get_files()
    }

    /// Stored tags of a file; relative paths are taken from the root.
    pub fn tags(&self, path: &Path) -> Result<Option<Tags>, LibraryError> {
        self.store.get_tags(&self.resolve(path))
    }

    pub fn files_with_tag(&self, tag: &str) -> Result<Vec<PathBuf>, LibraryError> {
        self.store.files_with_tag(tag)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &RedbTagStore {
        &self.store
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::Library;
    use crate::store::TagStore;

    #[test]
    fn unreadable_audio_is_not_recorded() {
        let music = tempfile::tempdir().unwrap();
        let index = tempfile::tempdir().unwrap();
        fs::create_dir_all(music.path().join("Album")).unwrap();
        fs::write(music.path().join("Album").join("01.flac"), b"not really flac").unwrap();
        fs::write(music.path().join("Album").join("notes.txt"), b"liner notes").unwrap();

        let library = Library::open(music.path(), &index.path().join("omg.redb")).unwrap();
        let stats = library.update().unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.added, 0);
        assert!(library.files().unwrap().is_empty());
        assert_eq!(library.tags(Path::new("Album/01.flac")).unwrap(), None);
    }

    #[test]
    fn vanished_files_are_removed_from_index() {
        let music = tempfile::tempdir().unwrap();
        let index = tempfile::tempdir().unwrap();
        let library = Library::open(music.path(), &index.path().join("omg.redb")).unwrap();

        let ghost = library.root().join("ghost.mp3");
        library
            .store()
            .upsert(
                &common::FileInfo::new(&ghost, std::time::SystemTime::now()),
                &common::Tags::new(),
            )
            .unwrap();

        let stats = library.update().unwrap();
        assert_eq!(stats.removed, 1);
        assert_eq!(library.tags(&ghost).unwrap(), None);
    }

    #[test]
    fn open_rejects_missing_root() {
        let index = tempfile::tempdir().unwrap();
        let missing = index.path().join("no-music-here");
        assert!(Library::open(&missing, &index.path().join("omg.redb")).is_err());
    }
}
