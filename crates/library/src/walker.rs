use std::path::{Path, PathBuf};

use common::FileInfo;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::LibraryError;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "ogg", "flac", "m4a", "mp4", "wav", "wma", "mpc"];

/// Lists the audio files currently present, with their modification times.
pub trait AudioFileWalker {
    fn get_files(&self) -> Result<Vec<FileInfo>, LibraryError>;
}

impl<T: AudioFileWalker + ?Sized> AudioFileWalker for &T {
    fn get_files(&self) -> Result<Vec<FileInfo>, LibraryError> {
        (**self).get_files()
    }
}

#[derive(Clone, Debug)]
pub struct FilesystemWalker {
    root: PathBuf,
}

impl FilesystemWalker {
    pub fn new(root: &Path) -> Result<Self, LibraryError> {
        if !root.exists() {
            return Err(LibraryError::InvalidRoot(
                root.to_path_buf(),
                "must exist in the filesystem",
            ));
        }
        if !root.is_dir() {
            return Err(LibraryError::InvalidRoot(
                root.to_path_buf(),
                "must be a directory",
            ));
        }
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AudioFileWalker for FilesystemWalker {
    fn get_files(&self) -> Result<Vec<FileInfo>, LibraryError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_audio_file(entry.path()) {
                continue;
            }
            let mtime = match entry.metadata().map(|meta| meta.modified()) {
                Ok(Ok(mtime)) => mtime,
                Ok(Err(err)) => {
                    debug!("No modification time for {:?}: {}", entry.path(), err);
                    continue;
                }
                Err(err) => {
                    debug!("Failed to stat {:?}: {}", entry.path(), err);
                    continue;
                }
            };
            files.push(FileInfo::new(entry.into_path(), mtime));
        }
        Ok(files)
    }
}

pub fn is_audio_file(path: &Path) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext = ext.to_string_lossy().to_ascii_lowercase();
    AUDIO_EXTENSIONS.contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::{is_audio_file, AudioFileWalker, FilesystemWalker};
    use crate::error::LibraryError;

    #[test]
    fn recognizes_audio_extensions() {
        for name in ["file.mp3", "file.mp4", "file.flac", "file.ogg", "file.MPC", "a.b.Wma"] {
            assert!(is_audio_file(Path::new(name)), "{}", name);
        }
    }

    #[test]
    fn rejects_other_extensions() {
        for name in ["file.pdf", "file.a", "file.exe", "file.png", "file.album", "mp3"] {
            assert!(!is_audio_file(Path::new(name)), "{}", name);
        }
    }

    #[test]
    fn lists_audio_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Artist").join("Album");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("01.flac"), b"x").unwrap();
        fs::write(nested.join("cover.jpg"), b"x").unwrap();
        fs::write(dir.path().join("loose.MP3"), b"x").unwrap();

        let walker = FilesystemWalker::new(dir.path()).unwrap();
        let mut names: Vec<String> = walker
            .get_files()
            .unwrap()
            .into_iter()
            .map(|f| {
                assert!(f.path.starts_with(walker.root()));
                f.path.file_name().unwrap().to_string_lossy().to_string()
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["01.flac", "loose.MP3"]);
    }

    #[test]
    fn root_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = FilesystemWalker::new(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidRoot(_, _)));
    }

    #[test]
    fn root_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.mp3");
        fs::write(&file, b"x").unwrap();
        let err = FilesystemWalker::new(&file).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidRoot(_, _)));
    }
}
