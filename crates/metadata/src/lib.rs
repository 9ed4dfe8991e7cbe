use std::fmt;
use std::path::{Path, PathBuf};

use common::Tags;
use lofty::error::LoftyError;
use lofty::prelude::TaggedFileExt;
use lofty::tag::{Tag, TagType};
use tracing::debug;

/// Reads the tag multimap of an audio file.
pub trait TagProvider {
    fn get_tags(&self, path: &Path) -> Result<Tags, MetadataError>;
}

/// Tag provider backed by `lofty`. Relative paths are resolved against `root`.
#[derive(Clone, Debug)]
pub struct LoftyTagProvider {
    root: PathBuf,
}

impl LoftyTagProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl TagProvider for LoftyTagProvider {
    fn get_tags(&self, path: &Path) -> Result<Tags, MetadataError> {
        read_tags(&self.resolve(path))
    }
}

/// Reads every text item of the file's primary tag (or its first tag if the
/// format has no primary one). Keys use the generic upper-case names; items
/// without a generic name keep their native key.
pub fn read_tags(path: &Path) -> Result<Tags, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let mut tags = Tags::new();
    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        collect_items(tag, &mut tags);
    }
    Ok(tags)
}

fn collect_items(tag: &Tag, tags: &mut Tags) {
    let native = tag.tag_type();
    for item in tag.items() {
        let key = item
            .key()
            .map_key(TagType::VorbisComments, true)
            .or_else(|| item.key().map_key(native, true));
        let Some(key) = key else {
            debug!("Skipping unmapped tag item {:?}", item.key());
            continue;
        };
        let Some(value) = item.value().text() else {
            continue;
        };
        tags.entry(key.to_uppercase())
            .or_default()
            .push(value.to_string());
    }
}

/// Tag extraction failed: the file could not be read or is not a valid audio file.
#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::{LoftyTagProvider, TagProvider};

    #[test]
    fn resolves_relative_paths_against_root() {
        let provider = LoftyTagProvider::new("/music");
        assert_eq!(
            provider.resolve(Path::new("a/b.mp3")),
            PathBuf::from("/music/a/b.mp3")
        );
        assert_eq!(
            provider.resolve(Path::new("/elsewhere/c.flac")),
            PathBuf::from("/elsewhere/c.flac")
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LoftyTagProvider::new(dir.path());
        assert!(provider.get_tags(Path::new("missing.mp3")).is_err());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.flac"), b"definitely not flac").unwrap();
        let provider = LoftyTagProvider::new(dir.path());
        assert!(provider.get_tags(Path::new("broken.flac")).is_err());
    }
}
