use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

mod date;

pub use date::{DateFormatError, PartialDate};

/// Tag name to its values. Value order is significant and duplicates are kept.
pub type Tags = BTreeMap<String, Vec<String>>;

/// A file as seen by the filesystem or as last recorded in the tag store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub mtime: SystemTime,
}

impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, mtime: SystemTime) -> Self {
        Self {
            path: path.into(),
            mtime,
        }
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// MusicBrainz artist id.
    ArtistId
);
entity_id!(
    /// MusicBrainz work id.
    WorkId
);
entity_id!(
    /// MusicBrainz recording id.
    RecordingId
);
entity_id!(
    /// MusicBrainz release id.
    ReleaseId
);
entity_id!(
    /// Id of a track in a release's track listing. Unique across all releases.
    TrackId
);
