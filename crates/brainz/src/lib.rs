mod aliases;
mod api;
mod cache;
mod error;
mod memory;
mod model;
mod source;

pub use aliases::{resolve_alias, Alias, AliasEntry};
pub use api::{MusicbrainzApi, MusicbrainzConfig, DEFAULT_USER_AGENT};
pub use cache::ResponseCache;
pub use error::BrainzError;
pub use memory::MemorySource;
pub use model::{
    ArtistData, MediumData, ParentWorkLink, RecordingArtistRelation, RecordingData, ReleaseData,
    TrackData, WorkData, WorkRecording,
};
pub use source::MusicbrainzSource;
