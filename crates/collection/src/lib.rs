mod builder;
mod entities;
mod error;
mod store;

pub use builder::CollectionBuilder;
pub use entities::{
    Artist, ContentItem, ParentWork, Release, Track, TrackGroup, TrackGroupId, Work,
};
pub use error::CollectionError;
pub use store::{CollectionStats, CollectionStore};
