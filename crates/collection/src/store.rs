use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use common::{ArtistId, ReleaseId, TrackId, WorkId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::entities::{Artist, Release, Track, TrackGroup, TrackGroupId, Work};
use crate::error::CollectionError;

struct Entities<K, V> {
    kind: &'static str,
    items: RwLock<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash + Display, V> Entities<K, V> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            items: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, id: &K) -> Option<Arc<V>> {
        self.items.read().get(id).cloned()
    }

    fn add(&self, id: K, value: V) -> Result<Arc<V>, CollectionError> {
        let mut items = self.items.write();
        if items.contains_key(&id) {
            return Err(CollectionError::Duplicate {
                kind: self.kind,
                id: id.to_string(),
            });
        }
        let value = Arc::new(value);
        items.insert(id, Arc::clone(&value));
        Ok(value)
    }

    fn len(&self) -> usize {
        self.items.read().len()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub artists: usize,
    pub works: usize,
    pub tracks: usize,
    pub track_groups: usize,
    pub releases: usize,
}

/// Owns every resolved entity, at most one per id.
///
/// `add_*` refuses ids that are already present; callers check with `get_*`
/// first. Entities are handed out as shared `Arc`s of the stored value.
pub struct CollectionStore {
    artists: Entities<ArtistId, Artist>,
    works: Entities<WorkId, Work>,
    tracks: Entities<TrackId, Track>,
    track_groups: Entities<TrackGroupId, TrackGroup>,
    releases: Entities<ReleaseId, Release>,
}

impl Default for CollectionStore {
    fn default() -> Self {
        Self {
            artists: Entities::new("artist"),
            works: Entities::new("work"),
            tracks: Entities::new("track"),
            track_groups: Entities::new("track group"),
            releases: Entities::new("release"),
        }
    }
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_artist(&self, id: &ArtistId) -> Option<Arc<Artist>> {
        self.artists.get(id)
    }

    pub fn add_artist(&self, artist: Artist) -> Result<Arc<Artist>, CollectionError> {
        self.artists.add(artist.id.clone(), artist)
    }

    pub fn get_work(&self, id: &WorkId) -> Option<Arc<Work>> {
        self.works.get(id)
    }

    pub fn add_work(&self, work: Work) -> Result<Arc<Work>, CollectionError> {
        self.works.add(work.id.clone(), work)
    }

    pub fn get_track(&self, id: &TrackId) -> Option<Arc<Track>> {
        self.tracks.get(id)
    }

    pub fn add_track(&self, track: Track) -> Result<Arc<Track>, CollectionError> {
        self.tracks.add(track.id.clone(), track)
    }

    pub fn get_track_group(&self, id: &TrackGroupId) -> Option<Arc<TrackGroup>> {
        self.track_groups.get(id)
    }

    pub fn add_track_group(&self, group: TrackGroup) -> Result<Arc<TrackGroup>, CollectionError> {
        self.track_groups.add(group.id.clone(), group)
    }

    pub fn get_release(&self, id: &ReleaseId) -> Option<Arc<Release>> {
        self.releases.get(id)
    }

    pub fn add_release(&self, release: Release) -> Result<Arc<Release>, CollectionError> {
        self.releases.add(release.id.clone(), release)
    }

    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            artists: self.artists.len(),
            works: self.works.len(),
            tracks: self.tracks.len(),
            track_groups: self.track_groups.len(),
            releases: self.releases.len(),
        }
    }
}
