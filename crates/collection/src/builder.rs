use std::sync::Arc;

use brainz::{MediumData, MusicbrainzSource, TrackData};
use common::{ArtistId, ReleaseId, TrackId, WorkId};
use tracing::{debug, info, warn};

use crate::entities::{
    Artist, ContentItem, ParentWork, Release, Track, TrackGroup, TrackGroupId, Work,
};
use crate::error::CollectionError;
use crate::store::CollectionStore;

/// Resolves MusicBrainz entities into a [`CollectionStore`].
///
/// Every `get_or_add_*` returns the stored entity when there is one and only
/// otherwise asks the source, so each id is fetched at most once as long as
/// the same store is used.
pub struct CollectionBuilder<'a, S: MusicbrainzSource + ?Sized> {
    store: &'a CollectionStore,
    source: &'a S,
}

#[derive(Debug, PartialEq, Eq)]
enum GroupKey {
    Track(TrackId),
    Work(WorkId),
}

impl<'a, S: MusicbrainzSource + ?Sized> CollectionBuilder<'a, S> {
    pub fn new(store: &'a CollectionStore, source: &'a S) -> Self {
        Self { store, source }
    }

    pub fn store(&self) -> &CollectionStore {
        self.store
    }

    pub fn get_or_add_artist(&self, id: &ArtistId) -> Result<Arc<Artist>, CollectionError> {
        if let Some(artist) = self.store.get_artist(id) {
            return Ok(artist);
        }
        debug!("Fetching artist {}", id);
        let data = self.source.get_artist_data(id)?;
        self.store.add_artist(Artist::from(data))
    }

    /// Resolves a work together with its composers and its chain of parents.
    pub fn get_or_add_work(&self, id: &WorkId) -> Result<Arc<Work>, CollectionError> {
        self.resolve_work(id, &mut Vec::new())
    }

    /// `chain` holds the works whose parent is being resolved, innermost last.
    fn resolve_work(
        &self,
        id: &WorkId,
        chain: &mut Vec<WorkId>,
    ) -> Result<Arc<Work>, CollectionError> {
        if let Some(work) = self.store.get_work(id) {
            return Ok(work);
        }
        if chain.contains(id) {
            let mut cycle = chain.clone();
            cycle.push(id.clone());
            return Err(CollectionError::WorkCycle(cycle));
        }

        debug!("Fetching work {}", id);
        let data = self.source.get_work_data(id)?;
        let composers = self.source.get_composers(id)?;
        for composer in &composers {
            self.get_or_add_artist(composer)?;
        }

        let parents = self.source.get_parent_works(id)?;
        if parents.len() > 1 {
            warn!(
                "Work {} ({}) has {} parents; ignoring all but the first",
                id,
                data.name,
                parents.len()
            );
        }
        let parent = parents.into_iter().next().map(|link| ParentWork {
            id: link.parent,
            position: link.ordinal,
        });
        if let Some(parent) = &parent {
            chain.push(id.clone());
            let resolved = self.resolve_work(&parent.id, chain);
            chain.pop();
            resolved?;
        }

        self.store.add_work(Work {
            id: id.clone(),
            name: data.name,
            disambiguation: data.disambiguation,
            composers,
            parent,
        })
    }

    /// Builds a release with its artists, tracks and track groups.
    ///
    /// Tracks, groups and the release itself are stored only once the whole
    /// release has been resolved.
    pub fn get_or_add_release(&self, id: &ReleaseId) -> Result<Arc<Release>, CollectionError> {
        if let Some(release) = self.store.get_release(id) {
            return Ok(release);
        }
        debug!("Fetching release {}", id);
        let data = self.source.get_release_data(id)?;
        for artist in &data.credited_artists {
            self.get_or_add_artist(artist)?;
        }

        let mut tracks = Vec::new();
        for medium in &data.media {
            for track in &medium.tracks {
                tracks.push(self.create_track(medium, track)?);
            }
        }
        let (contents, groups) = self.group_tracks(&tracks)?;

        for track in tracks {
            self.store.add_track(track)?;
        }
        for group in groups {
            self.store.add_track_group(group)?;
        }
        let release = self.store.add_release(Release {
            id: id.clone(),
            title: data.title,
            date: data.date,
            artists: data.credited_artists,
            contents,
        })?;
        info!("Added release {}", release);
        Ok(release)
    }

    /// Builds the track at `track` on `medium`, resolving its works and
    /// performers. The track itself is not stored.
    pub fn create_track(
        &self,
        medium: &MediumData,
        track: &TrackData,
    ) -> Result<Track, CollectionError> {
        debug!("Fetching recording {}", track.recording_id);
        let recording = self.source.get_recording_data(&track.recording_id)?;

        let mut works = Vec::new();
        for performance in self.source.get_recorded_works(&recording.id)? {
            self.get_or_add_work(&performance.work)?;
            works.push(performance.work);
        }

        let mut artists: Vec<ArtistId> = Vec::new();
        for relation in self.source.get_recording_artists(&recording.id)? {
            self.get_or_add_artist(&relation.artist)?;
            if !artists.contains(&relation.artist) {
                artists.push(relation.artist);
            }
        }

        Ok(Track {
            id: track.track_id.clone(),
            recording_id: recording.id,
            title: recording.title,
            medium_number: medium.position,
            medium_format: medium.format.clone(),
            track_number: track.position,
            works,
            artists,
        })
    }

    /// Folds runs of consecutive tracks recording parts of the same parent
    /// work into track groups. Order is kept; a run of one stays a bare track.
    fn group_tracks(
        &self,
        tracks: &[Track],
    ) -> Result<(Vec<ContentItem>, Vec<TrackGroup>), CollectionError> {
        let mut runs: Vec<(GroupKey, Vec<&Track>)> = Vec::new();
        for track in tracks {
            let key = self.group_key(track)?;
            if let Some((last, members)) = runs.last_mut() {
                if *last == key {
                    members.push(track);
                    continue;
                }
            }
            runs.push((key, vec![track]));
        }

        let mut contents = Vec::with_capacity(runs.len());
        let mut groups = Vec::new();
        for (key, members) in runs {
            match key {
                GroupKey::Work(work) if members.len() > 1 => {
                    let id = TrackGroupId {
                        first_track: members[0].id.clone(),
                        track_count: members.len(),
                    };
                    contents.push(ContentItem::Group(id.clone()));
                    groups.push(TrackGroup {
                        id,
                        work,
                        tracks: members.iter().map(|track| track.id.clone()).collect(),
                    });
                }
                _ => contents.extend(
                    members
                        .iter()
                        .map(|track| ContentItem::Track(track.id.clone())),
                ),
            }
        }
        Ok((contents, groups))
    }

    fn group_key(&self, track: &Track) -> Result<GroupKey, CollectionError> {
        let Some(primary) = track.works.first() else {
            return Ok(GroupKey::Track(track.id.clone()));
        };
        let work = self.get_or_add_work(primary)?;
        Ok(match &work.parent {
            Some(parent) => GroupKey::Work(parent.id.clone()),
            None => GroupKey::Track(track.id.clone()),
        })
    }
}
