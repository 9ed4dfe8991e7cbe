use std::collections::HashMap;

use common::{ArtistId, RecordingId, ReleaseId, WorkId};
use parking_lot::Mutex;

use crate::error::BrainzError;
use crate::model::{
    ArtistData, ParentWorkLink, RecordingArtistRelation, RecordingData, ReleaseData, WorkData,
    WorkRecording,
};
use crate::source::MusicbrainzSource;

/// In-memory entity graph. Counts every fetch per operation and id.
#[derive(Default)]
pub struct MemorySource {
    artists: HashMap<ArtistId, ArtistData>,
    works: HashMap<WorkId, WorkData>,
    parents: HashMap<WorkId, Vec<ParentWorkLink>>,
    composers: HashMap<WorkId, Vec<ArtistId>>,
    recordings: HashMap<RecordingId, RecordingData>,
    recorded_works: HashMap<RecordingId, Vec<WorkRecording>>,
    recording_artists: HashMap<RecordingId, Vec<RecordingArtistRelation>>,
    releases: HashMap<ReleaseId, ReleaseData>,
    fetches: Mutex<HashMap<(&'static str, String), usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_artist(&mut self, artist: ArtistData) -> &mut Self {
        self.artists.insert(artist.id.clone(), artist);
        self
    }

    pub fn add_work(&mut self, work: WorkData) -> &mut Self {
        self.works.insert(work.id.clone(), work);
        self
    }

    pub fn add_parent(&mut self, part: &WorkId, parent: &WorkId, ordinal: u32) -> &mut Self {
        self.parents
            .entry(part.clone())
            .or_default()
            .push(ParentWorkLink {
                parent: parent.clone(),
                part: part.clone(),
                ordinal,
            });
        self
    }

    pub fn add_composer(&mut self, work: &WorkId, composer: &ArtistId) -> &mut Self {
        self.composers
            .entry(work.clone())
            .or_default()
            .push(composer.clone());
        self
    }

    pub fn add_recording(&mut self, recording: RecordingData) -> &mut Self {
        self.recordings.insert(recording.id.clone(), recording);
        self
    }

    pub fn add_recorded_work(&mut self, recording: &RecordingId, work: &WorkId) -> &mut Self {
        self.recorded_works
            .entry(recording.clone())
            .or_default()
            .push(WorkRecording {
                recording: recording.clone(),
                work: work.clone(),
            });
        self
    }

    pub fn add_recording_artist(&mut self, relation: RecordingArtistRelation) -> &mut Self {
        self.recording_artists
            .entry(relation.recording.clone())
            .or_default()
            .push(relation);
        self
    }

    pub fn add_release(&mut self, release: ReleaseData) -> &mut Self {
        self.releases.insert(release.id.clone(), release);
        self
    }

    /// How often `operation` was called for `id`. Operations are named after
    /// the trait method without its `get_` prefix.
    pub fn fetch_count(&self, operation: &str, id: &str) -> usize {
        self.fetches
            .lock()
            .iter()
            .filter(|((op, key), _)| *op == operation && key == id)
            .map(|(_, count)| *count)
            .sum()
    }

    /// Highest number of calls seen for any single operation and id.
    pub fn max_fetch_count(&self) -> usize {
        self.fetches.lock().values().copied().max().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }

    fn record(&self, operation: &'static str, id: &str) {
        *self
            .fetches
            .lock()
            .entry((operation, id.to_string()))
            .or_insert(0) += 1;
    }
}

impl MusicbrainzSource for MemorySource {
    fn get_artist_data(&self, artist: &ArtistId) -> Result<ArtistData, BrainzError> {
        self.record("artist_data", artist.as_str());
        self.artists
            .get(artist)
            .cloned()
            .ok_or_else(|| BrainzError::NotFound(format!("artist {}", artist)))
    }

    fn get_work_data(&self, work: &WorkId) -> Result<WorkData, BrainzError> {
        self.record("work_data", work.as_str());
        self.works
            .get(work)
            .cloned()
            .ok_or_else(|| BrainzError::NotFound(format!("work {}", work)))
    }

    fn get_parent_works(&self, work: &WorkId) -> Result<Vec<ParentWorkLink>, BrainzError> {
        self.record("parent_works", work.as_str());
        Ok(self.parents.get(work).cloned().unwrap_or_default())
    }

    fn get_composers(&self, work: &WorkId) -> Result<Vec<ArtistId>, BrainzError> {
        self.record("composers", work.as_str());
        Ok(self.composers.get(work).cloned().unwrap_or_default())
    }

    fn get_recording_data(&self, recording: &RecordingId) -> Result<RecordingData, BrainzError> {
        self.record("recording_data", recording.as_str());
        self.recordings
            .get(recording)
            .cloned()
            .ok_or_else(|| BrainzError::NotFound(format!("recording {}", recording)))
    }

    fn get_recorded_works(
        &self,
        recording: &RecordingId,
    ) -> Result<Vec<WorkRecording>, BrainzError> {
        self.record("recorded_works", recording.as_str());
        Ok(self.recorded_works.get(recording).cloned().unwrap_or_default())
    }

    fn get_recording_artists(
        &self,
        recording: &RecordingId,
    ) -> Result<Vec<RecordingArtistRelation>, BrainzError> {
        self.record("recording_artists", recording.as_str());
        Ok(self
            .recording_artists
            .get(recording)
            .cloned()
            .unwrap_or_default())
    }

    fn get_release_data(&self, release: &ReleaseId) -> Result<ReleaseData, BrainzError> {
        self.record("release_data", release.as_str());
        self.releases
            .get(release)
            .cloned()
            .ok_or_else(|| BrainzError::NotFound(format!("release {}", release)))
    }
}
