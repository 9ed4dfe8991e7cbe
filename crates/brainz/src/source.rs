use common::{ArtistId, RecordingId, ReleaseId, WorkId};

use crate::error::BrainzError;
use crate::model::{
    ArtistData, ParentWorkLink, RecordingArtistRelation, RecordingData, ReleaseData, WorkData,
    WorkRecording,
};

/// Read-only, id-addressed access to the MusicBrainz entity graph.
///
/// Relation queries only report relations in the direction the graph declares
/// them: a recording performs a work (forward), a work is a part of its parent
/// (backward) and was written by its composers (backward).
pub trait MusicbrainzSource {
    fn get_artist_data(&self, artist: &ArtistId) -> Result<ArtistData, BrainzError>;

    fn get_work_data(&self, work: &WorkId) -> Result<WorkData, BrainzError>;

    fn get_parent_works(&self, work: &WorkId) -> Result<Vec<ParentWorkLink>, BrainzError>;

    fn get_composers(&self, work: &WorkId) -> Result<Vec<ArtistId>, BrainzError>;

    fn get_recording_data(&self, recording: &RecordingId) -> Result<RecordingData, BrainzError>;

    fn get_recorded_works(&self, recording: &RecordingId)
        -> Result<Vec<WorkRecording>, BrainzError>;

    /// Artists credited on the recording itself (performers, conductors, ...).
    fn get_recording_artists(
        &self,
        recording: &RecordingId,
    ) -> Result<Vec<RecordingArtistRelation>, BrainzError>;

    fn get_release_data(&self, release: &ReleaseId) -> Result<ReleaseData, BrainzError>;
}

impl<T: MusicbrainzSource + ?Sized> MusicbrainzSource for &T {
    fn get_artist_data(&self, artist: &ArtistId) -> Result<ArtistData, BrainzError> {
        (**self).get_artist_data(artist)
    }

    fn get_work_data(&self, work: &WorkId) -> Result<WorkData, BrainzError> {
        (**self).get_work_data(work)
    }

    fn get_parent_works(&self, work: &WorkId) -> Result<Vec<ParentWorkLink>, BrainzError> {
        (**self).get_parent_works(work)
    }

    fn get_composers(&self, work: &WorkId) -> Result<Vec<ArtistId>, BrainzError> {
        (**self).get_composers(work)
    }

    fn get_recording_data(&self, recording: &RecordingId) -> Result<RecordingData, BrainzError> {
        (**self).get_recording_data(recording)
    }

    fn get_recorded_works(
        &self,
        recording: &RecordingId,
    ) -> Result<Vec<WorkRecording>, BrainzError> {
        (**self).get_recorded_works(recording)
    }

    fn get_recording_artists(
        &self,
        recording: &RecordingId,
    ) -> Result<Vec<RecordingArtistRelation>, BrainzError> {
        (**self).get_recording_artists(recording)
    }

    fn get_release_data(&self, release: &ReleaseId) -> Result<ReleaseData, BrainzError> {
        (**self).get_release_data(release)
    }
}
