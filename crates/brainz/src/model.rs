use std::time::Duration;

use common::{ArtistId, PartialDate, RecordingId, ReleaseId, TrackId, WorkId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistData {
    pub id: ArtistId,
    pub name: String,
    pub sort_name: Option<String>,
    pub disambiguation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkData {
    pub id: WorkId,
    pub name: String,
    pub disambiguation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingData {
    pub id: RecordingId,
    pub title: String,
    pub length: Option<Duration>,
    pub disambiguation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackData {
    pub position: u32,
    pub recording_id: RecordingId,
    pub track_id: TrackId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediumData {
    pub position: u32,
    pub format: Option<String>,
    pub tracks: Vec<TrackData>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseData {
    pub id: ReleaseId,
    pub title: String,
    pub credited_artists: Vec<ArtistId>,
    pub date: Option<PartialDate>,
    pub media: Vec<MediumData>,
}

/// A recording performing a work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecording {
    pub recording: RecordingId,
    pub work: WorkId,
}

/// `part` is the `ordinal`-th part of `parent`, counted from 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentWorkLink {
    pub parent: WorkId,
    pub part: WorkId,
    pub ordinal: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingArtistRelation {
    pub recording: RecordingId,
    pub artist: ArtistId,
    pub kind: String,
    pub attributes: Vec<String>,
    pub end_date: Option<PartialDate>,
}
