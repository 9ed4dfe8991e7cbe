use std::fmt;

use brainz::ArtistData;
use common::{ArtistId, PartialDate, RecordingId, ReleaseId, TrackId, WorkId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub sort_name: String,
    pub disambiguation: Option<String>,
}

impl From<ArtistData> for Artist {
    /// Artists without a sort name sort by their display name.
    fn from(data: ArtistData) -> Self {
        let sort_name = data.sort_name.unwrap_or_else(|| data.name.clone());
        Self {
            id: data.id,
            name: data.name,
            sort_name,
            disambiguation: data.disambiguation,
        }
    }
}

/// The enclosing work of a part, and the part's 1-based position in it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentWork {
    pub id: WorkId,
    pub position: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    pub id: WorkId,
    pub name: String,
    pub disambiguation: Option<String>,
    pub composers: Vec<ArtistId>,
    pub parent: Option<ParentWork>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub recording_id: RecordingId,
    pub title: String,
    pub medium_number: u32,
    pub medium_format: Option<String>,
    pub track_number: u32,
    pub works: Vec<WorkId>,
    pub artists: Vec<ArtistId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackGroupId {
    pub first_track: TrackId,
    pub track_count: usize,
}

impl fmt::Display for TrackGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.first_track, self.track_count)
    }
}

/// Consecutive tracks of a release that together record one work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackGroup {
    pub id: TrackGroupId,
    pub work: WorkId,
    pub tracks: Vec<TrackId>,
}

impl fmt::Display for TrackGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recording of {} ({} tracks)", self.work, self.tracks.len())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentItem {
    Track(TrackId),
    Group(TrackGroupId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub title: String,
    pub date: Option<PartialDate>,
    pub artists: Vec<ArtistId>,
    pub contents: Vec<ContentItem>,
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.date {
            Some(date) => write!(f, "{} ({})", self.title, date),
            None => f.write_str(&self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use brainz::ArtistData;
    use common::{ArtistId, PartialDate, ReleaseId, TrackId};

    use super::{Artist, ContentItem, Release, TrackGroupId};

    #[test]
    fn artist_sort_name_falls_back_to_name() {
        let artist = Artist::from(ArtistData {
            id: ArtistId::new("a"),
            name: "Martha Argerich".to_string(),
            sort_name: None,
            disambiguation: None,
        });
        assert_eq!(artist.sort_name, "Martha Argerich");
    }

    #[test]
    fn release_display_includes_date() {
        let mut release = Release {
            id: ReleaseId::new("r"),
            title: "Concertos".to_string(),
            date: Some(PartialDate::year_month(1995, 3)),
            artists: Vec::new(),
            contents: Vec::new(),
        };
        assert_eq!(release.to_string(), "Concertos (1995-03)");
        release.date = None;
        assert_eq!(release.to_string(), "Concertos");
    }

    #[test]
    fn content_items_serialize_tagged() {
        let items = vec![
            ContentItem::Group(TrackGroupId {
                first_track: TrackId::new("t1"),
                track_count: 2,
            }),
            ContentItem::Track(TrackId::new("t3")),
        ];
        let json = serde_json::to_string(&items).unwrap();
        assert_eq!(
            json,
            r#"[{"group":{"first_track":"t1","track_count":2}},{"track":"t3"}]"#
        );
    }
}
