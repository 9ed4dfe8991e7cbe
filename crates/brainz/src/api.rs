use std::time::{Duration, Instant};

use common::{ArtistId, PartialDate, RecordingId, ReleaseId, TrackId, WorkId};
use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::aliases::{resolve_alias, Alias, AliasEntry};
use crate::cache::ResponseCache;
use crate::error::BrainzError;
use crate::model::{
    ArtistData, MediumData, ParentWorkLink, RecordingArtistRelation, RecordingData, ReleaseData,
    TrackData, WorkData, WorkRecording,
};
use crate::source::MusicbrainzSource;

pub const DEFAULT_USER_AGENT: &str = concat!("omg/", env!("CARGO_PKG_VERSION"));

const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct MusicbrainzConfig {
    pub hostname: String,
    pub use_https: bool,
    /// At most one request per second, as the public server demands.
    pub rate_limit: bool,
    pub user_agent: String,
    pub timeout: Duration,
    pub preferred_locales: Vec<String>,
}

impl Default for MusicbrainzConfig {
    fn default() -> Self {
        Self {
            hostname: "musicbrainz.org".to_string(),
            use_https: true,
            rate_limit: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            preferred_locales: vec!["en".to_string()],
        }
    }
}

impl MusicbrainzConfig {
    pub fn base_url(&self) -> String {
        format!(
            "http{}://{}/ws/2",
            if self.use_https { "s" } else { "" },
            self.hostname
        )
    }
}

/// Blocking client of the MusicBrainz JSON web service.
pub struct MusicbrainzApi {
    config: MusicbrainzConfig,
    client: Client,
    cache: Option<ResponseCache>,
    last_request: Mutex<Option<Instant>>,
}

impl MusicbrainzApi {
    pub fn new(config: MusicbrainzConfig) -> Result<Self, BrainzError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            client,
            cache: None,
            last_request: Mutex::new(None),
        })
    }

    /// Serves repeated requests from `cache` and stores fresh responses in it.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &MusicbrainzConfig {
        &self.config
    }

    pub fn request_url(&self, entity: &str, id: &str, include: &[&str]) -> String {
        let mut url = format!("{}/{}/{}", self.config.base_url(), entity, id);
        if !include.is_empty() {
            url.push_str("?inc=");
            url.push_str(&include.join("+"));
        }
        url
    }

    fn call<T: DeserializeOwned>(
        &self,
        entity: &str,
        id: &str,
        include: &[&str],
    ) -> Result<T, BrainzError> {
        let url = self.request_url(entity, id, include);
        let body = self.fetch(&url)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn fetch(&self, url: &str) -> Result<String, BrainzError> {
        if let Some(cache) = &self.cache {
            if let Some(body) = cache.get(url)? {
                debug!("Cached response for {}", url);
                return Ok(body);
            }
        }
        self.throttle();
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BrainzError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text()?;
        if let Some(cache) = &self.cache {
            cache.put(url, &body)?;
        }
        Ok(body)
    }

    fn throttle(&self) {
        if !self.config.rate_limit {
            return;
        }
        let mut last = self.last_request.lock();
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                std::thread::sleep(MIN_REQUEST_INTERVAL - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

impl MusicbrainzSource for MusicbrainzApi {
    fn get_artist_data(&self, artist: &ArtistId) -> Result<ArtistData, BrainzError> {
        let response: ArtistResponse = self.call("artist", artist.as_str(), &["aliases"])?;
        Ok(artist_data(artist, response, &self.config.preferred_locales))
    }

    fn get_work_data(&self, work: &WorkId) -> Result<WorkData, BrainzError> {
        let response: WorkResponse = self.call("work", work.as_str(), &["aliases"])?;
        Ok(work_data(work, response, &self.config.preferred_locales))
    }

    fn get_parent_works(&self, work: &WorkId) -> Result<Vec<ParentWorkLink>, BrainzError> {
        let response: RelationsResponse = self.call("work", work.as_str(), &["work-rels"])?;
        parent_works(work, &response.relations)
    }

    fn get_composers(&self, work: &WorkId) -> Result<Vec<ArtistId>, BrainzError> {
        let response: RelationsResponse = self.call("work", work.as_str(), &["artist-rels"])?;
        composers(&response.relations)
    }

    fn get_recording_data(&self, recording: &RecordingId) -> Result<RecordingData, BrainzError> {
        let response: RecordingResponse = self.call("recording", recording.as_str(), &[])?;
        Ok(recording_data(recording, response))
    }

    fn get_recorded_works(
        &self,
        recording: &RecordingId,
    ) -> Result<Vec<WorkRecording>, BrainzError> {
        let response: RelationsResponse =
            self.call("recording", recording.as_str(), &["work-rels"])?;
        recorded_works(recording, &response.relations)
    }

    fn get_recording_artists(
        &self,
        recording: &RecordingId,
    ) -> Result<Vec<RecordingArtistRelation>, BrainzError> {
        let response: RelationsResponse =
            self.call("recording", recording.as_str(), &["artist-rels"])?;
        recording_artists(recording, &response.relations)
    }

    fn get_release_data(&self, release: &ReleaseId) -> Result<ReleaseData, BrainzError> {
        let response: ReleaseResponse = self.call(
            "release",
            release.as_str(),
            &["media", "recordings", "artists"],
        )?;
        release_data(release, response)
    }
}

#[derive(Deserialize)]
struct EntityRef {
    id: String,
}

#[derive(Deserialize)]
struct ArtistResponse {
    name: String,
    #[serde(rename = "sort-name")]
    sort_name: Option<String>,
    disambiguation: Option<String>,
    #[serde(default)]
    aliases: Vec<AliasEntry>,
}

#[derive(Deserialize)]
struct WorkResponse {
    title: String,
    #[serde(rename = "sort-name")]
    sort_name: Option<String>,
    disambiguation: Option<String>,
    #[serde(default)]
    aliases: Vec<AliasEntry>,
}

#[derive(Deserialize)]
struct RecordingResponse {
    title: String,
    length: Option<u64>,
    disambiguation: Option<String>,
}

#[derive(Deserialize)]
struct RelationsResponse {
    #[serde(default)]
    relations: Vec<Relation>,
}

#[derive(Deserialize)]
struct Relation {
    #[serde(rename = "type")]
    kind: Option<String>,
    direction: Option<String>,
    #[serde(rename = "ordering-key")]
    ordering_key: Option<u32>,
    #[serde(default)]
    attributes: Vec<String>,
    end: Option<String>,
    work: Option<EntityRef>,
    artist: Option<EntityRef>,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    title: String,
    date: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    media: Vec<MediumResponse>,
}

#[derive(Deserialize)]
struct ArtistCredit {
    artist: Option<EntityRef>,
}

#[derive(Deserialize)]
struct MediumResponse {
    position: u32,
    format: Option<String>,
    #[serde(default)]
    tracks: Vec<TrackResponse>,
}

#[derive(Deserialize)]
struct TrackResponse {
    id: String,
    position: u32,
    recording: EntityRef,
}

fn artist_data(id: &ArtistId, response: ArtistResponse, locales: &[String]) -> ArtistData {
    let alias = resolve_alias(&response.aliases, locales).unwrap_or(Alias {
        name: response.name,
        sort_name: response.sort_name,
    });
    ArtistData {
        id: id.clone(),
        name: alias.name,
        sort_name: alias.sort_name,
        disambiguation: non_empty(response.disambiguation),
    }
}

fn work_data(id: &WorkId, response: WorkResponse, locales: &[String]) -> WorkData {
    let alias = resolve_alias(&response.aliases, locales).unwrap_or(Alias {
        name: response.title,
        sort_name: response.sort_name,
    });
    WorkData {
        id: id.clone(),
        name: alias.name,
        disambiguation: non_empty(response.disambiguation),
    }
}

fn recording_data(id: &RecordingId, response: RecordingResponse) -> RecordingData {
    RecordingData {
        id: id.clone(),
        title: response.title,
        length: response.length.map(Duration::from_millis),
        disambiguation: non_empty(response.disambiguation),
    }
}

fn release_data(id: &ReleaseId, response: ReleaseResponse) -> Result<ReleaseData, BrainzError> {
    let date = match non_empty(response.date) {
        Some(text) => Some(PartialDate::parse(&text)?),
        None => None,
    };
    let credited_artists = response
        .artist_credit
        .into_iter()
        .filter_map(|credit| credit.artist)
        .map(|artist| ArtistId::new(artist.id))
        .collect();
    let media = response
        .media
        .into_iter()
        .map(|medium| MediumData {
            position: medium.position,
            format: medium.format,
            tracks: medium
                .tracks
                .into_iter()
                .map(|track| TrackData {
                    position: track.position,
                    recording_id: RecordingId::new(track.recording.id),
                    track_id: TrackId::new(track.id),
                })
                .collect(),
        })
        .collect();
    Ok(ReleaseData {
        id: id.clone(),
        title: response.title,
        credited_artists,
        date,
        media,
    })
}

fn recorded_works(
    recording: &RecordingId,
    relations: &[Relation],
) -> Result<Vec<WorkRecording>, BrainzError> {
    relations
        .iter()
        .filter(|relation| is_performance(relation))
        .map(|relation| {
            Ok(WorkRecording {
                recording: recording.clone(),
                work: WorkId::new(target(&relation.work, "work")?),
            })
        })
        .collect()
}

fn parent_works(work: &WorkId, relations: &[Relation]) -> Result<Vec<ParentWorkLink>, BrainzError> {
    relations
        .iter()
        .filter(|relation| is_part_of(relation))
        .map(|relation| {
            let ordinal = relation.ordering_key.ok_or_else(|| {
                BrainzError::Malformed(format!("parts relation of work {} has no ordering key", work))
            })?;
            Ok(ParentWorkLink {
                parent: WorkId::new(target(&relation.work, "work")?),
                part: work.clone(),
                ordinal,
            })
        })
        .collect()
}

fn composers(relations: &[Relation]) -> Result<Vec<ArtistId>, BrainzError> {
    relations
        .iter()
        .filter(|relation| is_composer(relation))
        .map(|relation| Ok(ArtistId::new(target(&relation.artist, "artist")?)))
        .collect()
}

fn recording_artists(
    recording: &RecordingId,
    relations: &[Relation],
) -> Result<Vec<RecordingArtistRelation>, BrainzError> {
    relations
        .iter()
        .filter(|relation| relation.direction.as_deref() == Some("backward"))
        .filter(|relation| relation.artist.is_some())
        .map(|relation| {
            let end_date = match relation.end.as_deref().filter(|end| !end.is_empty()) {
                Some(end) => Some(PartialDate::parse(end)?),
                None => None,
            };
            Ok(RecordingArtistRelation {
                recording: recording.clone(),
                artist: ArtistId::new(target(&relation.artist, "artist")?),
                kind: relation.kind.clone().unwrap_or_default(),
                attributes: relation.attributes.clone(),
                end_date,
            })
        })
        .collect()
}

fn is_performance(relation: &Relation) -> bool {
    relation.kind.as_deref() == Some("performance") && relation.direction.as_deref() == Some("forward")
}

fn is_part_of(relation: &Relation) -> bool {
    relation.kind.as_deref() == Some("parts") && relation.direction.as_deref() == Some("backward")
}

fn is_composer(relation: &Relation) -> bool {
    relation.kind.as_deref() == Some("composer") && relation.direction.as_deref() == Some("backward")
}

fn target(entity: &Option<EntityRef>, kind: &str) -> Result<String, BrainzError> {
    entity
        .as_ref()
        .map(|entity| entity.id.clone())
        .ok_or_else(|| BrainzError::Malformed(format!("relation without {} target", kind)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
