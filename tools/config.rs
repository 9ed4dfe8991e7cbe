use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use brainz::{MusicbrainzConfig, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicbrainzSection {
    pub hostname: String,
    pub use_https: bool,
    pub rate_limit: bool,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Empty disables the response cache.
    pub cache_path: String,
}

impl Default for MusicbrainzSection {
    fn default() -> Self {
        Self {
            hostname: "musicbrainz.org".to_string(),
            use_https: true,
            rate_limit: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
            cache_path: String::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OmgConfig {
    pub version: u32,
    pub music_root: String,
    pub index_path: String,
    pub preferred_locales: Vec<String>,
    pub musicbrainz: MusicbrainzSection,
}

impl Default for OmgConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            music_root: String::new(),
            index_path: "omg.redb".to_string(),
            preferred_locales: vec!["en".to_string(), "de".to_string()],
            musicbrainz: MusicbrainzSection::default(),
        }
    }
}

impl OmgConfig {
    pub fn musicbrainz_config(&self) -> MusicbrainzConfig {
        let section = &self.musicbrainz;
        MusicbrainzConfig {
            hostname: section.hostname.trim().to_string(),
            use_https: section.use_https,
            rate_limit: section.rate_limit,
            user_agent: section.user_agent.trim().to_string(),
            timeout: Duration::from_secs(section.timeout_secs),
            preferred_locales: self.preferred_locales.clone(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("OMG_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

/// Reads the config at `path`, or writes the defaults there. The flag is true
/// when the file was created.
pub fn load_or_create_config(path: &Path) -> Result<(OmgConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: OmgConfig = serde_yaml::from_str(&contents)?;
        let upgraded = config.version < CONFIG_VERSION;
        if upgraded {
            config.version = CONFIG_VERSION;
        }
        if config.index_path.trim().is_empty() {
            config.index_path = "omg.redb".to_string();
        }
        if config.musicbrainz.hostname.trim().is_empty() {
            config.musicbrainz.hostname = "musicbrainz.org".to_string();
        }
        if config.musicbrainz.user_agent.trim().is_empty() {
            config.musicbrainz.user_agent = DEFAULT_USER_AGENT.to_string();
        }
        if upgraded {
            save_config(path, &config)?;
        }
        return Ok((config, false));
    }

    let config = OmgConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &OmgConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}

/// `None` for a blank value.
pub fn resolve_optional_path(config_path: &Path, value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(resolve_path(config_path, trimmed))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::{
        load_or_create_config, resolve_optional_path, resolve_path, OmgConfig, CONFIG_VERSION,
    };

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.yaml");

        let (config, created) = load_or_create_config(&path).unwrap();
        assert!(created);
        assert!(path.exists());
        assert_eq!(config.index_path, "omg.redb");
        assert_eq!(config.preferred_locales, vec!["en", "de"]);

        let (again, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
        assert_eq!(again.musicbrainz.hostname, "musicbrainz.org");
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "version: 0\nmusic_root: /srv/music\nmusicbrainz:\n  hostname: localhost:5000\n  use_https: false\n",
        )
        .unwrap();

        let (config, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.music_root, "/srv/music");
        assert_eq!(config.index_path, "omg.redb");
        assert!(config.musicbrainz.rate_limit);

        let brainz = config.musicbrainz_config();
        assert_eq!(brainz.base_url(), "http://localhost:5000/ws/2");
        assert_eq!(brainz.preferred_locales, vec!["en", "de"]);
    }

    #[test]
    fn upgraded_config_is_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 0\nmusic_root: /srv/music\n").unwrap();

        load_or_create_config(&path).unwrap();

        let saved: OmgConfig = serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.version, CONFIG_VERSION);
        assert_eq!(saved.music_root, "/srv/music");
    }

    #[test]
    fn current_config_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let contents = format!("version: {}\nmusic_root: /srv/music\n", CONFIG_VERSION);
        fs::write(&path, &contents).unwrap();

        load_or_create_config(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), contents);
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let config_path = Path::new("/etc/omg/config.yaml");
        assert_eq!(
            resolve_path(config_path, "omg.redb"),
            PathBuf::from("/etc/omg/omg.redb")
        );
        assert_eq!(
            resolve_path(config_path, "/var/lib/omg.redb"),
            PathBuf::from("/var/lib/omg.redb")
        );
        assert_eq!(resolve_optional_path(config_path, "  "), None);
    }
}
