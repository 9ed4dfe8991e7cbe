mod config;

use std::fs;
use std::path::{Path, PathBuf};

use brainz::{MusicbrainzApi, ResponseCache};
use clap::{ArgAction, Parser, Subcommand};
use collection::{CollectionBuilder, CollectionStore, ContentItem, Release, TrackGroup};
use common::ReleaseId;
use library::{Library, RedbTagStore, TagStore};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{
    config_path_from_env, load_or_create_config, resolve_optional_path, resolve_path, OmgConfig,
};

#[derive(Parser, Debug)]
#[command(name = "omg", version, about = "Keeps a tag index of a music folder and maps releases onto MusicBrainz works")]
struct CliArgs {
    /// More output; repeat for debug logging.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Config file (defaults to $OMG_CONFIG or config.yaml next to the binary)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Work with the tag index of local audio files
    #[command(subcommand)]
    Files(FilesCommand),
    /// Build releases from MusicBrainz
    #[command(subcommand)]
    Collection(CollectionCommand),
}

#[derive(Subcommand, Debug)]
enum FilesCommand {
    /// Synchronize the index with the music folder
    Update {
        /// Music folder (defaults to music_root from the config)
        root: Option<PathBuf>,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print the stored tags of one file
    Tags {
        path: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// List files carrying a tag
    WithTag {
        tag: String,
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum CollectionCommand {
    /// Resolve releases with their works and track groups
    Release {
        #[arg(required = true)]
        mbids: Vec<String>,
    },
}

#[derive(Serialize)]
struct ReleaseReport<'a> {
    release: &'a Release,
    groups: Vec<TrackGroup>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    let config_path = args.config.clone().unwrap_or_else(config_path_from_env);
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    match args.command {
        Command::Files(FilesCommand::Update { root, db }) => {
            let root = match root {
                Some(root) => root,
                None => resolve_optional_path(&config_path, &config.music_root)
                    .ok_or("no music root given and none configured")?,
            };
            let index_path = index_path(&config_path, &config, db);
            let library = Library::open(&root, &index_path)?;
            let stats = library.update()?;
            println!(
                "{} added, {} updated, {} removed, {} unchanged, {} failed",
                stats.added, stats.updated, stats.removed, stats.unchanged, stats.failed
            );
        }
        Command::Files(FilesCommand::Tags { path, db }) => {
            let store = RedbTagStore::open(&index_path(&config_path, &config, db))?;
            let path = fs::canonicalize(&path).unwrap_or(path);
            match store.get_tags(&path)? {
                Some(tags) => println!("{}", serde_json::to_string_pretty(&tags)?),
                None => println!("{}: not found", path.display()),
            }
        }
        Command::Files(FilesCommand::WithTag { tag, db }) => {
            let store = RedbTagStore::open(&index_path(&config_path, &config, db))?;
            for path in store.files_with_tag(&tag.to_uppercase())? {
                println!("{}", path.display());
            }
        }
        Command::Collection(CollectionCommand::Release { mbids }) => {
            build_releases(&config_path, &config, &mbids)?;
        }
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn index_path(config_path: &Path, config: &OmgConfig, flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| resolve_path(config_path, config.index_path.trim()))
}

fn build_releases(
    config_path: &Path,
    config: &OmgConfig,
    mbids: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut api = MusicbrainzApi::new(config.musicbrainz_config())?;
    if let Some(cache_path) = resolve_optional_path(config_path, &config.musicbrainz.cache_path) {
        info!("Using response cache {:?}", cache_path);
        api = api.with_cache(ResponseCache::open(&cache_path)?);
    }

    let store = CollectionStore::new();
    let builder = CollectionBuilder::new(&store, &api);
    for mbid in mbids {
        let release = builder.get_or_add_release(&ReleaseId::new(mbid.trim()))?;
        let groups = release
            .contents
            .iter()
            .filter_map(|item| match item {
                ContentItem::Group(id) => store.get_track_group(id),
                ContentItem::Track(_) => None,
            })
            .map(|group| (*group).clone())
            .collect();
        let report = ReleaseReport {
            release: &release,
            groups,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let stats = store.stats();
    info!(
        "Collection holds {} releases, {} tracks, {} track groups, {} works, {} artists",
        stats.releases, stats.tracks, stats.track_groups, stats.works, stats.artists
    );
    Ok(())
}
