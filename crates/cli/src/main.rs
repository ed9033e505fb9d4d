use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use discovery::{DailyPlaylist, ImportReport, PlaylistImporter, PlaylistOrchestrator};
use pipeline::{FavoritesSource, Favorites, FilterEngine, MatchKind, NormalizedKey, PlatformAggregator};
use serde::Serialize;
use sources::{ClientFactory, HttpClientFactory, LastFmClient, SoundCloudClient};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

mod config;

use config::{AppConfig, LASTFM_API_KEY_VAR, SOUNDCLOUD_TOKEN_VAR};

/// songs-enjoyer - daily playlists of music you haven't liked yet
#[derive(Parser)]
#[command(name = "songs-enjoyer")]
#[command(about = "Tag-based playlist generator that skips tracks you already like", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log level (overrides RUST_LOG), e.g. "debug" or "pipeline=debug"
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate today's playlist (the default)
    Generate {
        /// Tags to search, comma separated (defaults to config `default_tags`)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Number of tracks in the playlist (defaults to config `num_tracks`)
        #[arg(short, long)]
        num_tracks: Option<usize>,

        /// Skip platform filtering entirely
        #[arg(long)]
        no_filter: bool,
    },

    /// Generate a playlist and write it to a SoundCloud playlist
    Import {
        /// Tags to search, comma separated (defaults to config `default_tags`)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Number of tracks in the playlist (defaults to config `num_tracks`)
        #[arg(short, long)]
        num_tracks: Option<usize>,

        /// Skip platform filtering entirely
        #[arg(long)]
        no_filter: bool,

        /// Playlist title (defaults to config `import.playlist_title`)
        #[arg(long)]
        title: Option<String>,
    },

    /// Fetch favorites from every enabled platform and report what came back
    Favorites,

    /// Show how two tracks normalize and whether they match
    Match {
        #[arg(long)]
        artist_a: String,
        #[arg(long)]
        title_a: String,
        #[arg(long)]
        artist_b: String,
        #[arg(long)]
        title_b: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;

    // Dispatch to appropriate command handler
    match cli.command.unwrap_or(Commands::Generate {
        tags: Vec::new(),
        num_tracks: None,
        no_filter: false,
    }) {
        Commands::Generate {
            tags,
            num_tracks,
            no_filter,
        } => handle_generate(config, tags, num_tracks, no_filter, cli.json).await?,
        Commands::Import {
            tags,
            num_tracks,
            no_filter,
            title,
        } => handle_import(config, tags, num_tracks, no_filter, title, cli.json).await?,
        Commands::Favorites => handle_favorites(config, cli.json).await?,
        Commands::Match {
            artist_a,
            title_a,
            artist_b,
            title_b,
        } => handle_match(
            &config,
            (artist_a.as_str(), title_a.as_str()),
            (artist_b.as_str(), title_b.as_str()),
            cli.json,
        )?,
    }

    Ok(())
}

fn build_factory(config: &AppConfig) -> Result<HttpClientFactory> {
    HttpClientFactory::new(config.filtering.tuning.fetch_timeout()).context("Failed to build HTTP client")
}

/// Fetch, filter and select; shared by `generate` and `import`
async fn build_playlist(
    mut config: AppConfig,
    tags: Vec<String>,
    num_tracks: Option<usize>,
    no_filter: bool,
) -> Result<DailyPlaylist> {
    let tags = if tags.is_empty() { config.default_tags.clone() } else { tags };
    let num_tracks = num_tracks.unwrap_or(config.num_tracks);
    if no_filter {
        config.filtering.enabled = false;
    }

    let api_key = config
        .lastfm
        .api_key
        .clone()
        .ok_or_else(|| anyhow!("Last.fm API key missing: set lastfm.api_key or {}", LASTFM_API_KEY_VAR))?;

    let factory = build_factory(&config)?;
    let mut lastfm = LastFmClient::new(factory.http().clone(), api_key);
    if let Some(base_url) = &config.lastfm.base_url {
        lastfm = lastfm.with_base_url(base_url);
    }

    let orchestrator = PlaylistOrchestrator::new(Arc::new(lastfm), Arc::new(FilterEngine::new(Arc::new(factory))))
        .with_limit_per_tag(config.lastfm.limit_per_tag);

    orchestrator.generate(&tags, num_tracks, &config.filtering).await
}

/// Handle the 'generate' command
async fn handle_generate(
    config: AppConfig,
    tags: Vec<String>,
    num_tracks: Option<usize>,
    no_filter: bool,
    json: bool,
) -> Result<()> {
    let start = Instant::now();
    let playlist = build_playlist(config, tags, num_tracks, no_filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&playlist)?);
    } else {
        print_playlist(&playlist);
        println!("{} Generated in {:.2?}", "✓".green(), start.elapsed());
    }

    Ok(())
}

#[derive(Serialize)]
struct ImportOutput<'a> {
    playlist: &'a DailyPlaylist,
    import: &'a ImportReport,
}

/// Handle the 'import' command
async fn handle_import(
    config: AppConfig,
    tags: Vec<String>,
    num_tracks: Option<usize>,
    no_filter: bool,
    title: Option<String>,
    json: bool,
) -> Result<()> {
    let token = config
        .import_token()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("SoundCloud token missing: set import.oauth_token or {}", SOUNDCLOUD_TOKEN_VAR))?;
    let title = title.unwrap_or_else(|| config.import.playlist_title.clone());

    let factory = build_factory(&config)?;
    let mut soundcloud = SoundCloudClient::new(factory.http().clone(), token);
    if let Some(base_url) = &config.import.base_url {
        soundcloud = soundcloud.with_base_url(base_url);
    }
    let importer = PlaylistImporter::new(Arc::new(soundcloud));

    let start = Instant::now();
    let playlist = build_playlist(config, tags, num_tracks, no_filter).await?;
    let description = format!(
        "Music discovery playlist generated from tags: {}",
        playlist.tags.join(", ")
    );
    let report = importer
        .import(&playlist.tracks, &title, &description)
        .await
        .context("SoundCloud import failed")?;

    if json {
        let output = ImportOutput {
            playlist: &playlist,
            import: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_playlist(&playlist);
    print_import(&report, &title);
    println!("{} Imported in {:.2?}", "✓".green(), start.elapsed());
    Ok(())
}

#[derive(Serialize)]
struct FavoritesReport {
    platform: String,
    tracks: usize,
    fetched: usize,
    skipped: usize,
    error: Option<String>,
}

impl From<&Favorites> for FavoritesReport {
    fn from(favorites: &Favorites) -> Self {
        Self {
            platform: favorites.platform.id().to_string(),
            tracks: favorites.len(),
            fetched: favorites.fetched,
            skipped: favorites.skipped,
            error: favorites.error.clone(),
        }
    }
}

/// Handle the 'favorites' command
async fn handle_favorites(config: AppConfig, json: bool) -> Result<()> {
    let factory = build_factory(&config)?;
    let mut reports = Vec::new();

    for entry in config.filtering.enabled_platforms() {
        let favorites = match factory.build(entry.platform, &entry.credentials) {
            Ok(client) => {
                PlatformAggregator::new(client, &config.filtering.tuning)
                    .fetch_favorites()
                    .await
            }
            Err(err) => Favorites::failed(entry.platform, err.to_string()),
        };
        reports.push((entry.platform, FavoritesReport::from(&favorites)));
    }

    if json {
        let reports: Vec<&FavoritesReport> = reports.iter().map(|(_, report)| report).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("{}", "No platforms enabled for filtering".yellow());
        return Ok(());
    }

    println!("{}", "Favorites by platform:".bold().blue());
    for (platform, report) in &reports {
        match &report.error {
            None => println!(
                "{} {}: {} tracks ({} fetched, {} skipped)",
                "✓".green(),
                platform,
                report.tracks,
                report.fetched,
                report.skipped
            ),
            Some(error) => println!("{} {}: {}", "✗".red(), platform, error),
        }
    }

    Ok(())
}

/// Handle the 'match' command
fn handle_match(config: &AppConfig, a: (&str, &str), b: (&str, &str), json: bool) -> Result<()> {
    let key_a = NormalizedKey::new(a.0, a.1);
    let key_b = NormalizedKey::new(b.0, b.1);
    let verdict = config.filtering.tuning.matcher().compare(&key_a, &key_b);

    let tier = match verdict {
        Some(MatchKind::Exact) => "exact".to_string(),
        Some(MatchKind::Fuzzy { artist, title }) => format!("fuzzy (artist {:.3}, title {:.3})", artist, title),
        None => "no match".to_string(),
    };

    if json {
        let output = serde_json::json!({
            "a": key_a,
            "b": key_b,
            "artist_similarity": pipeline::matcher::similarity(&key_a.artist_key, &key_b.artist_key),
            "title_similarity": pipeline::matcher::similarity(&key_a.title_key, &key_b.title_key),
            "is_match": verdict.is_some(),
            "tier": tier,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("A: {:?} / {:?}", key_a.artist_key, key_a.title_key);
    println!("B: {:?} / {:?}", key_b.artist_key, key_b.title_key);
    if verdict.is_some() {
        println!("{} {}", "✓".green(), tier);
    } else {
        println!("{} {}", "✗".red(), tier);
    }

    Ok(())
}

/// Helper function to format and print the playlist
fn print_playlist(playlist: &DailyPlaylist) {
    println!(
        "{}",
        format!("Daily playlist for {}:", playlist.tags.join(", ")).bold().blue()
    );

    for (i, track) in playlist.tracks.iter().enumerate() {
        println!("{}. {} - {}", (i + 1).to_string().green(), track.artist(), track.title());
    }

    let stats = &playlist.filter_stats;
    println!(
        "{}Fetched {} unique tracks, filtered out {} ({:.1}%)",
        "• ".cyan(),
        playlist.total_fetched,
        stats.removed_count,
        stats.removal_percentage
    );
    for (platform, count) in &stats.matches_by_platform {
        println!("{}{}: {} already liked", "• ".cyan(), platform, count);
    }
    for error in &playlist.errors {
        println!("{}{}", "! ".yellow(), error);
    }
}

fn print_import(report: &ImportReport, title: &str) {
    match &report.playlist {
        Some(playlist) => println!(
            "{} Added {} new of {} found tracks to '{}'{}",
            "✓".green(),
            report.added,
            report.found.len(),
            playlist.title,
            playlist
                .permalink_url
                .as_deref()
                .map(|url| format!(" ({})", url))
                .unwrap_or_default()
        ),
        None => {
            println!(
                "{} Found {} tracks but could not update '{}'",
                "!".yellow(),
                report.found.len(),
                title
            );
            for link in report.sample_links(3) {
                println!("{}{}", "• ".cyan(), link);
            }
        }
    }

    if !report.not_found.is_empty() {
        println!("{}{} not found on {}", "• ".cyan(), report.not_found.len(), report.platform);
    }
    for warning in &report.warnings {
        println!("{}{}", "! ".yellow(), warning);
    }
}
