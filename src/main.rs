use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use spotidash::sync::DEFAULT_CONCURRENT_FETCHES;
use spotidash::{
    CatalogClient, Config, SnapshotStore, SyncOrchestrator, SyncSnapshot, Track, actions, views,
};

#[derive(Parser)]
#[command(name = "spotidash")]
#[command(about = "Sync your Spotify library and slice it into playlist views")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull down your playlists, their tracks and your liked tracks
    Sync {
        /// How many playlist fetches run at once
        #[arg(long, default_value_t = DEFAULT_CONCURRENT_FETCHES)]
        concurrency: usize,
    },

    /// List every playlist in your library
    Playlists,

    /// Show the tracks added most recently across your library
    RecentlyAdded {
        /// How many entries to show
        #[arg(short, long, default_value_t = 30)]
        limit: usize,
    },

    /// Show liked tracks that sit in none of your playlists
    Unfiled,

    /// Find the playlists that contain a song
    CheckSong {
        /// Search text, track URL or spotify:track: URI; omit to use the current playback
        query: Option<String>,
    },

    /// Queue several playlists as one shuffled batch
    Merge {
        /// Names of the playlists to queue together
        #[arg(required = true, num_args = 2..)]
        playlist_names: Vec<String>,
    },

    /// Save last month's top tracks as a playlist
    ExportTopTracks,

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Sync { concurrency } => {
            sync_library(concurrency).await?;
        }
        Commands::Playlists => {
            list_playlists().await?;
        }
        Commands::RecentlyAdded { limit } => {
            recently_added(limit).await?;
        }
        Commands::Unfiled => {
            unfiled().await?;
        }
        Commands::CheckSong { query } => {
            check_song(query.as_deref()).await?;
        }
        Commands::Merge { playlist_names } => {
            merge(&playlist_names).await?;
        }
        Commands::ExportTopTracks => {
            export_top_tracks().await?;
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

async fn connect() -> Result<CatalogClient> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let missing = config.get_missing_config();
    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        println!(
            "\n{}",
            "Set SPOTIFY_ACCESS_TOKEN in your environment or .env file.".yellow()
        );
        std::process::exit(1);
    }

    CatalogClient::new(&config)
        .await
        .context("Failed to connect to Spotify")
}

async fn run_sync(orchestrator: &SyncOrchestrator) -> Result<SyncSnapshot> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Fetching playlists...");

    let snapshot = orchestrator
        .sync(|msg| pb.set_message(msg.to_string()))
        .await?;

    pb.finish_with_message("Sync complete");
    Ok(snapshot)
}

async fn sync_full() -> Result<SyncSnapshot> {
    let client = connect().await?;
    let orchestrator = SyncOrchestrator::new(client, SnapshotStore::new());
    run_sync(&orchestrator).await
}

async fn sync_library(concurrency: usize) -> Result<()> {
    println!("{}", "Spotify Library Sync".cyan().bold());
    println!("{}", "=".repeat(50));

    let client = connect().await?;
    let orchestrator =
        SyncOrchestrator::new(client, SnapshotStore::new()).with_concurrency(concurrency);

    let snapshot = run_sync(&orchestrator).await?;

    let playlist_tracks: usize = snapshot
        .playlists_and_tracks
        .iter()
        .map(|pt| pt.entries.len())
        .sum();

    println!();
    println!("{}", "SYNC SUMMARY".bold());
    println!("{}", "=".repeat(50));
    println!("Playlists found: {}", snapshot.playlists.len());
    println!(
        "Playlists synced: {}",
        snapshot.playlists_and_tracks.len()
    );
    println!("Playlist tracks: {}", playlist_tracks);
    println!("Liked tracks: {}", snapshot.liked_tracks.len());

    Ok(())
}

async fn list_playlists() -> Result<()> {
    println!("{}", "Your Spotify Playlists".cyan().bold());
    println!("{}", "=".repeat(50));

    let client = connect().await?;
    let playlists = client
        .get_user_playlists()
        .await
        .context("Failed to fetch playlists")?;

    if playlists.is_empty() {
        println!("{}", "No playlists found".yellow());
        return Ok(());
    }

    for (i, playlist) in playlists.iter().enumerate() {
        let marker = if playlist.owner_id == client.user_id() {
            "owned".green()
        } else if playlist.collaborative {
            "collaborative".cyan()
        } else {
            "followed".normal()
        };
        println!("{:2}. {} ({})", i + 1, playlist.name.green(), marker);
    }

    println!(
        "\n{}",
        format!("Total: {} playlists", playlists.len()).cyan()
    );

    Ok(())
}

async fn recently_added(limit: usize) -> Result<()> {
    println!("{}", "Recently Added".cyan().bold());
    println!("{}", "=".repeat(50));

    let snapshot = sync_full().await?;
    let feed = views::recently_added(&snapshot);

    if feed.is_empty() {
        println!("{}", "No tracks found".yellow());
        return Ok(());
    }

    let now = chrono::Utc::now();
    for item in feed.iter().take(limit) {
        let days = (now - item.added_at).num_days();
        let age = match days {
            0 => "today".to_string(),
            1 => "1 day ago".to_string(),
            n => format!("{} days ago", n),
        };
        println!(
            "{} - {} ({}, {})",
            item.track.name.green(),
            item.track.artists.join(", "),
            item.playlist_name.cyan(),
            age
        );
    }

    Ok(())
}

async fn unfiled() -> Result<()> {
    println!("{}", "Liked but Unfiled".cyan().bold());
    println!("{}", "=".repeat(50));

    let snapshot = sync_full().await?;
    let unfiled = views::liked_unfiled(&snapshot);

    if unfiled.is_empty() {
        println!("{}", "Every liked track is already in a playlist".green());
        return Ok(());
    }

    for entry in &unfiled {
        println!(
            "{} - {}",
            entry.track.name.green(),
            entry.track.artists.join(", ")
        );
    }

    println!("\n{}", format!("Count: {}", unfiled.len()).cyan());

    Ok(())
}

async fn check_song(query: Option<&str>) -> Result<()> {
    println!("{}", "Check Song".cyan().bold());
    println!("{}", "=".repeat(50));

    let client = connect().await?;
    let target = resolve_target(&client, query).await?;

    println!(
        "Looking for: {} - {}\n",
        target.name.green(),
        target.artists.join(", ")
    );

    let orchestrator = SyncOrchestrator::new(client, SnapshotStore::new());
    let snapshot = run_sync(&orchestrator).await?;

    let playlists = views::playlists_containing(&snapshot, &target);
    if playlists.is_empty() {
        println!("{}", "Not in any of your playlists".yellow());
    } else {
        println!("Found in {} playlists:", playlists.len());
        for playlist in playlists {
            println!("  - {}", playlist.name.green());
        }
    }

    Ok(())
}

async fn resolve_target(client: &CatalogClient, query: Option<&str>) -> Result<Track> {
    match query {
        None => client
            .get_current_track()
            .await?
            .context("Nothing is playing; pass a search query or track URL"),
        Some(q) if q.starts_with("http") || q.starts_with("spotify:") => {
            let track_id = CatalogClient::parse_track_url(q)?;
            Ok(client.get_track(&track_id).await?)
        }
        Some(q) => {
            let mut results = client.search_tracks(q, 5).await?;
            if results.is_empty() {
                anyhow::bail!("No tracks matched \"{}\"", q);
            }
            Ok(results.remove(0))
        }
    }
}

async fn merge(playlist_names: &[String]) -> Result<()> {
    println!("{}", "Queue Playlists".cyan().bold());
    println!("{}", "=".repeat(50));
    println!("Queueing: {}", playlist_names.join(", "));

    let client = connect().await?;
    let all_playlists = client
        .get_user_playlists()
        .await
        .context("Failed to fetch playlists")?;

    let mut selection = Vec::new();
    for name in playlist_names {
        let playlist = all_playlists
            .iter()
            .find(|p| p.name.to_lowercase() == name.to_lowercase())
            .with_context(|| format!("No playlist named \"{}\"", name))?;
        selection.push(playlist.clone());
    }

    let report = actions::merge_playlists(&client, &selection).await?;

    println!();
    println!(
        "{}",
        format!(
            "Queued {} unique tracks ({} total) from {} playlists",
            report.unique_tracks,
            report.total_entries,
            report.source_playlists.len()
        )
        .green()
    );
    println!("{}", "Playback started, shuffle on".cyan());

    Ok(())
}

async fn export_top_tracks() -> Result<()> {
    println!("{}", "Top Tracks Export".cyan().bold());
    println!("{}", "=".repeat(50));

    let client = connect().await?;
    let playlist = actions::export_top_tracks(&client).await?;

    println!(
        "\n{}",
        format!("Created playlist: {}", playlist.name).green()
    );

    Ok(())
}

fn show_setup_guide() {
    println!("{}", "Spotidash Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Get an access token".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/");
    println!("   - Create an app and request a user token with these scopes:");
    println!("     playlist-read-private playlist-read-collaborative");
    println!("     user-library-read user-top-read user-read-playback-state");
    println!("     user-modify-playback-state playlist-modify-public");
    println!("     playlist-modify-private");

    println!("\n{}", "2. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     SPOTIFY_ACCESS_TOKEN=your_token");

    println!("\n{}", "3. Usage".yellow());
    println!("   - spotidash sync                   (pull down your library)");
    println!("   - spotidash recently-added         (newest additions first)");
    println!("   - spotidash unfiled                (liked tracks in no playlist)");
    println!("   - spotidash check-song \"query\"     (which playlists hold a song)");
    println!("   - spotidash merge \"Gym\" \"Focus\"    (queue playlists together)");
    println!("   - spotidash export-top-tracks      (save last month's top songs)");

    let configured = Config::from_env().map(|c| c.validate()).unwrap_or(false);
    if configured {
        println!("\n{}", "Token found - ready to sync!".green());
    } else {
        println!("\n{}", "Set SPOTIFY_ACCESS_TOKEN to get started.".yellow());
    }
}
