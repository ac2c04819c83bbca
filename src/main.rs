use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use library_transfer::catalog::{DestinationCatalog, SourceCatalog};
use library_transfer::config::Config;
use library_transfer::models::{Category, TrackDescriptor};
use library_transfer::progress::{format_duration, set_log_only};
use library_transfer::report::confidence_marker;
use library_transfer::safety::{default_applied_path, validate_output_path, APPLIED_MARKER};
use library_transfer::snapshot::{JsonLibrary, SnapshotCatalog};
use library_transfer::transfer::{Transfer, TransferSession};

#[derive(Parser)]
#[command(name = "library-transfer")]
#[command(about = "Move liked songs, artists, albums and playlists between streaming catalogs")]
struct Args {
    /// Library export of the source catalog (JSON)
    source: PathBuf,

    /// Destination catalog snapshot (JSON)
    destination: PathBuf,

    #[command(subcommand)]
    command: Command,

    /// TOML file overriding matching constants and transfer limits
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for failure reports
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Where to save the destination snapshot with applied writes
    /// (default: <DESTINATION>.applied.json)
    #[arg(long, global = true)]
    applied: Option<PathBuf>,

    /// Write run statistics as JSON
    #[arg(long, global = true)]
    stats: Option<PathBuf>,

    /// Hide progress bars for tail-friendly output
    #[arg(long, global = true)]
    log_only: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Liked songs into destination favorites
    Songs,
    /// Followed artists into destination favorites
    Artists,
    /// Saved albums into destination favorites
    Albums,
    /// Recreate playlists on the destination
    Playlists,
    /// Songs, artists, albums and playlists, with combined statistics
    All,
    /// Match a single track and show the query that found it
    Probe {
        name: String,

        /// Credited artist (repeat for several)
        #[arg(long = "artist", required = true)]
        artists: Vec<String>,

        #[arg(long)]
        album: Option<String>,

        #[arg(long)]
        duration_ms: Option<u64>,
    },
}

fn probe<S, D>(transfer: &Transfer<'_, S, D>, destination: &str, high_confidence: f64, track: &TrackDescriptor)
where
    S: SourceCatalog + ?Sized,
    D: DestinationCatalog + ?Sized,
{
    println!("\nProbe: {} - {}", track.name, track.artist_string());
    println!("{:-<80}", "");

    match transfer.match_track(track) {
        Some(found) => {
            let candidate = &found.candidate;
            println!(
                "{} {} - {} [{}]",
                confidence_marker(found.confidence, high_confidence),
                candidate.name,
                candidate.artist_name,
                candidate.id
            );
            if let Some(album) = &candidate.album_name {
                println!("  Album: {}", album);
            }
            println!("  Confidence: {:.0}%", found.confidence * 100.0);
            println!("  Query: {}", found.query_used);
        }
        None => println!("❌ No match found on {}", destination),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    set_log_only(args.log_only);

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &args.output_dir {
        config.transfer.output_dir = dir.clone();
    }

    let source = JsonLibrary::load(&args.source)
        .with_context(|| format!("Failed to load library export {}", args.source.display()))?;
    let destination = SnapshotCatalog::load(&args.destination)
        .with_context(|| format!("Failed to load destination snapshot {}", args.destination.display()))?;
    println!("Source: {} ({})", source.name(), args.source.display());
    println!("Destination: {} ({})", destination.name(), args.destination.display());

    let transfer = Transfer::new(&source, &destination, &config);

    let category = match args.command {
        Command::Probe {
            name,
            artists,
            album,
            duration_ms,
        } => {
            let artist_refs: Vec<&str> = artists.iter().map(String::as_str).collect();
            let mut track = TrackDescriptor::new(&name, &artist_refs);
            track.album = album;
            track.duration_ms = duration_ms;
            probe(
                &transfer,
                destination.name(),
                config.matching.track_high_confidence,
                &track,
            );
            return Ok(());
        }
        Command::Songs => Some(Category::Songs),
        Command::Artists => Some(Category::Artists),
        Command::Albums => Some(Category::Albums),
        Command::Playlists => Some(Category::PlaylistTracks),
        Command::All => None,
    };

    // Safety check: never overwrite either input with the applied snapshot
    let applied = args
        .applied
        .clone()
        .unwrap_or_else(|| default_applied_path(&args.destination));
    validate_output_path(&applied, APPLIED_MARKER, &[&args.source, &args.destination])?;

    let start = Instant::now();
    let mut session = TransferSession::new();
    match category {
        Some(category) => {
            transfer.run(category, &mut session);
        }
        None => {
            transfer.run_everything(&mut session);
        }
    }

    destination
        .save(&applied)
        .with_context(|| format!("Failed to save applied snapshot {}", applied.display()))?;
    println!("\n💾 Applied snapshot saved: {}", applied.display());

    if let Some(path) = &args.stats {
        session
            .stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats {}", path.display()))?;
        println!("📊 Stats written: {}", path.display());
    }

    info!(
        imported = session.stats.total_imported(),
        failed = session.stats.total_failed,
        elapsed = %format_duration(start.elapsed()),
        "Transfer finished"
    );
    Ok(())
}
