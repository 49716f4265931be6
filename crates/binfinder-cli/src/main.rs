use std::path::PathBuf;

use anyhow::Context;
use binfinder_client::BinsClient;
use binfinder_core::{load_bins_file, BoundingBox, Coordinate, ProximityResolver};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod simulate;

#[derive(Debug, Parser)]
#[command(name = "binfinder-cli")]
#[command(about = "Nearest-bin finder: simulation and backend tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a sensor track through the host and renderer bridge
    Simulate {
        /// YAML track file (fixes, failures, nudges)
        #[arg(long)]
        track: PathBuf,
        /// YAML bins file; bins are fetched from the backend when omitted
        #[arg(long)]
        bins: Option<PathBuf>,
        /// Report every marker reconciliation from the renderer
        #[arg(long)]
        debug_overlay: bool,
    },
    /// Resolve the nearest bin to a point once
    Nearest {
        /// YAML bins file
        #[arg(long)]
        bins: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
    /// Fetch bins around a point from the backend
    Fetch {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Print the bins as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Report a new bin at a point
    Add {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = binfinder_core::load_app_config().context("failed to load configuration")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Simulate {
            track,
            bins,
            debug_overlay,
        }) => {
            simulate::run_simulation(&config, &track, bins.as_deref(), debug_overlay).await?;
        }
        Some(Commands::Nearest { bins, lat, lng }) => {
            let at = Coordinate::new(lat, lng)?;
            let bins = load_bins_file(&bins)?.to_bins()?;
            let resolver = ProximityResolver::new(config.proximity_settings());
            let proximity = resolver.resolve(&bins, Some(at));
            for entry in &proximity.annotated {
                match entry.distance {
                    Some(d) => println!("{:>6}  {d:>8.1} m", entry.id()),
                    None => println!("{:>6}  out of range", entry.id()),
                }
            }
            match resolver.summarize(&proximity) {
                Some(summary) => {
                    println!("nearest: bin {} ({})", summary.bin_id, summary.describe());
                }
                None => println!("no bin within range of {at}"),
            }
        }
        Some(Commands::Fetch { lat, lng, json }) => {
            let at = Coordinate::new(lat, lng)?;
            let client = BinsClient::new(&config)?;
            let area = BoundingBox::around(at, config.fetch_span_degrees);
            let bins = client.fetch_bins(&area).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&bins)?);
            } else {
                for bin in &bins {
                    let status = match (bin.is_listed(), bin.is_moderated()) {
                        (false, _) => "hidden",
                        (true, false) => "pending",
                        (true, true) => "listed",
                    };
                    println!("{:>6}  {}  {status}", bin.id, bin.coordinate);
                }
                println!("{} bins", bins.len());
            }
        }
        Some(Commands::Add { lat, lng }) => {
            let at = Coordinate::new(lat, lng)?;
            let client = BinsClient::new(&config)?;
            let bin = client.create_bin(at).await?;
            println!("created bin {} at {}", bin.id, bin.coordinate);
        }
        None => println!("binfinder-cli ready; see --help"),
    }

    Ok(())
}
