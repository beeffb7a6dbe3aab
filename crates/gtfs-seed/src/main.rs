use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gtfs_seed_core::pipeline::{build_snapshot, BuildOptions};
use gtfs_seed_feed::FeedArchive;
use tracing_subscriber::EnvFilter;

mod fetch;

#[derive(Parser, Debug)]
#[command(author, version, about = "GTFS seed snapshot builder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the seed snapshot from a GTFS feed
    Build(BuildArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// URL of the GTFS ZIP archive (falls back to GTFS_FEED_URL)
    #[arg(long, conflicts_with = "archive")]
    url: Option<String>,

    /// Read the GTFS ZIP from a local file instead of downloading
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Where to publish the finished snapshot
    #[arg(long, default_value = "assets/gtfs/gtfs_seed.sqlite")]
    output: PathBuf,

    /// Version label recorded in the snapshot metadata
    #[arg(long)]
    feed_version: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Build(args) => build(args).await,
    }
}

async fn build(args: BuildArgs) -> Result<()> {
    let bytes = match (&args.archive, args.url) {
        (Some(path), _) => std::fs::read(path)
            .with_context(|| format!("failed to read archive {}", path.display()))?,
        (None, url) => {
            let url = match url {
                Some(url) => url,
                None => std::env::var("GTFS_FEED_URL")
                    .context("either --url, --archive, or GTFS_FEED_URL must be set")?,
            };
            fetch::download_feed(&url).await?
        }
    };

    let mut feed = FeedArchive::from_bytes(bytes).context("failed to open GTFS archive")?;
    let report = build_snapshot(
        &mut feed,
        &BuildOptions {
            output_path: args.output,
            feed_version: args.feed_version,
        },
    )
    .await
    .context("snapshot build failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
