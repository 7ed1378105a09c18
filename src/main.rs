//! # Archive Harvest
//!
//! Collects plain-text corpora from two sources:
//!
//! - **Presidency archive**: pages through the article archive of gob.mx and
//!   stores every transcript ("versión estenográfica") as a text file
//! - **Video channel**: lists a channel's playlists and videos through the
//!   YouTube Data API and stores video descriptions and comment threads
//!
//! ## Usage
//!
//! ```sh
//! archive_harvest archive -o ./Data_v3
//! YOUTUBE_API_KEY=... archive_harvest youtube -o ./Data --output all
//! ```
//!
//! ## Architecture
//!
//! Every listing is consumed through the same bounded cursor harvester:
//! 1. **Fetching**: a page-fetch closure bound to one listing, wrapped with retries
//! 2. **Harvesting**: pages are requested one after another until the listing
//!    ends or the page cap is reached
//! 3. **Normalizing**: titles become deterministic file names
//! 4. **Output**: records are written below the output directory

use clap::Parser;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use archive_harvest::config::Settings;
use archive_harvest::fetch::BoxError;
use archive_harvest::{pipeline, scrapers};
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("archive_harvest starting up");

    let args = Cli::parse();
    let mut settings = Settings::load(args.config.as_deref()).await?;
    let http = scrapers::http_client(&settings.http)?;

    let outcome = match &args.command {
        Command::Archive(archive_args) => {
            archive_args.apply(&mut settings.archive);
            pipeline::run_archive(http, &settings, &archive_args.output_dir)
                .await
                .map(|report| info!(files = report.files.len(), "Archive run complete"))
        }
        Command::Youtube(youtube_args) => {
            youtube_args.apply(&mut settings.youtube);
            pipeline::run_youtube(http, &settings, &youtube_args.channel_run())
                .await
                .map(|report| {
                    info!(
                        playlists = report.playlists.len(),
                        descriptions = report.descriptions_written,
                        comments = report.comment_files.len(),
                        "Channel run complete"
                    )
                })
        }
    };

    if let Err(e) = outcome {
        error!(error = %e, "Harvest failed");
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}
