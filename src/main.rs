use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grinds::{export, populate, rank, Nominatim, RateLimited, Store};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

#[derive(Debug, Parser)]
struct Cli {
    /// SQLite database holding resolved coordinates
    #[arg(long, default_value = "restaurants.db")]
    db: PathBuf,

    /// Seconds to wait between geocoder calls
    #[arg(long, default_value_t = 1.0)]
    interval: f64,

    /// User agent sent to Nominatim
    #[arg(long, default_value = "grinds/0.1 (restaurant locator)")]
    user_agent: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Geocode every listed place that is not already in the database
    Populate {
        /// Text file with one place name per line
        #[arg(long, default_value = "restaurants.txt")]
        names: PathBuf,
        /// Region suffix appended to every lookup
        #[arg(long, default_value = "Honolulu, Hawaii")]
        region: String,
    },
    /// List stored places nearest-first from an address
    Rank { address: String },
    /// Write the place list as JSON for the website
    Export {
        #[arg(long, default_value = "restaurants.txt")]
        names: PathBuf,
        #[arg(long, default_value = "restaurants.json")]
        out: PathBuf,
        #[arg(long, default_value = "Honolulu, Hawaii")]
        region: String,
    },
    /// Forget one place so the next populate looks it up again
    Purge { name: String },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let store = Store::open(&cli.db)
        .with_context(|| format!("failed to open {}", cli.db.display()))?;
    let mut geocoder = RateLimited::new(
        Nominatim::new(&cli.user_agent),
        Duration::from_secs_f64(cli.interval),
    );

    match cli.command {
        Command::Populate { names, region } => {
            let names = read_names(&names)?;

            let bar = progress_bar(names.len() as u64);
            let summary = populate(&store, &mut geocoder, &names, &region, |_, message| {
                bar.set_message(message.to_string());
                bar.inc(1);
                true
            })?;
            bar.finish_and_clear();

            let (resolved, sentinels) = store.counts()?;
            info!(
                "{} names: {} found, {} failed, {} already cached; store has {} resolved, {} unresolved",
                summary.total, summary.found, summary.failed, summary.skipped, resolved, sentinels
            );
        }
        Command::Rank { address } => {
            let ranked = rank(&store, &mut geocoder, &address, |_, _| true)?;
            if ranked.is_empty() {
                println!("nothing in the database yet, run populate first");
            }
            for place in &ranked {
                println!("{}: {:.2} miles", place.name, place.miles);
            }
        }
        Command::Export { names, out, region } => {
            let names = read_names(&names)?;
            let entries = export(&store, &names, &region)?;
            write(&out, serde_json::to_string_pretty(&entries)?)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!("wrote {} places to {}", entries.len(), out.display());
        }
        Command::Purge { name } => {
            if store.purge(&name)? {
                println!("purged {name}");
            } else {
                println!("no record for {name}");
            }
        }
    }

    Ok(())
}

fn read_names(path: &Path) -> Result<Vec<String>> {
    let raw = read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|x| !x.is_empty() && !x.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn progress_bar(len: u64) -> ProgressBar {
    ProgressBar::new(len).with_style(
        ProgressStyle::with_template("[{elapsed_precise}] {pos}/{len} {percent}% {msg}")
            .expect("hardcoded"),
    )
}
