#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the OSM document toolchain.
//!
//! `shape` converts an OSM XML extract into JSON lines ready for
//! `mongoimport`; the remaining subcommands are read-only audits of the
//! same input.
//!
//! Uses `indicatif-log-bridge` (via [`osm_docs_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal. The `shape` run
//! summary goes to stderr since stdout may carry the documents.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use osm_docs_cli_utils::{IndicatifProgress, MultiProgress};
use osm_docs_normalize::files::{self, Input};
use osm_docs_normalize::{
    DocumentShaper, NormalizeError, Pipeline, RunSummary, audit, load_street_normalizer,
};

#[derive(Parser)]
#[command(name = "osm_docs", about = "OpenStreetMap XML to document normalization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shape nodes and ways into JSON documents, one per line
    Shape {
        /// OSM XML input (`.osm`, `.osm.gz`, or `-` for stdin)
        input: PathBuf,
        /// Output file. Defaults to stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// TOML file overriding the built-in street tables
        #[arg(long)]
        street_tables: Option<PathBuf>,
    },
    /// Count every element name in the document
    Count {
        /// OSM XML input
        input: PathBuf,
    },
    /// Tally tag key categories on nodes and ways
    Keys {
        /// OSM XML input
        input: PathBuf,
    },
    /// List street names whose type is not in the expected list
    Streets {
        /// OSM XML input
        input: PathBuf,
        /// TOML file overriding the built-in street tables
        #[arg(long)]
        street_tables: Option<PathBuf>,
    },
    /// Count unique contributors (`uid`)
    Users {
        /// OSM XML input
        input: PathBuf,
        /// Print every user id, not just the count
        #[arg(long)]
        list: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = osm_docs_cli_utils::init_logger();
    let cli = Cli::parse();

    run(cli.command, &multi)?;

    Ok(())
}

fn run(command: Commands, multi: &MultiProgress) -> Result<(), NormalizeError> {
    match command {
        Commands::Shape {
            input,
            output,
            street_tables,
        } => {
            let streets = load_street_normalizer(street_tables.as_deref())?;
            let Input { reader, len } = files::open_input(&input)?;
            let sink = files::open_output(output.as_deref())?;

            log::info!("Shaping {}", input.display());
            let progress = IndicatifProgress::bytes_bar(multi, "Shaping", len);
            let summary = Pipeline::new(DocumentShaper::new(streets))
                .with_progress(progress)
                .run(reader, sink)?;

            print_summary(&summary);
        }
        Commands::Count { input } => {
            let counts = audit::count_elements(open(&input)?)?;
            println!("{:<20} {:>12}", "Element", "Count");
            for (name, count) in &counts {
                println!("{name:<20} {count:>12}");
            }
        }
        Commands::Keys { input } => {
            let counts = audit::audit_keys(open(&input)?)?;
            println!("{:<20} {:>12}", "Category", "Keys");
            for (category, count) in &counts {
                println!("{:<20} {count:>12}", category.to_string());
            }
        }
        Commands::Streets {
            input,
            street_tables,
        } => {
            let streets = load_street_normalizer(street_tables.as_deref())?;
            let unexpected = audit::audit_streets(open(&input)?, &streets)?;
            if unexpected.is_empty() {
                println!("All street types are expected.");
            }
            for (street_type, names) in &unexpected {
                println!("{street_type} ({})", names.len());
                for name in names {
                    let normalized = streets.normalize(name);
                    if normalized == *name {
                        println!("  {name}");
                    } else {
                        println!("  {name} => {normalized}");
                    }
                }
            }
        }
        Commands::Users { input, list } => {
            let users = audit::unique_users(open(&input)?)?;
            if list {
                for uid in &users {
                    println!("{uid}");
                }
            }
            println!("{} unique users", users.len());
        }
    }

    Ok(())
}

fn open(path: &Path) -> Result<Box<dyn std::io::BufRead>, files::FilesError> {
    log::info!("Reading {}", path.display());
    Ok(files::open_input(path)?.reader)
}

fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!("{:<24} {:>12}", "Elements read", summary.elements_read);
    eprintln!("{:<24} {:>12}", "Documents written", summary.documents_written);
    eprintln!("{:<24} {:>12}", "Unique users", summary.unique_users);

    for (name, count) in &summary.ignored {
        eprintln!("{:<24} {count:>12}", format!("Ignored <{name}>"));
    }
    for (reason, count) in &summary.skipped {
        eprintln!("{:<24} {count:>12}", format!("Skipped ({reason})"));
    }
    for (reason, count) in &summary.dropped {
        eprintln!("{:<24} {count:>12}", format!("Dropped ({reason})"));
    }
    for (category, count) in &summary.key_categories {
        eprintln!("{:<24} {count:>12}", format!("Keys ({category})"));
    }

    eprintln!(
        "{:<24} {:>11.1}s",
        "Elapsed",
        summary.duration.as_secs_f64()
    );
}
