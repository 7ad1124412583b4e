mod config;
mod db;
mod fetch;
mod parser;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use config::{DocumentKind, Settings};
use parser::extract::projects::ProjectRecord;
use parser::extract::trip::TripRecord;
use parser::normalize::display_text;
use parser::{Extracted, SectionLabels};

#[derive(Parser)]
#[command(name = "portfolio_content", about = "Extracts portfolio records from markdown content")]
struct Cli {
    /// Config file (without extension); defaults to ./portfolio
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register configured sources
    Init,
    /// Retrieve unfetched sources
    Fetch {
        /// Max documents to fetch (default: all unfetched)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Fetch every source again, including ones fetched before
        #[arg(long)]
        refresh: bool,
    },
    /// Extract records from fetched documents
    Process {
        /// Max documents to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Init + fetch + process in one pipeline
    Run {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show pipeline statistics
    Stats,
    /// Project table
    Projects {
        /// Only projects in this language
        #[arg(short, long)]
        language: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show the stored trip
    Trip,
    /// Write stored records as JSON for the site
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Parse a local file directly and print its records as JSON
    Parse {
        /// projects or travel
        kind: DocumentKind,
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct Export {
    projects: Vec<ProjectRecord>,
    trip: Option<TripRecord>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let labels = SectionLabels::from(&settings);

    let result = match cli.command {
        Commands::Init => {
            let conn = open_store(&settings)?;
            let inserted = db::insert_sources(&conn, &settings.sources)?;
            println!(
                "Registered {} new sources ({} configured)",
                inserted,
                settings.sources.len()
            );
            Ok(())
        }
        Commands::Fetch { limit, refresh } => {
            let conn = open_store(&settings)?;
            if refresh {
                let n = db::reset_fetched(&conn)?;
                info!("Marked {} documents for refetch", n);
            }
            let docs = db::fetch_unfetched(&conn, limit)?;
            if docs.is_empty() {
                println!("No unfetched documents. Run 'init' first or use --refresh.");
                return Ok(());
            }
            println!("Fetching {} documents...", docs.len());
            let stats = fetch::fetch_documents_streaming(&conn, docs, &fetch_options(&settings)).await?;
            println!(
                "Done: {} fetched ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = open_store(&settings)?;
            let docs = db::fetch_unprocessed(&conn, limit)?;
            if docs.is_empty() {
                println!("No unprocessed documents. Run 'fetch' first.");
                return Ok(());
            }
            println!("Processing {} documents...", docs.len());
            let counts = process_documents(&conn, &docs, &labels)?;
            counts.print();
            Ok(())
        }
        Commands::Run { limit } => {
            let conn = open_store(&settings)?;
            db::insert_sources(&conn, &settings.sources)?;
            let docs = db::fetch_unfetched(&conn, limit)?;

            let t_fetch = Instant::now();
            if !docs.is_empty() {
                println!("Pipeline: fetching {} documents...", docs.len());
                let stats =
                    fetch::fetch_documents_streaming(&conn, docs, &fetch_options(&settings)).await?;
                println!(
                    "Fetched {} documents ({} ok, {} errors) in {:.1}s",
                    stats.total,
                    stats.ok,
                    stats.errors,
                    t_fetch.elapsed().as_secs_f64()
                );
            }

            let unprocessed = db::fetch_unprocessed(&conn, None)?;
            if unprocessed.is_empty() {
                println!("Nothing to process.");
                return Ok(());
            }
            println!("Processing {} documents...", unprocessed.len());
            let counts = process_documents(&conn, &unprocessed, &labels)?;
            counts.print();
            Ok(())
        }
        Commands::Stats => {
            let conn = open_store(&settings)?;
            let s = db::get_stats(&conn)?;
            println!("Documents: {}", s.documents);
            println!("Fetched:   {}", s.fetched);
            println!("Unfetched: {}", s.unfetched);
            println!("Errors:    {}", s.fetch_errors);
            println!("Processed: {}", s.processed);
            println!("Projects:  {}", s.projects);
            println!("Trips:     {}", s.trips);
            Ok(())
        }
        Commands::Projects { language, limit } => {
            let conn = open_store(&settings)?;
            let rows: Vec<ProjectRecord> = db::latest_projects(&conn)?
                .into_iter()
                .filter(|p| language.as_deref().map_or(true, |l| p.language.eq_ignore_ascii_case(l)))
                .take(limit)
                .collect();
            if rows.is_empty() {
                println!("No projects found.");
                return Ok(());
            }

            println!("{:>3} | {:<24} | {:<12} | {:<50}", "#", "Project", "Language", "Description");
            println!("{}", "-".repeat(98));
            for (i, p) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<24} | {:<12} | {:<50}",
                    i + 1,
                    truncate(&p.title, 24),
                    truncate(or_dash(&p.language), 12),
                    truncate(or_dash(&p.description), 50)
                );
            }
            println!("\n{} projects", rows.len());
            Ok(())
        }
        Commands::Trip => {
            let conn = open_store(&settings)?;
            match db::latest_trip(&conn)? {
                Some(trip) => print_trip(&trip),
                None => println!("No trip found (missing trip name or start date?)."),
            }
            Ok(())
        }
        Commands::Export { out } => {
            let conn = open_store(&settings)?;
            let export = Export {
                projects: db::latest_projects(&conn)?,
                trip: db::latest_trip(&conn)?,
            };
            let json = serde_json::to_string_pretty(&export)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Exported {} projects to {}", export.projects.len(), path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        Commands::Parse { kind, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let json = match parser::extract_text(kind, &text, &labels) {
                Extracted::Projects(projects) => serde_json::to_string_pretty(&projects)?,
                Extracted::Trip(trip) => serde_json::to_string_pretty(&trip)?,
            };
            println!("{}", json);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn open_store(settings: &Settings) -> anyhow::Result<rusqlite::Connection> {
    let conn = db::connect(&settings.database_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn fetch_options(settings: &Settings) -> fetch::FetchOptions {
    fetch::FetchOptions {
        concurrency: settings.concurrency,
        max_retries: settings.max_retries,
    }
}

struct ProcessCounts {
    documents: usize,
    projects: usize,
    trips: usize,
    incomplete_trips: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} documents: {} projects, {} trips ({} travel documents without a complete trip).",
            self.documents, self.projects, self.trips, self.incomplete_trips,
        );
    }
}

fn process_documents(
    conn: &rusqlite::Connection,
    docs: &[db::FetchedDocument],
    labels: &SectionLabels,
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        documents: 0,
        projects: 0,
        trips: 0,
        incomplete_trips: 0,
    };

    for chunk in docs.chunks(100) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|doc| parser::process_document(doc, labels))
            .collect();

        for (doc, processed) in chunk.iter().zip(&results) {
            match &processed.extracted {
                Extracted::Projects(p) => {
                    info!("{}: {} projects", doc.location, p.len());
                    counts.projects += p.len();
                }
                Extracted::Trip(Some(t)) => {
                    info!("{}: trip '{}'", doc.location, t.name);
                    counts.trips += 1;
                }
                Extracted::Trip(None) => {
                    info!("{}: no complete trip", doc.location);
                    counts.incomplete_trips += 1;
                }
            }
        }

        counts.documents += results.len();
        db::save_processed(conn, &results)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn print_trip(trip: &TripRecord) {
    let or_unknown = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
    println!("Trip:      {}", display_text(&trip.name));
    println!("Started:   {}", trip.start_date);
    if let Some(end) = trip.end_date() {
        println!("Ended:     {}", end);
    }
    println!("Duration:  {} days", or_unknown(trip.duration));
    println!("Locations: {}", or_unknown(trip.locations));
    println!("Distance:  {}", trip.distance.as_deref().unwrap_or("-"));
    let countries: Vec<String> = trip.countries.iter().map(|c| display_text(c)).collect();
    println!("Countries: {}", if countries.is_empty() { "-".into() } else { countries.join(", ") });
    if let Some(summary) = &trip.summary {
        println!("\n{}", summary);
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
