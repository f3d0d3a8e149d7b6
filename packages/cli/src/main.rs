#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the estate map toolchain.
//!
//! `fetch` pulls a lookback window of transactions for a parent area from
//! a government API and writes them to disk; `analyze` runs the trend
//! aggregation over such a file for one sub-area and prints the result as
//! JSON or as plain-text tables.

mod report;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use estate_map_analytics::{analyze_at, build_periods};
use estate_map_cli_utils::IndicatifProgress;
use estate_map_source::source_def::{FieldMapping, SourceDefinition, parse_source_toml};
use estate_map_source::{FetchOptions, fetch, file, registry};
use estate_map_transaction_models::{SizeCategory, YearMonth};

#[derive(Parser)]
#[command(name = "estate_map", about = "Real-estate transaction trend toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch transactions for a parent area and write them to a file
    Fetch {
        /// Parent area code sent to the API (e.g., "11680")
        #[arg(long)]
        area_code: String,
        /// Number of deal months to fetch, counting back from the reference month
        #[arg(long, default_value_t = 36)]
        months: usize,
        /// Embedded source identifier (see `sources`)
        #[arg(long, default_value = registry::DEFAULT_SOURCE_ID)]
        source: String,
        /// Load the source definition from a TOML file instead
        #[arg(long)]
        source_file: Option<PathBuf>,
        /// Newest deal month (YYYY-MM). Defaults to the current month.
        #[arg(long)]
        reference: Option<YearMonth>,
        /// Output file (.json or .csv)
        #[arg(long)]
        output: PathBuf,
    },
    /// Aggregate transactions from a file into trend series for a sub-area
    Analyze {
        /// Input file (.json or .csv)
        #[arg(long)]
        input: PathBuf,
        /// Sub-area (neighborhood) name, matched exactly
        #[arg(long)]
        sub_area: String,
        /// Reference month (YYYY-MM) the newest period ends at. Defaults to the current month.
        #[arg(long)]
        reference: Option<YearMonth>,
        /// Read raw API rows using this source's field names instead of the
        /// normalized layout written by `fetch`
        #[arg(long)]
        source: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the period labels for a reference month
    Periods {
        /// Reference month (YYYY-MM). Defaults to the current month.
        #[arg(long)]
        reference: Option<YearMonth>,
    },
    /// List the size categories
    Categories,
    /// List the embedded data sources
    Sources,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

fn load_source(
    id: &str,
    source_file: Option<&PathBuf>,
) -> Result<SourceDefinition, Box<dyn std::error::Error>> {
    let Some(path) = source_file else {
        return Ok(registry::find_source(id)?);
    };
    let text = std::fs::read_to_string(path)?;
    let source = parse_source_toml(&text)?;
    log::info!("Loaded source '{}' from {}", source.id, path.display());
    Ok(source)
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = estate_map_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            area_code,
            months,
            source,
            source_file,
            reference,
            output,
        } => {
            let source = load_source(&source, source_file.as_ref())?;
            let options = FetchOptions {
                area_code,
                reference: reference.unwrap_or_else(YearMonth::current),
                months,
            };

            let progress = IndicatifProgress::steps_bar(&multi, "Months", months as u64);
            let records = fetch::fetch_transactions(&source, &options, &progress).await?;
            file::save_records(&output, &records)?;
        }
        Commands::Analyze {
            input,
            sub_area,
            reference,
            source,
            format,
            output,
        } => {
            let fields = match source {
                Some(id) => registry::find_source(&id)?.fields,
                None => FieldMapping::canonical(),
            };
            let records = file::load_records(&input, &fields)?;
            let reference = reference.unwrap_or_else(YearMonth::current);
            let result = analyze_at(&records, &sub_area, reference);

            if result.coverage.sub_area_records == 0 {
                log::warn!("No records matched sub-area '{sub_area}'");
            }

            let mut out: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(std::io::stdout().lock()),
            };
            match format {
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut out, &result)?;
                    writeln!(out)?;
                }
                OutputFormat::Table => report::write_table(&mut out, &result)?,
            }
            out.flush()?;
        }
        Commands::Periods { reference } => {
            let reference = reference.unwrap_or_else(YearMonth::current);
            for (i, bucket) in build_periods(reference).iter().enumerate() {
                println!(
                    "{i:>2}  {:<14} {} .. {}",
                    bucket.label, bucket.start, bucket.end
                );
            }
        }
        Commands::Categories => {
            println!("{:<12} RANGE", "LABEL");
            println!("{}", "-".repeat(30));
            for category in SizeCategory::all() {
                let (lower, upper) = category.bounds();
                match upper {
                    Some(upper) => println!("{:<12} [{lower}, {upper})", category.as_ref()),
                    None => println!("{:<12} [{lower}, ∞)", category.as_ref()),
                }
            }
        }
        Commands::Sources => {
            let sources = registry::all_sources();
            println!("{:<20} NAME", "ID");
            println!("{}", "-".repeat(50));
            for source in &sources {
                println!("{:<20} {}", source.id, source.name);
            }
        }
    }

    Ok(())
}
