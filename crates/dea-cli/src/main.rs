mod report;

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use dea_engine::{Engine, ExcludedUnit, PeerSet, ResultRow, ResultTable, Unit};
use dea_solver::Solver;
use serde::Serialize;
use tracing::info;

use report::{CategorySummary, Target};

#[derive(Parser)]
#[command(name = "dea")]
#[command(about = "Data Envelopment Analysis efficiency scoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every unit under CRS and VRS and print the ranked table
    Score {
        /// JSON array of {name, code, output, input} records
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
        /// Only show the N most and N least efficient units
        #[arg(long)]
        top: Option<usize>,
        /// Show output targets and inefficiency categories
        #[arg(short, long)]
        targets: bool,
        /// Simplex pivot limit per program
        #[arg(long, default_value_t = 10000)]
        max_iterations: usize,
        /// Simplex comparison tolerance
        #[arg(long, default_value_t = 1e-9)]
        tolerance: f64,
        /// Solve programs one at a time
        #[arg(long)]
        sequential: bool,
    },
    /// Validate a units file without solving
    Check {
        /// JSON array of {name, code, output, input} records
        file: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<&'a [ResultRow]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    most_efficient: Option<Vec<&'a ResultRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    least_efficient: Option<Vec<&'a ResultRow>>,
    excluded: &'a [ExcludedUnit],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    targets: Vec<Target>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    categories: Vec<CategorySummary>,
}

fn main() {
    // Respects RUST_LOG, logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            file,
            format,
            top,
            targets,
            max_iterations,
            tolerance,
            sequential,
        } => {
            let units = read_units(&file);

            let solver = Solver::new()
                .with_max_iterations(max_iterations)
                .with_tolerance(tolerance);
            let engine = Engine::new(solver).with_parallel(!sequential);

            let table = match engine.compute_scores_from(units) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let targets = if targets { report::targets(&table) } else { Vec::new() };

            match format {
                Format::Json => print_json(&table, top, targets),
                Format::Table => print_table(&table, top, &targets),
            }
        }
        Commands::Check { file } => {
            let units = read_units(&file);
            match PeerSet::new(units) {
                Ok(peers) => {
                    info!(units = peers.len(), "peer set is valid");
                    println!("✓ {} is valid", file.display());
                    println!("  {} units", peers.len());
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn read_units(file: &Path) -> Vec<Unit> {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::from_str(&source) {
        Ok(units) => units,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_json(table: &ResultTable, top: Option<usize>, targets: Vec<Target>) {
    let categories = report::summarize(&targets);
    let (rows, most_efficient, least_efficient) = match top {
        Some(n) => {
            let (most, least) = report::top_and_bottom(table, n);
            (None, Some(most), Some(least))
        }
        None => (Some(table.rows.as_slice()), None, None),
    };

    let out = JsonReport {
        rows,
        most_efficient,
        least_efficient,
        excluded: &table.excluded,
        targets,
        categories,
    };

    match serde_json::to_string_pretty(&out) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing results: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_table(table: &ResultTable, top: Option<usize>, targets: &[Target]) {
    match top {
        Some(n) => {
            let (most, least) = report::top_and_bottom(table, n);
            println!("Most efficient:");
            print_rows(&most);
            println!();
            println!("Least efficient:");
            print_rows(&least);
        }
        None => {
            let rows: Vec<&ResultRow> = table.rows.iter().collect();
            print_rows(&rows);
        }
    }

    if !table.excluded.is_empty() {
        println!();
        println!("Excluded (score could not be determined):");
        for unit in &table.excluded {
            println!("  {:30} CRS: {:?}  VRS: {:?}", unit.name, unit.crs, unit.vrs);
        }
    }

    if !targets.is_empty() {
        println!();
        println!("Output targets:");
        println!(
            "  {:30} {:>8} {:>10} {:>9} {:>9}  {}",
            "Unit", "Output", "Required", "Increase", "Pct", "Category"
        );
        for t in targets {
            println!(
                "  {:30} {:8.2} {:10.2} {:9.2} {:8.1}%  {}",
                t.name, t.output, t.required_output, t.increase, t.percent_increase, t.category
            );
        }

        println!();
        println!("Categories:");
        for summary in report::summarize(targets) {
            println!(
                "  {:10} {:5} units  mean output {:5.2} -> {:5.2} (+{:.2})",
                summary.category.to_string(),
                summary.units,
                summary.mean_output,
                summary.mean_required_output,
                summary.mean_increase
            );
        }
    }
}

fn print_rows(rows: &[&ResultRow]) {
    println!(
        "  {:30} {:>12} {:>8} {:>10} {:>7} {:>7} {:>7}  {}",
        "Unit", "Code", "Output", "Input", "CRS", "VRS", "Scale", "Peers"
    );
    for row in rows {
        println!(
            "  {:30} {:>12} {:8.2} {:10.2} {:7.4} {:7.4} {:7.4}  {}",
            row.name,
            row.code,
            row.output,
            row.input,
            row.crs,
            row.vrs,
            row.scale,
            row.crs_peers.join(", ")
        );
    }
}
