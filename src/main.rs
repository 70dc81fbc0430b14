use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use meter_readings::config::init_tracing;
use meter_readings::{ingest_file, seed_accounts, IngestOptions, OrderingScope, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "meter-readings")]
#[command(about = "Validate and ingest bulk meter reading CSV uploads")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "METER_READINGS_DB", default_value = "meter_readings.db")]
    database: PathBuf,

    /// Enable verbose logging (per-row rejections)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load accounts from a CSV file (AccountId,FirstName,LastName)
    Seed {
        #[arg(value_name = "ACCOUNTS_CSV")]
        accounts_csv: PathBuf,
    },

    /// Validate and store one batch of meter readings
    Ingest {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Also check readings against earlier rows of the same file
        #[arg(long)]
        check_batch_order: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show connection status and row counts
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut store = SqliteStore::open(&cli.database)
        .with_context(|| format!("Failed to open database {:?}", cli.database))?;

    match cli.command {
        Command::Seed { accounts_csv } => {
            let inserted = seed_accounts(&mut store, &accounts_csv)?;
            println!("✓ Seeded {} accounts", inserted);
        }
        Command::Ingest {
            file,
            check_batch_order,
            json,
        } => {
            let ordering = if check_batch_order {
                OrderingScope::IncludeBatch
            } else {
                OrderingScope::StoredOnly
            };
            let options = IngestOptions::new().with_ordering(ordering);

            let report = match ingest_file(&mut store, &file, &options) {
                Ok(report) => report,
                Err(e) if e.is_input_error() => bail!("{}", e),
                Err(e) => return Err(e).context("Batch failed, nothing was stored"),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report.result)?);
            } else {
                println!("✓ Accepted: {} readings", report.accepted());
                println!("✗ Rejected: {} readings", report.rejected());
                for rejection in &report.rejections {
                    println!(
                        "   row {}: {}",
                        rejection.row,
                        rejection.kind.message()
                    );
                }
            }
        }
        Command::Status => {
            let status = store.status();
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
