use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;
use txledger::{
    csv,
    error::Result,
    store::{LedgerStore, Summary},
};

const DEFAULT_DB_PATH: &str = "db/transactions.db";

#[derive(Parser)]
#[command(name = "txledger")]
#[command(about = "Transaction data processing pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load transactions from a CSV file into the ledger
    Load { csv_file: PathBuf },
    /// Show summary statistics for the ledger
    Summary,
}

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run(Cli::parse()) {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Load { csv_file } => {
            let mut store = LedgerStore::open(DEFAULT_DB_PATH)?;
            let transactions = csv::process_file(&csv_file)?;
            store.save(&transactions)?;
            println!("Successfully loaded {} transactions", transactions.len());
        }
        Commands::Summary => {
            let store = LedgerStore::open(DEFAULT_DB_PATH)?;
            print_summary(&store.summarize()?);
        }
    }

    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("\nTransaction Summary:");
    println!("Total Transactions: {}", summary.total_count);
    match summary.date_range {
        Some((min, max)) => println!("Date Range: {min} to {max}"),
        None => println!("Date Range: (none)"),
    }

    println!("\nCategory Statistics:");
    for stat in &summary.category_stats {
        println!("{}:", stat.category);
        println!("  Count: {}", stat.count);
        println!("  Total Amount: {:.2}", stat.total_amount);
        println!("  Average Amount: {:.2}\n", stat.average_amount);
    }
}
