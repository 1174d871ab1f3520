pub mod accounts;
pub mod import;
pub mod imports;
pub mod init;
pub mod refs;
pub mod status;
pub mod transactions;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::{FinnError, Result};
use crate::settings::{load_settings, Settings};

/// Open the configured database, or explain how to create one.
pub(crate) fn open_db() -> Result<(Settings, Connection)> {
    let settings = load_settings();
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(FinnError::Settings(format!(
            "No database found at {}\nRun `finn init` to create one.",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    Ok((settings, conn))
}

#[derive(Parser)]
#[command(
    name = "finn",
    version,
    about = "Import bank CSV exports into typed transactions using per-account column mappings."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory, create it and initialize the database.
    Init {
        /// Path for finn data (default: ~/Documents/finn)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Import a CSV file into an account using the account's mapping.
    Import {
        /// Path to the CSV file
        file: String,
        /// Account name to import into
        #[arg(long)]
        account: String,
        /// Import even if identical data was already imported
        #[arg(long)]
        force: bool,
    },
    /// Inspect and replay import jobs.
    Imports {
        #[command(subcommand)]
        command: ImportsCommands,
    },
    /// List transactions.
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// List categories, projects or contacts.
    Refs {
        /// One of: categories, projects, contacts
        kind: String,
    },
    /// Show settings, database location and row counts.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        /// Account name; the mapping file is <mappings dir>/<name>.json
        name: String,
        /// Account number at the institution
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "CAD")]
        currency: String,
        /// Importer kind key
        #[arg(long, default_value = "CSV")]
        importer: String,
        /// Balance before the first imported statement
        #[arg(long = "opening-balance", allow_hyphen_values = true)]
        opening_balance: Option<f64>,
        /// Date of the opening balance: YYYY-MM-DD (default: today)
        #[arg(long = "opening-date", requires = "opening_balance")]
        opening_date: Option<String>,
    },
    /// List all accounts with balances.
    List,
}

#[derive(Subcommand)]
pub enum ImportsCommands {
    /// List import jobs, newest first.
    List {
        #[arg(long)]
        account: Option<String>,
    },
    /// Show one import job with its error log.
    Show {
        id: i64,
        /// Also print the stored file content
        #[arg(long)]
        data: bool,
    },
    /// Run the stored data of a job again as a new job.
    Replay { id: i64 },
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// List recent transactions.
    List {
        #[arg(long)]
        account: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}
