mod builder;
mod cli;
mod convert;
mod db;
mod error;
mod fmt;
mod importer;
mod job;
mod mapping;
mod models;
mod resolver;
mod rules;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{AccountsCommands, Cli, Commands, ImportsCommands, TransactionsCommands};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("finn=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                name,
                number,
                description,
                currency,
                importer,
                opening_balance,
                opening_date,
            } => cli::accounts::add(cli::accounts::NewAccount {
                name: &name,
                number: number.as_deref(),
                description: description.as_deref(),
                currency: &currency,
                importer: &importer,
                opening_balance,
                opening_date: opening_date.as_deref(),
            }),
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Import {
            file,
            account,
            force,
        } => cli::import::run(&file, &account, force),
        Commands::Imports { command } => match command {
            ImportsCommands::List { account } => cli::imports::list(account.as_deref()),
            ImportsCommands::Show { id, data } => cli::imports::show(id, data),
            ImportsCommands::Replay { id } => cli::imports::replay(id),
        },
        Commands::Transactions { command } => match command {
            TransactionsCommands::List { account, limit } => {
                cli::transactions::list(account.as_deref(), limit)
            }
        },
        Commands::Refs { kind } => cli::refs::list(&kind),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
