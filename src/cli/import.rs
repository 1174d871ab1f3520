use std::path::PathBuf;

use crate::cli::imports::print_report;
use crate::cli::open_db;
use crate::error::{FinnError, Result};
use crate::importer::{import_file, ImportResult, ImporterRegistry};
use crate::job::ImportStatus;

pub fn run(file: &str, account: &str, force: bool) -> Result<()> {
    let file_path = PathBuf::from(file);
    let (settings, mut conn) = open_db()?;
    let registry = ImporterRegistry::with_defaults();

    let result = import_file(
        &mut conn,
        &registry,
        &settings.mappings_dir(),
        &file_path,
        account,
        force,
    )?;

    match result {
        ImportResult::Duplicate(previous) => {
            println!(
                "This file was already imported into {account} (import #{previous}). \
                 Use --force to import it again."
            );
            Ok(())
        }
        ImportResult::Finished(job) => {
            print_report(&job);
            if job.status == ImportStatus::Error {
                return Err(FinnError::Other(format!("import #{} failed", job.id)));
            }
            Ok(())
        }
    }
}
