use colored::{ColoredString, Colorize};
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::importer::{replay_import, ImporterRegistry};
use crate::job::{ImportJob, ImportStatus};

fn status_label(status: ImportStatus) -> ColoredString {
    match status {
        ImportStatus::Completed => status.as_str().green(),
        ImportStatus::Partial => status.as_str().yellow(),
        ImportStatus::Error => status.as_str().red(),
        _ => status.as_str().normal(),
    }
}

pub fn print_report(job: &ImportJob) {
    println!(
        "Import #{} of {}: {}",
        job.id,
        job.filename,
        status_label(job.status).bold()
    );
    println!(
        "{} rows, {} imported, {} rejected",
        job.counts.total, job.counts.good, job.counts.bad
    );
    if !job.counts.errors.is_empty() {
        println!();
        for line in job.counts.errors.lines() {
            println!("  {line}");
        }
    }
}

pub fn list(account: Option<&str>) -> Result<()> {
    let (_settings, conn) = open_db()?;
    let jobs = ImportJob::list(&conn, account)?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "When", "Account", "File", "Status", "Total", "Good", "Bad",
    ]);
    for (account_name, job) in &jobs {
        table.add_row(vec![
            Cell::new(job.id),
            Cell::new(&job.timestamp),
            Cell::new(account_name),
            Cell::new(&job.filename),
            Cell::new(status_label(job.status)),
            Cell::new(job.counts.total),
            Cell::new(job.counts.good),
            Cell::new(job.counts.bad),
        ]);
    }
    println!("Imports\n{table}");
    Ok(())
}

pub fn show(id: i64, with_data: bool) -> Result<()> {
    let (_settings, conn) = open_db()?;
    let job = ImportJob::load(&conn, id)?;
    let account = crate::db::get_account(&conn, job.account_id)?;
    println!("Account:   {}", account.name);
    println!("When:      {}", job.timestamp);
    println!(
        "Checksum:  {}",
        job.checksum.as_deref().unwrap_or("(none)")
    );
    print_report(&job);
    if !job.status.is_final() {
        println!("(this import never finished)");
    }
    if with_data {
        println!();
        print!("{}", job.data);
        if !job.data.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

pub fn replay(id: i64) -> Result<()> {
    let (settings, mut conn) = open_db()?;
    let registry = ImporterRegistry::with_defaults();
    let job = replay_import(&mut conn, &registry, &settings.mappings_dir(), id)?;
    println!("Replayed import #{id}");
    print_report(&job);
    Ok(())
}
