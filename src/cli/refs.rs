use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::{FinnError, Result};
use crate::resolver::{list_references, RefKind};

pub fn list(kind: &str) -> Result<()> {
    let kind = RefKind::parse(kind).ok_or_else(|| {
        FinnError::Other(format!(
            "Unknown reference kind '{kind}'. Use categories, projects or contacts."
        ))
    })?;
    let (_settings, conn) = open_db()?;
    let refs = list_references(&conn, kind)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Description", "Created for", "Txns"]);
    for r in &refs {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(&r.name),
            Cell::new(r.description.as_deref().unwrap_or_default()),
            Cell::new(r.account.as_deref().unwrap_or_default()),
            Cell::new(r.transactions),
        ]);
    }
    println!("{}\n{table}", kind.table());
    Ok(())
}
