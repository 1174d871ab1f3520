use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::open_db;
use crate::db::list_transactions;
use crate::error::Result;
use crate::fmt::money;
use crate::models::debit_credit;

fn money_cell(val: f64) -> Cell {
    let text = if val == 0.0 { String::new() } else { money(val) };
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn list(account: Option<&str>, limit: usize) -> Result<()> {
    let (_settings, conn) = open_db()?;
    let rows = list_transactions(&conn, account, limit)?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Date", "Account", "Type", "Description", "Out", "In", "Ccy", "Contact", "Category",
        "Project",
    ]);
    for row in &rows {
        let (debit, credit) = debit_credit(row.amount);
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(&row.date),
            Cell::new(&row.account),
            Cell::new(&row.tx_type),
            Cell::new(&row.description),
            money_cell(debit),
            money_cell(credit),
            Cell::new(&row.currency),
            Cell::new(row.contact.as_deref().unwrap_or_default()),
            Cell::new(row.category.as_deref().unwrap_or_default()),
            Cell::new(row.project.as_deref().unwrap_or_default()),
        ]);
    }
    println!("Transactions\n{table}");
    Ok(())
}
