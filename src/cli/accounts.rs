use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::{account_summaries, add_account, add_opening_balance};
use crate::error::{FinnError, Result};
use crate::fmt::amount;

pub struct NewAccount<'a> {
    pub name: &'a str,
    pub number: Option<&'a str>,
    pub description: Option<&'a str>,
    pub currency: &'a str,
    pub importer: &'a str,
    pub opening_balance: Option<f64>,
    pub opening_date: Option<&'a str>,
}

pub fn add(new: NewAccount) -> Result<()> {
    let (settings, conn) = open_db()?;
    let opening_date = match new.opening_date {
        Some(raw) => chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| FinnError::Other(format!("Invalid --opening-date '{raw}': {e}")))?,
        None => chrono::Local::now().date_naive(),
    };
    let currency = new.currency.trim().to_uppercase();
    let account = add_account(
        &conn,
        new.name,
        new.number,
        new.description,
        &currency,
        new.importer,
    )?;
    println!("Added account: {}", account.name);
    if let Some(balance) = new.opening_balance {
        add_opening_balance(&conn, &account, balance, opening_date)?;
        println!(
            "Opening balance {} on {opening_date}",
            amount(balance, &account.currency)
        );
    }
    let mapping = crate::mapping::mapping_path(&settings.mappings_dir(), &account.name);
    if !mapping.exists() {
        println!("Create {} before importing.", mapping.display());
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let (_settings, conn) = open_db()?;
    let summaries = account_summaries(&conn)?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Name", "Number", "Importer", "Txns", "Out", "In", "Balance",
    ]);
    for s in &summaries {
        let ccy = &s.account.currency;
        let balance = amount(s.balance, ccy);
        let balance = if s.balance < 0.0 {
            balance.red().to_string()
        } else {
            balance
        };
        table.add_row(vec![
            Cell::new(s.account.id),
            Cell::new(&s.account.name),
            Cell::new(s.account.number.as_deref().unwrap_or_default()),
            Cell::new(&s.account.importer),
            Cell::new(s.transactions),
            Cell::new(amount(s.debit, ccy)),
            Cell::new(amount(s.credit, ccy)),
            Cell::new(balance),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
