use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::{FinnError, Result};
use crate::models::{Account, Transaction, TransactionKind, TxType};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    number TEXT,
    description TEXT,
    currency TEXT NOT NULL DEFAULT 'CAD',
    importer TEXT NOT NULL DEFAULT 'CSV',
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    account_id INTEGER,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_name ON categories(name);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    category_id INTEGER,
    account_id INTEGER,
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_projects_name ON projects(name);

CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    interac_address TEXT,
    account_info TEXT,
    category_id INTEGER,
    account_id INTEGER,
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_contacts_name ON contacts(name);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    filename TEXT NOT NULL,
    status TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '',
    total INTEGER NOT NULL DEFAULT 0,
    good INTEGER NOT NULL DEFAULT 0,
    bad INTEGER NOT NULL DEFAULT 0,
    errors TEXT NOT NULL DEFAULT '',
    checksum TEXT,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    import_id INTEGER,
    kind TEXT NOT NULL DEFAULT 'standard',
    date TEXT NOT NULL,
    tx_type TEXT NOT NULL,
    amount REAL NOT NULL DEFAULT 0,
    currency TEXT NOT NULL DEFAULT 'CAD',
    foreign_amount REAL NOT NULL DEFAULT 0,
    description TEXT NOT NULL DEFAULT '',
    consolidated INTEGER NOT NULL DEFAULT 0,
    category_id INTEGER,
    project_id INTEGER,
    contact_id INTEGER,
    cross_post_id INTEGER,
    counter_account_id INTEGER,
    extra TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (import_id) REFERENCES imports(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (project_id) REFERENCES projects(id),
    FOREIGN KEY (contact_id) REFERENCES contacts(id),
    FOREIGN KEY (cross_post_id) REFERENCES transactions(id),
    FOREIGN KEY (counter_account_id) REFERENCES accounts(id)
);
CREATE INDEX IF NOT EXISTS idx_transactions_account_date ON transactions(account_id, date);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn account_from_row(row: &rusqlite::Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        number: row.get(2)?,
        description: row.get(3)?,
        currency: row.get(4)?,
        importer: row.get(5)?,
    })
}

pub fn find_account(conn: &Connection, name: &str) -> Result<Account> {
    conn.query_row(
        "SELECT id, name, number, description, currency, importer FROM accounts WHERE name = ?1",
        [name],
        account_from_row,
    )
    .optional()?
    .ok_or_else(|| FinnError::UnknownAccount(name.to_string()))
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    conn.query_row(
        "SELECT id, name, number, description, currency, importer FROM accounts WHERE id = ?1",
        [id],
        account_from_row,
    )
    .optional()?
    .ok_or_else(|| FinnError::UnknownAccount(format!("#{id}")))
}

pub fn add_account(
    conn: &Connection,
    name: &str,
    number: Option<&str>,
    description: Option<&str>,
    currency: &str,
    importer: &str,
) -> Result<Account> {
    conn.execute(
        "INSERT INTO accounts (name, number, description, currency, importer) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![name, number, description, currency, importer],
    )?;
    get_account(conn, conn.last_insert_rowid())
}

pub fn insert_transaction(conn: &Connection, tx: &Transaction) -> Result<i64> {
    let (cross_post, counter_account) = match tx.kind {
        TransactionKind::Transfer {
            cross_post,
            counter_account,
        } => (cross_post, counter_account),
        _ => (None, None),
    };
    let extra = if tx.extra.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&tx.extra).map_err(|e| FinnError::Other(e.to_string()))?)
    };
    conn.prepare_cached(
        "INSERT INTO transactions (account_id, import_id, kind, date, tx_type, amount, currency, \
         foreign_amount, description, consolidated, category_id, project_id, contact_id, \
         cross_post_id, counter_account_id, extra) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    )?
    .execute(rusqlite::params![
        tx.account_id,
        tx.import_id,
        tx.kind.key(),
        tx.date.map(|d| d.format("%Y-%m-%d").to_string()),
        tx.tx_type.code(),
        tx.amount,
        tx.currency,
        tx.foreign_amount,
        tx.description,
        tx.consolidated,
        tx.category_id,
        tx.project_id,
        tx.contact_id,
        cross_post,
        counter_account,
        extra,
    ])?;
    Ok(conn.last_insert_rowid())
}

/// Record the balance an account held before its first imported statement.
pub fn add_opening_balance(
    conn: &Connection,
    account: &Account,
    amount: f64,
    date: chrono::NaiveDate,
) -> Result<i64> {
    let mut tx = Transaction::new(account.id, TxType::OpeningBalance, &account.currency);
    tx.date = Some(date);
    tx.amount = amount;
    tx.description = "Opening Balance".to_string();
    insert_transaction(conn, &tx)
}

/// Flattened transaction for listings, with reference names joined in.
#[derive(Debug, Clone)]
pub struct TransactionRow {
    pub id: i64,
    pub account: String,
    pub date: String,
    pub tx_type: String,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub contact: Option<String>,
    pub category: Option<String>,
    pub project: Option<String>,
}

pub fn list_transactions(
    conn: &Connection,
    account: Option<&str>,
    limit: usize,
) -> Result<Vec<TransactionRow>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, a.name, t.date, t.tx_type, t.amount, t.currency, t.description, \
                co.name, ca.name, p.name \
         FROM transactions t \
         JOIN accounts a ON a.id = t.account_id \
         LEFT JOIN contacts co ON co.id = t.contact_id \
         LEFT JOIN categories ca ON ca.id = t.category_id \
         LEFT JOIN projects p ON p.id = t.project_id \
         WHERE ?1 IS NULL OR a.name = ?1 \
         ORDER BY t.date DESC, t.id DESC \
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![account, limit as i64], |row| {
            Ok(TransactionRow {
                id: row.get(0)?,
                account: row.get(1)?,
                date: row.get(2)?,
                tx_type: row.get(3)?,
                amount: row.get(4)?,
                currency: row.get(5)?,
                description: row.get(6)?,
                contact: row.get(7)?,
                category: row.get(8)?,
                project: row.get(9)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct AccountSummary {
    pub account: Account,
    pub transactions: i64,
    pub balance: f64,
    /// Sum of outflows as a positive number.
    pub debit: f64,
    pub credit: f64,
}

pub fn account_summaries(conn: &Connection) -> Result<Vec<AccountSummary>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.name, a.number, a.description, a.currency, a.importer, \
                count(t.id), \
                COALESCE(SUM(t.amount), 0), \
                COALESCE(SUM(CASE WHEN t.amount < 0 THEN -t.amount ELSE 0 END), 0), \
                COALESCE(SUM(CASE WHEN t.amount > 0 THEN t.amount ELSE 0 END), 0) \
         FROM accounts a LEFT JOIN transactions t ON t.account_id = a.id \
         GROUP BY a.id ORDER BY a.name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AccountSummary {
                account: account_from_row(row)?,
                transactions: row.get(6)?,
                balance: row.get(7)?,
                debit: row.get(8)?,
                credit: row.get(9)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["accounts", "categories", "projects", "contacts", "imports", "transactions"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_add_account_defaults() {
        let (_dir, conn) = test_db();
        let acct = add_test_account(&conn, "ManulifeOne");
        assert_eq!(acct.currency, "CAD");
        assert_eq!(acct.importer, "CSV");
        let found = find_account(&conn, "ManulifeOne").unwrap();
        assert_eq!(found.id, acct.id);
    }

    #[test]
    fn test_find_unknown_account() {
        let (_dir, conn) = test_db();
        let err = find_account(&conn, "Nope").unwrap_err();
        assert!(matches!(err, FinnError::UnknownAccount(name) if name == "Nope"));
    }

    #[test]
    fn test_reference_names_are_unique() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO contacts (name) VALUES ('ACME')", []).unwrap();
        assert!(conn.execute("INSERT INTO contacts (name) VALUES ('ACME')", []).is_err());
    }

    #[test]
    fn test_insert_transaction_and_summaries() {
        let (_dir, conn) = test_db();
        let acct = add_test_account(&conn, "Chequing");
        let mut tx = Transaction::new(acct.id, TxType::Credit, "CAD");
        tx.date = chrono::NaiveDate::from_ymd_opt(2020, 1, 15);
        tx.amount = 100.0;
        tx.extra.insert("memo".into(), serde_json::Value::from("hello"));
        insert_transaction(&conn, &tx).unwrap();
        tx.amount = -30.0;
        tx.extra.clear();
        insert_transaction(&conn, &tx).unwrap();

        let extra: Option<String> = conn
            .query_row("SELECT extra FROM transactions ORDER BY id LIMIT 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(extra.as_deref(), Some(r#"{"memo":"hello"}"#));

        let summaries = account_summaries(&conn).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].transactions, 2);
        assert_eq!(summaries[0].balance, 70.0);
        assert_eq!(summaries[0].debit, 30.0);
        assert_eq!(summaries[0].credit, 100.0);

        let rows = list_transactions(&conn, Some("Chequing"), 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2020-01-15");
        assert!(list_transactions(&conn, Some("Other"), 10).unwrap().is_empty());
        assert_eq!(list_transactions(&conn, None, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_opening_balance() {
        let (_dir, conn) = test_db();
        let acct = add_test_account(&conn, "Chequing");
        let date = chrono::NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
        add_opening_balance(&conn, &acct, 1500.0, date).unwrap();
        let (kind, tx_type, description): (String, String, String) = conn
            .query_row("SELECT kind, tx_type, description FROM transactions", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(kind, "opening_balance");
        assert_eq!(tx_type, "O");
        assert_eq!(description, "Opening Balance");
        assert_eq!(account_summaries(&conn).unwrap()[0].balance, 1500.0);
    }

    #[test]
    fn test_transaction_without_date_rejected() {
        let (_dir, conn) = test_db();
        let acct = add_test_account(&conn, "Chequing");
        let tx = Transaction::new(acct.id, TxType::Debit, "CAD");
        assert!(matches!(insert_transaction(&conn, &tx), Err(FinnError::Db(_))));
    }
}
