use std::collections::HashMap;
use std::fmt;

use rusqlite::{Connection, OptionalExtension};

use crate::error::{FinnError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Category,
    Project,
    Contact,
}

impl RefKind {
    pub const ALL: [RefKind; 3] = [Self::Category, Self::Project, Self::Contact];

    pub fn table(&self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Project => "projects",
            Self::Contact => "contacts",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Project => "project",
            Self::Contact => "contact",
        }
    }

    /// Transaction column holding the reference.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Category => "category_id",
            Self::Project => "project_id",
            Self::Contact => "contact_id",
        }
    }

    pub fn parse(s: &str) -> Option<RefKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" | "categories" => Some(Self::Category),
            "project" | "projects" => Some(Self::Project),
            "contact" | "contacts" => Some(Self::Contact),
            _ => None,
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Find-or-create for categories, projects and contacts, keyed by name.
/// Lives for one import job; ids already seen are served from memory.
pub struct ReferenceResolver {
    account_id: i64,
    cache: HashMap<(RefKind, String), i64>,
}

impl ReferenceResolver {
    pub fn new(account_id: i64) -> Self {
        Self {
            account_id,
            cache: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, conn: &Connection, kind: RefKind, name: &str) -> Result<i64> {
        if let Some(id) = self.cache.get(&(kind, name.to_string())) {
            return Ok(*id);
        }
        let id = find_or_create(conn, kind, name, self.account_id).map_err(|source| {
            FinnError::Reference {
                kind: kind.label(),
                name: name.to_string(),
                source,
            }
        })?;
        self.cache.insert((kind, name.to_string()), id);
        Ok(id)
    }
}

fn find_or_create(
    conn: &Connection,
    kind: RefKind,
    name: &str,
    account_id: i64,
) -> rusqlite::Result<i64> {
    let table = kind.table();
    let existing: Option<i64> = conn
        .prepare_cached(&format!("SELECT id FROM {table} WHERE name = ?1"))?
        .query_row([name], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.prepare_cached(&format!(
        "INSERT INTO {table} (name, account_id) VALUES (?1, ?2)"
    ))?
    .execute(rusqlite::params![name, account_id])?;
    let id = conn.last_insert_rowid();
    tracing::debug!("created {} '{name}' (#{id})", kind.label());
    Ok(id)
}

#[derive(Debug, Clone)]
pub struct Reference {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub account: Option<String>,
    pub transactions: i64,
}

/// Every entity of `kind` with the number of transactions pointing at it.
pub fn list_references(conn: &Connection, kind: RefKind) -> Result<Vec<Reference>> {
    let sql = format!(
        "SELECT r.id, r.name, r.description, a.name, \
                (SELECT count(*) FROM transactions t WHERE t.{column} = r.id) \
         FROM {table} r LEFT JOIN accounts a ON a.id = r.account_id \
         ORDER BY r.name",
        table = kind.table(),
        column = kind.column(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Reference {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                account: row.get(3)?,
                transactions: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
