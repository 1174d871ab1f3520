use std::fmt;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use sha2::{Digest, Sha256};

use crate::db;
use crate::error::{FinnError, Result};
use crate::importer::ImporterRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Initial,
    Read,
    InProgress,
    Completed,
    Error,
    Partial,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "Initial",
            Self::Read => "Read",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Error => "Error",
            Self::Partial => "Partial",
        }
    }

    pub fn parse(s: &str) -> Option<ImportStatus> {
        [
            Self::Initial,
            Self::Read,
            Self::InProgress,
            Self::Completed,
            Self::Error,
            Self::Partial,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Partial)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row accounting for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub total: i64,
    pub good: i64,
    pub bad: i64,
    /// Newline-joined, append-only.
    pub errors: String,
}

impl ImportCounts {
    pub fn add_error(&mut self, message: &str) {
        if !self.errors.is_empty() {
            self.errors.push('\n');
        }
        self.errors.push_str(message);
    }

    /// Count a row before it is processed.
    pub fn record_row(&mut self) {
        self.total += 1;
    }

    pub fn record_good(&mut self) {
        self.good += 1;
    }

    pub fn record_bad(&mut self, row: usize, err: &FinnError) {
        self.bad += 1;
        self.add_error(&format!("row {row}: {err}"));
    }

    /// Every row seen so far counts as bad once the batch is rolled back.
    fn abort(&mut self, err: &FinnError) {
        self.good = 0;
        self.bad = self.total;
        self.add_error(&err.to_string());
        self.add_error("import rolled back; no transactions were saved");
    }

    pub fn final_status(&self) -> ImportStatus {
        match (self.good, self.bad) {
            (_, 0) => ImportStatus::Completed,
            (0, _) => ImportStatus::Error,
            _ => ImportStatus::Partial,
        }
    }

    fn reset(&mut self) {
        self.total = 0;
        self.good = 0;
        self.bad = 0;
    }
}

pub fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// One run of one file against one account.
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub id: i64,
    pub account_id: i64,
    pub timestamp: String,
    pub filename: String,
    pub status: ImportStatus,
    pub data: String,
    pub checksum: Option<String>,
    pub counts: ImportCounts,
}

const JOB_COLUMNS: &str =
    "i.id, i.account_id, i.timestamp, i.filename, i.status, i.data, i.checksum, \
     i.total, i.good, i.bad, i.errors";

fn job_from_row(row: &rusqlite::Row) -> rusqlite::Result<ImportJob> {
    let status: String = row.get(4)?;
    Ok(ImportJob {
        id: row.get(0)?,
        account_id: row.get(1)?,
        timestamp: row.get(2)?,
        filename: row.get(3)?,
        status: ImportStatus::parse(&status).unwrap_or(ImportStatus::Error),
        data: row.get(5)?,
        checksum: row.get(6)?,
        counts: ImportCounts {
            total: row.get(7)?,
            good: row.get(8)?,
            bad: row.get(9)?,
            errors: row.get(10)?,
        },
    })
}

impl ImportJob {
    pub fn create(conn: &Connection, account_id: i64, filename: &str) -> Result<ImportJob> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        conn.execute(
            "INSERT INTO imports (account_id, timestamp, filename, status) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![account_id, timestamp, filename, ImportStatus::Initial.as_str()],
        )?;
        let job = ImportJob {
            id: conn.last_insert_rowid(),
            account_id,
            timestamp,
            filename: filename.to_string(),
            status: ImportStatus::Initial,
            data: String::new(),
            checksum: None,
            counts: ImportCounts::default(),
        };
        tracing::info!("import #{} created for {}", job.id, job.filename);
        Ok(job)
    }

    pub fn load(conn: &Connection, id: i64) -> Result<ImportJob> {
        conn.query_row(
            &format!("SELECT {JOB_COLUMNS} FROM imports i WHERE i.id = ?1"),
            [id],
            job_from_row,
        )
        .optional()?
        .ok_or(FinnError::UnknownImport(id))
    }

    /// Jobs newest first, each with its account name.
    pub fn list(conn: &Connection, account: Option<&str>) -> Result<Vec<(String, ImportJob)>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS}, a.name FROM imports i JOIN accounts a ON a.id = i.account_id \
             WHERE ?1 IS NULL OR a.name = ?1 ORDER BY i.id DESC"
        ))?;
        let jobs = stmt
            .query_map([account], |row| Ok((row.get(11)?, job_from_row(row)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    /// Most recent job for `account_id` that stored the same data and did not
    /// fail outright.
    pub fn find_by_checksum(
        conn: &Connection,
        account_id: i64,
        checksum: &str,
    ) -> Result<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM imports WHERE account_id = ?1 AND checksum = ?2 \
                 AND status IN ('Completed', 'Partial') ORDER BY id DESC LIMIT 1",
                rusqlite::params![account_id, checksum],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// New job over the stored data of an earlier one, left in `Read`.
    pub fn replay(conn: &Connection, source_id: i64) -> Result<ImportJob> {
        let source = Self::load(conn, source_id)?;
        let mut job = Self::create(conn, source.account_id, &source.filename)?;
        job.set_data(conn, source.data)?;
        tracing::info!("import #{} replays #{}", job.id, source.id);
        Ok(job)
    }

    pub fn save(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "UPDATE imports SET status = ?1, data = ?2, checksum = ?3, total = ?4, good = ?5, \
             bad = ?6, errors = ?7 WHERE id = ?8",
            rusqlite::params![
                self.status.as_str(),
                self.data,
                self.checksum,
                self.counts.total,
                self.counts.good,
                self.counts.bad,
                self.counts.errors,
                self.id,
            ],
        )?;
        Ok(())
    }

    fn transition(&mut self, conn: &Connection, status: ImportStatus) -> Result<()> {
        tracing::info!("import #{}: {} -> {}", self.id, self.status, status);
        self.status = status;
        self.save(conn)
    }

    /// Record `err` and end the job in `Error`.
    pub fn fail(&mut self, conn: &Connection, err: &FinnError) -> Result<ImportStatus> {
        tracing::warn!("import #{} failed: {err}", self.id);
        self.counts.add_error(&err.to_string());
        self.transition(conn, ImportStatus::Error)?;
        Ok(self.status)
    }

    fn set_data(&mut self, conn: &Connection, data: String) -> Result<()> {
        self.checksum = Some(checksum(data.as_bytes()));
        self.data = data;
        self.transition(conn, ImportStatus::Read)
    }

    /// `Initial -> Read`, or `Error` if the file cannot be read.
    pub fn load_file(&mut self, conn: &Connection, path: &Path) -> Result<ImportStatus> {
        match std::fs::read_to_string(path) {
            Ok(data) => {
                self.set_data(conn, data)?;
                Ok(self.status)
            }
            Err(e) => self.fail(conn, &FinnError::Io(e)),
        }
    }

    /// Run the stored data through the account's importer and settle the job
    /// in `Completed`, `Partial` or `Error`. Only a failure to persist the
    /// job record is returned as `Err`.
    pub fn read(
        &mut self,
        conn: &mut Connection,
        registry: &ImporterRegistry,
        mappings_dir: &Path,
    ) -> Result<ImportStatus> {
        if self.status != ImportStatus::Read {
            return Err(FinnError::Other(format!(
                "import #{} has status {}; only jobs in Read can run",
                self.id, self.status
            )));
        }
        let importer = match db::get_account(conn, self.account_id)
            .and_then(|account| registry.importer_for(&account, mappings_dir))
        {
            Ok(importer) => importer,
            Err(e) => return self.fail(conn, &e),
        };

        self.counts.reset();
        self.transition(conn, ImportStatus::InProgress)?;

        let outcome = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
            Ok(tx) => match importer.process(&tx, self.id, &self.data, &mut self.counts) {
                Ok(()) => tx.commit().map_err(FinnError::from),
                Err(e) => {
                    if let Err(rollback) = tx.rollback() {
                        tracing::warn!("import #{}: rollback failed: {rollback}", self.id);
                    }
                    Err(e)
                }
            },
            Err(e) => Err(e.into()),
        };

        let status = match outcome {
            Ok(()) => self.counts.final_status(),
            Err(e) => {
                tracing::warn!("import #{} aborted: {e}", self.id);
                self.counts.abort(&e);
                ImportStatus::Error
            }
        };
        self.transition(conn, status)?;
        tracing::info!(
            "import #{}: {} rows, {} good, {} bad",
            self.id,
            self.counts.total,
            self.counts.good,
            self.counts.bad
        );
        Ok(status)
    }
}
