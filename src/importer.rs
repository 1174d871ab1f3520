use std::path::Path;

use rusqlite::Connection;

use crate::builder::TransactionBuilder;
use crate::db;
use crate::error::{FinnError, Result};
use crate::job::{checksum, ImportCounts, ImportJob, ImportStatus};
use crate::mapping::{load_mapping, MappingConfig};
use crate::models::Account;
use crate::resolver::ReferenceResolver;

// ---------------------------------------------------------------------------
// Importer kinds: enum dispatch instead of trait objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImporterKind {
    Csv,
}

impl ImporterKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Csv => "Delimited text with per-account column mapping",
        }
    }

    /// Load whatever the kind needs to process files for `account`.
    pub fn prepare(&self, account: &Account, mappings_dir: &Path) -> Result<Importer> {
        match self {
            Self::Csv => {
                let config = load_mapping(mappings_dir, &account.name)?;
                Ok(Importer::Csv(CsvImporter::new(account.clone(), config)))
            }
        }
    }
}

/// Importer kinds available to a run. Built explicitly and passed in.
#[derive(Debug, Clone, Default)]
pub struct ImporterRegistry {
    kinds: Vec<ImporterKind>,
}

impl ImporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ImporterKind::Csv);
        registry
    }

    pub fn register(&mut self, kind: ImporterKind) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
    }

    pub fn kinds(&self) -> &[ImporterKind] {
        &self.kinds
    }

    pub fn get_by_key(&self, key: &str) -> Option<ImporterKind> {
        self.kinds
            .iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(key.trim()))
            .copied()
    }

    pub fn importer_for(&self, account: &Account, mappings_dir: &Path) -> Result<Importer> {
        let kind = self
            .get_by_key(&account.importer)
            .ok_or_else(|| FinnError::UnknownImporterKind(account.importer.clone()))?;
        kind.prepare(account, mappings_dir)
    }
}

pub enum Importer {
    Csv(CsvImporter),
}

impl Importer {
    /// Run every row of `data` inside the caller's transaction, updating
    /// `counts` as rows succeed or are rejected. An `Err` aborts the batch.
    pub fn process(
        &self,
        conn: &Connection,
        import_id: i64,
        data: &str,
        counts: &mut ImportCounts,
    ) -> Result<()> {
        match self {
            Self::Csv(csv) => csv.process(conn, import_id, data, counts),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub struct CsvImporter {
    account: Account,
    config: MappingConfig,
}

impl CsvImporter {
    pub fn new(account: Account, config: MappingConfig) -> Self {
        Self { account, config }
    }

    pub fn process(
        &self,
        conn: &Connection,
        import_id: i64,
        data: &str,
        counts: &mut ImportCounts,
    ) -> Result<()> {
        let settings = &self.config.settings;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(settings.delimiter)
            .from_reader(data.as_bytes());
        let builder = TransactionBuilder::new(&self.config, &self.account);
        let mut resolver = ReferenceResolver::new(self.account.id);

        let mut records = rdr.records();
        if settings.header_line {
            if let Some(header) = records.next() {
                header?;
            }
        }

        for (ix, record) in records.enumerate() {
            let record = record?;
            let row_no = ix + 1;
            counts.record_row();
            let fields = self.config.map_row(record.iter());
            let classified = self.config.rules.classify(&fields);
            match builder.build(&classified) {
                Ok(pending) => {
                    let id = builder.save(conn, &mut resolver, pending, Some(import_id))?;
                    tracing::debug!("import #{import_id} row {row_no}: transaction #{id}");
                    counts.record_good();
                }
                Err(e) if e.is_row_scoped() => {
                    tracing::warn!("import #{import_id} row {row_no} rejected: {e}");
                    counts.record_bad(row_no, &e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

pub enum ImportResult {
    /// Identical data was already imported into the account by this job id.
    Duplicate(i64),
    Finished(ImportJob),
}

pub fn import_file(
    conn: &mut Connection,
    registry: &ImporterRegistry,
    mappings_dir: &Path,
    file_path: &Path,
    account_name: &str,
    force: bool,
) -> Result<ImportResult> {
    let account = db::find_account(conn, account_name)?;

    if !force {
        if let Ok(bytes) = std::fs::read(file_path) {
            let digest = checksum(&bytes);
            if let Some(previous) = ImportJob::find_by_checksum(conn, account.id, &digest)? {
                return Ok(ImportResult::Duplicate(previous));
            }
        }
    }

    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let mut job = ImportJob::create(conn, account.id, filename)?;
    if job.load_file(conn, file_path)? == ImportStatus::Read {
        job.read(conn, registry, mappings_dir)?;
    }
    Ok(ImportResult::Finished(job))
}

/// Run the data of an earlier job again as a new job.
pub fn replay_import(
    conn: &mut Connection,
    registry: &ImporterRegistry,
    mappings_dir: &Path,
    import_id: i64,
) -> Result<ImportJob> {
    let mut job = ImportJob::replay(conn, import_id)?;
    job.read(conn, registry, mappings_dir)?;
    Ok(job)
}
