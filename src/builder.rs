use rusqlite::Connection;

use crate::convert::{convert, Value};
use crate::db;
use crate::error::{FinnError, Result};
use crate::mapping::{FieldTarget, MappingConfig, RowFields};
use crate::models::{Account, Transaction, TxType};
use crate::resolver::{RefKind, ReferenceResolver};

/// A typed transaction that has not been stored yet, with the reference
/// names still to be resolved.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub tx: Transaction,
    pub contact: Option<String>,
    pub project: Option<String>,
    pub category: Option<String>,
}

pub struct TransactionBuilder<'a> {
    config: &'a MappingConfig,
    account: &'a Account,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(config: &'a MappingConfig, account: &'a Account) -> Self {
        Self { config, account }
    }

    /// Convert a classified row into a transaction. Fails only with
    /// row-scoped errors.
    pub fn build(&self, row: &RowFields) -> Result<PendingTransaction> {
        let tx_type = match non_empty(row, "type") {
            Some(code) => TxType::parse(code).ok_or_else(|| {
                FinnError::Classification(format!("unknown transaction type '{code}'"))
            })?,
            None => TxType::Debit,
        };
        let currency = self
            .config
            .settings
            .currency
            .as_deref()
            .unwrap_or(&self.account.currency);
        let mut tx = Transaction::new(self.account.id, tx_type, currency);

        for spec in self.config.mapped_fields() {
            let Some(target) = &spec.target else {
                continue;
            };
            if target.is_reference_or_type() {
                continue;
            }
            let raw = row.get(&spec.name).map(String::as_str).unwrap_or("");
            let value = convert(spec, raw)?;
            match target {
                FieldTarget::Date => {
                    if let Value::Date(d) = value {
                        tx.date = Some(d);
                    }
                }
                FieldTarget::Amount => tx.amount = value.as_f64().unwrap_or_default(),
                FieldTarget::ForeignAmount => {
                    tx.foreign_amount = value.as_f64().unwrap_or_default();
                }
                FieldTarget::Currency => {
                    if let Value::Str(ccy) = value {
                        if !ccy.is_empty() {
                            tx.currency = ccy;
                        }
                    }
                }
                FieldTarget::Description => {
                    if let Value::Str(text) = value {
                        tx.description = text;
                    }
                }
                FieldTarget::Consolidated => {
                    tx.consolidated = matches!(value, Value::Bool(true));
                }
                FieldTarget::Extra(name) => {
                    tx.extra.insert(name.clone(), value.to_json());
                }
                _ => {}
            }
        }

        if tx.date.is_none() {
            return Err(FinnError::Build("row has no date".to_string()));
        }

        Ok(PendingTransaction {
            tx,
            contact: non_empty(row, "contact").map(str::to_string),
            project: non_empty(row, "project").map(str::to_string),
            category: non_empty(row, "category").map(str::to_string),
        })
    }

    /// Attach contact, project and category (in that order) and store the
    /// transaction. Returns its id.
    pub fn save(
        &self,
        conn: &Connection,
        resolver: &mut ReferenceResolver,
        pending: PendingTransaction,
        import_id: Option<i64>,
    ) -> Result<i64> {
        let PendingTransaction {
            mut tx,
            contact,
            project,
            category,
        } = pending;
        if let Some(name) = &contact {
            tx.contact_id = Some(resolver.resolve(conn, RefKind::Contact, name)?);
        }
        if let Some(name) = &project {
            tx.project_id = Some(resolver.resolve(conn, RefKind::Project, name)?);
        }
        if let Some(name) = &category {
            tx.category_id = Some(resolver.resolve(conn, RefKind::Category, name)?);
        }
        tx.import_id = import_id;
        db::insert_transaction(conn, &tx)
    }
}

fn non_empty<'r>(row: &'r RowFields, key: &str) -> Option<&'r str> {
    row.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}
