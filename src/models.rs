use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub number: Option<String>,
    pub description: Option<String>,
    pub currency: String,
    /// Key of the importer kind used for this account's files, e.g. "CSV".
    pub importer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Debit,
    Credit,
    Transfer,
    OpeningBalance,
    Adjustment,
}

impl TxType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Debit => "D",
            Self::Credit => "C",
            Self::Transfer => "T",
            Self::OpeningBalance => "O",
            Self::Adjustment => "A",
        }
    }

    /// Accepts the one-letter code or the full name, case-insensitively.
    pub fn parse(s: &str) -> Option<TxType> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "debit" => Some(Self::Debit),
            "c" | "credit" => Some(Self::Credit),
            "t" | "transfer" => Some(Self::Transfer),
            "o" | "openingbalance" | "opening_balance" => Some(Self::OpeningBalance),
            "a" | "adjustment" => Some(Self::Adjustment),
            _ => None,
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Record variant a transaction is stored as.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionKind {
    Standard,
    OpeningBalance,
    /// `cross_post` would point at the paired leg in the counter account.
    /// Nothing fills either field yet; transfers are stored one-sided.
    Transfer {
        cross_post: Option<i64>,
        counter_account: Option<i64>,
    },
}

impl TransactionKind {
    pub fn for_type(tx_type: TxType) -> Self {
        match tx_type {
            TxType::Debit | TxType::Credit | TxType::Adjustment => Self::Standard,
            TxType::OpeningBalance => Self::OpeningBalance,
            TxType::Transfer => Self::Transfer {
                cross_post: None,
                counter_account: None,
            },
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::OpeningBalance => "opening_balance",
            Self::Transfer { .. } => "transfer",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Option<i64>,
    pub account_id: i64,
    pub import_id: Option<i64>,
    pub kind: TransactionKind,
    pub date: Option<NaiveDate>,
    pub tx_type: TxType,
    pub amount: f64,
    pub currency: String,
    pub foreign_amount: f64,
    pub description: String,
    pub consolidated: bool,
    pub category_id: Option<i64>,
    pub project_id: Option<i64>,
    pub contact_id: Option<i64>,
    /// Converted values whose mapped name matches no attribute.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Transaction {
    pub fn new(account_id: i64, tx_type: TxType, currency: &str) -> Self {
        Self {
            id: None,
            account_id,
            import_id: None,
            kind: TransactionKind::for_type(tx_type),
            date: None,
            tx_type,
            amount: 0.0,
            currency: currency.to_string(),
            foreign_amount: 0.0,
            description: String::new(),
            consolidated: false,
            category_id: None,
            project_id: None,
            contact_id: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Split a signed amount into (debit, credit): outflows and inflows as
/// positive numbers, the other side zero.
pub fn debit_credit(amount: f64) -> (f64, f64) {
    if amount < 0.0 {
        (-amount, 0.0)
    } else {
        (0.0, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_type_codes_and_names() {
        assert_eq!(TxType::parse("C"), Some(TxType::Credit));
        assert_eq!(TxType::parse("d"), Some(TxType::Debit));
        assert_eq!(TxType::parse("Transfer"), Some(TxType::Transfer));
        assert_eq!(TxType::parse(" O "), Some(TxType::OpeningBalance));
        assert_eq!(TxType::parse("adjustment"), Some(TxType::Adjustment));
        assert_eq!(TxType::parse("X"), None);
        assert_eq!(TxType::parse(""), None);
    }

    #[test]
    fn test_kind_follows_type() {
        assert_eq!(TransactionKind::for_type(TxType::Credit), TransactionKind::Standard);
        assert_eq!(TransactionKind::for_type(TxType::Adjustment), TransactionKind::Standard);
        assert_eq!(
            TransactionKind::for_type(TxType::OpeningBalance),
            TransactionKind::OpeningBalance
        );
        assert_eq!(TransactionKind::for_type(TxType::Transfer).key(), "transfer");
    }

    #[test]
    fn test_debit_credit_split() {
        assert_eq!(debit_credit(-12.5), (12.5, 0.0));
        assert_eq!(debit_credit(40.0), (0.0, 40.0));
        assert_eq!(debit_credit(0.0), (0.0, 0.0));
    }

    #[test]
    fn test_new_transaction_defaults() {
        let tx = Transaction::new(7, TxType::Transfer, "USD");
        assert_eq!(tx.account_id, 7);
        assert_eq!(tx.currency, "USD");
        assert!(tx.date.is_none());
        assert!(tx.extra.is_empty());
        assert_eq!(tx.kind.key(), "transfer");
    }
}
