use serde::{Deserialize, Serialize};

/// Income vs. expense. Used both for transactions and for the declared type
/// of a category; an imported row is only valid when the two agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub base_currency: String,
    pub decimal_separator: char,
    pub thousands_separator: char,
    pub date_format: String,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub category_type: TransactionType,
    pub is_active: bool,
}

/// A vendor or client record. Which table it lives in is decided by the
/// transaction type it is attached to.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Counterparty {
    pub id: i64,
    pub name: String,
}
