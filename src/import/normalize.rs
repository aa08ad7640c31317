use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::catalog;
use crate::error::Result;
use crate::models::{Account, Category, Organization, TransactionType};

use super::duplicates::DuplicateMatch;
use super::mapper::RawImportRow;
use super::options::{CsvParsingOptions, DirectionMode};
use super::values::{is_valid_currency_code, parse_amount, parse_date, split_tags};

/// Ambient organization settings the normalizer depends on, passed explicitly
/// so the stage stays pure and testable.
#[derive(Debug, Clone)]
pub struct OrgSettings {
    pub base_currency: String,
}

impl From<&Organization> for OrgSettings {
    fn from(org: &Organization) -> Self {
        Self {
            base_currency: org.base_currency.clone(),
        }
    }
}

/// Case-insensitive name lookups over the organization's active categories
/// and accounts. Built once per import, one query per collection.
pub struct CatalogIndex {
    categories: HashMap<String, Category>,
    accounts: HashMap<String, Account>,
}

impl CatalogIndex {
    pub fn load(conn: &Connection, org_id: i64) -> Result<Self> {
        Ok(Self::from_parts(
            catalog::list_active_categories(conn, org_id)?,
            catalog::list_active_accounts(conn, org_id)?,
        ))
    }

    pub fn from_parts(categories: Vec<Category>, accounts: Vec<Account>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|c| (c.name.to_lowercase(), c))
                .collect(),
            accounts: accounts
                .into_iter()
                .map(|a| (a.name.to_lowercase(), a))
                .collect(),
        }
    }

    fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(&name.to_lowercase())
    }

    fn account(&self, name: &str) -> Option<&Account> {
        self.accounts.get(&name.to_lowercase())
    }
}

/// A vendor or client staged for creation. Normalization never writes;
/// commit materializes each distinct name once.
#[derive(Debug, Clone, PartialEq)]
pub enum CounterpartyRef {
    Vendor(String),
    Client(String),
}

impl CounterpartyRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Vendor(n) | Self::Client(n) => n,
        }
    }
}

/// The fully-resolved payload of a valid row.
#[derive(Debug, Clone)]
pub struct NormalizedTransaction {
    pub txn_type: TransactionType,
    pub date: NaiveDate,
    pub amount_base: f64,
    pub currency_base: String,
    pub amount_secondary: Option<f64>,
    pub currency_secondary: Option<String>,
    // Legacy display pair: the secondary currency is "original" when present,
    // otherwise base is original with rate 1.0.
    pub amount_original: f64,
    pub currency_original: String,
    pub exchange_rate_to_base: f64,
    pub description: String,
    pub category_id: i64,
    pub account_id: i64,
    pub counterparty: Option<CounterpartyRef>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub document_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Valid,
    Invalid,
}

#[derive(Debug, Clone)]
pub struct NormalizedImportRow {
    pub index: usize,
    pub status: RowStatus,
    pub errors: Vec<String>,
    pub normalized: Option<NormalizedTransaction>,
    pub is_duplicate_candidate: bool,
    pub duplicate_matches: Vec<DuplicateMatch>,
}

impl NormalizedImportRow {
    pub fn is_valid(&self) -> bool {
        self.status == RowStatus::Valid
    }

    /// Demote the row, appending an error and dropping the payload. Invalid
    /// rows never carry a normalized payload, even on late-stage demotion.
    pub fn invalidate(&mut self, error: String) {
        self.status = RowStatus::Invalid;
        self.errors.push(error);
        self.normalized = None;
    }
}

/// Parse, resolve, and validate every mapped row against the organization's
/// catalog. Missing required fields short-circuit a row; all later checks
/// accumulate, so one row can report several problems at once.
pub fn normalize_rows(
    raw_rows: &[RawImportRow],
    catalog: &CatalogIndex,
    settings: &OrgSettings,
    options: &CsvParsingOptions,
) -> Vec<NormalizedImportRow> {
    raw_rows
        .iter()
        .map(|raw| normalize_row(raw, catalog, settings, options))
        .collect()
}

fn normalize_row(
    raw: &RawImportRow,
    catalog: &CatalogIndex,
    settings: &OrgSettings,
    options: &CsvParsingOptions,
) -> NormalizedImportRow {
    let c = &raw.candidate;

    let mut missing: Vec<&str> = Vec::new();
    if c.date.is_none() {
        missing.push("date");
    }
    if c.amount.is_none() {
        missing.push("amount");
    }
    if c.currency.is_none() {
        missing.push("currency");
    }
    if c.description.is_none() {
        missing.push("description");
    }
    if c.category.is_none() {
        missing.push("category");
    }
    if c.account.is_none() {
        missing.push("account");
    }
    if raw.direction_mode == DirectionMode::TypeColumn && c.txn_type.is_none() {
        missing.push("type");
    }
    if !missing.is_empty() {
        return NormalizedImportRow {
            index: raw.index,
            status: RowStatus::Invalid,
            errors: missing
                .iter()
                .map(|f| format!("Missing required field: {f}"))
                .collect(),
            normalized: None,
            is_duplicate_candidate: false,
            duplicate_matches: Vec::new(),
        };
    }

    let mut errors: Vec<String> = Vec::new();

    let date_raw = c.date.as_deref().unwrap_or_default();
    let date = parse_date(date_raw, options.date_format);
    if date.is_none() {
        errors.push(format!("Invalid date: {date_raw}"));
    }

    let amount_raw = c.amount.as_deref().unwrap_or_default();
    let parsed_amount = parse_amount(
        amount_raw,
        options.decimal_separator,
        options.thousands_separator,
    );
    if parsed_amount.is_none() {
        errors.push(format!("Invalid amount: {amount_raw}"));
    }

    let (txn_type, amount) = resolve_direction(raw.direction_mode, c.txn_type.as_deref(), parsed_amount, &mut errors);
    if let Some(a) = amount {
        if a <= 0.0 {
            errors.push("Amount must be positive".to_string());
        }
    }

    let currency_raw = c.currency.as_deref().unwrap_or_default();
    let currency = currency_raw.trim().to_uppercase();
    if !is_valid_currency_code(&currency) {
        errors.push(format!("Invalid currency code: {currency_raw}"));
    }

    let secondary = resolve_secondary_pair(c.secondary_amount.as_deref(), c.secondary_currency.as_deref(), options, &mut errors);

    let category_name = c.category.as_deref().unwrap_or_default();
    let category = catalog.category(category_name);
    match (category, txn_type) {
        (None, _) => errors.push(format!("Unknown category: {category_name}")),
        (Some(cat), Some(row_type)) if cat.category_type != row_type => {
            errors.push(format!(
                "Category '{}' is {} but the row resolved to {}",
                cat.name,
                cat.category_type.label(),
                row_type.label()
            ));
        }
        _ => {}
    }

    let account_name = c.account.as_deref().unwrap_or_default();
    let account = catalog.account(account_name);
    if account.is_none() {
        errors.push(format!("Unknown account: {account_name}"));
    }

    if !errors.is_empty() {
        return NormalizedImportRow {
            index: raw.index,
            status: RowStatus::Invalid,
            errors,
            normalized: None,
            is_duplicate_candidate: false,
            duplicate_matches: Vec::new(),
        };
    }

    // No errors means every prerequisite parsed and resolved.
    let date = date.expect("validated");
    let amount = amount.expect("validated");
    let txn_type = txn_type.expect("validated");
    let category_id = category.expect("validated").id;
    let account_id = account.expect("validated").id;

    let triple = resolve_currency_triple(amount, &currency, secondary, &settings.base_currency);

    // A vendor only makes sense on an expense row, a client on an income row;
    // a counterparty cell on the other side is ignored for bulk files.
    let counterparty = match txn_type {
        TransactionType::Expense => c.vendor.clone().map(CounterpartyRef::Vendor),
        TransactionType::Income => c.client.clone().map(CounterpartyRef::Client),
    };

    NormalizedImportRow {
        index: raw.index,
        status: RowStatus::Valid,
        errors: Vec::new(),
        normalized: Some(NormalizedTransaction {
            txn_type,
            date,
            amount_base: triple.amount_base,
            currency_base: triple.currency_base,
            amount_secondary: triple.amount_secondary,
            currency_secondary: triple.currency_secondary,
            amount_original: triple.amount_original,
            currency_original: triple.currency_original,
            exchange_rate_to_base: triple.exchange_rate_to_base,
            description: c.description.clone().unwrap_or_default(),
            category_id,
            account_id,
            counterparty,
            notes: c.notes.clone(),
            tags: c.tags.as_deref().map(split_tags).unwrap_or_default(),
            document_path: c.document.clone(),
        }),
        is_duplicate_candidate: false,
        duplicate_matches: Vec::new(),
    }
}

/// Resolve INCOME/EXPENSE per the direction mode and force the amount
/// positive; the sign is never retained in the amount itself.
fn resolve_direction(
    mode: DirectionMode,
    type_cell: Option<&str>,
    amount: Option<f64>,
    errors: &mut Vec<String>,
) -> (Option<TransactionType>, Option<f64>) {
    match mode {
        DirectionMode::TypeColumn => {
            let txn_type = match type_cell.unwrap_or_default().trim().to_uppercase().as_str() {
                "INCOME" | "IN" => Some(TransactionType::Income),
                "EXPENSE" | "EXP" | "OUT" => Some(TransactionType::Expense),
                other => {
                    errors.push(format!("Unknown transaction type: {other}"));
                    None
                }
            };
            (txn_type, amount.map(f64::abs))
        }
        DirectionMode::SignBased => match amount {
            Some(a) if a < 0.0 => (Some(TransactionType::Expense), Some(a.abs())),
            Some(a) if a > 0.0 => (Some(TransactionType::Income), Some(a)),
            Some(_) => {
                errors.push("Amount must not be zero for sign-based imports".to_string());
                (None, None)
            }
            None => (None, None),
        },
    }
}

/// Both secondary fields must co-occur; this is the first stage that can
/// observe a single-sided pair.
fn resolve_secondary_pair(
    amount_cell: Option<&str>,
    currency_cell: Option<&str>,
    options: &CsvParsingOptions,
    errors: &mut Vec<String>,
) -> Option<(f64, String)> {
    match (amount_cell, currency_cell) {
        (None, None) => None,
        (Some(_), None) => {
            errors.push("Secondary amount requires a secondary currency".to_string());
            None
        }
        (None, Some(_)) => {
            errors.push("Secondary currency requires a secondary amount".to_string());
            None
        }
        (Some(amount_raw), Some(currency_raw)) => {
            let amount = parse_amount(
                amount_raw,
                options.decimal_separator,
                options.thousands_separator,
            );
            let currency = currency_raw.trim().to_uppercase();
            let mut ok = true;
            if amount.is_none() {
                errors.push(format!("Invalid secondary amount: {amount_raw}"));
                ok = false;
            } else if amount == Some(0.0) {
                errors.push("Secondary amount must not be zero".to_string());
                ok = false;
            }
            if !is_valid_currency_code(&currency) {
                errors.push(format!("Invalid secondary currency code: {currency_raw}"));
                ok = false;
            }
            if ok {
                Some((amount.unwrap_or_default().abs(), currency))
            } else {
                None
            }
        }
    }
}

struct CurrencyTriple {
    amount_base: f64,
    currency_base: String,
    amount_secondary: Option<f64>,
    currency_secondary: Option<String>,
    amount_original: f64,
    currency_original: String,
    exchange_rate_to_base: f64,
}

/// Base vs. secondary vs. legacy-original. When the secondary pair is in the
/// organization's base currency, it becomes canonical base and the primary
/// cell moves to the secondary/original slot with a derived rate; otherwise
/// the primary cell is base and the secondary (if any) rides along as the
/// original foreign pair.
fn resolve_currency_triple(
    amount: f64,
    currency: &str,
    secondary: Option<(f64, String)>,
    base_currency: &str,
) -> CurrencyTriple {
    match secondary {
        Some((sec_amount, sec_currency))
            if sec_currency == base_currency && currency != base_currency =>
        {
            CurrencyTriple {
                amount_base: sec_amount,
                currency_base: sec_currency,
                amount_secondary: Some(amount),
                currency_secondary: Some(currency.to_string()),
                amount_original: amount,
                currency_original: currency.to_string(),
                exchange_rate_to_base: sec_amount / amount,
            }
        }
        Some((sec_amount, sec_currency)) => CurrencyTriple {
            amount_base: amount,
            currency_base: currency.to_string(),
            amount_secondary: Some(sec_amount),
            currency_secondary: Some(sec_currency.clone()),
            amount_original: sec_amount,
            currency_original: sec_currency,
            exchange_rate_to_base: amount / sec_amount,
        },
        None => CurrencyTriple {
            amount_base: amount,
            currency_base: currency.to_string(),
            amount_secondary: None,
            currency_secondary: None,
            amount_original: amount,
            currency_original: currency.to_string(),
            exchange_rate_to_base: 1.0,
        },
    }
}
