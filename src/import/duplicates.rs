use chrono::{Days, NaiveDate};
use rusqlite::Connection;

use crate::catalog::{self, ExistingTransaction};
use crate::error::Result;

use super::normalize::{NormalizedImportRow, NormalizedTransaction};

/// Tunables for the duplicate heuristic. The defaults match how statement
/// lines typically drift from book entries; both knobs materially affect
/// false-positive rates, so they are configuration rather than constants.
#[derive(Debug, Clone)]
pub struct DuplicateConfig {
    /// Days of padding on each side of the import's date range, and the
    /// maximum date distance for a Condition B match.
    pub window_days: u64,
    pub amount_epsilon: f64,
    /// Display budget per row, not a correctness limit.
    pub max_matches: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            window_days: 2,
            amount_epsilon: 0.01,
            max_matches: 5,
        }
    }
}

/// A reference to an existing transaction that collided with an import row.
#[derive(Debug, Clone)]
pub struct DuplicateMatch {
    pub transaction_id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub counterparty: Option<String>,
}

/// Flag probable duplicates among the valid rows against existing booked
/// transactions. One bounded query over the padded date range; advisory
/// only — no row is ever rejected here.
pub fn detect_duplicates(
    conn: &Connection,
    org_id: i64,
    rows: Vec<NormalizedImportRow>,
    cfg: &DuplicateConfig,
) -> Result<Vec<NormalizedImportRow>> {
    let dates: Vec<NaiveDate> = rows
        .iter()
        .filter_map(|r| r.normalized.as_ref().map(|n| n.date))
        .collect();
    let (Some(&min), Some(&max)) = (dates.iter().min(), dates.iter().max()) else {
        return Ok(rows);
    };
    let from = min
        .checked_sub_days(Days::new(cfg.window_days))
        .unwrap_or(min);
    let to = max.checked_add_days(Days::new(cfg.window_days)).unwrap_or(max);
    let existing = catalog::transactions_in_range(conn, org_id, from, to)?;
    Ok(flag_duplicates(rows, &existing, cfg))
}

/// Pure matching pass, separated from the query for testability.
pub fn flag_duplicates(
    rows: Vec<NormalizedImportRow>,
    existing: &[ExistingTransaction],
    cfg: &DuplicateConfig,
) -> Vec<NormalizedImportRow> {
    rows.into_iter()
        .map(|mut row| {
            if let Some(n) = row.normalized.as_ref() {
                let matches = matches_for(n, existing, cfg);
                row.is_duplicate_candidate = !matches.is_empty();
                row.duplicate_matches = matches;
            }
            row
        })
        .collect()
}

fn matches_for(
    n: &NormalizedTransaction,
    existing: &[ExistingTransaction],
    cfg: &DuplicateConfig,
) -> Vec<DuplicateMatch> {
    let (row_amount, row_currency) = row_match_pair(n);
    let row_counterparty = n.counterparty.as_ref().map(|c| c.name().trim().to_lowercase());

    let mut matches = Vec::new();
    for e in existing {
        let (e_amount, e_currency) = existing_match_pair(e);
        let amount_matches = (row_amount - e_amount).abs() <= cfg.amount_epsilon
            && row_currency.eq_ignore_ascii_case(e_currency);
        if !amount_matches {
            continue;
        }

        // Condition A: same day + matching counterparty name.
        let same_day = n.date == e.date;
        let counterparty_matches = match (&row_counterparty, &e.counterparty) {
            (Some(a), Some(b)) => a == &b.trim().to_lowercase(),
            _ => false,
        };

        // Condition B: within the window + exact description match.
        let within_window =
            (n.date - e.date).num_days().unsigned_abs() <= cfg.window_days;
        let description_matches = n.description.eq_ignore_ascii_case(&e.description);

        if (same_day && counterparty_matches) || (within_window && description_matches) {
            matches.push(DuplicateMatch {
                transaction_id: e.id,
                date: e.date,
                amount: e_amount,
                currency: e_currency.to_string(),
                description: e.description.clone(),
                counterparty: e.counterparty.clone(),
            });
            if matches.len() >= cfg.max_matches {
                break;
            }
        }
    }
    matches
}

// The pair a human would reconcile against: the original foreign-currency
// amount when one exists, otherwise the base amount.
fn row_match_pair(n: &NormalizedTransaction) -> (f64, &str) {
    match (n.amount_secondary, n.currency_secondary.as_deref()) {
        (Some(amount), Some(currency)) => (amount, currency),
        _ => (n.amount_base, n.currency_base.as_str()),
    }
}

fn existing_match_pair(e: &ExistingTransaction) -> (f64, &str) {
    match (e.amount_secondary, e.currency_secondary.as_deref()) {
        (Some(amount), Some(currency)) => (amount, currency),
        _ => (e.amount_base, e.currency_base.as_str()),
    }
}
