pub mod accounts;
pub mod categories;
pub mod import;
pub mod init;
pub mod status;
pub mod templates;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::catalog;
use crate::error::{Result, SatchelError};
use crate::models::Organization;
use crate::settings::load_settings;

pub const DB_FILENAME: &str = "satchel.db";

/// The organization a command operates on: an explicit `--org`, falling back
/// to the one selected at init time.
pub(crate) fn resolve_org(conn: &Connection, org_flag: Option<&str>) -> Result<Organization> {
    let name = match org_flag {
        Some(n) => n.to_string(),
        None => {
            let settings = load_settings();
            if settings.current_org.is_empty() {
                return Err(SatchelError::Other(
                    "No organization selected. Pass --org or run `satchel init` first.".to_string(),
                ));
            }
            settings.current_org
        }
    };
    catalog::find_organization(conn, &name)
}

#[derive(Parser)]
#[command(
    name = "satchel",
    about = "Multi-organization bookkeeping CLI with CSV/ZIP statement import."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up Satchel: choose a data directory and create an organization.
    Init {
        /// Organization name, e.g. 'Acme Consulting'
        org: String,
        /// Path for Satchel data (default: ~/Documents/satchel)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Base currency code for the organization
        #[arg(long = "base-currency", default_value = "USD")]
        base_currency: String,
        /// Decimal separator used in this organization's statements
        #[arg(long = "decimal-separator", default_value_t = '.')]
        decimal_separator: char,
        /// Thousands separator used in this organization's statements
        #[arg(long = "thousands-separator", default_value_t = ',')]
        thousands_separator: char,
        /// Date format: DD_MM_YYYY, MM_DD_YYYY, or YYYY_MM_DD
        #[arg(long = "date-format", default_value = "YYYY_MM_DD")]
        date_format: String,
    },
    /// Preview or commit a CSV/ZIP statement import.
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Manage saved import templates.
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Show the database location and per-organization statistics.
    Status,
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Run the pipeline and show every row with its errors; writes nothing.
    Preview {
        /// Path to a CSV file or a ZIP archive containing transactions.csv
        file: String,
        /// Organization name (default: current organization)
        #[arg(long)]
        org: Option<String>,
        /// Saved template to take mapping and parsing options from
        #[arg(long)]
        template: Option<String>,
        /// Path to a column mapping JSON file (when not using a template)
        #[arg(long)]
        mapping: Option<String>,
        /// Direction mode: type_column or sign_based
        #[arg(long, default_value = "type_column")]
        direction: String,
        /// Cell delimiter (may be multi-character; '\t' via shell quoting)
        #[arg(long)]
        delimiter: Option<String>,
        /// Zero-based index of the header row
        #[arg(long = "header-row", default_value = "0")]
        header_row: usize,
        /// The file has no header row; columns are addressed as 'Column N'
        #[arg(long = "no-headers")]
        no_headers: bool,
    },
    /// Run the pipeline and write the valid rows into the books.
    Commit {
        /// Path to a CSV file or a ZIP archive containing transactions.csv
        file: String,
        /// Organization name (default: current organization)
        #[arg(long)]
        org: Option<String>,
        /// Saved template to take mapping and parsing options from
        #[arg(long)]
        template: Option<String>,
        /// Path to a column mapping JSON file (when not using a template)
        #[arg(long)]
        mapping: Option<String>,
        /// Direction mode: type_column or sign_based
        #[arg(long, default_value = "type_column")]
        direction: String,
        /// Cell delimiter (may be multi-character)
        #[arg(long)]
        delimiter: Option<String>,
        /// Zero-based index of the header row
        #[arg(long = "header-row", default_value = "0")]
        header_row: usize,
        /// The file has no header row
        #[arg(long = "no-headers")]
        no_headers: bool,
        /// Leave out rows flagged as probable duplicates
        #[arg(long = "skip-duplicates")]
        skip_duplicates: bool,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Save (or overwrite) a named template from a mapping file and options.
    Save {
        /// Template name, e.g. 'first-national-checking'
        name: String,
        /// Path to a column mapping JSON file
        #[arg(long)]
        mapping: String,
        /// Organization name (default: current organization)
        #[arg(long)]
        org: Option<String>,
        /// Direction mode: type_column or sign_based
        #[arg(long, default_value = "type_column")]
        direction: String,
        /// Cell delimiter
        #[arg(long, default_value = ",")]
        delimiter: String,
        /// Zero-based index of the header row
        #[arg(long = "header-row", default_value = "0")]
        header_row: usize,
        /// The file has no header row
        #[arg(long = "no-headers")]
        no_headers: bool,
    },
    /// List saved templates.
    List {
        #[arg(long)]
        org: Option<String>,
    },
    /// Delete a saved template.
    Delete {
        /// Template name
        name: String,
        #[arg(long)]
        org: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        /// Account name, e.g. 'Business Checking'
        name: String,
        #[arg(long)]
        org: Option<String>,
    },
    /// List active accounts.
    List {
        #[arg(long)]
        org: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a new category.
    Add {
        /// Category name, e.g. 'Hosting'
        name: String,
        /// Category type: income or expense
        #[arg(long = "type")]
        category_type: String,
        #[arg(long)]
        org: Option<String>,
    },
    /// List active categories.
    List {
        #[arg(long)]
        org: Option<String>,
    },
}
