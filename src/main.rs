mod catalog;
mod cli;
mod db;
mod error;
mod fmt;
mod import;
mod models;
mod settings;
mod templates;

use clap::Parser;

use cli::{
    AccountsCommands, CategoriesCommands, Cli, Commands, ImportCommands, TemplateCommands,
};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            org,
            data_dir,
            base_currency,
            decimal_separator,
            thousands_separator,
            date_format,
        } => cli::init::run(
            &org,
            data_dir,
            &base_currency,
            decimal_separator,
            thousands_separator,
            &date_format,
        ),
        Commands::Import { command } => match command {
            ImportCommands::Preview {
                file,
                org,
                template,
                mapping,
                direction,
                delimiter,
                header_row,
                no_headers,
            } => cli::import::preview(&cli::import::ImportArgs {
                file,
                org,
                template,
                mapping,
                direction,
                delimiter,
                header_row,
                no_headers,
            }),
            ImportCommands::Commit {
                file,
                org,
                template,
                mapping,
                direction,
                delimiter,
                header_row,
                no_headers,
                skip_duplicates,
            } => cli::import::commit(
                &cli::import::ImportArgs {
                    file,
                    org,
                    template,
                    mapping,
                    direction,
                    delimiter,
                    header_row,
                    no_headers,
                },
                skip_duplicates,
            ),
        },
        Commands::Templates { command } => match command {
            TemplateCommands::Save {
                name,
                mapping,
                org,
                direction,
                delimiter,
                header_row,
                no_headers,
            } => cli::templates::save(&cli::templates::SaveArgs {
                name,
                mapping,
                org,
                direction,
                delimiter,
                header_row,
                no_headers,
            }),
            TemplateCommands::List { org } => cli::templates::list(org.as_deref()),
            TemplateCommands::Delete { name, org } => {
                cli::templates::delete(&name, org.as_deref())
            }
        },
        Commands::Accounts { command } => match command {
            AccountsCommands::Add { name, org } => cli::accounts::add(&name, org.as_deref()),
            AccountsCommands::List { org } => cli::accounts::list(org.as_deref()),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::Add {
                name,
                category_type,
                org,
            } => cli::categories::add(&name, &category_type, org.as_deref()),
            CategoriesCommands::List { org } => cli::categories::list(org.as_deref()),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
