//! Admin CLI for the local FWP customer store.

mod commands;

use clap::{Parser, Subcommand};
use fwp_crm::config::{LayeredConfigOptions, StoreConfig};
use fwp_crm::store::CustomerStore;
use log::info;
use std::path::PathBuf;

/// Command-line options for the admin CLI.
#[derive(Parser, Debug)]
#[command(name = "fwp-crm", version)]
struct Cli {
    /// Optional path to a config.json5 applied over the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

/// Store operations exposed on the command line.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List customers, newest first
    List {
        /// Print the records as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print one customer as JSON
    Show { id: String },
    /// Add a customer from a JSON file
    Add {
        file: PathBuf,
        /// Assign a fresh id and creation time
        #[arg(long)]
        new_id: bool,
    },
    /// Replace a customer from a JSON file
    Update { file: PathBuf },
    /// Attach shipping details from a JSON file
    Ship { id: String, file: PathBuf },
    /// Delete a customer from both tiers
    Delete { id: String },
    /// Remove every customer from both tiers
    Clear {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

/// Entry point for the admin CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fwp_crm::init_logging();

    let cli = Cli::parse();
    info!("starting fwp-crm (config_set={})", cli.config.is_some());

    let mut options = LayeredConfigOptions::new();
    if let Some(path) = cli.config {
        options = options.with_runtime_path(path);
    }
    let config = StoreConfig::load_layered(options)?;
    let store = CustomerStore::from_config(&config)?;

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::List { json } => commands::list(&store, json, &mut stdout).await,
        Command::Show { id } => commands::show(&store, &id, &mut stdout).await,
        Command::Add { file, new_id } => commands::add(&store, &file, new_id, &mut stdout).await,
        Command::Update { file } => commands::update(&store, &file, &mut stdout).await,
        Command::Ship { id, file } => commands::ship(&store, &id, &file, &mut stdout).await,
        Command::Delete { id } => commands::delete(&store, &id, &mut stdout).await,
        Command::Clear { yes } => commands::clear(&store, yes, &mut stdout).await,
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn parses_add_with_new_id_and_global_config() {
        let cli = Cli::try_parse_from([
            "fwp-crm",
            "add",
            "order.json",
            "--new-id",
            "--config",
            "store.json5",
        ])
        .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("store.json5")));
        assert_eq!(
            cli.command,
            Command::Add {
                file: PathBuf::from("order.json"),
                new_id: true,
            }
        );
    }

    #[test]
    fn ship_requires_id_and_file() {
        assert!(Cli::try_parse_from(["fwp-crm", "ship", "only-id"]).is_err());
        let cli = Cli::try_parse_from(["fwp-crm", "ship", "a", "ship.json"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Ship {
                id: "a".to_string(),
                file: PathBuf::from("ship.json"),
            }
        );
    }
}
