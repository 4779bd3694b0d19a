//! Retrieve CLI
//!
//! Command-line interface for the retrieve blockstore: run the block server,
//! migrate an embedded store into a distributed one and query a running
//! server.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use retrieve_core::{Client, Config};

mod commands;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "retrieve")]
#[command(about = "Remote blockstore for content retrieval")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Block server address for client commands (host:port or URL)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the block server
    Serve {
        /// Address to listen on
        #[arg(long)]
        listen: Option<String>,
        /// Store connection string (postgres:// URL or embedded database path)
        #[arg(long)]
        store: Option<String>,
    },
    /// Copy every block from an embedded store into a distributed store
    Migrate {
        /// Embedded store path
        embedded: String,
        /// Distributed store connection string (postgres://...)
        distributed: String,
    },
    /// Fetch a block from the server
    Get {
        /// Block root
        root: String,
        /// Write the block to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show the stored size of a block
    Size {
        /// Block root
        root: String,
    },
    /// Check whether the server has a block
    Has {
        /// Block root
        root: String,
    },
    /// Upload a file as a block
    Put {
        /// Block root
        root: String,
        /// File holding the block bytes
        file: PathBuf,
    },
    /// Delete a block directly from a store
    #[command(alias = "rm")]
    Delete {
        /// Block root
        root: String,
        /// Store connection string (postgres:// URL or embedded database path)
        #[arg(long)]
        store: Option<String>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (listen, store, server_addr, max_connections, log_level)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands handle their own loading
    if let Commands::Config { command } = cli.command {
        return handle_config_command(command, cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    logging::init(&config.log_level, cli.debug);

    // The client is blocking, so only server-side commands get a runtime
    match cli.command {
        Commands::Serve { listen, store } => {
            runtime()?.block_on(commands::serve::run(&config, listen, store))
        }
        Commands::Migrate {
            embedded,
            distributed,
        } => runtime()?.block_on(commands::migrate::run(
            &config,
            &embedded,
            &distributed,
            &output,
        )),
        Commands::Get { root, out } => {
            commands::block::get(&client(&config, cli.server)?, &root, out, &output)
        }
        Commands::Size { root } => {
            commands::block::size(&client(&config, cli.server)?, &root, &output)
        }
        Commands::Has { root } => {
            commands::block::has(client(&config, cli.server)?, &root, &output)
        }
        Commands::Put { root, file } => {
            commands::block::put(&client(&config, cli.server)?, &root, &file, &output)
        }
        Commands::Delete { root, store } => {
            runtime()?.block_on(commands::block::delete(&config, store, &root, &output))
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}

/// Client for `--server`, falling back to the configured address
fn client(config: &Config, server: Option<String>) -> Result<Client> {
    let addr = server.unwrap_or_else(|| config.server_addr.clone());
    Client::new(&addr).with_context(|| format!("Invalid server address: {}", addr))
}
