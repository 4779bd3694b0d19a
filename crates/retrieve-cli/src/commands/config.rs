//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use retrieve_core::store::dialect::redact;
use retrieve_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let store = redact(&config.store);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "listen": config.listen,
                    "store": store,
                    "server_addr": config.server_addr,
                    "max_connections": config.max_connections,
                    "log_level": config.log_level
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  listen:          {}", config.listen);
            println!("  store:           {}", store);
            println!("  server_addr:     {}", config.server_addr);
            println!("  max_connections: {}", config.max_connections);
            println!("  log_level:       {}", config.log_level);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "store" { redact(&value) } else { value };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "listen" => config.listen = value.to_string(),
        "store" => config.store = value.to_string(),
        "server_addr" => config.server_addr = value.to_string(),
        "max_connections" => {
            config.max_connections = value
                .parse()
                .context("Invalid value for max_connections. Use a positive integer.")?;
        }
        "log_level" => config.log_level = value.to_string(),
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: listen, store, server_addr, max_connections, log_level",
                key
            );
        }
    }
    Ok(())
}
