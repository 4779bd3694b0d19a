//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use retrieve_core::{MigrationReport, RootBlock, RootSize};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a fetched block
    ///
    /// With `out`, the raw bytes go to that file. Otherwise JSON mode prints
    /// the wire message and the other modes write the raw bytes to stdout.
    pub fn print_block(&self, block: &RootBlock, out: Option<&Path>) -> Result<()> {
        if let Some(path) = out {
            std::fs::write(path, &block.block)
                .with_context(|| format!("Failed to write block to {:?}", path))?;
            self.success(&format!(
                "Wrote {} ({}) to {}",
                block.root,
                human_size(block.block.len() as u64),
                path.display()
            ));
            return Ok(());
        }

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(block)?);
            }
            OutputFormat::Human | OutputFormat::Quiet => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(&block.block)
                    .and_then(|_| stdout.flush())
                    .context("Failed to write block to stdout")?;
            }
        }
        Ok(())
    }

    /// Print a block size
    pub fn print_size(&self, size: &RootSize) {
        match self.format {
            OutputFormat::Human => {
                println!("{}  {}", size.root, human_size(size.size));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"root": size.root, "size": size.size}));
            }
            OutputFormat::Quiet => {
                println!("{}", size.size);
            }
        }
    }

    /// Print whether a block is available
    pub fn print_has(&self, root: &str, present: bool) {
        match self.format {
            OutputFormat::Human => {
                if present {
                    println!("{} is available", root);
                } else {
                    println!("{} is not available", root);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"root": root, "has": present}));
            }
            OutputFormat::Quiet => {
                println!("{}", present);
            }
        }
    }

    /// Print the summary of a finished migration
    pub fn print_migration(&self, report: &MigrationReport) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "✓ Migrated {} block(s), {}",
                    report.blocks,
                    human_size(report.bytes)
                );
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "success",
                        "blocks": report.blocks,
                        "bytes": report.bytes
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", report.blocks);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Format a byte count with a binary unit
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
