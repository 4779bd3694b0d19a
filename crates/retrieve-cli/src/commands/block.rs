//! Block command handlers
//!
//! `get`, `size`, `has` and `put` talk to a running block server. `delete`
//! has no wire route and works directly on a store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use retrieve_core::{BlockServer, BlockSource, Client, Config, Store};

use crate::output::Output;

/// Fetch a block and print it or write it to `out`
pub fn get(client: &Client, root: &str, out: Option<PathBuf>, output: &Output) -> Result<()> {
    let block = client
        .fetch_block(root)
        .with_context(|| format!("Failed to get block {}", root))?;
    output.print_block(&block, out.as_deref())
}

/// Print the stored size of a block
pub fn size(client: &Client, root: &str, output: &Output) -> Result<()> {
    let size = client
        .fetch_size(root)
        .with_context(|| format!("Failed to get size of {}", root))?;
    output.print_size(&size);
    Ok(())
}

/// Report whether the server has a block
///
/// Uses the best-effort lookup, so an unreachable server reads as absent.
pub fn has(client: Client, root: &str, output: &Output) -> Result<()> {
    let present = client.best_effort().has(root);
    output.print_has(root, present);
    Ok(())
}

/// Upload the contents of `file` as the block for `root`
pub fn put(client: &Client, root: &str, file: &Path, output: &Output) -> Result<()> {
    let data = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    client
        .post_block(root, &data)
        .with_context(|| format!("Failed to store block {}", root))?;
    output.success(&format!("Stored {} ({} bytes)", root, data.len()));
    Ok(())
}

/// Delete a block directly from a store
///
/// Goes through [`BlockServer`] so the delete is logged like any other
/// server operation.
pub async fn delete(
    config: &Config,
    store: Option<String>,
    root: &str,
    output: &Output,
) -> Result<()> {
    let conn = store.unwrap_or_else(|| config.store.clone());
    let store = Store::open_with_options(&conn, config.store_options())
        .await
        .context("Failed to open store")?;
    let store = Arc::new(store);

    let server = BlockServer::new(Arc::clone(&store));
    let result = server.delete(root).await;
    drop(server);
    if let Ok(store) = Arc::try_unwrap(store) {
        store.close().await;
    }

    if result.with_context(|| format!("Failed to delete block {}", root))? {
        output.success(&format!("Deleted {}", root));
    } else {
        output.message(&format!("{} was not stored", root));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_delete_removes_block() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blocks.db");
        let conn = path.to_str().unwrap().to_string();

        let store = Store::open(&conn).await.unwrap();
        store.upsert("bafy1", &[0x01, 0x02]).await.unwrap();
        store.close().await;

        let config = Config::default();
        let output = Output::new(OutputFormat::Quiet);
        delete(&config, Some(conn.clone()), "bafy1", &output)
            .await
            .unwrap();
        // Deleting again is not an error
        delete(&config, Some(conn.clone()), "bafy1", &output)
            .await
            .unwrap();

        let store = Store::open(&conn).await.unwrap();
        assert_eq!(store.get_block("bafy1").await.unwrap(), None);
    }

    #[test]
    fn test_put_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let client = Client::new("127.0.0.1:9").unwrap();
        let output = Output::new(OutputFormat::Quiet);

        let err = put(&client, "bafy1", &temp.path().join("missing"), &output).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
