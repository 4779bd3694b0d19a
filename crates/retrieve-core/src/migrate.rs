//! Bulk block migration
//!
//! Copies every block from a source store into a destination store, one row
//! at a time: read a row, upsert it, then read the next. There is no batching
//! and no checkpoint. Any failure aborts the run and leaves the destination
//! partially migrated; running again from scratch converges to a full copy
//! because every write is an overwrite-upsert.

use thiserror::Error;
use tracing::{info, Span};

use crate::store::{Store, StoreError};

/// Errors that abort a migration
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Reading the next row from the source failed
    #[error("Failed to read block after {} from source: {source}", .after.as_deref().unwrap_or("<start>"))]
    Read {
        /// Last root read successfully, if any
        after: Option<String>,
        #[source]
        source: StoreError,
    },

    /// Writing a row to the destination failed
    #[error("Failed to write block {root} to destination: {source}")]
    Write {
        root: String,
        #[source]
        source: StoreError,
    },
}

/// Summary of a completed migration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Blocks written to the destination
    pub blocks: u64,
    /// Total block bytes written
    pub bytes: u64,
}

/// One-shot copy of every block from `source` to `dest`
pub struct Migration<'a> {
    source: &'a Store,
    dest: &'a Store,
    span: Span,
}

impl<'a> Migration<'a> {
    pub fn new(source: &'a Store, dest: &'a Store) -> Self {
        Self {
            source,
            dest,
            span: tracing::info_span!("migrate"),
        }
    }

    /// Log under the given span instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Copy all blocks, stopping at the first error
    pub async fn run(&self) -> Result<MigrationReport, MigrationError> {
        info!(
            parent: &self.span,
            source = %self.source.target(),
            source_dialect = %self.source.dialect(),
            dest = %self.dest.target(),
            dest_dialect = %self.dest.dialect(),
            "migration started"
        );

        let mut report = MigrationReport::default();
        let mut next = self
            .source
            .first_block()
            .await
            .map_err(|source| MigrationError::Read {
                after: None,
                source,
            })?;

        while let Some(block) = next {
            self.dest
                .upsert(&block.root, &block.data)
                .await
                .map_err(|source| MigrationError::Write {
                    root: block.root.clone(),
                    source,
                })?;

            report.blocks += 1;
            report.bytes += block.data.len() as u64;
            info!(parent: &self.span, root = %block.root, size = block.data.len(), "migrated");

            next = self
                .source
                .next_block_after(&block.root)
                .await
                .map_err(|source| MigrationError::Read {
                    after: Some(block.root.clone()),
                    source,
                })?;
        }

        info!(
            parent: &self.span,
            blocks = report.blocks,
            bytes = report.bytes,
            "migration complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MEMORY;
    use tempfile::TempDir;

    async fn seeded_source() -> Store {
        let source = Store::open(MEMORY).await.unwrap();
        source.upsert("bafy1", &[0x01, 0x02, 0x03]).await.unwrap();
        source.upsert("bafy2", b"second block").await.unwrap();
        source.upsert("bafy3", &[]).await.unwrap();
        source
    }

    async fn assert_same_rows(source: &Store, dest: &Store) {
        assert_eq!(
            source.block_count().await.unwrap(),
            dest.block_count().await.unwrap()
        );
        let mut next = source.first_block().await.unwrap();
        while let Some(block) = next {
            assert_eq!(
                dest.get_block(&block.root).await.unwrap(),
                Some(block.data.clone()),
                "{}",
                block.root
            );
            assert_eq!(dest.get_size(&block.root).await.unwrap(), Some(block.size));
            next = source.next_block_after(&block.root).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_migrate_copies_every_block() {
        let source = seeded_source().await;
        let dest = Store::open(MEMORY).await.unwrap();

        let report = Migration::new(&source, &dest).run().await.unwrap();

        assert_eq!(report.blocks, 3);
        assert_eq!(report.bytes, 3 + 12);
        assert_same_rows(&source, &dest).await;
    }

    #[tokio::test]
    async fn test_migrate_twice_converges() {
        let source = seeded_source().await;
        let dest = Store::open(MEMORY).await.unwrap();

        Migration::new(&source, &dest).run().await.unwrap();
        let second = Migration::new(&source, &dest).run().await.unwrap();

        assert_eq!(second.blocks, 3);
        assert_same_rows(&source, &dest).await;
    }

    #[tokio::test]
    async fn test_resume_after_partial_run() {
        let source = seeded_source().await;
        let dest = Store::open(MEMORY).await.unwrap();

        // State left by a run that died after its first write, plus a stale
        // copy of a later block
        dest.upsert("bafy1", &[0x01, 0x02, 0x03]).await.unwrap();
        dest.upsert("bafy2", b"stale").await.unwrap();

        Migration::new(&source, &dest).run().await.unwrap();

        assert_same_rows(&source, &dest).await;
    }

    #[tokio::test]
    async fn test_empty_source() {
        let source = Store::open(MEMORY).await.unwrap();
        let dest = Store::open(MEMORY).await.unwrap();

        let report = Migration::new(&source, &dest).run().await.unwrap();
        assert_eq!(report, MigrationReport::default());
    }

    #[tokio::test]
    async fn test_read_failure_at_start_aborts() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("source.db");
        let source_path = source_path.to_str().unwrap();

        let source = Store::open(source_path).await.unwrap();
        source.upsert("bafy1", &[0x01, 0x02, 0x03]).await.unwrap();
        let dest = Store::open(MEMORY).await.unwrap();

        // Break the source behind the store's back
        let conn = rusqlite::Connection::open(source_path).unwrap();
        conn.execute_batch("DROP TABLE RootBlocks").unwrap();
        drop(conn);

        let err = Migration::new(&source, &dest).run().await.unwrap_err();
        match err {
            MigrationError::Read { after, .. } => assert_eq!(after, None),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(dest.block_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_mid_walk_aborts() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("source.db");
        let source_path = source_path.to_str().unwrap();

        let source = Store::open(source_path).await.unwrap();
        source.upsert("bafy1", &[0x01, 0x02, 0x03]).await.unwrap();
        let dest = Store::open(MEMORY).await.unwrap();

        // A second row the store cannot decode
        let conn = rusqlite::Connection::open(source_path).unwrap();
        conn.execute(
            "INSERT INTO RootBlocks (root, size, block) VALUES ('bafy2', -1, x'00')",
            [],
        )
        .unwrap();
        drop(conn);

        let err = Migration::new(&source, &dest).run().await.unwrap_err();
        match err {
            MigrationError::Read { after, source } => {
                assert_eq!(after.as_deref(), Some("bafy1"));
                assert!(matches!(source, StoreError::InvalidSize { .. }), "{source}");
            }
            other => panic!("unexpected error: {other}"),
        }

        // Rows before the failure were copied, nothing after it
        assert_eq!(dest.block_count().await.unwrap(), 1);
        assert_eq!(
            dest.get_block("bafy1").await.unwrap(),
            Some(vec![0x01, 0x02, 0x03])
        );
    }

    #[tokio::test]
    async fn test_write_failure_aborts() {
        let temp = TempDir::new().unwrap();
        let dest_path = temp.path().join("dest.db");
        let dest_path = dest_path.to_str().unwrap();

        let source = seeded_source().await;
        let dest = Store::open(dest_path).await.unwrap();

        // Break the destination behind the store's back
        let conn = rusqlite::Connection::open(dest_path).unwrap();
        conn.execute_batch("DROP TABLE RootBlocks").unwrap();
        drop(conn);

        let err = Migration::new(&source, &dest).run().await.unwrap_err();
        match err {
            MigrationError::Write { root, .. } => assert_eq!(root, "bafy1"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
