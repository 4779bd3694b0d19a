//! Block table schema
//!
//! One table, `RootBlocks`, maps a content identifier to its size and bytes.
//! Creation is idempotent: opening an existing store leaves its rows alone.

use rusqlite::Connection;
use sqlx::PgPool;

use super::dialect::Dialect;

/// Name of the block table
pub const BLOCK_TABLE: &str = "RootBlocks";

/// Create the block table in an embedded database if absent
pub fn init_embedded(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(Dialect::Embedded.create_table_sql())
}

/// Create the block table in a distributed database if absent
pub async fn init_distributed(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(Dialect::Distributed.create_table_sql())
        .execute(pool)
        .await?;
    Ok(())
}

/// Check whether the block table exists in an embedded database
pub fn embedded_table_exists(conn: &Connection) -> rusqlite::Result<bool> {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1")?
        .exists([BLOCK_TABLE])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_embedded() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!embedded_table_exists(&conn).unwrap());

        init_embedded(&conn).unwrap();
        assert!(embedded_table_exists(&conn).unwrap());

        let columns: Vec<String> = conn
            .prepare("SELECT name FROM pragma_table_info('RootBlocks') ORDER BY cid")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert_eq!(columns, vec!["root", "size", "block"]);
    }

    #[test]
    fn test_init_embedded_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_embedded(&conn).unwrap();
        conn.execute(
            "INSERT INTO RootBlocks (root, size, block) VALUES ('bafy1', 3, x'010203')",
            [],
        )
        .unwrap();

        init_embedded(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM RootBlocks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_table_check_reports_errors() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("garbage.db");
        std::fs::write(&path, vec![0x5a; 4096]).unwrap();
        let conn = Connection::open(&path).unwrap();

        // Not a database file: an error, not "absent"

        assert!(embedded_table_exists(&conn).is_err());
    }

    #[test]
    fn test_root_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        init_embedded(&conn).unwrap();
        conn.execute(
            "INSERT INTO RootBlocks (root, size, block) VALUES ('bafy1', 1, x'01')",
            [],
        )
        .unwrap();

        let dup = conn.execute(
            "INSERT INTO RootBlocks (root, size, block) VALUES ('bafy1', 1, x'02')",
            [],
        );
        assert!(dup.is_err());
    }
}
