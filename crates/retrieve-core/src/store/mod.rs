//! Block storage
//!
//! The [`Store`] binds a live connection to a [`Dialect`]:
//! - **Embedded**: one SQLite connection behind a mutex. Statements run on
//!   the blocking pool one at a time, which is the single-writer constraint.
//! - **Distributed**: a Postgres-protocol connection pool (YugabyteDB,
//!   Postgres) that accepts many concurrent writers.
//!
//! Every write is an upsert keyed by `root` with last-write-wins semantics in
//! both dialects. A missing row is reported as `Ok(None)`, never as an error.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open("/var/lib/retrieve/blocks.db").await?;
//! store.upsert("bafy1", &[1, 2, 3]).await?;
//! assert_eq!(store.get_size("bafy1").await?, Some(3));
//! ```

pub mod dialect;
pub mod error;
pub mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::Connection as _;
use tracing::{debug, info};

pub use dialect::Dialect;
pub use error::{StoreError, StoreResult};

/// Connection string that opens a private in-memory embedded database
pub const MEMORY: &str = ":memory:";

/// Default pool size for the distributed dialect
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

/// Default wait for a distributed connection, at open and from the pool
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long an embedded statement waits on a file lock held by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A stored block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Content identifier, opaque to the store
    pub root: String,
    /// Byte length of `data` at the time of write
    pub size: u64,
    pub data: Vec<u8>,
}

impl Block {
    fn from_row(root: String, size: i64, data: Vec<u8>) -> StoreResult<Self> {
        let size = u64::try_from(size).map_err(|_| StoreError::InvalidSize {
            root: root.clone(),
            size,
        })?;
        Ok(Self { root, size, data })
    }
}

/// Raw `(root, size, block)` row
type BlockRow = (String, i64, Vec<u8>);

/// Options applied when opening a store
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Pool size for the distributed dialect (embedded is always 1)
    pub max_connections: u32,
    /// How long to wait for a distributed connection before giving up
    pub acquire_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

#[derive(Debug)]
enum Backend {
    Embedded(Arc<Mutex<Connection>>),
    Distributed(PgPool),
}

/// Handle on an open block store
#[derive(Debug)]
pub struct Store {
    dialect: Dialect,
    /// Connection string with credentials removed
    target: String,
    backend: Backend,
}

impl Store {
    /// Open a store with default options
    pub async fn open(conn: &str) -> StoreResult<Self> {
        Self::open_with_options(conn, StoreOptions::default()).await
    }

    /// Open a store, selecting the dialect from the connection string
    ///
    /// Creates the block table if it does not exist. Opening the same target
    /// twice is safe and keeps existing rows.
    pub async fn open_with_options(conn: &str, options: StoreOptions) -> StoreResult<Self> {
        let dialect = Dialect::from_connection_string(conn);
        let target = dialect::redact(conn);

        let backend = match dialect {
            Dialect::Embedded => {
                let path = conn.to_string();
                let connection =
                    tokio::task::spawn_blocking(move || open_embedded(&path)).await??;
                Backend::Embedded(Arc::new(Mutex::new(connection)))
            }
            Dialect::Distributed => {
                ping_distributed(conn, options.acquire_timeout)
                    .await
                    .map_err(|e| StoreError::connect(dialect, target.clone(), e))?;

                let max_connections = dialect.max_connections(options.max_connections);
                let pool = PgPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(options.acquire_timeout)
                    .connect(conn)
                    .await
                    .map_err(|e| StoreError::connect(dialect, target.clone(), e))?;
                schema::init_distributed(&pool)
                    .await
                    .map_err(|e| StoreError::schema(dialect, e))?;
                Backend::Distributed(pool)
            }
        };

        info!(
            dialect = %dialect,
            target = %target,
            max_connections = dialect.max_connections(options.max_connections),
            "store opened"
        );

        Ok(Self {
            dialect,
            target,
            backend,
        })
    }

    /// Dialect resolved at open time
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Connection target with credentials removed
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Get the bytes stored for `root`
    pub async fn get_block(&self, root: &str) -> StoreResult<Option<Vec<u8>>> {
        let sql = self.dialect.select_block_sql();
        match &self.backend {
            Backend::Embedded(conn) => {
                let root = root.to_owned();
                with_embedded(conn, move |conn| {
                    Ok(conn
                        .query_row(sql, [&root], |row| row.get::<_, Vec<u8>>(0))
                        .optional()?)
                })
                .await
            }
            Backend::Distributed(pool) => Ok(sqlx::query_scalar::<_, Vec<u8>>(sql)
                .bind(root)
                .fetch_optional(pool)
                .await?),
        }
    }

    /// Get the stored size for `root` without reading the block bytes
    pub async fn get_size(&self, root: &str) -> StoreResult<Option<u64>> {
        let sql = self.dialect.select_size_sql();
        let size = match &self.backend {
            Backend::Embedded(conn) => {
                let root = root.to_owned();
                with_embedded(conn, move |conn| {
                    Ok(conn
                        .query_row(sql, [&root], |row| row.get::<_, i64>(0))
                        .optional()?)
                })
                .await?
            }
            Backend::Distributed(pool) => {
                sqlx::query_scalar::<_, i64>(sql)
                    .bind(root)
                    .fetch_optional(pool)
                    .await?
            }
        };

        size.map(|size| {
            u64::try_from(size).map_err(|_| StoreError::InvalidSize {
                root: root.to_owned(),
                size,
            })
        })
        .transpose()
    }

    /// Insert or fully replace the block for `root`
    ///
    /// The size is derived from `data`; returns it.
    pub async fn upsert(&self, root: &str, data: &[u8]) -> StoreResult<u64> {
        let sql = self.dialect.upsert_sql();
        let size = data.len() as i64;
        match &self.backend {
            Backend::Embedded(conn) => {
                let root = root.to_owned();
                let data = data.to_vec();
                with_embedded(conn, move |conn| {
                    conn.execute(sql, rusqlite::params![root, size, data])?;
                    Ok(())
                })
                .await?;
            }
            Backend::Distributed(pool) => {
                sqlx::query(sql)
                    .bind(root)
                    .bind(size)
                    .bind(data)
                    .execute(pool)
                    .await?;
            }
        }
        Ok(data.len() as u64)
    }

    /// Remove the block for `root`
    ///
    /// Returns whether a row existed. Deleting a missing root is not an error.
    pub async fn delete(&self, root: &str) -> StoreResult<bool> {
        let sql = self.dialect.delete_sql();
        let removed = match &self.backend {
            Backend::Embedded(conn) => {
                let root = root.to_owned();
                with_embedded(conn, move |conn| Ok(conn.execute(sql, [&root])? as u64)).await?
            }
            Backend::Distributed(pool) => {
                sqlx::query(sql)
                    .bind(root)
                    .execute(pool)
                    .await?
                    .rows_affected()
            }
        };
        Ok(removed > 0)
    }

    /// First block in root order
    pub async fn first_block(&self) -> StoreResult<Option<Block>> {
        self.fetch_block_row(self.dialect.first_block_sql(), None)
            .await
    }

    /// Block whose root follows `cursor` in root order
    ///
    /// Together with [`Store::first_block`] this walks every row in a stable
    /// order, one row per statement.
    pub async fn next_block_after(&self, cursor: &str) -> StoreResult<Option<Block>> {
        self.fetch_block_row(self.dialect.next_block_sql(), Some(cursor))
            .await
    }

    /// Number of stored blocks
    pub async fn block_count(&self) -> StoreResult<u64> {
        let sql = self.dialect.count_sql();
        let count = match &self.backend {
            Backend::Embedded(conn) => {
                with_embedded(conn, move |conn| {
                    Ok(conn.query_row(sql, [], |row| row.get::<_, i64>(0))?)
                })
                .await?
            }
            Backend::Distributed(pool) => {
                sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await?
            }
        };
        Ok(count.max(0) as u64)
    }

    /// Close the underlying connections
    pub async fn close(self) {
        match self.backend {
            Backend::Embedded(_) => {}
            Backend::Distributed(pool) => pool.close().await,
        }
        debug!(dialect = %self.dialect, target = %self.target, "store closed");
    }

    async fn fetch_block_row(
        &self,
        sql: &'static str,
        cursor: Option<&str>,
    ) -> StoreResult<Option<Block>> {
        let row = match &self.backend {
            Backend::Embedded(conn) => {
                let cursor = cursor.map(str::to_owned);
                with_embedded(conn, move |conn| {
                    let mut stmt = conn.prepare(sql)?;
                    let read = |row: &rusqlite::Row<'_>| -> rusqlite::Result<BlockRow> {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    };
                    let row = match &cursor {
                        Some(cursor) => stmt.query_row([cursor], read),
                        None => stmt.query_row([], read),
                    };
                    Ok(row.optional()?)
                })
                .await?
            }
            Backend::Distributed(pool) => {
                let query = sqlx::query_as::<_, BlockRow>(sql);
                let query = match cursor {
                    Some(cursor) => query.bind(cursor),
                    None => query,
                };
                query.fetch_optional(pool).await?
            }
        };

        row.map(|(root, size, data)| Block::from_row(root, size, data))
            .transpose()
    }
}

/// Open the embedded database file and ensure the block table exists
fn open_embedded(path: &str) -> StoreResult<Connection> {
    if path != MEMORY {
        let parent = PathBuf::from(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from);
        if let Some(parent) = parent {
            std::fs::create_dir_all(&parent).map_err(|source| StoreError::CreateDirectory {
                path: parent.clone(),
                source,
            })?;
        }
    }

    let conn = Connection::open(path)
        .map_err(|e| StoreError::connect(Dialect::Embedded, path.to_string(), e))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| StoreError::connect(Dialect::Embedded, path.to_string(), e))?;
    schema::init_embedded(&conn).map_err(|e| StoreError::schema(Dialect::Embedded, e))?;

    Ok(conn)
}

/// Open and close a single connection so an unreachable backend reports its
/// real cause instead of a pool timeout
async fn ping_distributed(conn: &str, timeout: Duration) -> Result<(), sqlx::Error> {
    let connection = tokio::time::timeout(timeout, PgConnection::connect(conn))
        .await
        .map_err(|_| {
            sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("no connection within {:?}", timeout),
            ))
        })??;
    connection.close().await
}

/// Run a statement on the embedded connection from the blocking pool
async fn with_embedded<T, F>(conn: &Arc<Mutex<Connection>>, f: F) -> StoreResult<T>
where
    F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&guard)
    })
    .await?
}
