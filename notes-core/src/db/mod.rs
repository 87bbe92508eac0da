pub mod migrations;

use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;
use tokio_rusqlite::Connection;

use migrations::MIGRATIONS;

pub use rusqlite;
pub use tokio_rusqlite;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not_found")]
    NotFound(String),
    #[error(transparent)]
    TokioRusqlite(tokio_rusqlite::Error),
    #[error(transparent)]
    Rusqlite(rusqlite::Error),
    #[error(transparent)]
    Migration(rusqlite_migration::Error),
}

impl Error {
    pub fn not_found_message(self, message: impl Into<String>) -> Self {
        if matches!(self, Self::NotFound(_)) {
            return Self::NotFound(message.into());
        }
        self
    }
}

impl From<tokio_rusqlite::Error> for Error {
    fn from(error: tokio_rusqlite::Error) -> Self {
        match error {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::QueryReturnedNoRows) => Self::NotFound("Not found".into()),
            tokio_rusqlite::Error::Other(err) => match err.downcast::<rusqlite_migration::Error>() {
                Ok(migration) => Self::Migration(*migration),
                Err(err) => Self::TokioRusqlite(tokio_rusqlite::Error::Other(err)),
            },
            error => Self::TokioRusqlite(error),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound("Not found".into()),
            error => Self::Rusqlite(error),
        }
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(error: rusqlite_migration::Error) -> Self {
        Self::Migration(error)
    }
}

pub type DB = Connection;

/// Opens the database at `path` and brings its schema up to date.
pub async fn open_db(path: impl AsRef<Path>) -> Result<DB> {
    let path = path.as_ref().to_path_buf();
    tracing::debug!("opening note database at {}", path.display());

    let conn = Connection::open(path).await?;

    conn.call(|conn| {
        migrate(conn)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(())
    })
    .await?;

    Ok(conn)
}

#[cfg(test)]
pub async fn init_test_db() -> Result<DB> {
    let conn = Connection::open_in_memory().await?;

    conn.call(|conn| {
        migrate(conn)?;
        Ok(())
    })
    .await?;

    Ok(conn)
}

fn migrate(conn: &mut rusqlite::Connection) -> tokio_rusqlite::Result<()> {
    MIGRATIONS
        .to_latest(conn)
        .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))
}

/// Database handle that opens on first use.
///
/// Concurrent first callers share one open: whoever gets there first runs it
/// and the rest await its result. A failed open leaves the handle empty, so
/// the next call tries again. Once open, the connection lives as long as the
/// handle.
#[derive(Debug)]
pub struct LazyDb {
    path: PathBuf,
    cell: OnceCell<DB>,
}

impl LazyDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    /// Wraps a connection that is already open and migrated.
    pub fn ready(db: DB) -> Self {
        Self {
            path: PathBuf::new(),
            cell: OnceCell::new_with(Some(db)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> Result<&DB> {
        self.cell.get_or_try_init(|| open_db(&self.path)).await
    }
}
