use crate::db;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The backing store could not be opened or its schema created.
    #[error("storage_unavailable")]
    StorageUnavailable(#[source] db::Error),

    #[error("persistence_read_failed")]
    PersistenceReadFailed(#[source] db::Error),

    /// An insert, update or delete was rejected by the backing store.
    #[error("persistence_write_failed")]
    PersistenceWriteFailed(#[source] db::Error),

    #[error("not_found: {0}")]
    NotFound(String),

    // validation
    #[error("validation: {0}")]
    Validation(String),

    #[error(transparent)]
    Config(#[from] envy::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Storage failures are the only kind worth offering a retry for.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

/// db::Error --> crate::Error, by the kind of call that failed.
/// `db::Error::NotFound` becomes `Error::NotFound` on reads and writes.
pub mod db_mappers {
    use super::*;

    impl Error {
        pub(crate) fn unavailable(error: impl Into<db::Error>) -> Self {
            Self::StorageUnavailable(error.into())
        }

        pub(crate) fn read(error: impl Into<db::Error>) -> Self {
            match error.into() {
                db::Error::NotFound(msg) => Self::NotFound(msg),
                error => Self::PersistenceReadFailed(error),
            }
        }

        pub(crate) fn write(error: impl Into<db::Error>) -> Self {
            match error.into() {
                db::Error::NotFound(msg) => Self::NotFound(msg),
                error => Self::PersistenceWriteFailed(error),
            }
        }
    }
}
