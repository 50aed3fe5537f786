use std::fmt;

/// Error kinds surfaced by the event store. Matches the `SchedulerError` /
/// `DuplicateKey` abstract kinds named for this layer; `DuplicateKey` is
/// deliberately unreachable from the public API because [`crate::add`]
/// swallows it internally and reports a bool instead (duplicate insert is a
/// soft failure, never raised to the caller).
#[derive(Debug)]
pub enum StoreError {
    Connection(sqlx::Error),
    Query(sqlx::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connection(e) => write!(f, "event store connection error: {e}"),
            StoreError::Query(e) => write!(f, "event store query error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Connection(e) | StoreError::Query(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Query(e)
    }
}

pub fn is_unique_constraint_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
