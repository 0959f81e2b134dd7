use std::time::Duration;

/// A session to the database could not be established
#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("Database connect error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// A query failed on an established session
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("Query error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// A session did not shut down cleanly
#[derive(thiserror::Error, Debug)]
pub enum CloseError {
    #[error("Close error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Pool construction failed; no pool is handed to the caller
#[derive(thiserror::Error, Debug)]
pub enum PoolInitError {
    #[error("Pool capacity must be at least 1")]
    ZeroCapacity,

    #[error("Failed to open pool slot {slot}: {source}")]
    Connect {
        slot: usize,
        #[source]
        source: ConnectionError,
    },
}

/// Errors from the optional bounded acquire path
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    #[error("Timed out after {0:?} waiting for an idle connection")]
    AcquireTimeout(Duration),
}
