use crate::{
    config::DbConfig,
    error::{CloseError, ConnectionError, QueryError},
};

/// A single live database session
///
/// Ownership is the lifecycle: a caller holding a `Connection` has exclusive
/// use of it, and `close` consumes it so a closed session cannot be pooled
/// or used again.
#[async_trait::async_trait]
pub trait Connection: Send + 'static {
    /// Execute a statement and return the number of rows affected.
    ///
    /// Failures are returned as-is; there is no retry.
    async fn execute(&mut self, query: &str) -> Result<u64, QueryError>;

    /// Shut the session down.
    async fn close(self) -> Result<(), CloseError>;
}

/// Opens new [`Connection`]s from a [`DbConfig`]
///
/// The pool calls `connect` once per slot while it is being built.
#[async_trait::async_trait]
pub trait ConnectionFactory: Send + Sync {
    type Connection: Connection;

    async fn connect(&self, config: &DbConfig) -> Result<Self::Connection, ConnectionError>;
}
