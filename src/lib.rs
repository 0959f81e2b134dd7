//! A fixed-size pool of reusable database connections, plus a small
//! benchmark harness comparing pooled and per-query sessions.

pub mod bench;
pub mod config;
pub mod db;
pub mod error;

pub use config::{BenchConfig, BenchMode, DbConfig};
pub use db::{
    Connection, ConnectionFactory, PgClient, PgConnector, Pool, PoolStatus, PooledConnection,
};
pub use error::{CloseError, ConnectionError, PoolError, PoolInitError, QueryError};
