pub mod connection;
pub mod pool;
pub mod postgres;

pub use connection::{Connection, ConnectionFactory};
pub use pool::{Pool, PoolStatus, PooledConnection};
pub use postgres::{PgClient, PgConnector};
