use sqlx::{
    postgres::{PgConnectOptions, PgConnection},
    Connection as _, Executor,
};
use uuid::Uuid;

use crate::{
    config::DbConfig,
    db::connection::{Connection, ConnectionFactory},
    error::{CloseError, ConnectionError, QueryError},
};

/// A Postgres session backed by a single `sqlx::PgConnection`
pub struct PgClient {
    id: Uuid,
    conn: PgConnection,
}

impl PgClient {
    /// Opens a new Postgres session
    ///
    /// The options are built field by field, so credentials containing
    /// URL-reserved characters need no escaping.
    pub async fn connect(config: &DbConfig) -> Result<Self, ConnectionError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database);

        let conn = PgConnection::connect_with(&options).await?;
        let id = Uuid::new_v4();

        tracing::debug!(connection_id = %id, target_db = %config, "Postgres session opened");

        Ok(Self { id, conn })
    }

    /// Identifier used in log fields
    pub fn id(&self) -> Uuid {
        self.id
    }
}

#[async_trait::async_trait]
impl Connection for PgClient {
    async fn execute(&mut self, query: &str) -> Result<u64, QueryError> {
        let result = self.conn.execute(query).await?;
        Ok(result.rows_affected())
    }

    async fn close(self) -> Result<(), CloseError> {
        let id = self.id;
        self.conn.close().await?;
        tracing::debug!(connection_id = %id, "Postgres session closed");
        Ok(())
    }
}

/// Factory handed to the pool for Postgres sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

#[async_trait::async_trait]
impl ConnectionFactory for PgConnector {
    type Connection = PgClient;

    async fn connect(&self, config: &DbConfig) -> Result<PgClient, ConnectionError> {
        PgClient::connect(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a running Postgres reachable through the DB_* variables
    #[tokio::test]
    #[ignore]
    async fn test_execute_and_close_against_live_database() {
        let config = DbConfig::from_env().unwrap();

        let mut client = PgClient::connect(&config).await.unwrap();
        client.execute("SELECT 1").await.unwrap();
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_host_fails() {
        let config = DbConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..DbConfig::default()
        };

        let result = PgConnector.connect(&config).await;
        assert!(matches!(result, Err(ConnectionError::Database(_))));
    }
}
