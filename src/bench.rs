use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    config::DbConfig,
    db::{Connection, ConnectionFactory, Pool},
};

/// How queries reached the database during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchKind {
    Pooled { pool_size: usize },
    Unpooled,
}

/// Outcome of one benchmark run
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub kind: BenchKind,
    pub queries: usize,
    pub failures: usize,
    pub elapsed: Duration,
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BenchKind::Pooled { pool_size } => write!(f, "pooled: pool size {}, ", pool_size)?,
            BenchKind::Unpooled => write!(f, "unpooled: ")?,
        }
        write!(f, "queries {}, time {:?}", self.queries, self.elapsed)?;
        if self.failures > 0 {
            write!(f, ", failures {}", self.failures)?;
        }
        Ok(())
    }
}

/// Runs `queries` concurrent tasks that each borrow a connection from `pool`
///
/// Every task acquires, executes `query` once, and releases. A failed query
/// or a panicked task is logged and counted; its connection still goes back
/// to the pool.
pub async fn run_pooled<C: Connection>(
    pool: Arc<Pool<C>>,
    queries: usize,
    query: &str,
) -> BenchReport {
    let query: Arc<str> = Arc::from(query);
    let start = Instant::now();

    let mut tasks = Vec::with_capacity(queries);
    for _ in 0..queries {
        let pool = Arc::clone(&pool);
        let query = Arc::clone(&query);
        let task = tokio::spawn(async move {
            // The guard hands the connection back even if this task panics
            let mut conn = pool.get().await;
            let result = conn.execute(&query).await;
            drop(conn);
            result
        });
        tasks.push(task);
    }

    let mut failures = 0;
    for task in tasks {
        match task.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Pooled query failed");
                failures += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, "Task join error");
                failures += 1;
            }
        }
    }

    let report = BenchReport {
        kind: BenchKind::Pooled {
            pool_size: pool.size(),
        },
        queries,
        failures,
        elapsed: start.elapsed(),
    };
    tracing::info!(
        pool_size = pool.size(),
        queries,
        failures,
        elapsed = ?report.elapsed,
        "Pooled benchmark finished"
    );
    report
}

/// Runs `queries` queries, each on a freshly opened and closed session
///
/// Sessions are opened one after another so the server's own connection
/// limit is never the bottleneck being measured.
pub async fn run_unpooled<F>(
    factory: &F,
    config: &DbConfig,
    queries: usize,
    query: &str,
) -> BenchReport
where
    F: ConnectionFactory + ?Sized,
{
    let start = Instant::now();
    let mut failures = 0;

    for _ in 0..queries {
        let mut conn = match factory.connect(config).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "Unpooled connect failed");
                failures += 1;
                continue;
            }
        };

        if let Err(e) = conn.execute(query).await {
            tracing::error!(error = %e, "Unpooled query failed");
            failures += 1;
        }

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "Unpooled close failed");
        }
    }

    let report = BenchReport {
        kind: BenchKind::Unpooled,
        queries,
        failures,
        elapsed: start.elapsed(),
    };
    tracing::info!(
        queries,
        failures,
        elapsed = ?report.elapsed,
        "Unpooled benchmark finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display_pooled() {
        let report = BenchReport {
            kind: BenchKind::Pooled { pool_size: 10 },
            queries: 1000,
            failures: 0,
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(
            report.to_string(),
            "pooled: pool size 10, queries 1000, time 1.5s"
        );
    }

    #[test]
    fn test_report_display_with_failures() {
        let report = BenchReport {
            kind: BenchKind::Unpooled,
            queries: 10,
            failures: 3,
            elapsed: Duration::from_millis(20),
        };
        assert_eq!(
            report.to_string(),
            "unpooled: queries 10, time 20ms, failures 3"
        );
    }
}
