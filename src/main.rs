use std::sync::Arc;

use connection_pool::{
    bench::{self, BenchReport},
    BenchConfig, BenchMode, DbConfig, PgConnector, Pool,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db_config = DbConfig::from_env()?;
    let bench_config = BenchConfig::from_env()?;

    tracing::info!(target_db = %db_config, mode = ?bench_config.mode, "Starting benchmark");

    if matches!(bench_config.mode, BenchMode::Unpooled | BenchMode::Both) {
        let report = bench::run_unpooled(
            &PgConnector,
            &db_config,
            bench_config.queries,
            &bench_config.query,
        )
        .await;
        print_report(&report);
    }

    if matches!(bench_config.mode, BenchMode::Pooled | BenchMode::Both) {
        for &pool_size in &bench_config.pool_sizes {
            let pool = Arc::new(Pool::connect(&db_config, pool_size).await?);

            let report =
                bench::run_pooled(Arc::clone(&pool), bench_config.queries, &bench_config.query)
                    .await;
            print_report(&report);

            if let Err(e) = pool.close().await {
                tracing::error!(error = %e, pool_size, "Error closing the connection pool");
            }
        }
    }

    Ok(())
}

fn print_report(report: &BenchReport) {
    println!("{}", report);
}
