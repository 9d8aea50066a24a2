use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use magnetar::config::Config;
use magnetar::index::DocumentIndexManager;
use magnetar::metrics::IndexMetrics;
use magnetar::model::FeatureCache;
use magnetar::pipeline::DocumentUpdatePipeline;
use magnetar::query::QueryExecutor;
use magnetar::ranking::ModelRegistry;
use magnetar::{create_router, AppState};

#[derive(Parser)]
#[command(name = "magnetar")]
#[command(about = "Real-time in-memory search and ranking service", long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, env = "MAGNETAR_CONFIG", default_value = "magnetar.json")]
    config: PathBuf,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;

    info!(
        "Starting Magnetar v{} with config {:?}",
        magnetar::VERSION,
        args.config
    );
    info!("Index settings:");
    info!("  Initial buckets: {}", config.index.initial_buckets);
    info!("  Expire batch cap: {}", config.index.max_size);
    info!("  Maintain interval: {}s", config.index.maintain_interval);
    info!("  Update threads: {}", config.index.update_thread_num);
    info!("  Update queue size: {}", config.index.update_queue_size);
    info!("  Default TTL: {}s", config.index.default_ttl);
    info!("Server settings:");
    info!("  Port: {}", config.server.port);
    info!("  Worker threads: {}", config.server.thread_num);
    info!(
        "  Max requests per thread: {}",
        config.server.max_request_per_thread
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.thread_num.max(1))
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<()> {
    let cache = Arc::new(FeatureCache::from_config(&config.feature_spaces));
    info!("Registered {} feature spaces", cache.space_count());

    let index_config = &config.index;
    let index = if index_config.restore_on_startup {
        info!(
            "Restoring index from snapshot prefix {:?}",
            index_config.snapshot_prefix
        );
        match DocumentIndexManager::restore(
            index_config.initial_buckets,
            index_config.max_size,
            &index_config.snapshot_prefix,
        ) {
            Ok(index) => index,
            Err(e) if e.is_restore_recoverable() => {
                error!("Failed to restore index ({e}), starting empty");
                DocumentIndexManager::new(index_config.initial_buckets, index_config.max_size)
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        info!("Creating an empty index");
        DocumentIndexManager::new(index_config.initial_buckets, index_config.max_size)
    };
    let index = Arc::new(index);
    index.start_maintain(index_config.maintain_interval, index_config.maintain_interval);

    let metrics = Arc::new(IndexMetrics::new()?);

    let pipeline = Arc::new(DocumentUpdatePipeline::new(
        index_config.update_thread_num,
        index_config.update_queue_size,
        index.clone(),
        metrics.clone(),
    ));
    pipeline.start();

    let registry = ModelRegistry::with_defaults(cache.clone());
    let model = Arc::new(registry.create(&config.ranking)?);
    let executor = QueryExecutor::new(index.clone(), model);

    let state = AppState {
        cache,
        index: index.clone(),
        pipeline: pipeline.clone(),
        executor,
        metrics,
        default_ttl: index_config.default_ttl,
        snapshot_prefix: index_config.snapshot_prefix.clone(),
    };
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Magnetar listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Teardown in reverse construction order: the server has stopped,
    // then the pipeline drains, then maintenance, then the optional dump.
    info!("Server stopped, draining update pipeline");
    pipeline.stop();

    if index_config.dump_on_exit && !index_config.snapshot_prefix.is_empty() {
        info!(
            "Dumping index to snapshot prefix {:?}",
            index_config.snapshot_prefix
        );
        if let Err(e) = index.dump(&index_config.snapshot_prefix) {
            error!("Failed to dump index on exit: {e}");
        }
    }

    info!("Stopping index maintenance");
    index.stop_maintain();

    info!("Exit successfully");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install SIGINT handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
