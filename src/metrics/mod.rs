use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Opts, Registry};
use std::sync::Arc;

/// Prometheus metrics for the index service
#[derive(Clone)]
pub struct IndexMetrics {
    // Counters
    pub documents_fed: Counter,
    pub feed_errors: Counter,
    pub events_staged: Counter,
    pub postings_expired: Counter,
    pub queries_total: Counter,
    pub query_errors: Counter,
    pub snapshot_dumps: Counter,

    // Gauges
    pub index_size: Gauge,
    pub expire_table_size: Gauge,
    pub pipeline_queue_depth: Gauge,

    // Histograms
    pub query_latency: Histogram,

    registry: Arc<Registry>,
}

impl IndexMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let documents_fed = Counter::with_opts(Opts::new(
            "magnetar_documents_fed_total",
            "Total number of documents accepted by the update pipeline",
        ))?;
        registry.register(Box::new(documents_fed.clone()))?;

        let feed_errors = Counter::with_opts(Opts::new(
            "magnetar_feed_errors_total",
            "Total number of rejected document feeds",
        ))?;
        registry.register(Box::new(feed_errors.clone()))?;

        let events_staged = Counter::with_opts(Opts::new(
            "magnetar_events_staged_total",
            "Total number of per-term events staged into the changeset",
        ))?;
        registry.register(Box::new(events_staged.clone()))?;

        let postings_expired = Counter::with_opts(Opts::new(
            "magnetar_postings_expired_total",
            "Total number of postings removed by TTL expiration",
        ))?;
        registry.register(Box::new(postings_expired.clone()))?;

        let queries_total = Counter::with_opts(Opts::new(
            "magnetar_queries_total",
            "Total number of queries executed",
        ))?;
        registry.register(Box::new(queries_total.clone()))?;

        let query_errors = Counter::with_opts(Opts::new(
            "magnetar_query_errors_total",
            "Total number of failed queries",
        ))?;
        registry.register(Box::new(query_errors.clone()))?;

        let snapshot_dumps = Counter::with_opts(Opts::new(
            "magnetar_snapshot_dumps_total",
            "Total number of snapshot dumps",
        ))?;
        registry.register(Box::new(snapshot_dumps.clone()))?;

        let index_size = Gauge::with_opts(Opts::new(
            "magnetar_index_size",
            "Current number of postings in the applied index",
        ))?;
        registry.register(Box::new(index_size.clone()))?;

        let expire_table_size = Gauge::with_opts(Opts::new(
            "magnetar_expire_table_size",
            "Current number of entries in the expire table",
        ))?;
        registry.register(Box::new(expire_table_size.clone()))?;

        let pipeline_queue_depth = Gauge::with_opts(Opts::new(
            "magnetar_pipeline_queue_depth",
            "Documents waiting in the update pipeline queue",
        ))?;
        registry.register(Box::new(pipeline_queue_depth.clone()))?;

        let query_latency = Histogram::with_opts(
            HistogramOpts::new("magnetar_query_latency_seconds", "Query latency")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]),
        )?;
        registry.register(Box::new(query_latency.clone()))?;

        Ok(Self {
            documents_fed,
            feed_errors,
            events_staged,
            postings_expired,
            queries_total,
            query_errors,
            snapshot_dumps,
            index_size,
            expire_table_size,
            pipeline_queue_depth,
            query_latency,
            registry: Arc::new(registry),
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record one processed document and its staged event count
    pub fn record_feed(&self, staged_events: usize) {
        self.documents_fed.inc();
        self.events_staged.inc_by(staged_events as f64);
    }

    pub fn record_feed_error(&self) {
        self.feed_errors.inc();
    }

    pub fn record_query(&self, duration_secs: f64) {
        self.queries_total.inc();
        self.query_latency.observe(duration_secs);
    }

    pub fn record_query_error(&self) {
        self.query_errors.inc();
    }

    pub fn record_dump(&self) {
        self.snapshot_dumps.inc();
    }

    pub fn record_expired(&self, count: usize) {
        self.postings_expired.inc_by(count as f64);
    }

    /// Refresh point-in-time gauges, called at scrape time
    pub fn set_index_gauges(&self, index_size: usize, expire_table_size: usize) {
        self.index_size.set(index_size as f64);
        self.expire_table_size.set(expire_table_size as f64);
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.pipeline_queue_depth.set(depth as f64);
    }
}

impl Default for IndexMetrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
