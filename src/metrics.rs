//! Prometheus metrics for hot-swap handles.

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};

use crate::error::{Error, Result};

/// Configuration for swap metrics collection.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Metric prefix for all swap metrics.
    pub prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: "hotswap".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the metric prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

fn counter(registry: &Registry, name: String, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::new(name, help).map_err(|e| Error::Metrics(e.to_string()))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| Error::Metrics(e.to_string()))?;
    Ok(counter)
}

/// Swap metrics collector.
pub struct SwapMetrics {
    config: MetricsConfig,
    registry: Registry,
    checks: IntCounter,
    swaps: IntCounter,
    loads: IntCounter,
    load_failures: IntCounter,
    unloaded: IntCounter,
    load_duration: Histogram,
}

impl SwapMetrics {
    /// Create a new metrics collector with its own Prometheus registry.
    pub fn new(config: MetricsConfig) -> Result<Self> {
        let registry = Registry::new();
        let prefix = &config.prefix;

        let checks = counter(
            &registry,
            format!("{}_checks_total", prefix),
            "Freshness checks that searched for a newer version",
        )?;
        let swaps = counter(
            &registry,
            format!("{}_swaps_total", prefix),
            "Descriptors replaced by a newer version",
        )?;
        let loads = counter(
            &registry,
            format!("{}_loads_total", prefix),
            "Successful artifact loads",
        )?;
        let load_failures = counter(
            &registry,
            format!("{}_load_failures_total", prefix),
            "Artifact loads that failed",
        )?;
        let unloaded = counter(
            &registry,
            format!("{}_unloaded_total", prefix),
            "Registry entries removed by unloading",
        )?;

        let load_duration = Histogram::with_opts(
            HistogramOpts::new(
                format!("{}_load_duration_seconds", prefix),
                "Artifact load duration in seconds",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )
        .map_err(|e| Error::Metrics(e.to_string()))?;
        registry
            .register(Box::new(load_duration.clone()))
            .map_err(|e| Error::Metrics(e.to_string()))?;

        Ok(Self {
            config,
            registry,
            checks,
            swaps,
            loads,
            load_failures,
            unloaded,
            load_duration,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Get the Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a freshness check.
    pub fn record_check(&self) {
        self.checks.inc();
    }

    /// Record an adopted swap.
    pub fn record_swap(&self) {
        self.swaps.inc();
    }

    /// Record a load attempt.
    pub fn record_load(&self, succeeded: bool, duration_secs: f64) {
        if succeeded {
            self.loads.inc();
        } else {
            self.load_failures.inc();
        }
        self.load_duration.observe(duration_secs);
    }

    /// Record unloaded registry entries.
    pub fn record_unload(&self, removed: usize) {
        self.unloaded.inc_by(removed as u64);
    }

    /// Get the total number of checks.
    pub fn checks_total(&self) -> u64 {
        self.checks.get()
    }

    /// Get the total number of swaps.
    pub fn swaps_total(&self) -> u64 {
        self.swaps.get()
    }

    /// Get the total number of successful loads.
    pub fn loads_total(&self) -> u64 {
        self.loads.get()
    }

    /// Get the total number of failed loads.
    pub fn load_failures_total(&self) -> u64 {
        self.load_failures.get()
    }

    /// Get the total number of unloaded entries.
    pub fn unloaded_total(&self) -> u64 {
        self.unloaded.get()
    }
}

impl std::fmt::Debug for SwapMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapMetrics")
            .field("config", &self.config)
            .field("checks", &self.checks_total())
            .field("swaps", &self.swaps_total())
            .field("loads", &self.loads_total())
            .field("load_failures", &self.load_failures_total())
            .field("unloaded", &self.unloaded_total())
            .finish()
    }
}
