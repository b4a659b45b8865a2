//! Logging and metrics for outfitsave.
//!
//! - [`init`] installs the global `tracing` subscriber.
//! - [`ShareMetrics`] is the sink the slug allocator and HTTP layer report
//!   into. [`NoopShareMetrics`] is always available; the Prometheus-backed
//!   recorder is compiled in with the `prometheus` feature.

use std::env;
use std::str::FromStr;

use time::macros::format_description;
use time::UtcOffset;
use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;

#[cfg(feature = "prometheus")]
pub use crate::prometheus_impl::PrometheusShareMetrics;

/// Error type for telemetry initialisation failures.
///
/// This is intentionally lightweight so `outfitsave-telemetry` can be used
/// without depending on `outfitsave-core`. Callers can map this into their own
/// error types as needed.
#[derive(Debug)]
pub enum TelemetryError {
    /// Provided log level string could not be parsed.
    InvalidLevel(String),

    /// Failed to configure the subscriber (should be rare).
    SubscriberInit(String),

    /// Metrics could not be encoded for export.
    Export(String),
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryError::InvalidLevel(level) => {
                write!(f, "invalid log level: {}", level)
            }
            TelemetryError::SubscriberInit(msg) => write!(f, "failed to init telemetry: {}", msg),
            TelemetryError::Export(msg) => write!(f, "failed to export metrics: {}", msg),
        }
    }
}

impl std::error::Error for TelemetryError {}

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Interface for recording share-link metrics.
///
/// Implementations must be cheap and non-panicking; they are called on the
/// request path.
pub trait ShareMetrics: Send + Sync + 'static {
    /// A new slug was written after `attempts` candidates (1-based).
    fn record_allocated(&self, attempts: u32);

    /// A candidate was discarded because it was already taken.
    fn record_collision(&self);

    /// The allocator gave up after exhausting its attempt bound.
    fn record_exhausted(&self);

    /// A share request reused the slug already stored on the outfit.
    fn record_existing(&self);

    /// An HTTP request finished.
    ///
    /// - `route`: the matched route template, e.g. `/api/outfits/:id/share`.
    /// - `status`: the response status code.
    fn record_request(&self, route: &str, status: u16);
}

/// A metrics sink that drops everything.
#[derive(Debug, Clone, Default)]
pub struct NoopShareMetrics;

impl ShareMetrics for NoopShareMetrics {
    fn record_allocated(&self, _attempts: u32) {}

    fn record_collision(&self) {}

    fn record_exhausted(&self) {}

    fn record_existing(&self) {}

    fn record_request(&self, _route: &str, _status: u16) {}
}

#[cfg(feature = "prometheus")]
pub mod prometheus_impl {
    use super::*;

    use prometheus::{
        Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
        TextEncoder,
    };

    /// Prometheus-backed share metrics.
    #[derive(Clone)]
    pub struct PrometheusShareMetrics {
        registry: Registry,
        allocations_total: IntCounter,
        collisions_total: IntCounter,
        exhausted_total: IntCounter,
        reused_total: IntCounter,
        allocation_attempts: Histogram,
        http_requests_total: IntCounterVec,
    }

    impl PrometheusShareMetrics {
        /// Create a recorder with a fresh registry.
        pub fn new() -> Result<Self> {
            let registry = Registry::new();

            let allocations_total = IntCounter::with_opts(
                Opts::new("slug_allocations_total", "Share slugs newly assigned")
                    .namespace("outfitsave"),
            )
            .map_err(export_err)?;
            let collisions_total = IntCounter::with_opts(
                Opts::new(
                    "slug_collisions_total",
                    "Slug candidates discarded because they were taken",
                )
                .namespace("outfitsave"),
            )
            .map_err(export_err)?;
            let exhausted_total = IntCounter::with_opts(
                Opts::new(
                    "slug_exhausted_total",
                    "Share requests that ran out of slug attempts",
                )
                .namespace("outfitsave"),
            )
            .map_err(export_err)?;
            let reused_total = IntCounter::with_opts(
                Opts::new(
                    "slug_reused_total",
                    "Share requests answered with an existing slug",
                )
                .namespace("outfitsave"),
            )
            .map_err(export_err)?;
            let allocation_attempts = Histogram::with_opts(
                HistogramOpts::new(
                    "slug_allocation_attempts",
                    "Candidates tried per successful allocation",
                )
                .namespace("outfitsave")
                .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0]),
            )
            .map_err(export_err)?;
            let http_requests_total = IntCounterVec::new(
                Opts::new("http_requests_total", "HTTP requests handled").namespace("outfitsave"),
                &["route", "status"],
            )
            .map_err(export_err)?;

            registry
                .register(Box::new(allocations_total.clone()))
                .map_err(export_err)?;
            registry
                .register(Box::new(collisions_total.clone()))
                .map_err(export_err)?;
            registry
                .register(Box::new(exhausted_total.clone()))
                .map_err(export_err)?;
            registry
                .register(Box::new(reused_total.clone()))
                .map_err(export_err)?;
            registry
                .register(Box::new(allocation_attempts.clone()))
                .map_err(export_err)?;
            registry
                .register(Box::new(http_requests_total.clone()))
                .map_err(export_err)?;

            Ok(Self {
                registry,
                allocations_total,
                collisions_total,
                exhausted_total,
                reused_total,
                allocation_attempts,
                http_requests_total,
            })
        }

        /// Access the underlying Prometheus registry.
        pub fn registry(&self) -> &Registry {
            &self.registry
        }

        /// Encode the registry in the text exposition format.
        ///
        /// Returns the content type and the body.
        pub fn render(&self) -> Result<(String, Vec<u8>)> {
            let encoder = TextEncoder::new();
            let mut buffer = Vec::new();
            encoder
                .encode(&self.registry.gather(), &mut buffer)
                .map_err(export_err)?;
            Ok((encoder.format_type().to_string(), buffer))
        }
    }

    fn export_err(err: prometheus::Error) -> TelemetryError {
        TelemetryError::Export(err.to_string())
    }

    impl ShareMetrics for PrometheusShareMetrics {
        fn record_allocated(&self, attempts: u32) {
            self.allocations_total.inc();
            self.allocation_attempts.observe(f64::from(attempts));
        }

        fn record_collision(&self) {
            self.collisions_total.inc();
        }

        fn record_exhausted(&self) {
            self.exhausted_total.inc();
        }

        fn record_existing(&self) {
            self.reused_total.inc();
        }

        fn record_request(&self, route: &str, status: u16) {
            let status = status.to_string();
            self.http_requests_total
                .with_label_values(&[route, status.as_str()])
                .inc();
        }
    }
}

/// Initialise the global logging subscriber.
///
/// - `level`: explicit level or filter expression. When `None`, `RUST_LOG`
///   is respected if set, else `"info"`.
///
/// Logs carry a local-offset timestamp, level and target. Calling this
/// twice returns [`TelemetryError::SubscriberInit`].
///
/// ```ignore
/// outfitsave_telemetry::init(Some("info,outfitsave_core=debug"))?;
/// ```
pub fn init(level: Option<&str>) -> Result<()> {
    let filter = if let Some(level_str) = level {
        parse_level_filter(level_str)?
    } else if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("info")
    };

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_timer(OffsetTime::new(
            // Falls back to UTC when the local offset cannot be determined.
            UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
            format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour sign:mandatory]:[offset_minute]"
            ),
        ));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    Ok(())
}

/// Parse a level string into an `EnvFilter`.
///
/// Accepts plain levels ("info", "debug") and full filter expressions
/// ("info,outfitsave_core=debug").
fn parse_level_filter(level_str: &str) -> Result<EnvFilter> {
    if Level::from_str(level_str).is_ok() {
        return Ok(EnvFilter::new(level_str));
    }

    EnvFilter::builder()
        .parse(level_str)
        .map_err(|e| TelemetryError::InvalidLevel(format!("{} ({})", level_str, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_level() {
        assert!(parse_level_filter("debug").is_ok());
    }

    #[test]
    fn parse_full_expression() {
        assert!(parse_level_filter("info,outfitsave_core=debug").is_ok());
    }

    #[test]
    fn noop_metrics_do_not_panic() {
        let metrics = NoopShareMetrics;
        metrics.record_allocated(1);
        metrics.record_collision();
        metrics.record_exhausted();
        metrics.record_existing();
        metrics.record_request("/api/outfits/:id/share", 200);
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn prometheus_render_includes_counters() {
        let metrics = PrometheusShareMetrics::new().expect("registry");
        metrics.record_allocated(2);
        metrics.record_collision();
        metrics.record_request("/api/share/:slug", 404);

        let (content_type, body) = metrics.render().expect("render");
        let text = String::from_utf8(body).expect("utf8");
        assert!(content_type.starts_with("text/plain"));
        assert!(text.contains("outfitsave_slug_allocations_total 1"));
        assert!(text.contains("outfitsave_slug_collisions_total 1"));
        assert!(text.contains("status=\"404\""));
    }
}
