//! Prometheus recorder setup and the `/metrics` scrape route.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::sentiment::Lexicon;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and export static gauges with the
    /// loaded lexicon table sizes.
    pub fn init(lexicon: &Lexicon) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_counter!(
            "analyze_requests_total",
            "Sentiment analysis requests served, by endpoint."
        );
        describe_counter!(
            "analyze_failures_total",
            "Requests that failed because the post source errored."
        );
        describe_gauge!(
            "analyze_last_success_timestamp_seconds",
            "Unix time of the last successfully served analysis."
        );

        let (weights, negations, intensifiers) = lexicon.table_sizes();
        gauge!("lexicon_weight_tokens").set(weights as f64);
        gauge!("lexicon_negation_tokens").set(negations as f64);
        gauge!("lexicon_intensifier_tokens").set(intensifiers as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
