//! Prometheus metrics for the question pipeline

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub asks_total: IntCounter,
    pub ask_failures_total: IntCounterVec,
    pub translation_retries_total: IntCounter,
    pub summarization_failures_total: IntCounter,
    pub uploads_total: IntCounter,
    pub ask_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let asks_total = IntCounter::new("dataq_asks_total", "Questions received")?;
        registry.register(Box::new(asks_total.clone()))?;

        let ask_failures_total = IntCounterVec::new(
            Opts::new("dataq_ask_failures_total", "Failed questions by stage"),
            &["stage"],
        )?;
        registry.register(Box::new(ask_failures_total.clone()))?;

        let translation_retries_total = IntCounter::new(
            "dataq_translation_retries_total",
            "Re-translations after a failed generated query",
        )?;
        registry.register(Box::new(translation_retries_total.clone()))?;

        let summarization_failures_total = IntCounter::new(
            "dataq_summarization_failures_total",
            "Narrative fallbacks after a summarizer failure",
        )?;
        registry.register(Box::new(summarization_failures_total.clone()))?;

        let uploads_total = IntCounter::new("dataq_uploads_total", "Datasets installed")?;
        registry.register(Box::new(uploads_total.clone()))?;

        let ask_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "dataq_ask_duration_seconds",
            "End-to-end latency of /ask",
        ))?;
        registry.register(Box::new(ask_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            asks_total,
            ask_failures_total,
            translation_retries_total,
            summarization_failures_total,
            uploads_total,
            ask_duration_seconds,
        })
    }

    pub fn failure(&self, stage: &str) {
        self.ask_failures_total.with_label_values(&[stage]).inc();
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_appear_in_exposition() {
        let metrics = Metrics::new().unwrap();
        metrics.asks_total.inc();
        metrics.failure("validate");
        metrics.failure("validate");

        let text = metrics.render().unwrap();
        assert!(text.contains("dataq_asks_total 1"));
        assert!(text.contains("dataq_ask_failures_total{stage=\"validate\"} 2"));
    }
}
