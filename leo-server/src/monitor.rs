//! Response-time bookkeeping for chat requests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

const MAX_SAMPLES_PER_MODEL: usize = 100;
const MAX_OVERALL_SAMPLES: usize = 1000;

#[derive(Default)]
struct Metrics {
    response_times: VecDeque<f64>,
    by_model: BTreeMap<String, VecDeque<f64>>,
    error_counts: BTreeMap<String, BTreeMap<String, u64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelStats {
    pub avg_response_time: f64,
    pub median_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub request_count: usize,
}

#[derive(Default)]
pub struct PerformanceMonitor {
    metrics: Mutex<Metrics>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn metrics(&self) -> MutexGuard<'_, Metrics> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_response_time(&self, model: &str, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        let mut metrics = self.metrics();
        push_bounded(&mut metrics.response_times, seconds, MAX_OVERALL_SAMPLES);
        let times = metrics.by_model.entry(model.to_string()).or_default();
        push_bounded(times, seconds, MAX_SAMPLES_PER_MODEL);
    }

    pub fn record_error(&self, model: &str, error: &str) {
        let mut metrics = self.metrics();
        *metrics
            .error_counts
            .entry(model.to_string())
            .or_default()
            .entry(error.to_string())
            .or_default() += 1;
    }

    pub fn model_stats(&self, model: &str) -> Option<ModelStats> {
        self.metrics().by_model.get(model).and_then(summarize)
    }

    /// Summary as served by `/api/performance`.
    pub fn stats(&self) -> Value {
        let metrics = self.metrics();
        let Some(overall) = summarize(&metrics.response_times) else {
            return json!({ "error": "No data available" });
        };

        let by_model: BTreeMap<&str, ModelStats> = metrics
            .by_model
            .iter()
            .filter_map(|(model, times)| summarize(times).map(|stats| (model.as_str(), stats)))
            .collect();

        json!({
            "overall": {
                "avg_response_time": overall.avg_response_time,
                "median_response_time": overall.median_response_time,
                "total_requests": overall.request_count,
            },
            "by_model": by_model,
            "error_counts": metrics.error_counts,
        })
    }
}

fn push_bounded(samples: &mut VecDeque<f64>, value: f64, limit: usize) {
    samples.push_back(value);
    while samples.len() > limit {
        samples.pop_front();
    }
}

fn summarize(samples: &VecDeque<f64>) -> Option<ModelStats> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = samples.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mid = count / 2;
    let median = if count % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Some(ModelStats {
        avg_response_time: sorted.iter().sum::<f64>() / count as f64,
        median_response_time: median,
        min_response_time: sorted[0],
        max_response_time: sorted[count - 1],
        request_count: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_monitor_reports_no_data() {
        let monitor = PerformanceMonitor::new();
        assert_eq!(monitor.stats(), json!({ "error": "No data available" }));
    }

    #[test]
    fn stats_per_model() {
        let monitor = PerformanceMonitor::new();
        for secs in [1, 3, 2, 10] {
            monitor.record_response_time("google/gemma-2-9b-it", Duration::from_secs(secs));
        }
        monitor.record_response_time("openai/gpt-5", Duration::from_secs(4));

        let gemma = monitor.model_stats("google/gemma-2-9b-it").unwrap();
        assert_eq!(gemma.request_count, 4);
        assert_eq!(gemma.median_response_time, 2.5);
        assert_eq!(gemma.avg_response_time, 4.0);
        assert_eq!(gemma.min_response_time, 1.0);
        assert_eq!(gemma.max_response_time, 10.0);

        let stats = monitor.stats();
        assert_eq!(stats["overall"]["total_requests"], 5);
        assert_eq!(stats["overall"]["median_response_time"], 3.0);
        assert_eq!(stats["by_model"]["openai/gpt-5"]["request_count"], 1);
    }

    #[test]
    fn keeps_last_hundred_per_model() {
        let monitor = PerformanceMonitor::new();
        for i in 0..150 {
            monitor.record_response_time("m", Duration::from_millis(i));
        }
        let stats = monitor.model_stats("m").unwrap();
        assert_eq!(stats.request_count, 100);
        assert_eq!(stats.min_response_time, 0.05);
    }

    #[test]
    fn errors_are_counted_by_message() {
        let monitor = PerformanceMonitor::new();
        monitor.record_response_time("m", Duration::from_secs(1));
        monitor.record_error("m", "API error: 500");
        monitor.record_error("m", "API error: 500");
        assert_eq!(monitor.stats()["error_counts"]["m"]["API error: 500"], 2);
    }
}
