use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorMetrics {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub avg_response_time_ms: f64,
    pub stale_responses_dropped: u64,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
}

/// Shared counters for calls made against the tracker backend.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<Mutex<CollaboratorMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call_start(&self) -> CallTracker {
        CallTracker {
            start_time: Instant::now(),
            collector: self.clone(),
        }
    }

    pub fn record_error(&self, error: String) {
        let mut metrics = self.lock();
        metrics.last_error = Some(error);
        metrics.last_error_time = Some(Utc::now());
    }

    pub fn record_stale_drop(&self) {
        self.lock().stale_responses_dropped += 1;
    }

    pub fn get_metrics(&self) -> CollaboratorMetrics {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, CollaboratorMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct CallTracker {
    start_time: Instant,
    collector: MetricsCollector,
}

impl CallTracker {
    pub fn finish(self, success: bool) {
        let duration = self.start_time.elapsed();
        let mut metrics = self.collector.lock();

        metrics.total_calls += 1;
        if success {
            metrics.successful_calls += 1;
        } else {
            metrics.failed_calls += 1;
        }

        // Exponential moving average, seeded by the first sample
        let sample = duration.as_secs_f64() * 1000.0;
        metrics.avg_response_time_ms = if metrics.total_calls == 1 {
            sample
        } else {
            let alpha = 0.1;
            metrics.avg_response_time_ms * (1.0 - alpha) + sample * alpha
        };
    }
}
