//! # Metrics Collection
//!
//! Step counters and durations recorded through the `metrics` facade.
//!
//! No recorder is installed here. A process embedding the rotator installs
//! its own (for example a Prometheus exporter); with no recorder installed
//! every call is a no-op. `ROTATOR_ENABLE_METRICS=false` turns recording off
//! even when a recorder is present.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Duration;

use crate::config::ObservabilityConfig;
use crate::domain::RotationStep;

pub const ROTATION_STEPS_TOTAL: &str = "rotation_steps_total";
pub const ROTATION_STEP_DURATION_SECONDS: &str = "rotation_step_duration_seconds";

/// Records rotation step metrics
#[derive(Debug, Clone, Copy)]
pub struct RotationMetrics {
    enabled: bool,
}

impl Default for RotationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationMetrics {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Enabled unless `enable_metrics` is off
    pub fn from_config(config: &ObservabilityConfig) -> Self {
        Self { enabled: config.enable_metrics }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one finished step invocation.
    ///
    /// `outcome` is a step outcome (`created`, `promoted`, ...) on success or
    /// an error kind (`connection`, `store_conflict`, ...) on failure.
    pub fn record_step(&self, step: RotationStep, outcome: &str, duration: Duration) {
        if !self.enabled {
            return;
        }

        let labels = [("step", step.as_str().to_string()), ("outcome", outcome.to_string())];
        counter!(ROTATION_STEPS_TOTAL, &labels).increment(1);

        let step_label = [("step", step.as_str().to_string())];
        histogram!(ROTATION_STEP_DURATION_SECONDS, &step_label).record(duration.as_secs_f64());
    }
}

/// Register metric descriptions with the installed recorder
pub fn register_rotation_metrics() {
    describe_counter!(
        ROTATION_STEPS_TOTAL,
        Unit::Count,
        "Rotation step invocations by step and outcome"
    );
    describe_histogram!(
        ROTATION_STEP_DURATION_SECONDS,
        Unit::Seconds,
        "Wall-clock duration of rotation step invocations"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CountingRecorder {
        counters: Mutex<Vec<String>>,
        increments: Arc<AtomicU64>,
    }

    impl Recorder for CountingRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            self.counters.lock().unwrap().push(key.name().to_string());
            Counter::from_arc(self.increments.clone())
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        register_rotation_metrics();
        let metrics = RotationMetrics::new();
        for step in RotationStep::ALL {
            metrics.record_step(step, "verified", Duration::from_millis(12));
        }
    }

    #[test]
    fn test_records_step_counter() {
        let recorder = CountingRecorder::default();
        let step_metrics = RotationMetrics::new();
        let elapsed = Duration::from_millis(5);

        metrics::with_local_recorder(&recorder, || {
            step_metrics.record_step(RotationStep::SetSecret, "password_set", elapsed);
        });

        assert_eq!(recorder.increments.load(Ordering::Acquire), 1);
        assert_eq!(*recorder.counters.lock().unwrap(), vec![ROTATION_STEPS_TOTAL.to_string()]);
    }

    #[test]
    fn test_disabled_by_config() {
        let config = ObservabilityConfig { enable_metrics: false, ..Default::default() };
        let recorder = CountingRecorder::default();
        let step_metrics = RotationMetrics::from_config(&config);
        assert!(!step_metrics.is_enabled());

        metrics::with_local_recorder(&recorder, || {
            step_metrics.record_step(RotationStep::TestSecret, "verified", Duration::ZERO);
        });

        assert_eq!(recorder.increments.load(Ordering::Acquire), 0);
        assert!(recorder.counters.lock().unwrap().is_empty());
    }
}
