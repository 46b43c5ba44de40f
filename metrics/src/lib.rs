use std::time::{Duration, Instant};

use opentelemetry::{
    metrics::{Counter, Histogram},
    KeyValue,
};

pub fn low_latency_boundaries() -> Vec<f64> {
    vec![
        0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0,
        500.0, 750.0, 1000.0, 2500.0, 5000.0, 7500.0, 10000.0,
    ]
}

pub trait TimerUpdate {
    fn add(&self, duration: Duration, labels: &[KeyValue]);
}

impl TimerUpdate for Histogram<f64> {
    fn add(&self, duration: Duration, labels: &[KeyValue]) {
        self.record(duration.as_secs_f64(), labels);
    }
}

/// Records the time between its creation and its drop into `metric`.
pub struct Timer<'a, T: TimerUpdate + Sync> {
    start: Instant,
    metric: &'a T,
    labels: &'a [KeyValue],
}

impl<'a, T: TimerUpdate + Sync> Timer<'a, T> {
    pub fn start_with_labels(metric: &'a T, labels: &'a [KeyValue]) -> Self {
        Self {
            start: Instant::now(),
            metric,
            labels,
        }
    }
}

impl<'a, T: TimerUpdate + Sync> Drop for Timer<'a, T> {
    fn drop(&mut self) {
        self.metric.add(self.start.elapsed(), self.labels);
    }
}

pub trait AutoIncrement {
    fn increment(&self, labels: &[KeyValue]);
}

impl AutoIncrement for Counter<u64> {
    fn increment(&self, labels: &[KeyValue]) {
        self.add(1, labels);
    }
}

pub mod blob_storage {
    use opentelemetry::metrics::Histogram;

    use crate::low_latency_boundaries;

    #[derive(Debug)]
    pub struct Metrics {
        pub operations: Histogram<f64>,
    }

    impl Default for Metrics {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Metrics {
        pub fn new() -> Metrics {
            let meter = opentelemetry::global::meter("blob-storage");

            let operations = meter
                .f64_histogram("block_backend.blob_operations_duration")
                .with_unit("s")
                .with_boundaries(low_latency_boundaries())
                .with_description("blob store latencies in seconds")
                .build();

            Metrics { operations }
        }
    }
}

pub mod block_backend {
    use opentelemetry::metrics::{Counter, Histogram};

    use crate::low_latency_boundaries;

    #[derive(Debug)]
    pub struct Metrics {
        pub block_writes: Histogram<f64>,
        pub object_bytes_written: Counter<u64>,
        pub listing_warnings: Counter<u64>,
    }

    impl Default for Metrics {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Metrics {
        pub fn new() -> Metrics {
            let meter = opentelemetry::global::meter("block-backend");

            let block_writes = meter
                .f64_histogram("block_backend.block_write_duration")
                .with_unit("s")
                .with_boundaries(low_latency_boundaries())
                .with_description("time to persist all components of a block in seconds")
                .build();

            let object_bytes_written = meter
                .u64_counter("block_backend.object_bytes_written")
                .with_description("number of payload bytes streamed to the object store")
                .build();

            let listing_warnings = meter
                .u64_counter("block_backend.listing_warnings")
                .with_description("number of listing entries skipped because they failed to read or parse")
                .build();

            Metrics {
                block_writes,
                object_bytes_written,
                listing_warnings,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder(Mutex<Vec<(Duration, usize)>>);

    impl TimerUpdate for Recorder {
        fn add(&self, duration: Duration, labels: &[KeyValue]) {
            self.0.lock().unwrap().push((duration, labels.len()));
        }
    }

    #[test]
    fn test_timer_records_on_drop() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        let labels = [KeyValue::new("op", "get")];
        {
            let _timer = Timer::start_with_labels(&recorder, &labels);
            assert!(recorder.0.lock().unwrap().is_empty());
        }
        let recorded = recorder.0.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1, 1);
    }

    #[test]
    fn test_boundaries_are_sorted() {
        let boundaries = low_latency_boundaries();
        assert!(boundaries.windows(2).all(|w| w[0] < w[1]));
    }
}
