use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Global metrics instance
pub static METRICS: Lazy<Mutex<Metrics>> = Lazy::new(|| Mutex::new(Metrics::new()));

/// Pipeline metrics tracker
#[derive(Debug, Default)]
pub struct Metrics {
    pub total_files_attempted: u64,
    pub total_files_successful: u64,
    pub total_files_failed: u64,
    pub total_rows_read: u64,
    pub total_rows_derived: u64,
    pub total_rows_unreadable: u64,
    pub rows_skipped: BTreeMap<&'static str, u64>,
    pub processing_times: BTreeMap<String, Duration>,
    pub start_time: Option<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_file_attempt(&mut self) {
        self.total_files_attempted += 1;
    }

    pub fn record_file_success(&mut self, rows_read: u64, rows_derived: u64) {
        self.total_files_successful += 1;
        self.total_rows_read += rows_read;
        self.total_rows_derived += rows_derived;
    }

    pub fn record_file_failure(&mut self) {
        self.total_files_failed += 1;
    }

    pub fn record_unreadable_rows(&mut self, count: u64) {
        self.total_rows_unreadable += count;
    }

    pub fn record_row_skipped(&mut self, kind: &'static str) {
        *self.rows_skipped.entry(kind).or_insert(0) += 1;
    }

    pub fn total_rows_skipped(&self) -> u64 {
        self.rows_skipped.values().sum()
    }

    pub fn record_processing_time(&mut self, operation: String, duration: Duration) {
        self.processing_times.insert(operation, duration);
    }

    pub fn get_total_duration(&self) -> Duration {
        self.start_time
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    pub fn get_throughput(&self) -> f64 {
        let duration_secs = self.get_total_duration().as_secs_f64();
        if duration_secs > 0.0 {
            self.total_rows_derived as f64 / duration_secs
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        let duration = self.get_total_duration();
        println!("\n========== Psychrometrics Run Summary ==========");
        println!("Total Duration: {:.2?}", duration);
        println!("Files Attempted: {}", self.total_files_attempted);
        println!("Files Successful: {}", self.total_files_successful);
        println!("Files Failed: {}", self.total_files_failed);
        println!("Rows Read: {}", self.total_rows_read);
        println!("Rows Derived: {}", self.total_rows_derived);
        println!("Rows Unreadable: {}", self.total_rows_unreadable);
        println!("Rows Skipped: {}", self.total_rows_skipped());
        for (kind, count) in &self.rows_skipped {
            println!("  {}: {}", kind, count);
        }
        println!("Throughput: {:.2} rows/sec", self.get_throughput());

        if !self.processing_times.is_empty() {
            println!("\nProcessing Times:");
            for (op, duration) in &self.processing_times {
                println!("  {}: {:.2?}", op, duration);
            }
        }
        println!("================================================\n");
    }
}

/// Helper macro to time an operation
#[macro_export]
macro_rules! time_operation {
    ($name:expr, $op:expr) => {{
        let start = std::time::Instant::now();
        let result = $op;
        let duration = start.elapsed();
        $crate::metrics::METRICS
            .lock()
            .record_processing_time($name.to_string(), duration);
        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_skip_counters() {
        let mut metrics = Metrics::new();
        metrics.record_row_skipped("parse");
        metrics.record_row_skipped("parse");
        metrics.record_row_skipped("timestamp");
        metrics.record_file_success(12, 9);

        assert_eq!(metrics.total_rows_skipped(), 3);
        assert_eq!(metrics.rows_skipped["parse"], 2);
        assert_eq!(metrics.total_rows_read, 12);
        assert_eq!(metrics.total_rows_derived, 9);
    }
}
