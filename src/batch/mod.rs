//! Batch Processing
//!
//! Runs the recognizer over many images and accumulates the per-image
//! results into one [`BatchResult`] with summary statistics.

pub mod messages;
pub mod processor;

pub use messages::BatchEvent;
pub use processor::{collect_images, scan_images, BatchProcessor};

use chrono::Local;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::recognition::{RecognitionResult, RecognitionStatus, WarningLevel};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_REPORTED_FAILURES: usize = 10;

/// Aggregate outcome of one batch
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Folder or description of the input set
    pub source: String,
    pub total_files: usize,
    pub total_processed: usize,
    pub successful_recognitions: usize,
    pub failed_recognitions: usize,
    /// Sum of per-image processing times in seconds
    pub processing_time_sum: f64,
    /// Wall-clock time of the whole batch
    pub elapsed: Duration,
    pub started_at: String,
    pub finished_at: String,
    /// One result per input path, in input order
    pub results: Vec<RecognitionResult>,
}

impl BatchResult {
    /// Summarize results that are already in input order
    pub fn from_results(source: impl Into<String>, results: Vec<RecognitionResult>, elapsed: Duration) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let now = Local::now().format(TIMESTAMP_FORMAT).to_string();

        Self {
            source: source.into(),
            total_files: results.len(),
            total_processed: results.len(),
            successful_recognitions: successful,
            failed_recognitions: results.len() - successful,
            processing_time_sum: results.iter().map(|r| r.processing_time).sum(),
            elapsed,
            started_at: now.clone(),
            finished_at: now,
            results,
        }
    }

    /// Share of processed images with at least one date, 0.0 when empty
    pub fn success_rate(&self) -> f64 {
        if self.total_processed == 0 {
            return 0.0;
        }
        self.successful_recognitions as f64 / self.total_processed as f64
    }

    /// Mean per-image processing time in seconds, 0.0 when empty
    pub fn average_processing_time(&self) -> f64 {
        if self.total_processed == 0 {
            return 0.0;
        }
        self.processing_time_sum / self.total_processed as f64
    }

    pub fn successful_results(&self) -> Vec<&RecognitionResult> {
        self.results.iter().filter(|r| r.success).collect()
    }

    pub fn failed_results(&self) -> Vec<&RecognitionResult> {
        self.results.iter().filter(|r| !r.success).collect()
    }

    /// Results whose warning level is Medium or High
    pub fn warning_results(&self) -> Vec<&RecognitionResult> {
        self.results
            .iter()
            .filter(|r| r.warning_level() >= WarningLevel::Medium)
            .collect()
    }

    /// Occurrences of each date across the batch, ordered by date
    pub fn date_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for result in &self.results {
            for date in &result.dates_found {
                *counts.entry(date.iso_string.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Human-readable summary
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        // Writing to a String cannot fail
        let _ = writeln!(report, "Production Date Recognition Report");
        let _ = writeln!(report, "==================================");
        let _ = writeln!(report, "Source: {}", self.source);
        let _ = writeln!(report, "Started: {}", self.started_at);
        let _ = writeln!(report, "Finished: {}", self.finished_at);
        let _ = writeln!(report);
        let _ = writeln!(report, "Total images: {}", self.total_files);
        let _ = writeln!(report, "Processed: {}", self.total_processed);
        let _ = writeln!(report, "Successful: {}", self.successful_recognitions);
        let _ = writeln!(report, "Failed: {}", self.failed_recognitions);
        let _ = writeln!(report, "Success rate: {:.2}%", self.success_rate() * 100.0);
        let _ = writeln!(report, "Average time: {:.3}s", self.average_processing_time());
        let _ = writeln!(report, "Elapsed: {:.3}s", self.elapsed.as_secs_f64());

        let failed = self.failed_results();
        if !failed.is_empty() {
            let _ = writeln!(report);
            let _ = writeln!(report, "Failures:");
            for result in failed.iter().take(MAX_REPORTED_FAILURES) {
                let _ = writeln!(
                    report,
                    "  - {}: {}",
                    result.image_path.display(),
                    result.warning_message.as_deref().unwrap_or(result.status.as_str())
                );
            }
            if failed.len() > MAX_REPORTED_FAILURES {
                let _ = writeln!(report, "  ... and {} more", failed.len() - MAX_REPORTED_FAILURES);
            }
        }

        let counts = self.date_counts();
        if !counts.is_empty() {
            let _ = writeln!(report);
            let _ = writeln!(report, "Dates found:");
            for (date, count) in &counts {
                let _ = writeln!(report, "  {}: {}", date, count);
            }
        }

        report
    }

    pub fn to_dict(&self) -> Value {
        json!({
            "source": self.source,
            "total_files": self.total_files,
            "total_processed": self.total_processed,
            "successful_recognitions": self.successful_recognitions,
            "failed_recognitions": self.failed_recognitions,
            "success_rate": self.success_rate(),
            "average_processing_time": self.average_processing_time(),
            "processing_time_sum": self.processing_time_sum,
            "elapsed": self.elapsed.as_secs_f64(),
            "started_at": self.started_at,
            "finished_at": self.finished_at,
            "date_counts": self.date_counts(),
            "results": self.results.iter().map(|r| r.to_dict()).collect::<Vec<_>>(),
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_dict())
    }
}

/// Collects results by input index while a batch is running
#[derive(Debug)]
pub struct BatchAccumulator {
    source: String,
    paths: Vec<PathBuf>,
    slots: Vec<Option<RecognitionResult>>,
    /// Filled slots
    completed: usize,
    started: Instant,
    started_at: String,
}

impl BatchAccumulator {
    pub fn new(source: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        let slots = vec![None; paths.len()];
        Self {
            source: source.into(),
            paths,
            slots,
            completed: 0,
            started: Instant::now(),
            started_at: Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots filled so far
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Store the result for input `index`; out-of-range indices are ignored
    pub fn record(&mut self, index: usize, result: RecognitionResult) {
        match self.slots.get_mut(index) {
            Some(slot) => {
                if slot.is_some() {
                    warn!("Result for index {} recorded twice, keeping the latest", index);
                } else {
                    self.completed += 1;
                }
                *slot = Some(result);
            }
            None => warn!("Discarding result for out-of-range index {}", index),
        }
    }

    /// Close the batch; every path gets exactly one result
    pub fn finish(self) -> BatchResult {
        let results: Vec<RecognitionResult> = self
            .slots
            .into_iter()
            .zip(self.paths)
            .map(|(slot, path)| {
                slot.unwrap_or_else(|| {
                    warn!("No result recorded for {}", path.display());
                    RecognitionResult::failure(
                        path,
                        RecognitionStatus::EngineFailure,
                        "recognition failed: no result produced",
                        0.0,
                    )
                })
            })
            .collect();

        let mut batch = BatchResult::from_results(self.source, results, self.started.elapsed());
        batch.started_at = self.started_at;
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::CanonicalDate;

    fn ok(path: &str, dates: &[(i32, u32, u32)], confidence: f32, time: f64) -> RecognitionResult {
        let mut result = RecognitionResult::failure(path, RecognitionStatus::Recognized, "", time);
        result.success = true;
        result.warning_message = None;
        result.confidence = confidence;
        result.dates_found = dates.iter().map(|&(y, m, d)| CanonicalDate::from_ymd(y, m, d)).collect();
        result
    }

    fn failed(path: &str, status: RecognitionStatus, message: &str, time: f64) -> RecognitionResult {
        RecognitionResult::failure(path, status, message, time)
    }

    fn sample() -> BatchResult {
        BatchResult::from_results(
            "photos",
            vec![
                ok("a.jpg", &[(2025, 6, 24)], 0.9, 0.2),
                ok("b.jpg", &[(2025, 6, 24), (2024, 1, 1)], 0.5, 0.4),
                failed("c.jpg", RecognitionStatus::NoDateFound, "no text detected", 0.3),
                failed("d.jpg", RecognitionStatus::Timeout, "timed out after 30s", 30.0),
            ],
            Duration::from_secs(31),
        )
    }

    #[test]
    fn test_counts_and_rates() {
        let batch = sample();
        assert_eq!(batch.total_files, 4);
        assert_eq!(batch.total_processed, 4);
        assert_eq!(batch.successful_recognitions, 2);
        assert_eq!(batch.failed_recognitions, 2);
        assert_eq!(
            batch.successful_recognitions + batch.failed_recognitions,
            batch.total_processed
        );
        assert!((batch.success_rate() - 0.5).abs() < 1e-9);
        assert!((batch.average_processing_time() - 30.9 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_batch() {
        let batch = BatchResult::from_results("empty", Vec::new(), Duration::ZERO);
        assert_eq!(batch.total_processed, 0);
        assert_eq!(batch.success_rate(), 0.0);
        assert_eq!(batch.average_processing_time(), 0.0);
        assert!(batch.generate_report().contains("Success rate: 0.00%"));
    }

    #[test]
    fn test_filters() {
        let batch = sample();
        assert_eq!(batch.successful_results().len(), 2);

        let failed: Vec<_> = batch.failed_results().iter().map(|r| r.image_path.clone()).collect();
        assert_eq!(failed, vec![PathBuf::from("c.jpg"), PathBuf::from("d.jpg")]);

        // b.jpg is successful but below 0.6
        assert_eq!(batch.warning_results().len(), 3);
    }

    #[test]
    fn test_date_counts_sorted() {
        let counts = sample().date_counts();
        let keys: Vec<&String> = counts.keys().collect();
        assert_eq!(keys, vec!["2024-01-01", "2025-06-24"]);
        assert_eq!(counts["2025-06-24"], 2);
    }

    #[test]
    fn test_generate_report() {
        let report = sample().generate_report();
        assert!(report.contains("Source: photos"));
        assert!(report.contains("Successful: 2"));
        assert!(report.contains("Success rate: 50.00%"));
        assert!(report.contains("  - c.jpg: no text detected"));
        assert!(report.contains("  - d.jpg: timed out after 30s"));
        assert!(report.contains("  2025-06-24: 2"));
    }

    #[test]
    fn test_report_caps_failures() {
        let results = (0..13)
            .map(|i| failed(&format!("{i}.jpg"), RecognitionStatus::NoDateFound, "no text detected", 0.1))
            .collect();
        let report = BatchResult::from_results("many", results, Duration::ZERO).generate_report();
        assert_eq!(report.matches("no text detected").count(), 10);
        assert!(report.contains("... and 3 more"));
    }

    #[test]
    fn test_to_dict() {
        let dict = sample().to_dict();
        assert_eq!(dict["total_processed"], 4);
        assert_eq!(dict["success_rate"], 0.5);
        assert_eq!(dict["date_counts"]["2025-06-24"], 2);
        assert_eq!(dict["results"][3]["status"], "timeout");

        let text = sample().to_json().unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["results"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_accumulator_orders_by_index() {
        let paths: Vec<PathBuf> = ["a.jpg", "b.jpg", "c.jpg"].iter().map(PathBuf::from).collect();
        let mut acc = BatchAccumulator::new("set", paths.clone());

        acc.record(2, ok("c.jpg", &[(2025, 1, 1)], 0.9, 0.1));
        acc.record(0, ok("a.jpg", &[(2025, 1, 2)], 0.9, 0.1));
        acc.record(1, failed("b.jpg", RecognitionStatus::NoDateFound, "no text detected", 0.1));
        assert_eq!(acc.completed(), 3);

        let batch = acc.finish();
        let order: Vec<PathBuf> = batch.results.iter().map(|r| r.image_path.clone()).collect();
        assert_eq!(order, paths);
        assert_eq!(batch.successful_recognitions, 2);
    }

    #[test]
    fn test_accumulator_completed_counts_distinct_slots() {
        let paths: Vec<PathBuf> = ["a.jpg", "b.jpg", "c.jpg"].iter().map(PathBuf::from).collect();
        let mut acc = BatchAccumulator::new("set", paths);
        assert_eq!(acc.completed(), 0);

        acc.record(1, ok("b.jpg", &[(2025, 1, 1)], 0.9, 0.1));
        assert_eq!(acc.completed(), 1);
        acc.record(1, ok("b.jpg", &[(2025, 1, 2)], 0.9, 0.1));
        assert_eq!(acc.completed(), 1);
        acc.record(9, ok("x.jpg", &[(2025, 1, 1)], 0.9, 0.1));
        assert_eq!(acc.completed(), 1);
        acc.record(0, ok("a.jpg", &[(2025, 1, 1)], 0.9, 0.1));
        assert_eq!(acc.completed(), 2);
    }

    #[test]
    fn test_accumulator_fills_missing_slots() {
        let paths: Vec<PathBuf> = ["a.jpg", "b.jpg"].iter().map(PathBuf::from).collect();
        let mut acc = BatchAccumulator::new("set", paths);
        acc.record(0, ok("a.jpg", &[(2025, 1, 1)], 0.9, 0.1));
        acc.record(7, ok("zzz.jpg", &[(2025, 1, 1)], 0.9, 0.1));

        let batch = acc.finish();
        assert_eq!(batch.total_processed, 2);
        assert_eq!(batch.results[1].image_path, PathBuf::from("b.jpg"));
        assert_eq!(batch.results[1].status, RecognitionStatus::EngineFailure);
    }
}
