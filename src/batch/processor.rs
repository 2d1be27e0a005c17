//! Batch Processor
//!
//! Bounded worker pool over a list of images. Workers pull `(index, path)`
//! jobs from a channel; every image runs on its own thread so a stuck
//! engine call can be abandoned after the per-image timeout.

use anyhow::{bail, Result};
use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{BatchAccumulator, BatchEvent, BatchResult};
use crate::config::{AppConfig, ConfigError, ScanConfig};
use crate::recognition::{DateRecognizer, RecognitionResult, RecognitionStatus};

/// Runs a [`DateRecognizer`] over many images
pub struct BatchProcessor {
    recognizer: Arc<DateRecognizer>,
    workers: usize,
    timeout: Duration,
    scan: ScanConfig,
    progress: Option<Sender<BatchEvent>>,
}

impl BatchProcessor {
    pub fn new(config: &AppConfig, recognizer: Arc<DateRecognizer>) -> Result<Self, ConfigError> {
        config.performance.validate()?;

        let mut workers = config.performance.max_workers;
        if !recognizer.engine().is_reentrant() && workers > 1 {
            info!(
                "OCR engine '{}' is not reentrant, using a single worker",
                recognizer.engine().name()
            );
            workers = 1;
        }

        Ok(Self {
            recognizer,
            workers,
            timeout: Duration::from_secs(config.performance.single_image_timeout_secs),
            scan: config.scan.clone(),
            progress: None,
        })
    }

    /// Send progress events to `sender`
    pub fn with_progress(mut self, sender: Sender<BatchEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Override the per-image time limit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Effective worker count
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Recognize every image under `folder`
    pub fn process_folder(&self, folder: &Path) -> Result<BatchResult> {
        let paths = scan_images(folder, &self.scan)?;
        info!("Found {} image(s) in {}", paths.len(), folder.display());
        Ok(self.process_paths(folder.display().to_string(), &paths))
    }

    /// Recognize `paths`; `results[i]` belongs to `paths[i]`
    pub fn process_paths(&self, source: impl Into<String>, paths: &[PathBuf]) -> BatchResult {
        let total = paths.len();
        let mut accumulator = BatchAccumulator::new(source, paths.to_vec());
        self.emit(BatchEvent::Started { total });

        let (job_tx, job_rx) = unbounded::<(usize, PathBuf)>();
        for job in paths.iter().cloned().enumerate() {
            // Receiver is alive until the scope below ends
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let (result_tx, result_rx) = unbounded::<(usize, RecognitionResult)>();
        let workers = self.workers.min(total);
        debug!("Processing {} image(s) with {} worker(s)", total, workers);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                scope.spawn(move || {
                    for (index, path) in jobs.iter() {
                        let result = self.recognize_with_timeout(path);
                        if results.send((index, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for (index, result) in result_rx.iter() {
                let path = result.image_path.clone();
                let success = result.success;
                accumulator.record(index, result);
                self.emit(BatchEvent::ImageFinished {
                    index,
                    path,
                    success,
                    completed: accumulator.completed(),
                    total,
                });
            }
        });

        let batch = accumulator.finish();
        info!(
            "Batch finished: {}/{} recognized in {:.2}s",
            batch.successful_recognitions,
            batch.total_processed,
            batch.elapsed.as_secs_f64()
        );
        self.emit(BatchEvent::Finished {
            successful: batch.successful_recognitions,
            failed: batch.failed_recognitions,
        });
        batch
    }

    /// Run one image on its own thread and wait at most `self.timeout`
    ///
    /// The clock starts when the recognizer reports that the engine is
    /// free; waiting behind an abandoned call to a non-reentrant engine
    /// does not count against this image.
    fn recognize_with_timeout(&self, path: PathBuf) -> RecognitionResult {
        let (tx, rx) = bounded(2);
        let recognizer = Arc::clone(&self.recognizer);
        let job_path = path.clone();

        let spawned = std::thread::Builder::new()
            .name("date-lens-image".to_string())
            .spawn(move || {
                let started = tx.clone();
                let result = recognizer.recognize_with_start(&job_path, move || {
                    let _ = started.send(ImageProgress::Started);
                });
                // Nobody listens after a timeout
                let _ = tx.send(ImageProgress::Done(result));
            });

        if let Err(e) = spawned {
            warn!("Failed to start recognition thread for {}: {}", path.display(), e);
            return RecognitionResult::failure(
                path,
                RecognitionStatus::EngineFailure,
                format!("recognition failed: {}", e),
                0.0,
            );
        }

        match rx.recv() {
            Ok(ImageProgress::Started) => {}
            Ok(ImageProgress::Done(result)) => return result,
            Err(_) => return aborted(path, 0.0),
        }

        let start = Instant::now();
        match rx.recv_timeout(self.timeout) {
            Ok(ImageProgress::Done(result)) => result,
            Ok(ImageProgress::Started) => aborted(path, start.elapsed().as_secs_f64()),
            Err(RecvTimeoutError::Timeout) => {
                warn!("Recognition of {} timed out after {:?}", path.display(), self.timeout);
                RecognitionResult::timeout(&path, self.timeout)
            }
            Err(RecvTimeoutError::Disconnected) => aborted(path, start.elapsed().as_secs_f64()),
        }
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(sender) = &self.progress {
            let _ = sender.send(event);
        }
    }
}

/// Messages from a per-image recognition thread
enum ImageProgress {
    /// The engine is free and processing has begun
    Started,
    Done(RecognitionResult),
}

fn aborted(path: PathBuf, processing_time: f64) -> RecognitionResult {
    warn!("Recognition of {} aborted", path.display());
    RecognitionResult::failure(
        path,
        RecognitionStatus::EngineFailure,
        "recognition failed: recognition aborted unexpectedly",
        processing_time,
    )
}

/// Image files under `folder`, sorted by path
pub fn scan_images(folder: &Path, scan: &ScanConfig) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        bail!("Not a directory: {}", folder.display());
    }

    let max_depth = if scan.recursive { usize::MAX } else { 1 };
    let mut paths: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_image_extension(path, &scan.extensions))
        .collect();

    paths.sort();
    Ok(paths)
}

/// Expand folders into their image files; every other path is kept as given
///
/// A path that does not exist stays in the list so the batch reports it as
/// a failed image instead of silently dropping it.
pub fn collect_images(paths: &[PathBuf], scan: &ScanConfig) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_dir() {
            images.extend(scan_images(path, scan)?);
        } else {
            if !path.exists() {
                warn!("Requested image {} does not exist", path.display());
            }
            images.push(path.clone());
        }
    }
    Ok(images)
}

fn has_image_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
