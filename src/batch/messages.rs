//! Progress messages sent from the batch processor to observers

use std::path::PathBuf;

/// Events emitted while a batch runs
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// The batch has started
    Started {
        /// Number of images queued
        total: usize,
    },
    /// One image has a result
    ImageFinished {
        /// Position of the image in the input list
        index: usize,
        path: PathBuf,
        success: bool,
        /// Images finished so far, this one included
        completed: usize,
        total: usize,
    },
    /// Every image has a result
    Finished { successful: usize, failed: usize },
}
