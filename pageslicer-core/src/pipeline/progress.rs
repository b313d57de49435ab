//! Progress reporting for extraction runs

use crate::plan::CropJob;
use std::time::Duration;

/// Snapshot taken after each completed crop
#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    /// Crops finished so far
    pub completed: usize,
    /// Crops in the whole plan
    pub total: usize,
    /// The crop that just finished
    pub job: CropJob,
    /// Time since the run started
    pub elapsed: Duration,
}

impl ExtractionProgress {
    /// Get progress percentage (0.0 - 100.0)
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    /// True once every crop is done; only concatenation remains
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Format progress as a string
    pub fn format_progress(&self) -> String {
        format!(
            "{}/{} ({:.1}%) - {}",
            self.completed,
            self.total,
            self.percentage(),
            self.job
        )
    }
}

/// Receives progress updates from a running extraction
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, progress: &ExtractionProgress);
}

impl<F> ProgressCallback for F
where
    F: Fn(&ExtractionProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &ExtractionProgress) {
        self(progress)
    }
}
