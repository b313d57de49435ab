//! Outcome of a successful extraction

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// What a completed run produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSummary {
    /// Location of the assembled document
    pub output: PathBuf,
    /// Source pages visited
    pub pages: usize,
    /// Annotated boxes processed
    pub regions: usize,
    /// Crops written, equal to the page count of the output
    pub crops: usize,
    /// Backend that performed the page operations
    pub backend: String,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl fmt::Display for ExtractionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} crops from {} regions on {} pages to {} in {:.2}s ({})",
            self.crops,
            self.regions,
            self.pages,
            self.output.display(),
            self.elapsed.as_secs_f64(),
            self.backend
        )
    }
}
