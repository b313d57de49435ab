//! Region extraction pipeline
//!
//! Turns a source document and its annotations into one output document
//! holding every crop, in plan order: pages ascending, boxes in annotation
//! order, tiles top to bottom.
//!
//! All intermediate files live in one scratch directory owned by the run.
//! The final document is assembled in a staging file next to the output and
//! moved into place only after concatenation succeeds, so a failed or
//! cancelled run leaves neither intermediates nor a partial output behind.
//!
//! # Example
//!
//! ```rust,no_run
//! use pageslicer::pipeline::{ExtractOptions, RegionExtractor};
//! use pageslicer::{AnnotationSet, AspectRatio, NativeOperations};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let annotations = AnnotationSet::from_path("boxes.json")?;
//! let options = ExtractOptions::default()
//!     .with_aspect_ratio("3:4".parse::<AspectRatio>()?)
//!     .with_progress_callback(|progress| {
//!         println!("{}", progress.format_progress());
//!     });
//!
//! let extractor = RegionExtractor::new(NativeOperations::new(), options);
//! let summary = extractor.extract(Path::new("paper.pdf"), &annotations, Path::new("regions.pdf"))?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

use crate::annotations::AnnotationSet;
use crate::aspect::AspectRatio;
use crate::error::{Result, SliceError};
use crate::operations::{NativeOperations, PageOperations};
use crate::plan::CropPlan;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;
use tempfile::{Builder, NamedTempFile, TempDir};
use tracing::{debug, info, warn};

pub mod progress;
pub mod result;

pub use progress::{ExtractionProgress, ProgressCallback};
pub use result::ExtractionSummary;

/// Shared flag for stopping a run from another thread
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the run stops before its next backend call
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Options for an extraction run
#[derive(Clone, Default)]
pub struct ExtractOptions {
    /// Target width-to-height ratio of every crop
    pub aspect_ratio: AspectRatio,
    /// Parent directory for scratch space (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
    /// Checked before every backend call
    pub cancellation: Option<CancellationToken>,
    /// Called after every crop
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl ExtractOptions {
    /// Set the target aspect ratio
    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Create scratch directories under `dir`
    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Stop the run when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set progress callback
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ExtractionProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }
}

/// Runs the extraction pipeline against a page-operations backend
pub struct RegionExtractor<O: PageOperations> {
    ops: O,
    options: ExtractOptions,
}

impl<O: PageOperations> RegionExtractor<O> {
    pub fn new(ops: O, options: ExtractOptions) -> Self {
        Self { ops, options }
    }

    /// The backend this extractor drives
    pub fn operations(&self) -> &O {
        &self.ops
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Crop every annotated region of `source` and write them, in order, as
    /// one document at `output`.
    ///
    /// # Errors
    ///
    /// - `NoRegions` when the annotations contain no boxes; nothing is invoked
    /// - `InvalidGeometry` for a degenerate box, before any backend call
    /// - `PageOutOfRange` or `ToolInvocation` when a backend call fails
    /// - `Cancelled` when the cancellation token fires
    ///
    /// On error `output` is left exactly as it was.
    pub fn extract(
        &self,
        source: &Path,
        annotations: &AnnotationSet,
        output: &Path,
    ) -> Result<ExtractionSummary> {
        let start = Instant::now();

        let plan = CropPlan::build(annotations, self.options.aspect_ratio)?;
        if plan.is_empty() {
            return Err(SliceError::NoRegions);
        }

        let total = plan.job_count();
        info!(
            "Extracting {} crops from {} pages of {} (aspect ratio {}, {} backend)",
            total,
            plan.page_count(),
            source.display(),
            plan.aspect_ratio,
            self.ops.name()
        );

        let scratch = self.scratch_dir()?;
        debug!("Scratch directory {}", scratch.path().display());

        let mut artifacts = Vec::with_capacity(total);
        for page in &plan.pages {
            self.check_cancelled()?;
            let page_path = scratch.path().join(format!("page_{}.pdf", page.page_index));
            self.ops.extract_page(source, page.page_index, &page_path)?;
            info!("Page {}: {} crops", page.page_index, page.jobs.len());

            for job in &page.jobs {
                self.check_cancelled()?;
                let crop_path = scratch.path().join(job.artifact_name());
                self.ops.crop(&page_path, &job.region, &crop_path)?;
                debug!("Cropped {}", job);
                artifacts.push(crop_path);

                self.report(ExtractionProgress {
                    completed: artifacts.len(),
                    total,
                    job: job.clone(),
                    elapsed: start.elapsed(),
                });
            }

            // The page is no longer needed once its crops exist
            if let Err(e) = fs::remove_file(&page_path) {
                warn!("Could not remove {}: {}", page_path.display(), e);
            }
        }

        self.check_cancelled()?;
        let staged = staging_file(output)?;
        self.ops.concatenate(&artifacts, staged.path())?;
        staged.persist(output).map_err(|e| SliceError::Io(e.error))?;

        if let Err(e) = scratch.close() {
            warn!("Could not remove scratch directory: {}", e);
        }

        let summary = ExtractionSummary {
            output: output.to_path_buf(),
            pages: plan.page_count(),
            regions: plan.region_count(),
            crops: total,
            backend: self.ops.name().to_string(),
            elapsed: start.elapsed(),
        };
        info!("{}", summary);
        Ok(summary)
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = Builder::new();
        builder.prefix("pageslicer-");
        let dir = match &self.options.scratch_dir {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.options.cancellation {
            Some(token) if token.is_cancelled() => {
                info!("Extraction cancelled");
                Err(SliceError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    fn report(&self, progress: ExtractionProgress) {
        if let Some(callback) = &self.options.progress_callback {
            callback.on_progress(&progress);
        }
    }
}

/// Empty file in the output's directory, so persisting it is a rename on
/// the same filesystem.
fn staging_file(output: &Path) -> Result<NamedTempFile> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(Builder::new()
        .prefix(".pageslicer-")
        .suffix(".pdf")
        .tempfile_in(dir)?)
}

/// Extract regions with the native backend.
///
/// Loads `annotations` from disk and writes the crops of `source` to
/// `output` at the given aspect ratio.
pub fn extract_regions<P, Q, R>(
    source: P,
    annotations: Q,
    output: R,
    aspect_ratio: AspectRatio,
) -> Result<ExtractionSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let annotations = AnnotationSet::from_path(annotations)?;
    let options = ExtractOptions::default().with_aspect_ratio(aspect_ratio);
    RegionExtractor::new(NativeOperations::new(), options).extract(
        source.as_ref(),
        &annotations,
        output.as_ref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::operations::{MockCall, MockPageOperations};

    #[test]
    fn test_extract_options_default() {
        let options = ExtractOptions::default();
        assert_eq!(options.aspect_ratio, AspectRatio::DEFAULT);
        assert!(options.scratch_dir.is_none());
        assert!(options.cancellation.is_none());
        assert!(options.progress_callback.is_none());
    }

    #[test]
    fn test_extract_options_builder() {
        let token = CancellationToken::new();
        let options = ExtractOptions::default()
            .with_aspect_ratio(AspectRatio::new(2.0).unwrap())
            .with_scratch_dir("/tmp/scratch")
            .with_cancellation(token.clone())
            .with_progress_callback(|_| {});

        assert_eq!(options.aspect_ratio.value(), 2.0);
        assert_eq!(options.scratch_dir, Some(PathBuf::from("/tmp/scratch")));
        assert!(options.progress_callback.is_some());

        token.cancel();
        assert!(options.cancellation.unwrap().is_cancelled());
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_no_regions_invokes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ops = MockPageOperations::new();
        let extractor = RegionExtractor::new(&ops, ExtractOptions::default());

        let annotations = AnnotationSet::from_json_str(r#"{"0": [], "3": []}"#).unwrap();
        let err = extractor
            .extract(Path::new("in.pdf"), &annotations, &dir.path().join("out.pdf"))
            .unwrap_err();

        assert!(matches!(err, SliceError::NoRegions));
        assert!(ops.calls().is_empty());
    }

    #[test]
    fn test_single_page_artifact_released_after_its_crops() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        fs::create_dir(&scratch).unwrap();
        let ops = MockPageOperations::new();
        let extractor = RegionExtractor::new(
            &ops,
            ExtractOptions::default().with_scratch_dir(&scratch),
        );

        let mut annotations = AnnotationSet::new();
        annotations.push(0, BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        annotations.push(1, BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        extractor
            .extract(Path::new("in.pdf"), &annotations, &dir.path().join("out.pdf"))
            .unwrap();

        let page_files: Vec<_> = ops
            .created_paths()
            .into_iter()
            .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with("page_"))
            .collect();
        assert_eq!(page_files.len(), 2);
        assert!(page_files.iter().all(|p| !p.exists()));
        assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);

        let crops = ops
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::Crop { .. }))
            .count();
        assert_eq!(crops, 2);
    }

    #[test]
    fn test_staging_file_for_bare_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let staged = staging_file(&dir.path().join("out.pdf")).unwrap();
        assert_eq!(staged.path().parent(), Some(dir.path()));
        assert!(staged
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(".pageslicer-"));
    }
}
