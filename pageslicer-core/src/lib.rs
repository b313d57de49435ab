//! # pageslicer
//!
//! Extract annotated regions from PDF documents as fixed-aspect crops.
//!
//! Given a source document and an annotation file listing bounding boxes per
//! page, pageslicer crops every box out of its page and assembles all crops,
//! in a deterministic order, into a single output document. Boxes taller than
//! the target aspect ratio allows are cut into equally sized tiles first, so
//! every output page has the same shape.
//!
//! ## Features
//!
//! - **Tiling**: Split tall regions into uniform tiles, top to bottom
//! - **Deterministic Order**: Pages ascending, boxes in annotation order, tiles top first
//! - **Pluggable Backends**: Native `lopdf` operations, or `pdftk`/`pdfcrop`
//! - **Clean Failure**: Scoped scratch space and atomic output; no partial results
//! - **Cancellation & Progress**: Stop a run from another thread, observe every crop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pageslicer::{extract_regions, Result};
//!
//! # fn main() -> Result<()> {
//! let summary = extract_regions("paper.pdf", "boxes.json", "regions.pdf", "3:4".parse()?)?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Planning Without Documents
//!
//! ```rust
//! use pageslicer::{AnnotationSet, AspectRatio, CropPlan, Result};
//!
//! # fn main() -> Result<()> {
//! let annotations = AnnotationSet::from_json_str(r#"{"2": [[0, 0, 100, 100]], "0": [[0, 0, 100, 250]]}"#)?;
//! let plan = CropPlan::build(&annotations, AspectRatio::new(1.0)?)?;
//!
//! // Page 0 comes first and its box is tall enough for three tiles
//! assert_eq!(plan.job_count(), 4);
//! assert_eq!(plan.jobs().next().unwrap().page_index, 0);
//! # Ok(())
//! # }
//! ```

pub mod annotations;
pub mod aspect;
pub mod error;
pub mod geometry;
pub mod operations;
pub mod pipeline;
pub mod plan;
pub mod tiling;

pub use annotations::AnnotationSet;
pub use aspect::{AspectRatio, MIN_ASPECT_RATIO};
pub use error::{ErrorKind, Result, SliceError};
pub use geometry::BoundingBox;
pub use operations::{ExternalTools, MockPageOperations, NativeOperations, PageOperations};
pub use pipeline::{
    extract_regions, CancellationToken, ExtractOptions, ExtractionProgress, ExtractionSummary,
    ProgressCallback, RegionExtractor,
};
pub use plan::{CropJob, CropPlan, PagePlan};
pub use tiling::{subdivide, tile_count, MAX_TILES};

/// Current version of pageslicer
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
    }
}
