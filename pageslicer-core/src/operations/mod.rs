//! Page operations
//!
//! The extraction pipeline needs exactly three document capabilities: pull
//! one page out of a document, crop a document to a box, and concatenate
//! documents in order. [`PageOperations`] abstracts them so the pipeline can
//! run against different backends:
//!
//! - [`NativeOperations`] - in-process, built on `lopdf`
//! - [`ExternalTools`] - shells out to `pdftk` and `pdfcrop`
//! - [`MockPageOperations`] - deterministic fake for tests
//!
//! Every operation reads and writes files, so artifacts can live in a scoped
//! scratch directory owned by the caller.

pub mod external;
pub mod mock;
pub mod native;

pub use external::ExternalTools;
pub use mock::{MockCall, MockPageOperations};
pub use native::NativeOperations;

use crate::error::Result;
use crate::geometry::BoundingBox;
use std::path::{Path, PathBuf};

/// Document capabilities consumed by the extraction pipeline
///
/// Implementations must write their result to `output` and nothing else;
/// the caller owns the lifetime of every path it passes in.
pub trait PageOperations: Send + Sync {
    /// Write a one-page document containing page `page_index` (zero-based)
    /// of `source` to `output`.
    ///
    /// # Errors
    ///
    /// Fails when the page index is out of range or the backend fails.
    fn extract_page(&self, source: &Path, page_index: u32, output: &Path) -> Result<()>;

    /// Write `source` cropped to `region` to `output`.
    ///
    /// The region is in the page's own coordinate space. Cropping to a region
    /// outside the page extent has backend-defined results.
    fn crop(&self, source: &Path, region: &BoundingBox, output: &Path) -> Result<()>;

    /// Write the pages of `inputs`, in order, as one document to `output`.
    ///
    /// # Errors
    ///
    /// Fails when `inputs` is empty or the backend fails.
    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;

    /// Short backend name used in logs and summaries
    fn name(&self) -> &str;
}

impl<T: PageOperations + ?Sized> PageOperations for &T {
    fn extract_page(&self, source: &Path, page_index: u32, output: &Path) -> Result<()> {
        (**self).extract_page(source, page_index, output)
    }

    fn crop(&self, source: &Path, region: &BoundingBox, output: &Path) -> Result<()> {
        (**self).crop(source, region, output)
    }

    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        (**self).concatenate(inputs, output)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: PageOperations + ?Sized> PageOperations for Box<T> {
    fn extract_page(&self, source: &Path, page_index: u32, output: &Path) -> Result<()> {
        (**self).extract_page(source, page_index, output)
    }

    fn crop(&self, source: &Path, region: &BoundingBox, output: &Path) -> Result<()> {
        (**self).crop(source, region, output)
    }

    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        (**self).concatenate(inputs, output)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
