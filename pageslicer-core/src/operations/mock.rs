//! Deterministic page operations for tests
//!
//! [`MockPageOperations`] never parses PDF. It writes small text artifacts
//! that describe what was done to them, so a test can read the final output
//! and check which page and region ended up at which position:
//!
//! - extracting page 3 writes `page 3`
//! - cropping that file writes `page 3 [x0, y0, x1, y1]`
//! - concatenating writes the inputs' contents, one per line
//!
//! Every call is recorded and failures can be injected.

use super::PageOperations;
use crate::error::{Result, SliceError};
use crate::geometry::BoundingBox;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    ExtractPage { page_index: u32 },
    Crop { region: BoundingBox },
    Concatenate { inputs: Vec<PathBuf> },
}

/// Fake backend that records calls and writes text artifacts
#[derive(Debug)]
pub struct MockPageOperations {
    page_count: u32,
    fail_on_crop: Option<usize>,
    fail_on_page: Option<u32>,
    calls: Mutex<Vec<MockCall>>,
    created: Mutex<Vec<PathBuf>>,
}

impl Default for MockPageOperations {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPageOperations {
    /// Create a mock whose source documents have 10 pages
    pub fn new() -> Self {
        Self {
            page_count: 10,
            fail_on_crop: None,
            fail_on_page: None,
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Set the page count reported for every source document
    pub fn with_page_count(mut self, page_count: u32) -> Self {
        self.page_count = page_count;
        self
    }

    /// Fail the `n`th crop call (zero-based)
    pub fn fail_on_crop(mut self, n: usize) -> Self {
        self.fail_on_crop = Some(n);
        self
    }

    /// Fail any attempt to extract `page_index`
    pub fn fail_on_page(mut self, page_index: u32) -> Self {
        self.fail_on_page = Some(page_index);
        self
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Every file this mock has written, in order
    pub fn created_paths(&self) -> Vec<PathBuf> {
        lock(&self.created).clone()
    }

    /// Number of crop calls so far
    pub fn crop_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, MockCall::Crop { .. }))
            .count()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }

    fn write(&self, output: &Path, contents: &str) -> Result<()> {
        fs::write(output, contents)?;
        lock(&self.created).push(output.to_path_buf());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PageOperations for MockPageOperations {
    fn extract_page(&self, _source: &Path, page_index: u32, output: &Path) -> Result<()> {
        self.record(MockCall::ExtractPage { page_index });

        if page_index >= self.page_count {
            return Err(SliceError::PageOutOfRange {
                page: page_index,
                page_count: self.page_count,
            });
        }
        if self.fail_on_page == Some(page_index) {
            return Err(SliceError::tool("mock", format!("page {page_index} failed")));
        }

        self.write(output, &format!("page {page_index}"))
    }

    fn crop(&self, source: &Path, region: &BoundingBox, output: &Path) -> Result<()> {
        let index = self.crop_count();
        self.record(MockCall::Crop { region: *region });

        if self.fail_on_crop == Some(index) {
            return Err(SliceError::tool("mock", format!("crop {index} failed")));
        }

        let page = fs::read_to_string(source)?;
        self.write(output, &format!("{} {}", page.trim(), region))
    }

    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        self.record(MockCall::Concatenate {
            inputs: inputs.to_vec(),
        });

        if inputs.is_empty() {
            return Err(SliceError::tool("mock", "no documents to concatenate"));
        }

        let mut parts = Vec::with_capacity(inputs.len());
        for input in inputs {
            parts.push(fs::read_to_string(input)?.trim().to_string());
        }
        self.write(output, &parts.join("\n"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
