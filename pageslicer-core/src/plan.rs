//! Crop-job planning
//!
//! Expands an [`AnnotationSet`] into the ordered list of crops the pipeline
//! performs: page ascending, then box in annotation order, then tile top to
//! bottom. Output page `n` of the assembled document is job `n` of the plan.

use crate::annotations::AnnotationSet;
use crate::aspect::AspectRatio;
use crate::error::Result;
use crate::geometry::BoundingBox;
use crate::tiling::subdivide;
use serde::Serialize;
use std::fmt;

/// One crop: a single tile of a single annotated box on a single page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropJob {
    /// Zero-based page index in the source document
    pub page_index: u32,
    /// Position of the source box within its page's annotation list
    pub box_index: usize,
    /// Position of this tile among the box's tiles, top first
    pub tile_index: usize,
    /// Number of tiles the source box was split into
    pub tile_count: usize,
    /// Area of the page to crop to
    pub region: BoundingBox,
}

impl CropJob {
    /// File name for this job's cropped artifact
    pub fn artifact_name(&self) -> String {
        format!(
            "region_{}_{}_{}.pdf",
            self.page_index, self.box_index, self.tile_index
        )
    }
}

impl fmt::Display for CropJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page {} box {} tile {}/{} {}",
            self.page_index,
            self.box_index,
            self.tile_index + 1,
            self.tile_count,
            self.region
        )
    }
}

/// All jobs for one source page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagePlan {
    pub page_index: u32,
    pub jobs: Vec<CropJob>,
}

/// The complete, ordered set of crops for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropPlan {
    pub aspect_ratio: AspectRatio,
    pub pages: Vec<PagePlan>,
}

impl CropPlan {
    /// Tile every annotated box. Performs no I/O; any invalid box fails here.
    pub fn build(annotations: &AnnotationSet, aspect_ratio: AspectRatio) -> Result<Self> {
        let mut pages = Vec::new();

        for (page_index, boxes) in annotations.pages() {
            if boxes.is_empty() {
                continue;
            }

            let mut jobs = Vec::new();
            for (box_index, region) in boxes.iter().enumerate() {
                let tiles = subdivide(region, aspect_ratio)?;
                let tile_count = tiles.len();
                jobs.extend(tiles.into_iter().enumerate().map(|(tile_index, tile)| CropJob {
                    page_index,
                    box_index,
                    tile_index,
                    tile_count,
                    region: tile,
                }));
            }

            pages.push(PagePlan { page_index, jobs });
        }

        Ok(Self {
            aspect_ratio,
            pages,
        })
    }

    /// All jobs in output order
    pub fn jobs(&self) -> impl Iterator<Item = &CropJob> + '_ {
        self.pages.iter().flat_map(|page| page.jobs.iter())
    }

    /// Number of crops, which is also the page count of the output
    pub fn job_count(&self) -> usize {
        self.pages.iter().map(|page| page.jobs.len()).sum()
    }

    /// Number of source pages that will be visited
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of annotated boxes the plan was built from
    pub fn region_count(&self) -> usize {
        self.jobs().filter(|job| job.tile_index == 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.job_count() == 0
    }
}
