//! Bounding boxes in page space
//!
//! Coordinates follow the PDF convention: origin at the bottom-left corner of
//! the page, `y` increasing upward. A box is stored as `[x0, y0, x1, y1]`
//! where `(x0, y0)` is the lower-left and `(x1, y1)` the upper-right corner.

use crate::error::{Result, SliceError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rectangle in page-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    /// Left edge
    pub x0: f64,
    /// Bottom edge
    pub y0: f64,
    /// Right edge
    pub x1: f64,
    /// Top edge
    pub y1: f64,
}

impl BoundingBox {
    /// Create a box from its edges, stored verbatim
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Create a box from two opposite corners given in any order
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            x0: a.0.min(b.0),
            y0: a.1.min(b.1),
            x1: a.0.max(b.0),
            y1: a.1.max(b.1),
        }
    }

    /// Get the width
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Get the height
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f64 {
        self.width() / self.height()
    }

    /// Check whether `other` lies entirely inside this box (edges inclusive)
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.y0 >= self.y0 && other.y1 <= self.y1
    }

    /// Check whether the two boxes share any area
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Reject boxes that cannot be tiled or cropped.
    pub fn validate(&self) -> Result<()> {
        let reason = if ![self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|c| c.is_finite())
        {
            Some("coordinates must be finite")
        } else if self.width() <= 0.0 {
            Some("width must be positive")
        } else if self.height() <= 0.0 {
            Some("height must be positive")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(SliceError::InvalidGeometry {
                bbox: *self,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Mirror the box across the horizontal center line of a page.
    ///
    /// Converts between a top-left-origin, y-down screen space and the
    /// bottom-left-origin, y-up page space. The transform is its own inverse.
    pub fn flip_vertical(&self, page_height: f64) -> Self {
        Self {
            x0: self.x0,
            y0: page_height - self.y1,
            x1: self.x1,
            y1: page_height - self.y0,
        }
    }

    /// Edges as `[x0, y0, x1, y1]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x0, self.y0, self.x1, self.y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_dimensions() {
        let bbox = BoundingBox::new(10.0, 20.0, 110.0, 220.0);
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 200.0);
        assert_eq!(bbox.aspect_ratio(), 0.5);
    }

    #[test]
    fn test_from_corners_normalizes() {
        let bbox = BoundingBox::from_corners((110.0, 20.0), (10.0, 220.0));
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 110.0, 220.0));

        let same = BoundingBox::from_corners((10.0, 20.0), (110.0, 220.0));
        assert_eq!(bbox, same);
    }

    #[test]
    fn test_validate() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).validate().is_ok());

        let zero_width = BoundingBox::new(5.0, 0.0, 5.0, 10.0);
        assert!(matches!(
            zero_width.validate(),
            Err(SliceError::InvalidGeometry { .. })
        ));

        let inverted = BoundingBox::new(0.0, 10.0, 10.0, 0.0);
        assert!(inverted.validate().is_err());

        let nan = BoundingBox::new(0.0, f64::NAN, 10.0, 10.0);
        assert!(nan.validate().is_err());

        let infinite = BoundingBox::new(0.0, 0.0, f64::INFINITY, 10.0);
        assert!(infinite.validate().is_err());
    }

    #[test]
    fn test_contains_and_intersects() {
        let page = BoundingBox::new(0.0, 0.0, 612.0, 792.0);
        let inside = BoundingBox::new(50.0, 50.0, 100.0, 100.0);
        let straddling = BoundingBox::new(600.0, 700.0, 700.0, 800.0);
        let outside = BoundingBox::new(700.0, 800.0, 710.0, 810.0);

        assert!(page.contains(&inside));
        assert!(page.contains(&page));
        assert!(!page.contains(&straddling));
        assert!(page.intersects(&straddling));
        assert!(!page.intersects(&outside));
    }

    #[test]
    fn test_flip_vertical() {
        // A box 100pt from the top of a 792pt page, 50pt tall
        let screen = BoundingBox::new(72.0, 100.0, 300.0, 150.0);
        let page = screen.flip_vertical(792.0);
        assert_eq!(page, BoundingBox::new(72.0, 642.0, 300.0, 692.0));
        assert_eq!(page.height(), screen.height());

        assert_eq!(page.flip_vertical(792.0), screen);
    }

    #[test]
    fn test_serde_as_array() {
        let bbox = BoundingBox::new(1.0, 2.5, 3.0, 4.0);
        let json = serde_json::to_string(&bbox).unwrap();
        assert_eq!(json, "[1.0,2.5,3.0,4.0]");

        let parsed: BoundingBox = serde_json::from_str("[1, 2.5, 3, 4]").unwrap();
        assert_eq!(parsed, bbox);

        assert!(serde_json::from_str::<BoundingBox>("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_display() {
        let bbox = BoundingBox::new(0.0, 1.5, 2.0, 3.0);
        assert_eq!(bbox.to_string(), "[0, 1.5, 2, 3]");
    }
}
