//! Region subdivision
//!
//! A region taller than one tile of the target aspect ratio is cut into
//! horizontal strips, each spanning the full width of the region and exactly
//! `width / ratio` tall. Strips are produced top to bottom. When the height is
//! not a whole multiple of the strip height, the last strip is anchored to the
//! bottom edge and overlaps the one above it, so every strip keeps the same
//! dimensions.

use crate::aspect::AspectRatio;
use crate::error::{Result, SliceError};
use crate::geometry::BoundingBox;

/// Relative tolerance when deciding whether the remaining strip is shorter
/// than one tile. Keeps exact multiples from producing a sliver tile.
const REMAINDER_TOLERANCE: f64 = 1e-9;

/// Most tiles a single region may be split into. A needle-thin region at a
/// wide ratio would otherwise ask for billions of crops.
pub const MAX_TILES: usize = 10_000;

/// Split a region into tiles of the target aspect ratio, top to bottom.
///
/// Returns the region unchanged as the single tile when it is no taller than
/// one tile, within the remainder tolerance. Fails with
/// [`SliceError::InvalidGeometry`] when the region would need more than
/// [`MAX_TILES`] tiles.
pub fn subdivide(region: &BoundingBox, ratio: AspectRatio) -> Result<Vec<BoundingBox>> {
    region.validate()?;

    let tile_height = ratio.height_for_width(region.width());
    let tolerance = tile_height * REMAINDER_TOLERANCE;
    if tile_height + tolerance >= region.height() {
        return Ok(vec![*region]);
    }

    let mut tiles = Vec::with_capacity(count_tiles(region, tile_height, tolerance)?);

    let mut step = 0u32;
    loop {
        let top = region.y1 - f64::from(step) * tile_height;
        let bottom = top - tile_height;

        if bottom - region.y0 <= tolerance {
            tiles.push(BoundingBox::new(
                region.x0,
                region.y0,
                region.x1,
                region.y0 + tile_height,
            ));
            break;
        }

        tiles.push(BoundingBox::new(region.x0, bottom, region.x1, top));
        step += 1;
    }

    Ok(tiles)
}

/// Number of tiles [`subdivide`] would produce for this region.
pub fn tile_count(region: &BoundingBox, ratio: AspectRatio) -> Result<usize> {
    region.validate()?;

    let tile_height = ratio.height_for_width(region.width());
    let tolerance = tile_height * REMAINDER_TOLERANCE;
    if tile_height + tolerance >= region.height() {
        return Ok(1);
    }
    count_tiles(region, tile_height, tolerance)
}

fn count_tiles(region: &BoundingBox, tile_height: f64, tolerance: f64) -> Result<usize> {
    let count = ((region.height() - tolerance) / tile_height).ceil().max(1.0);
    if !count.is_finite() || count > MAX_TILES as f64 {
        return Err(SliceError::InvalidGeometry {
            bbox: *region,
            reason: format!(
                "would be split into {count:.0} tiles of height {tile_height} (limit is {MAX_TILES})"
            ),
        });
    }
    Ok(count as usize)
}
