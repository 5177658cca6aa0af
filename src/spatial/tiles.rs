//! Overlapping tile grids for inference on oversized images
//!
//! Tiles advance by `floor(tile * (1 - overlap))` pixels (at least one) and the
//! last tile on each axis is pulled back so its far edge sits exactly on the
//! image edge. The grid therefore covers the image without padding, and the
//! last overlap on an axis may exceed the nominal ratio. Tiles are numbered in
//! row-major order; aggregation relies on that order for tie-breaking.

use crate::io::configuration::TilingConfig;
use crate::io::error::{Result, geometry_error, invalid_parameter};
use crate::spatial::bbox::PixelBox;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A rectangular region of the source image processed independently
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Row-major position in the plan
    pub id: usize,
    /// Top-left corner `(x, y)` in source pixels
    pub origin: (u32, u32),
    /// `(width, height)` in pixels
    pub size: (u32, u32),
}

impl Tile {
    /// Tile covering an entire image
    pub const fn whole(image_size: (u32, u32)) -> Self {
        Self {
            id: 0,
            origin: (0, 0),
            size: image_size,
        }
    }

    /// Source pixels covered by the tile
    pub const fn rect(&self) -> PixelBox {
        PixelBox {
            x_min: self.origin.0,
            y_min: self.origin.1,
            x_max: self.origin.0 + self.size.0,
            y_max: self.origin.1 + self.size.1,
        }
    }

    /// True when the tile is the whole image of the given size
    pub fn covers(&self, image_size: (u32, u32)) -> bool {
        self.origin == (0, 0) && self.size == image_size
    }
}

/// Image size above which tiled inference is used
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilingTrigger {
    /// Images wider than this are tiled
    pub max_width: u32,
    /// Images taller than this are tiled
    pub max_height: u32,
}

impl TilingTrigger {
    /// Whether an image of this size should be tiled
    pub const fn exceeds(&self, image_size: (u32, u32)) -> bool {
        image_size.0 > self.max_width || image_size.1 > self.max_height
    }
}

/// Pixel advance between successive tiles on one axis
pub fn step_size(tile_dim: u32, overlap_ratio: f32) -> u32 {
    let advance = f64::from(tile_dim) * (1.0 - f64::from(overlap_ratio));
    (advance.floor() as u32).max(1)
}

/// Tile start offsets along one axis of length `extent`
///
/// The tile dimension is clamped to the extent, so a tile larger than the
/// image yields a single offset of zero.
pub fn axis_offsets(extent: u32, tile_dim: u32, overlap_ratio: f32) -> Vec<u32> {
    let tile_dim = tile_dim.min(extent);
    let last = extent - tile_dim;
    let step = step_size(tile_dim.max(1), overlap_ratio);

    let mut offsets = Vec::new();
    let mut offset = 0;
    while offset < last {
        offsets.push(offset);
        offset += step;
    }
    offsets.push(last);
    offsets
}

/// Plan an overlapping grid over the whole image, ignoring any trigger
///
/// # Errors
///
/// Returns `InvalidParameter` for a zero-area image, a zero tile dimension or
/// an overlap ratio outside `[0, 1)`
pub fn plan_grid(
    image_size: (u32, u32),
    tile_size: (u32, u32),
    overlap_ratio: f32,
) -> Result<Vec<Tile>> {
    validate_geometry(tile_size, overlap_ratio)?;
    if image_size.0 == 0 || image_size.1 == 0 {
        return Err(invalid_parameter(
            "image_size",
            &format!("{}x{}", image_size.0, image_size.1),
            &"image must have a positive area",
        ));
    }

    let tile_width = tile_size.0.min(image_size.0);
    let tile_height = tile_size.1.min(image_size.1);
    let xs = axis_offsets(image_size.0, tile_width, overlap_ratio);
    let ys = axis_offsets(image_size.1, tile_height, overlap_ratio);

    let mut tiles = Vec::with_capacity(xs.len() * ys.len());
    for &y in &ys {
        for &x in &xs {
            tiles.push(Tile {
                id: tiles.len(),
                origin: (x, y),
                size: (tile_width, tile_height),
            });
        }
    }
    Ok(tiles)
}

fn validate_geometry(tile_size: (u32, u32), overlap_ratio: f32) -> Result<()> {
    if tile_size.0 == 0 || tile_size.1 == 0 {
        return Err(invalid_parameter(
            "tile_size",
            &format!("{}x{}", tile_size.0, tile_size.1),
            &"tile dimensions must be positive",
        ));
    }
    if !(overlap_ratio.is_finite() && (0.0..1.0).contains(&overlap_ratio)) {
        return Err(invalid_parameter(
            "overlap_ratio",
            &overlap_ratio,
            &"must be in [0, 1)",
        ));
    }
    Ok(())
}

/// Tiling planner bound to a tile size, overlap ratio and size trigger
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TilePlanner {
    tile_size: (u32, u32),
    overlap_ratio: f32,
    trigger: TilingTrigger,
}

impl TilePlanner {
    /// Create a planner after validating its geometry
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a zero tile dimension or an overlap
    /// ratio outside `[0, 1)`
    pub fn new(tile_size: (u32, u32), overlap_ratio: f32, trigger: TilingTrigger) -> Result<Self> {
        validate_geometry(tile_size, overlap_ratio)?;
        Ok(Self {
            tile_size,
            overlap_ratio,
            trigger,
        })
    }

    /// Create a planner from the tiling section of the engine configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the configured geometry is invalid
    pub fn from_config(config: &TilingConfig) -> Result<Self> {
        Self::new(
            (config.tile_width, config.tile_height),
            config.overlap_ratio,
            TilingTrigger {
                max_width: config.trigger_width,
                max_height: config.trigger_height,
            },
        )
    }

    /// Configured tile size
    pub const fn tile_size(&self) -> (u32, u32) {
        self.tile_size
    }

    /// Configured overlap ratio
    pub const fn overlap_ratio(&self) -> f32 {
        self.overlap_ratio
    }

    /// Whether an image of this size activates tiling
    pub const fn should_tile(&self, image_size: (u32, u32)) -> bool {
        self.trigger.exceeds(image_size)
    }

    /// Plan tiles for an image: one whole-image tile below the trigger, a grid above it
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a zero-area image
    pub fn plan(&self, image_size: (u32, u32)) -> Result<Vec<Tile>> {
        self.plan_scaled(image_size, image_size)
    }

    /// Plan tiles over `work_size` with the trigger applied to `source_size`
    ///
    /// The two differ when the image was downscaled before inference: a source
    /// frame above the trigger is still tiled after shrinking below it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a zero-area working image
    pub fn plan_scaled(
        &self,
        source_size: (u32, u32),
        work_size: (u32, u32),
    ) -> Result<Vec<Tile>> {
        if work_size.0 == 0 || work_size.1 == 0 {
            Err(invalid_parameter(
                "image_size",
                &format!("{}x{}", work_size.0, work_size.1),
                &"image must have a positive area",
            ))
        } else if self.should_tile(source_size) {
            plan_grid(work_size, self.tile_size, self.overlap_ratio)
        } else {
            Ok(vec![Tile::whole(work_size)])
        }
    }
}

/// Verify that a plan is a gap-free, in-bounds, row-major grid over the image
///
/// # Errors
///
/// Returns a `Geometry` error describing the first violated property
pub fn check_plan(tiles: &[Tile], image_size: (u32, u32)) -> Result<()> {
    let (width, height) = image_size;
    let mut xs = BTreeSet::new();
    let mut ys = BTreeSet::new();

    for (index, tile) in tiles.iter().enumerate() {
        let rect = tile.rect();
        if tile.id != index {
            return Err(geometry_error(
                "tile plan",
                &format!("tile {} is listed at position {index}", tile.id),
            ));
        }
        if tile.size.0 == 0 || tile.size.1 == 0 || rect.x_max > width || rect.y_max > height {
            return Err(geometry_error(
                "tile plan",
                &format!("tile {index} {rect:?} leaves the {width}x{height} image"),
            ));
        }
        xs.insert((rect.x_min, rect.x_max));
        ys.insert((rect.y_min, rect.y_max));
    }

    if tiles.len() != xs.len() * ys.len() {
        return Err(geometry_error(
            "tile plan",
            &format!(
                "{} tiles do not form a {}x{} grid",
                tiles.len(),
                xs.len(),
                ys.len()
            ),
        ));
    }
    check_axis_cover(&xs, width, "columns")?;
    check_axis_cover(&ys, height, "rows")
}

fn check_axis_cover(spans: &BTreeSet<(u32, u32)>, extent: u32, axis: &str) -> Result<()> {
    let mut covered = 0;
    for &(start, end) in spans {
        if start > covered {
            return Err(geometry_error(
                "tile plan",
                &format!("{axis} {covered}..{start} are not covered by any tile"),
            ));
        }
        covered = covered.max(end);
    }
    if covered < extent {
        return Err(geometry_error(
            "tile plan",
            &format!("{axis} {covered}..{extent} are not covered by any tile"),
        ));
    }
    Ok(())
}
