//! Spatial data structures for rasters, boxes and tile grids
//!
//! This module contains spatial-related functionality including:
//! - The immutable RGB raster and its luminance plane
//! - Detection and pixel bounding boxes
//! - The overlapping tile planner

/// Detection and pixel bounding boxes
pub mod bbox;
/// Immutable RGB raster and derived planes
pub mod raster;
/// Overlapping tile planning for oversized images
pub mod tiles;

pub use bbox::{BoundingBox, PixelBox};
pub use raster::Raster;
pub use tiles::{Tile, TilePlanner, TilingTrigger};
