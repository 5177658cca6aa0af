//! Image loading and PNG export of annotated detections and change masks

use crate::algorithm::aggregation::AggregatedDetection;
use crate::analysis::components::BinaryMask;
use crate::io::error::{EngineError, Result};
use crate::spatial::{BoundingBox, PixelBox, Raster};
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::path::Path;

/// Outline thickness of annotated detection boxes
pub const OUTLINE_THICKNESS: u32 = 2;

const CLASS_PALETTE: [[u8; 3]; 8] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
];

/// Decode an image file into an RGB raster
///
/// # Errors
///
/// Returns `ImageLoad` if the file cannot be read or decoded and
/// `InvalidImage` if it decodes to zero pixels
pub fn load_raster(path: &Path) -> Result<Raster> {
    let decoded = image::open(path).map_err(|e| EngineError::ImageLoad {
        path: path.to_path_buf(),
        source: e,
    })?;

    let raster = Raster::new(decoded.to_rgb8());
    if raster.is_empty() {
        return Err(EngineError::InvalidImage {
            path: path.to_path_buf(),
            reason: format!(
                "decoded to {}x{} pixels",
                raster.width(),
                raster.height()
            ),
        });
    }
    Ok(raster)
}

/// Outline colour for a detection class
pub fn class_color(class_id: u32) -> [u8; 3] {
    let index = class_id as usize % CLASS_PALETTE.len();
    CLASS_PALETTE.get(index).copied().unwrap_or([255, 255, 255])
}

// Integer pixel span covering a float box, clipped to the image
fn covering_pixels(bbox: &BoundingBox, width: u32, height: u32) -> Option<PixelBox> {
    let x_min = (bbox.x_min.floor().max(0.0) as u32).min(width);
    let y_min = (bbox.y_min.floor().max(0.0) as u32).min(height);
    let x_max = (bbox.x_max.ceil().max(0.0) as u32).min(width);
    let y_max = (bbox.y_max.ceil().max(0.0) as u32).min(height);
    (x_min < x_max && y_min < y_max).then_some(PixelBox {
        x_min,
        y_min,
        x_max,
        y_max,
    })
}

fn draw_outline(image: &mut RgbImage, rect: PixelBox, color: [u8; 3], thickness: u32) {
    for y in rect.y_min..rect.y_max {
        for x in rect.x_min..rect.x_max {
            let on_edge = x < rect.x_min + thickness
                || y < rect.y_min + thickness
                || x + thickness >= rect.x_max
                || y + thickness >= rect.y_max;
            if on_edge {
                image.put_pixel(x, y, Rgb(color));
            }
        }
    }
}

/// Copy of the raster with every detection outlined in its class colour
#[must_use]
pub fn annotate(raster: &Raster, detections: &[AggregatedDetection]) -> Raster {
    let mut image = raster.as_rgb().clone();
    let (width, height) = raster.dimensions();
    for detection in detections {
        if let Some(rect) = covering_pixels(&detection.bbox, width, height) {
            draw_outline(
                &mut image,
                rect,
                class_color(detection.class_id),
                OUTLINE_THICKNESS,
            );
        }
    }
    Raster::new(image)
}

/// Render a change mask as an 8-bit image, 255 where changed
pub fn mask_image(mask: &BinaryMask) -> GrayImage {
    GrayImage::from_fn(mask.width() as u32, mask.height() as u32, |x, y| {
        Luma([if mask.get(x as usize, y as usize) {
            255
        } else {
            0
        }])
    })
}

fn prepare_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create directory",
            source: e,
        })?;
    }
    Ok(())
}

/// Save the raster with outlined detections as a PNG
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the image
/// cannot be encoded
pub fn export_annotated_png(
    raster: &Raster,
    detections: &[AggregatedDetection],
    path: &Path,
) -> Result<()> {
    prepare_parent(path)?;
    annotate(raster, detections)
        .as_rgb()
        .save(path)
        .map_err(|e| EngineError::ImageExport {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Save a change mask as an 8-bit grayscale PNG
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the image
/// cannot be encoded
pub fn export_mask_png(mask: &BinaryMask, path: &Path) -> Result<()> {
    prepare_parent(path)?;
    mask_image(mask)
        .save(path)
        .map_err(|e| EngineError::ImageExport {
            path: path.to_path_buf(),
            source: e,
        })
}
