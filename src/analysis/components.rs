//! Bit-packed binary masks and 8-connected component labelling

use crate::spatial::bbox::PixelBox;
use bitvec::prelude::*;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Binary image stored one bit per pixel, row-major
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    width: usize,
    height: usize,
    bits: BitVec,
}

impl BinaryMask {
    /// Create a mask by evaluating `f(x, y)` for every pixel
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        let mut bits = BitVec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                bits.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    /// Set every pixel of a `[row, col]` plane whose value is strictly above `threshold`
    pub fn above_threshold(plane: &Array2<u8>, threshold: u32) -> Self {
        let (height, width) = plane.dim();
        let mut bits = BitVec::with_capacity(width * height);
        for &value in plane {
            bits.push(u32::from(value) > threshold);
        }
        Self {
            width,
            height,
            bits,
        }
    }

    /// Width in pixels
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Test a pixel; out-of-range coordinates read as unset
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits.get(y * self.width + x).as_deref() == Some(&true)
    }

    /// Number of set pixels
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }
}

/// One maximal 8-connected group of set pixels
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    /// Tight bounds of the group
    pub bbox: PixelBox,
    /// Number of pixels in the group
    pub area: usize,
    /// Sum of member x coordinates
    pub sum_x: u64,
    /// Sum of member y coordinates
    pub sum_y: u64,
    /// Sum of the caller-supplied per-pixel weight
    pub weight: f64,
}

impl Component {
    /// Mean member position `(x, y)`
    pub fn centroid(&self) -> (f64, f64) {
        let area = self.area.max(1) as f64;
        (self.sum_x as f64 / area, self.sum_y as f64 / area)
    }

    /// Mean caller-supplied weight over the members
    pub fn mean_weight(&self) -> f64 {
        self.weight / self.area.max(1) as f64
    }
}

/// Label 8-connected components in row-major discovery order
pub fn label_components(mask: &BinaryMask) -> Vec<Component> {
    label_components_weighted(mask, |_, _| 0.0)
}

/// Label 8-connected components, accumulating `weight(x, y)` over each one
pub fn label_components_weighted<F>(mask: &BinaryMask, mut weight: F) -> Vec<Component>
where
    F: FnMut(usize, usize) -> f64,
{
    let (width, height) = (mask.width(), mask.height());
    let mut visited = bitvec![0; width * height];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let index = y * width + x;
            if !mask.get(x, y) || visited.get(index).as_deref() == Some(&true) {
                continue;
            }

            visited.set(index, true);
            stack.push((x, y));
            let mut component = Component {
                bbox: PixelBox::single(x as u32, y as u32),
                area: 0,
                sum_x: 0,
                sum_y: 0,
                weight: 0.0,
            };

            while let Some((cx, cy)) = stack.pop() {
                component.bbox.include(cx as u32, cy as u32);
                component.area += 1;
                component.sum_x += cx as u64;
                component.sum_y += cy as u64;
                component.weight += weight(cx, cy);

                for ny in cy.saturating_sub(1)..=(cy + 1).min(height - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(width - 1) {
                        let neighbour = ny * width + nx;
                        if mask.get(nx, ny) && visited.get(neighbour).as_deref() == Some(&false)
                        {
                            visited.set(neighbour, true);
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            components.push(component);
        }
    }

    components
}

/// Mean position of a change region
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    /// Column coordinate
    pub x: f64,
    /// Row coordinate
    pub y: f64,
}

/// One connected region of changed pixels
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRegion {
    /// Tight pixel bounds, exclusive maxima
    pub bbox: PixelBox,
    /// Number of changed pixels in the region
    pub area_pixels: usize,
    /// Mean changed-pixel position
    pub centroid: Centroid,
}

impl From<&Component> for ChangeRegion {
    fn from(component: &Component) -> Self {
        let (x, y) = component.centroid();
        Self {
            bbox: component.bbox,
            area_pixels: component.area,
            centroid: Centroid { x, y },
        }
    }
}

/// Reduce a change mask to regions ordered by descending area
///
/// Regions below `min_area` are dropped and at most `max_regions` are kept.
/// Equal areas keep top-to-bottom, left-to-right order.
pub fn regions_from_mask(
    mask: &BinaryMask,
    min_area: usize,
    max_regions: Option<usize>,
) -> Vec<ChangeRegion> {
    let mut regions: Vec<ChangeRegion> = label_components(mask)
        .iter()
        .filter(|component| component.area >= min_area)
        .map(ChangeRegion::from)
        .collect();

    regions.sort_by(|a, b| {
        b.area_pixels
            .cmp(&a.area_pixels)
            .then(a.bbox.y_min.cmp(&b.bbox.y_min))
            .then(a.bbox.x_min.cmp(&b.bbox.x_min))
    });

    if let Some(limit) = max_regions {
        regions.truncate(limit);
    }
    regions
}
