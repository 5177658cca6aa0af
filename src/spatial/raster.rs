//! Immutable RGB raster and the single-channel planes derived from it
//!
//! Channel order is RGB on both the load and save paths. Every transform
//! returns a new raster; nothing mutates a raster after construction.

use image::imageops;
use image::{Rgb, RgbImage};
use ndarray::Array2;

/// A width x height x 3 array of 8-bit samples, row-major, RGB order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    pixels: RgbImage,
}

impl Raster {
    /// Wrap an already decoded RGB buffer
    pub const fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    /// Create a raster where every pixel has the same colour
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    /// Create a raster by evaluating `f(x, y)` for every pixel
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 3],
    {
        Self::new(RgbImage::from_fn(width, height, |x, y| Rgb(f(x, y))))
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `(width, height)` in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Borrow the underlying RGB buffer
    pub const fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }

    /// Copy out a sub-rectangle, clipped to the raster bounds
    #[must_use]
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new(imageops::crop_imm(&self.pixels, x, y, width, height).to_image())
    }

    /// Resample to the given dimensions with fixed 2x2 bilinear sampling
    ///
    /// Output pixel centres map to source coordinates with half-pixel
    /// alignment and edge samples are clamped. The kernel does not widen when
    /// shrinking, so strong downscales alias instead of averaging.
    #[must_use]
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        if self.is_empty() {
            return Self::filled(width, height, [0, 0, 0]);
        }

        let columns = bilinear_taps(self.width(), width);
        let rows = bilinear_taps(self.height(), height);
        Self::from_fn(width, height, |x, y| {
            let (Some(&(x0, x1, wx)), Some(&(y0, y1, wy))) =
                (columns.get(x as usize), rows.get(y as usize))
            else {
                return [0, 0, 0];
            };
            let sample = |px: u32, py: u32| self.pixels.get_pixel(px, py).0;
            let (a, b) = (sample(x0, y0), sample(x1, y0));
            let (c, d) = (sample(x0, y1), sample(x1, y1));

            let mut out = [0u8; 3];
            for ((value, (&a, &b)), (&c, &d)) in out
                .iter_mut()
                .zip(a.iter().zip(&b))
                .zip(c.iter().zip(&d))
            {
                let top = f32::from(a) * (1.0 - wx) + f32::from(b) * wx;
                let bottom = f32::from(c) * (1.0 - wx) + f32::from(d) * wx;
                *value = (top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8;
            }
            out
        })
    }

    /// Downscale so the longer side is at most `max_dimension`, keeping aspect ratio
    ///
    /// Returns the (possibly unchanged) raster and the applied scale factor.
    #[must_use]
    pub fn fit_within(&self, max_dimension: u32) -> (Self, f64) {
        let (width, height) = self.dimensions();
        let longer = width.max(height);
        if longer <= max_dimension || max_dimension == 0 {
            return (self.clone(), 1.0);
        }
        let scale = f64::from(max_dimension) / f64::from(longer);
        let new_width = ((f64::from(width) * scale) as u32).max(1);
        let new_height = ((f64::from(height) * scale) as u32).max(1);
        (self.resized(new_width, new_height), scale)
    }

    /// Single-channel luminance plane indexed `[row, col]`
    pub fn luminance(&self) -> Array2<u8> {
        let (width, height) = self.dimensions();
        Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
            luma_bt601(self.pixels.get_pixel(col as u32, row as u32).0)
        })
    }
}

/// BT.601 luminance in 14-bit fixed point, rounding to nearest
pub const fn luma_bt601(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb;
    let weighted = 4899 * r as u32 + 9617 * g as u32 + 1868 * b as u32 + 8192;
    (weighted >> 14) as u8
}

// Neighbouring source indices and the weight of the second one for each output index
fn bilinear_taps(source_len: u32, target_len: u32) -> Vec<(u32, u32, f32)> {
    let scale = source_len as f32 / target_len.max(1) as f32;
    let last = source_len.saturating_sub(1);
    (0..target_len)
        .map(|index| {
            let position = ((index as f32 + 0.5) * scale - 0.5).max(0.0);
            let low = (position.floor() as u32).min(last);
            let high = (low + 1).min(last);
            (low, high, (position - low as f32).clamp(0.0, 1.0))
        })
        .collect()
}
