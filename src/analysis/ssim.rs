//! Structural similarity difference strategy
//!
//! Local SSIM is computed over a square window (clipped at the border) from
//! summed-area tables. Each pixel's difference value is the dissimilarity
//! `(1 - ssim) / 2` rescaled to `0..=255`, so it thresholds like an absolute
//! luminance difference. The mean local SSIM is reported as the similarity
//! score.

use crate::math::integral::IntegralImage;
use ndarray::Array2;
use num_traits::clamp;

const DYNAMIC_RANGE: f64 = 255.0;
const C1: f64 = (0.01 * DYNAMIC_RANGE) * (0.01 * DYNAMIC_RANGE);
const C2: f64 = (0.03 * DYNAMIC_RANGE) * (0.03 * DYNAMIC_RANGE);

/// Per-pixel SSIM over a `window x window` neighbourhood
///
/// Both planes must share one shape; `window` is expected to be odd.
pub fn ssim_map(a: &Array2<u8>, b: &Array2<u8>, window: usize) -> Array2<f64> {
    let (height, width) = a.dim();
    let radius = window / 2;
    let value = |plane: &Array2<u8>, x: usize, y: usize| {
        f64::from(plane.get((y, x)).copied().unwrap_or(0))
    };

    let sum_a = IntegralImage::from_plane(a);
    let sum_b = IntegralImage::from_plane(b);
    let sum_aa = IntegralImage::new(width, height, |x, y| value(a, x, y).powi(2));
    let sum_bb = IntegralImage::new(width, height, |x, y| value(b, x, y).powi(2));
    let sum_ab = IntegralImage::new(width, height, |x, y| value(a, x, y) * value(b, x, y));

    Array2::from_shape_fn((height, width), |(y, x)| {
        let (sa, count) = sum_a.window_sum(x, y, radius);
        let n = count.max(1) as f64;
        let mean_a = sa / n;
        let mean_b = sum_b.window_sum(x, y, radius).0 / n;
        let var_a = sum_aa.window_sum(x, y, radius).0 / n - mean_a * mean_a;
        let var_b = sum_bb.window_sum(x, y, radius).0 / n - mean_b * mean_b;
        let covariance = sum_ab.window_sum(x, y, radius).0 / n - mean_a * mean_b;

        let numerator = (2.0 * mean_a * mean_b + C1) * (2.0 * covariance + C2);
        let denominator = (mean_a * mean_a + mean_b * mean_b + C1) * (var_a + var_b + C2);
        numerator / denominator
    })
}

/// Dissimilarity plane and mean SSIM score
pub fn ssim_difference(a: &Array2<u8>, b: &Array2<u8>, window: usize) -> (Array2<u8>, f64) {
    let map = ssim_map(a, b, window);
    let score = map.mean().unwrap_or(1.0);
    let plane = map.mapv(|s| {
        let dissimilarity = clamp((1.0 - s) / 2.0, 0.0, 1.0);
        (dissimilarity * DYNAMIC_RANGE).round() as u8
    });
    (plane, score)
}
