//! Summed-area tables for constant-time window statistics

use ndarray::Array2;

/// Summed-area table over a `[row, col]` plane
///
/// Entry `(r, c)` holds the sum of every value above and to the left of
/// `(r, c)`, exclusive, so the table is one larger than the plane on each
/// axis.
#[derive(Clone, Debug, PartialEq)]
pub struct IntegralImage {
    sums: Array2<f64>,
}

impl IntegralImage {
    /// Build a table over `value(x, y)` for a `width x height` plane
    pub fn new<F>(width: usize, height: usize, mut value: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut sums = Array2::zeros((height + 1, width + 1));
        for y in 0..height {
            let mut row_sum = 0.0;
            for x in 0..width {
                row_sum += value(x, y);
                let above = sums.get((y, x + 1)).copied().unwrap_or(0.0);
                if let Some(cell) = sums.get_mut((y + 1, x + 1)) {
                    *cell = above + row_sum;
                }
            }
        }
        Self { sums }
    }

    /// Build a table over the values of an 8-bit plane
    pub fn from_plane(plane: &Array2<u8>) -> Self {
        let (height, width) = plane.dim();
        Self::new(width, height, |x, y| {
            f64::from(plane.get((y, x)).copied().unwrap_or(0))
        })
    }

    /// Plane width
    pub fn width(&self) -> usize {
        self.sums.dim().1 - 1
    }

    /// Plane height
    pub fn height(&self) -> usize {
        self.sums.dim().0 - 1
    }

    fn at(&self, x: usize, y: usize) -> f64 {
        self.sums.get((y, x)).copied().unwrap_or(0.0)
    }

    /// Sum over columns `x0..x1` and rows `y0..y1`, clipped to the plane
    pub fn rect_sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let x1 = x1.min(self.width());
        let y1 = y1.min(self.height());
        if x0 >= x1 || y0 >= y1 {
            return 0.0;
        }
        self.at(x1, y1) - self.at(x0, y1) - self.at(x1, y0) + self.at(x0, y0)
    }

    /// Sum and element count of the square window of `radius` centred on `(x, y)`
    ///
    /// The window is clipped at the plane border.
    pub fn window_sum(&self, x: usize, y: usize, radius: usize) -> (f64, usize) {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius + 1).min(self.width());
        let y1 = (y + radius + 1).min(self.height());
        let count = x1.saturating_sub(x0) * y1.saturating_sub(y0);
        (self.rect_sum(x0, y0, x1, y1), count)
    }
}
