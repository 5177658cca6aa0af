//! Motion-compensated difference strategy
//!
//! Small misregistration between two passes over the same area makes plain
//! differencing light up every edge. This strategy estimates a displacement
//! per block by exhaustive block matching (sum of absolute differences within
//! a search radius) and differences each pixel against its displaced match.
//! It runs in both directions and keeps the larger residual, so swapping the
//! inputs yields the same plane.

use ndarray::{Array2, Zip};

fn sample(plane: &Array2<u8>, x: usize, y: usize) -> u8 {
    plane.get((y, x)).copied().unwrap_or(0)
}

struct Block {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl Block {
    // Displaced block must lie entirely inside the target plane
    fn shifted_fits(&self, dx: isize, dy: isize, width: usize, height: usize) -> bool {
        let x = self.x as isize + dx;
        let y = self.y as isize + dy;
        x >= 0
            && y >= 0
            && x as usize + self.width <= width
            && y as usize + self.height <= height
    }

    fn sad(&self, reference: &Array2<u8>, target: &Array2<u8>, dx: isize, dy: isize) -> u64 {
        let mut total = 0u64;
        for row in 0..self.height {
            for col in 0..self.width {
                let (x, y) = (self.x + col, self.y + row);
                let tx = (x as isize + dx) as usize;
                let ty = (y as isize + dy) as usize;
                total += u64::from(sample(reference, x, y).abs_diff(sample(target, tx, ty)));
            }
        }
        total
    }
}

/// Residual of `reference` against its best block-wise match in `target`
pub fn block_residual(
    reference: &Array2<u8>,
    target: &Array2<u8>,
    block_size: usize,
    search_radius: usize,
) -> Array2<u8> {
    let (height, width) = reference.dim();
    let block_size = block_size.max(1);
    let radius = search_radius as isize;
    let mut residual = Array2::zeros((height, width));

    for by in (0..height).step_by(block_size) {
        for bx in (0..width).step_by(block_size) {
            let block = Block {
                x: bx,
                y: by,
                width: block_size.min(width - bx),
                height: block_size.min(height - by),
            };

            let mut best = (0isize, 0isize);
            let mut best_sad = block.sad(reference, target, 0, 0);
            if best_sad > 0 {
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        if (dx, dy) == (0, 0) || !block.shifted_fits(dx, dy, width, height) {
                            continue;
                        }
                        let sad = block.sad(reference, target, dx, dy);
                        let closer = dx.abs() + dy.abs() < best.0.abs() + best.1.abs();
                        if sad < best_sad || (sad == best_sad && closer) {
                            best = (dx, dy);
                            best_sad = sad;
                        }
                    }
                }
            }

            for row in 0..block.height {
                for col in 0..block.width {
                    let (x, y) = (block.x + col, block.y + row);
                    let tx = (x as isize + best.0) as usize;
                    let ty = (y as isize + best.1) as usize;
                    if let Some(cell) = residual.get_mut((y, x)) {
                        *cell = sample(reference, x, y).abs_diff(sample(target, tx, ty));
                    }
                }
            }
        }
    }

    residual
}

/// Symmetric motion-compensated absolute difference of two same-shape planes
pub fn motion_compensated_difference(
    a: &Array2<u8>,
    b: &Array2<u8>,
    block_size: usize,
    search_radius: usize,
) -> Array2<u8> {
    let forward = block_residual(a, b, block_size, search_radius);
    let backward = block_residual(b, a, block_size, search_radius);
    Zip::from(&forward)
        .and(&backward)
        .map_collect(|&f, &r| f.max(r))
}
