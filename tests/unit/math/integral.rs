//! Tests for summed-area tables and clipped window sums

#[cfg(test)]
mod tests {
    use aerial_watch::math::integral::IntegralImage;
    use ndarray::array;

    // Tests rectangle sums over a small plane
    // Verified by omitting the top-left correction term
    #[test]
    fn test_rect_sum() {
        let table = IntegralImage::from_plane(&array![[1u8, 2, 3], [4, 5, 6]]);

        assert_eq!((table.width(), table.height()), (3, 2));
        assert!((table.rect_sum(0, 0, 3, 2) - 21.0).abs() < 1e-12);
        assert!((table.rect_sum(1, 0, 3, 2) - 16.0).abs() < 1e-12);
        assert!((table.rect_sum(1, 1, 2, 2) - 5.0).abs() < 1e-12);
        assert!(table.rect_sum(2, 1, 2, 2).abs() < 1e-12);
    }

    // Tests rectangles past the edge are clipped
    // Verified by indexing without clipping
    #[test]
    fn test_rect_sum_clipped() {
        let table = IntegralImage::new(4, 4, |_, _| 1.0);
        assert!((table.rect_sum(2, 2, 10, 10) - 4.0).abs() < 1e-12);
    }

    // Tests window sums shrink at borders and report their element count
    // Verified by always reporting a full window count
    #[test]
    fn test_window_sum() {
        let table = IntegralImage::new(3, 3, |_, _| 1.0);

        let (corner, corner_count) = table.window_sum(0, 0, 1);
        assert!((corner - 4.0).abs() < 1e-12);
        assert_eq!(corner_count, 4);

        let (centre, centre_count) = table.window_sum(1, 1, 1);
        assert!((centre - 9.0).abs() < 1e-12);
        assert_eq!(centre_count, 9);
    }

    // Tests the value callback receives column then row
    // Verified by passing row first
    #[test]
    fn test_callback_coordinates() {
        let table = IntegralImage::new(3, 2, |x, y| (x * 10 + y) as f64);
        assert!((table.rect_sum(2, 1, 3, 2) - 21.0).abs() < 1e-12);
    }
}
