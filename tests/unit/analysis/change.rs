//! Tests for two-image change detection across all difference methods

#[cfg(test)]
mod tests {
    use aerial_watch::analysis::change::{
        ChangeComparator, ComparisonMethod, ComparisonResult, ComparisonStatus,
        absolute_difference,
    };
    use aerial_watch::io::configuration::ComparisonConfig;
    use aerial_watch::spatial::Raster;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn with_squares(size: u32, squares: &[(u32, u32, u32)]) -> Raster {
        Raster::from_fn(size, size, |x, y| {
            let inside = squares
                .iter()
                .any(|&(sx, sy, side)| x >= sx && x < sx + side && y >= sy && y < sy + side);
            [if inside { 255 } else { 0 }; 3]
        })
    }

    fn noise(rng: &mut StdRng, size: u32) -> Raster {
        let values: Vec<u8> = (0..size * size).map(|_| rng.random()).collect();
        Raster::from_fn(size, size, |x, y| {
            [values.get((y * size + x) as usize).copied().unwrap_or(0); 3]
        })
    }

    // Tests identical images report no change
    // Verified by thresholding with greater-or-equal at zero difference
    #[test]
    fn test_identical_images() {
        let raster = with_squares(100, &[(20, 20, 10)]);
        let comparator = ChangeComparator::default();

        for method in ComparisonMethod::ALL {
            let result = comparator.compare(&raster, &raster, 30, method).unwrap();
            assert_eq!(result.changed_pixel_count, 0, "{method}");
            assert!(result.regions.is_empty());
            assert_eq!(result.status, ComparisonStatus::Ok);
        }
    }

    // Tests black against white flags every pixel for every method
    // Verified by differencing only one channel
    #[test]
    fn test_black_versus_white() {
        let black = Raster::filled(50, 50, [0; 3]);
        let white = Raster::filled(50, 50, [255; 3]);
        let comparator = ChangeComparator::default();

        for method in ComparisonMethod::ALL {
            let result = comparator.compare(&black, &white, 10, method).unwrap();
            assert_eq!(result.changed_pixel_count, 2500, "{method}");
            assert_eq!(result.regions.len(), 1);
            assert!((result.changed_fraction - 1.0).abs() < 1e-12);
        }
    }

    // Tests the second image is resized to the first and sizes are reported
    // Verified by resizing the first image instead
    #[test]
    fn test_second_image_is_resized() {
        let large = Raster::filled(100, 80, [40, 40, 40]);
        let small = Raster::filled(50, 40, [40, 40, 40]);
        let result = ChangeComparator::default()
            .compare(&large, &small, 30, ComparisonMethod::AbsDiff)
            .unwrap();

        assert!(result.resized_second);
        assert_eq!(result.image_sizes, [(100, 80), (50, 40)]);
        assert_eq!(result.changed_pixel_count, 0);

        let (_, mask) = ChangeComparator::default()
            .compare_with_mask(&large, &small, 30, ComparisonMethod::AbsDiff)
            .unwrap();
        assert_eq!((mask.width(), mask.height()), (100, 80));
    }

    // Tests regions are reported largest first with bounds and centroid
    // Verified by sorting regions by discovery order
    #[test]
    fn test_regions_ordered_by_area() {
        let before = Raster::filled(20, 20, [0; 3]);
        let after = with_squares(20, &[(2, 2, 3), (10, 10, 4)]);
        let result = ChangeComparator::default()
            .compare(&before, &after, 30, ComparisonMethod::AbsDiff)
            .unwrap();

        assert_eq!(result.changed_pixel_count, 25);
        let areas: Vec<usize> = result.regions.iter().map(|r| r.area_pixels).collect();
        assert_eq!(areas, vec![16, 9]);

        let largest = result.regions.first().unwrap();
        assert_eq!((largest.bbox.x_min, largest.bbox.x_max), (10, 14));
        assert!((largest.centroid.x - 11.5).abs() < 1e-9);
        assert!((largest.centroid.y - 11.5).abs() < 1e-9);
    }

    // Tests region filters drop small regions but keep their pixel count
    // Verified by counting only pixels of reported regions
    #[test]
    fn test_region_filters() {
        let before = Raster::filled(20, 20, [0; 3]);
        let after = with_squares(20, &[(2, 2, 3), (10, 10, 4), (2, 15, 2)]);
        let config = ComparisonConfig {
            min_region_area: 5,
            max_regions: Some(1),
            ..ComparisonConfig::default()
        };
        let comparator = ChangeComparator::new(config);
        let result = comparator
            .compare(&before, &after, 30, ComparisonMethod::AbsDiff)
            .unwrap();

        assert_eq!(comparator.config().min_region_area, 5);
        assert_eq!(result.changed_pixel_count, 29);
        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.regions.first().map(|r| r.area_pixels), Some(16));
    }

    // Tests thresholds outside [1, 100] and empty rasters are rejected
    // Verified by removing the threshold check
    #[test]
    fn test_invalid_inputs() {
        let raster = Raster::filled(4, 4, [0; 3]);
        let comparator = ChangeComparator::default();

        for threshold in [0, 101] {
            let error = comparator
                .compare(&raster, &raster, threshold, ComparisonMethod::AbsDiff)
                .unwrap_err();
            assert!(error.is_invalid_parameter());
        }
        assert!(
            comparator
                .compare(&raster, &Raster::filled(0, 4, [0; 3]), 30, ComparisonMethod::Ssim)
                .is_err()
        );
    }

    // Tests the changed count never increases as the threshold rises
    // Verified by thresholding with less-than
    #[test]
    fn test_threshold_monotonicity() {
        let mut rng = StdRng::seed_from_u64(3);
        let comparator = ChangeComparator::default();

        for _ in 0..4 {
            let a = noise(&mut rng, 24);
            let b = noise(&mut rng, 24);
            for method in ComparisonMethod::ALL {
                let mut previous = usize::MAX;
                for threshold in 1..=100 {
                    let count = comparator
                        .compare(&a, &b, threshold, method)
                        .unwrap()
                        .changed_pixel_count;
                    assert!(count <= previous, "{method} at {threshold}");
                    previous = count;
                }
            }
        }
    }

    // Tests swapping equally sized inputs leaves the changed count unchanged
    // Verified by keeping only the forward flow residual
    #[test]
    fn test_swap_symmetry() {
        let mut rng = StdRng::seed_from_u64(11);
        let comparator = ChangeComparator::default();

        for _ in 0..4 {
            let a = noise(&mut rng, 32);
            let b = noise(&mut rng, 32);
            for method in ComparisonMethod::ALL {
                let forward = comparator.compare(&a, &b, 40, method).unwrap();
                let backward = comparator.compare(&b, &a, 40, method).unwrap();
                assert_eq!(
                    forward.changed_pixel_count, backward.changed_pixel_count,
                    "{method}"
                );
            }
        }
    }

    // Tests only the SSIM method reports a similarity score
    // Verified by reporting a score for every method
    #[test]
    fn test_similarity_score_only_for_ssim() {
        let a = with_squares(32, &[(4, 4, 8)]);
        let b = with_squares(32, &[(16, 16, 8)]);
        let comparator = ChangeComparator::default();

        let ssim = comparator.compare(&a, &b, 30, ComparisonMethod::Ssim).unwrap();
        let score = ssim.similarity_score.unwrap();
        assert!(score > 0.0 && score < 1.0);

        let plain = comparator.compare(&a, &b, 30, ComparisonMethod::AbsDiff).unwrap();
        assert_eq!(plain.similarity_score, None);
    }

    // Tests method names parse case-insensitively and round-trip
    // Verified by matching names case-sensitively
    #[test]
    fn test_method_names() {
        assert_eq!("SSIM".parse::<ComparisonMethod>(), Ok(ComparisonMethod::Ssim));
        assert_eq!(" opticalflow ".parse::<ComparisonMethod>(), Ok(ComparisonMethod::OpticalFlow));
        assert!("blur".parse::<ComparisonMethod>().is_err());

        for method in ComparisonMethod::ALL {
            assert_eq!(method.to_string().parse::<ComparisonMethod>(), Ok(method));
        }
        assert_eq!(ComparisonMethod::default(), ComparisonMethod::AbsDiff);
    }

    // Tests the decode failure record is zeroed and flagged
    // Verified by leaving the status as Ok
    #[test]
    fn test_decode_failure_result() {
        let result = ComparisonResult::decode_failure(ComparisonMethod::Ssim, 25, "bad header");

        assert!(result.is_decode_failure());
        assert_eq!(result.changed_pixel_count, 0);
        assert!(result.regions.is_empty());
        assert_eq!(result.threshold, 25);
    }

    // Tests the absolute difference plane per pixel
    // Verified by using wrapping subtraction
    #[test]
    fn test_absolute_difference() {
        let a = array![[0u8, 200], [50, 255]];
        let b = array![[10u8, 100], [50, 0]];
        assert_eq!(absolute_difference(&a, &b), array![[10u8, 100], [0, 255]]);
    }
}
