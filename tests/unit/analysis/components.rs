//! Tests for binary masks and connected component labelling

#[cfg(test)]
mod tests {
    use aerial_watch::analysis::components::{
        BinaryMask, label_components, label_components_weighted, regions_from_mask,
    };
    use ndarray::array;

    fn mask_from(rows: &[&str]) -> BinaryMask {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        BinaryMask::from_fn(width, height, |x, y| {
            rows.get(y).and_then(|r| r.as_bytes().get(x)) == Some(&b'#')
        })
    }

    // Tests thresholding is strictly greater-than
    // Verified by using greater-or-equal
    #[test]
    fn test_above_threshold_is_strict() {
        let plane = array![[29u8, 30, 31], [0, 255, 30]];
        let mask = BinaryMask::above_threshold(&plane, 30);

        assert_eq!(mask.count_ones(), 2);
        assert!(mask.get(2, 0));
        assert!(mask.get(1, 1));
        assert!(!mask.get(1, 0));
    }

    // Tests diagonal neighbours belong to the same component
    // Verified by using 4-connectivity
    #[test]
    fn test_eight_connectivity() {
        let mask = mask_from(&["#...", ".#..", "..#.", "...."]);
        let components = label_components(&mask);

        assert_eq!(components.len(), 1);
        let only = components.first().unwrap();
        assert_eq!(only.area, 3);
        assert_eq!((only.bbox.x_min, only.bbox.y_min, only.bbox.x_max, only.bbox.y_max), (0, 0, 3, 3));
        assert_eq!(only.centroid(), (1.0, 1.0));
    }

    // Tests separated groups are labelled in row-major discovery order
    // Verified by scanning columns first
    #[test]
    fn test_separate_components() {
        let mask = mask_from(&["..##", "....", "#...", "#..#"]);
        let components = label_components(&mask);
        let areas: Vec<usize> = components.iter().map(|c| c.area).collect();

        assert_eq!(areas, vec![2, 2, 1]);
        assert_eq!(components.get(1).map(|c| c.bbox.x_min), Some(0));
    }

    // Tests weights accumulate over component members
    // Verified by ignoring the weight callback
    #[test]
    fn test_weighted_components() {
        let mask = mask_from(&["##", "##"]);
        let components = label_components_weighted(&mask, |x, y| (x + y) as f64);

        let only = components.first().unwrap();
        assert!((only.weight - 4.0).abs() < 1e-12);
        assert!((only.mean_weight() - 1.0).abs() < 1e-12);
    }

    // Tests equal-area regions keep top-to-bottom, left-to-right order
    // Verified by ordering ties by descending position
    #[test]
    fn test_region_tie_order() {
        let mask = mask_from(&["...#", "....", "#...", "...."]);
        let regions = regions_from_mask(&mask, 1, None);

        assert_eq!(regions.len(), 2);
        assert_eq!(regions.first().map(|r| (r.bbox.x_min, r.bbox.y_min)), Some((3, 0)));
        assert_eq!(regions.get(1).map(|r| (r.bbox.x_min, r.bbox.y_min)), Some((0, 2)));
    }

    // Tests out-of-range reads are unset and bits follow the predicate
    // Verified by wrapping out-of-range coordinates
    #[test]
    fn test_mask_access() {
        let mask = BinaryMask::from_fn(3, 2, |x, y| x == 2 && y == 1);

        assert!(mask.get(2, 1));
        assert!(!mask.get(1, 1));
        assert!(!mask.get(5, 5));
        assert!(!mask.get(2, 4));
        assert_eq!(mask.count_ones(), 1);
        assert_eq!((mask.width(), mask.height()), (3, 2));
    }
}
