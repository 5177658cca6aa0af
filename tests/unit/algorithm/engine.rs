//! Tests for backend selection, degradation and the facade entry points

#[cfg(test)]
mod tests {
    use aerial_watch::algorithm::engine::{AnalysisStatus, Engine, ModelSet};
    use aerial_watch::analysis::change::ComparisonMethod;
    use aerial_watch::inference::blob::BlobModel;
    use aerial_watch::inference::{Backend, DetectionModel, ModelHandle, RawDetection};
    use aerial_watch::io::configuration::EngineConfig;
    use aerial_watch::io::error::geometry_error;
    use aerial_watch::spatial::Raster;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenModel;

    impl DetectionModel for BrokenModel {
        fn name(&self) -> &str {
            "broken"
        }

        fn detect(
            &self,
            _raster: &Raster,
            _confidence: f32,
        ) -> aerial_watch::Result<Vec<RawDetection>> {
            Err(geometry_error("inference", &"out of memory"))
        }
    }

    fn blob() -> ModelHandle {
        ModelHandle::ready(BlobModel::default())
    }

    fn engine(models: ModelSet) -> Engine {
        Engine::new(models, EngineConfig::default()).unwrap()
    }

    // Black raster with white squares at the given top-left corners
    fn scene(width: u32, height: u32, squares: &[(u32, u32)], side: u32) -> Raster {
        Raster::from_fn(width, height, |x, y| {
            let inside = squares
                .iter()
                .any(|&(sx, sy)| x >= sx && x < sx + side && y >= sy && y < sy + side);
            [if inside { 255 } else { 0 }; 3]
        })
    }

    // Tests backend choice depends only on size and model availability
    // Verified by always preferring the whole-image backend
    #[test]
    fn test_select_backend() {
        let both = engine(ModelSet::shared(blob()));
        assert_eq!(both.select_backend((3000, 2000)), Some(Backend::Tiled));
        assert_eq!(both.select_backend((800, 600)), Some(Backend::WholeImage));

        let no_tiler = engine(ModelSet {
            whole_image: blob(),
            tiled: ModelHandle::unavailable("tiler failed"),
        });
        assert_eq!(no_tiler.select_backend((3000, 2000)), Some(Backend::WholeImage));

        let no_whole = engine(ModelSet {
            whole_image: ModelHandle::unavailable("whole failed"),
            tiled: blob(),
        });
        assert_eq!(no_whole.select_backend((800, 600)), Some(Backend::Tiled));

        let mut disabled = EngineConfig::default();
        disabled.tiling.enabled = false;
        let disabled_no_whole = Engine::new(
            ModelSet {
                whole_image: ModelHandle::unavailable("whole failed"),
                tiled: blob(),
            },
            disabled,
        )
        .unwrap();
        assert_eq!(disabled_no_whole.select_backend((3000, 2000)), Some(Backend::Tiled));
        let disabled_no_tiler = Engine::new(
            ModelSet {
                whole_image: blob(),
                tiled: ModelHandle::unavailable("tiler failed"),
            },
            disabled,
        )
        .unwrap();
        assert_eq!(disabled_no_tiler.select_backend((3000, 2000)), Some(Backend::WholeImage));

        let none = engine(ModelSet::shared(ModelHandle::unavailable("gone")));
        assert_eq!(none.select_backend((800, 600)), None);
    }

    // Tests disabling tiling forces whole-image inference
    // Verified by ignoring the enabled flag
    #[test]
    fn test_tiling_disabled() {
        let mut config = EngineConfig::default();
        config.tiling.enabled = false;
        let engine = Engine::new(ModelSet::shared(blob()), config).unwrap();

        assert_eq!(engine.select_backend((3000, 2000)), Some(Backend::WholeImage));
        let analysis = engine.analyze(&scene(2000, 1200, &[(100, 100)], 30), 0.25).unwrap();
        assert_eq!(analysis.tile_count, 1);
        assert!(!analysis.is_tiled());
        assert_eq!(analysis.detection_count(), 1);
    }

    // Tests the tiling slot runs a single tile when it stands in with tiling disabled
    // Verified by planning a grid whenever the tiling slot is selected
    #[test]
    fn test_tiling_disabled_with_tiled_fallback() {
        let mut config = EngineConfig::default();
        config.tiling.enabled = false;
        let models = ModelSet {
            whole_image: ModelHandle::unavailable("whole failed"),
            tiled: blob(),
        };
        let engine = Engine::new(models, config).unwrap();

        assert_eq!(engine.select_backend((3000, 2000)), Some(Backend::Tiled));
        assert_eq!(engine.select_backend((800, 600)), Some(Backend::Tiled));
        let analysis = engine
            .analyze(&scene(3000, 2000, &[(1500, 1000)], 40), 0.25)
            .unwrap();
        assert_eq!(analysis.backend, Some(Backend::Tiled));
        assert_eq!(analysis.tile_count, 1);
        assert!(!analysis.is_tiled());
        assert_eq!(analysis.detection_count(), 1);
    }

    // Tests a downscaled oversized image is still tiled over the working raster
    // Verified by deciding on the downscaled size
    #[test]
    fn test_downscaled_image_keeps_tiling() {
        let mut config = EngineConfig::default();
        config.max_image_dimension = Some(1500);
        let engine = Engine::new(ModelSet::shared(blob()), config).unwrap();

        // 3000x2000 shrinks to 1500x1000, below the trigger but still tiled
        let analysis = engine
            .analyze(&scene(3000, 2000, &[(200, 200)], 60), 0.25)
            .unwrap();
        assert_eq!(analysis.backend, Some(Backend::Tiled));
        assert_eq!(analysis.tile_count, 12);
        assert!(analysis.is_tiled());
        for detection in &analysis.detections {
            assert!(detection.bbox.is_within(3000, 2000));
        }
    }

    // Tests out-of-range confidence is rejected before any work
    // Verified by clamping the confidence instead
    #[test]
    fn test_invalid_confidence() {
        let engine = engine(ModelSet::shared(blob()));
        let raster = Raster::filled(10, 10, [0; 3]);

        assert!(engine.analyze(&raster, 1.5).unwrap_err().is_invalid_parameter());
        assert!(engine.analyze(&raster, -0.1).unwrap_err().is_invalid_parameter());
        assert!(engine.analyze(&Raster::filled(0, 0, [0; 3]), 0.5).is_err());
        assert!(
            engine
                .analyze_path("/nonexistent/image.png", 2.0)
                .unwrap_err()
                .is_invalid_parameter()
        );
    }

    // Tests missing models yield an empty result with an unavailable status
    // Verified by returning an error when no model is loaded
    #[test]
    fn test_model_unavailable() {
        let engine = engine(ModelSet::shared(ModelHandle::unavailable("weights missing")));
        let analysis = engine.analyze(&scene(100, 100, &[(10, 10)], 10), 0.25).unwrap();

        assert!(analysis.detections.is_empty());
        assert_eq!(analysis.backend, None);
        assert_eq!(
            analysis.status,
            AnalysisStatus::ModelUnavailable {
                reason: "weights missing".to_string()
            }
        );
    }

    // Tests tile failures are counted rather than propagated
    // Verified by aborting on the first failed tile
    #[test]
    fn test_failed_tiles_are_counted() {
        let engine = engine(ModelSet::shared(ModelHandle::ready(BrokenModel)));
        let analysis = engine.analyze(&Raster::filled(3000, 2000, [0; 3]), 0.25).unwrap();

        assert_eq!(analysis.status, AnalysisStatus::Ok);
        assert_eq!(analysis.tile_count, 40);
        assert_eq!(analysis.failed_tiles, 40);
        assert!(analysis.detections.is_empty());
    }

    // Tests the progress callback sees every tile exactly once
    // Verified by reporting only the first tile
    #[test]
    fn test_progress_callback() {
        let engine = engine(ModelSet::shared(blob()));
        let calls = AtomicUsize::new(0);
        let last_total = AtomicUsize::new(0);

        let analysis = engine
            .analyze_with_progress(&Raster::filled(2500, 1500, [0; 3]), 0.25, |_, total| {
                calls.fetch_add(1, Ordering::Relaxed);
                last_total.store(total, Ordering::Relaxed);
            })
            .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), analysis.tile_count);
        assert_eq!(last_total.load(Ordering::Relaxed), analysis.tile_count);
    }

    // Tests parallel tile inference matches the sequential result
    // Verified by collecting parallel results in completion order
    #[test]
    fn test_parallel_matches_sequential() {
        let raster = scene(3000, 2000, &[(100, 100), (1500, 1000), (2700, 1700)], 40);
        let sequential = engine(ModelSet::shared(blob())).analyze(&raster, 0.25).unwrap();

        let config = EngineConfig {
            worker_threads: 4,
            ..EngineConfig::default()
        };
        let parallel = Engine::new(ModelSet::shared(blob()), config)
            .unwrap()
            .analyze(&raster, 0.25)
            .unwrap();

        assert_eq!(sequential.detections, parallel.detections);
        assert_eq!(sequential.detection_count(), 3);
    }

    // Tests downscaled inference maps boxes back to source pixels
    // Verified by skipping the rescale step
    #[test]
    fn test_max_dimension_rescales_boxes() {
        let config = EngineConfig {
            max_image_dimension: Some(1500),
            ..EngineConfig::default()
        };
        let engine = Engine::new(ModelSet::shared(blob()), config).unwrap();
        let analysis = engine.analyze(&scene(3000, 2000, &[(200, 200)], 100), 0.25).unwrap();

        assert_eq!(analysis.image_size, (3000, 2000));
        assert_eq!(analysis.detection_count(), 1);
        let bbox = analysis.detections.first().unwrap().bbox;
        for (actual, expected) in [
            (bbox.x_min, 200.0),
            (bbox.y_min, 200.0),
            (bbox.x_max, 300.0),
            (bbox.y_max, 300.0),
        ] {
            assert!((actual - expected).abs() <= 4.0, "{bbox:?}");
        }
    }

    // Tests undecodable files produce typed failures for both operations
    // Verified by propagating the decode error
    #[test]
    fn test_decode_failures() {
        let engine = engine(ModelSet::shared(blob()));

        let analysis = engine.analyze_path("/nonexistent/image.png", 0.25).unwrap();
        assert!(matches!(analysis.status, AnalysisStatus::DecodeFailure { .. }));
        assert!(analysis.detections.is_empty());

        let result = engine
            .compare_paths("/nonexistent/a.png", "/nonexistent/b.png", 30, ComparisonMethod::AbsDiff)
            .unwrap();
        assert!(result.is_decode_failure());
        assert_eq!(result.changed_pixel_count, 0);

        assert!(
            engine
                .compare_paths("/nonexistent/a.png", "/nonexistent/b.png", 0, ComparisonMethod::AbsDiff)
                .unwrap_err()
                .is_invalid_parameter()
        );
    }

    // Tests invalid configuration is rejected at construction
    // Verified by skipping validation in Engine::new
    #[test]
    fn test_invalid_config() {
        let config = EngineConfig {
            iou_threshold: 0.0,
            ..EngineConfig::default()
        };
        assert!(Engine::new(ModelSet::shared(blob()), config).is_err());
    }
}
