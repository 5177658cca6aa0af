//! Engine facade: backend selection, tiled inference and change comparison
//!
//! The engine owns one adapter per backend slot and picks between them from
//! the image size alone. Every degradation (missing tiling model, missing
//! model, undecodable image, failed tile) is logged and reported through a
//! typed status instead of an error; only bad parameters and malformed tile
//! geometry come back as `Err`.

use crate::algorithm::aggregation::{AggregatedDetection, Aggregator};
use crate::analysis::change::{ChangeComparator, ComparisonMethod, ComparisonResult};
use crate::analysis::components::BinaryMask;
use crate::inference::adapter::{Backend, InferenceAdapter, InferenceStatus};
use crate::inference::model::{ModelHandle, RawDetection};
use crate::io::configuration::EngineConfig;
use crate::io::error::{Result, check_change_threshold, check_confidence, invalid_parameter};
use crate::io::image::load_raster;
use crate::spatial::tiles::check_plan;
use crate::spatial::{Raster, Tile, TilePlanner};
use rayon::ThreadPool;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Model handles for the two backend slots
#[derive(Clone, Debug)]
pub struct ModelSet {
    /// Model run once over the full image
    pub whole_image: ModelHandle,
    /// Model run per tile on oversized images
    pub tiled: ModelHandle,
}

impl ModelSet {
    /// Use one handle for both slots
    pub fn shared(handle: ModelHandle) -> Self {
        Self {
            whole_image: handle.clone(),
            tiled: handle,
        }
    }
}

/// Whether an analysis ran and, if not, why
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Inference ran
    #[default]
    Ok,
    /// The image could not be decoded
    DecodeFailure {
        /// Decoder error message
        reason: String,
    },
    /// Neither backend has a loaded model
    ModelUnavailable {
        /// Load failure recorded on the handle
        reason: String,
    },
}

/// Result of one `analyze` call
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    /// How the call went
    pub status: AnalysisStatus,
    /// Deduplicated detections in source-image pixels, by descending confidence
    pub detections: Vec<AggregatedDetection>,
    /// Backend that ran, if any
    pub backend: Option<Backend>,
    /// Tiles sent to the model
    pub tile_count: usize,
    /// Tiles whose inference raised an error
    pub failed_tiles: usize,
    /// Detections merged into a survivor during aggregation
    pub duplicates_removed: usize,
    /// Source `(width, height)`
    pub image_size: (u32, u32),
    /// Wall time spent in the call
    pub elapsed: Duration,
}

impl Analysis {
    fn empty(status: AnalysisStatus, image_size: (u32, u32), started: Instant) -> Self {
        Self {
            status,
            detections: Vec::new(),
            backend: None,
            tile_count: 0,
            failed_tiles: 0,
            duplicates_removed: 0,
            image_size,
            elapsed: started.elapsed(),
        }
    }

    /// Empty analysis recording that the image could not be decoded
    pub fn decode_failure(reason: impl Into<String>) -> Self {
        Self::empty(
            AnalysisStatus::DecodeFailure {
                reason: reason.into(),
            },
            (0, 0),
            Instant::now(),
        )
    }

    /// Number of detections kept
    pub fn detection_count(&self) -> usize {
        self.detections.len()
    }

    /// True when per-tile inference ran over more than one tile
    pub fn is_tiled(&self) -> bool {
        self.backend == Some(Backend::Tiled) && self.tile_count > 1
    }
}

/// Detection and comparison entry point
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    planner: TilePlanner,
    aggregator: Aggregator,
    comparator: ChangeComparator,
    whole: InferenceAdapter,
    tiled: InferenceAdapter,
    pool: Option<ThreadPool>,
}

impl Engine {
    /// Build an engine around explicit model handles
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the configuration fails validation
    pub fn new(models: ModelSet, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let planner = TilePlanner::from_config(&config.tiling)?;
        let aggregator = Aggregator::new(config.iou_threshold)?;

        let pool = if config.worker_threads > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_threads)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(error) => {
                    log::warn!("Tile worker pool unavailable, running sequentially: {error}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            config,
            planner,
            aggregator,
            comparator: ChangeComparator::new(config.comparison),
            whole: InferenceAdapter::new(Backend::WholeImage, models.whole_image),
            tiled: InferenceAdapter::new(Backend::Tiled, models.tiled),
            pool,
        })
    }

    /// Configuration in use
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Planner in use
    pub const fn planner(&self) -> &TilePlanner {
        &self.planner
    }

    /// Backend `analyze` would use for an image of this size
    ///
    /// Oversized images prefer the tiling backend and fall back to the
    /// whole-image one; smaller images prefer the whole-image backend and
    /// fall back to the tiling one with a single tile. `None` when neither
    /// model is loaded.
    pub fn select_backend(&self, image_size: (u32, u32)) -> Option<Backend> {
        let (preferred, fallback) = if self.wants_tiling(image_size) {
            (&self.tiled, &self.whole)
        } else {
            (&self.whole, &self.tiled)
        };

        if preferred.is_available() {
            Some(preferred.backend())
        } else if fallback.is_available() {
            Some(fallback.backend())
        } else {
            None
        }
    }

    // Tiling runs only when enabled and the source image is above the trigger
    const fn wants_tiling(&self, image_size: (u32, u32)) -> bool {
        self.config.tiling.enabled && self.planner.should_tile(image_size)
    }

    fn adapter(&self, backend: Backend) -> &InferenceAdapter {
        match backend {
            Backend::WholeImage => &self.whole,
            Backend::Tiled => &self.tiled,
        }
    }

    fn unavailable_reason(&self) -> String {
        self.whole
            .unavailable_reason()
            .or_else(|| self.tiled.unavailable_reason())
            .unwrap_or("no detection model loaded")
            .to_string()
    }

    /// Detect objects in a raster
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a confidence outside `[0, 1]` or an
    /// empty raster, and a `Geometry` error if the tile plan is malformed
    pub fn analyze(&self, raster: &Raster, confidence_threshold: f32) -> Result<Analysis> {
        self.analyze_with_progress(raster, confidence_threshold, |_, _| {})
    }

    /// Detect objects, reporting `(tiles_done, tiles_total)` after each tile
    ///
    /// # Errors
    ///
    /// Same as [`Engine::analyze`]
    pub fn analyze_with_progress<F>(
        &self,
        raster: &Raster,
        confidence_threshold: f32,
        on_tile: F,
    ) -> Result<Analysis>
    where
        F: Fn(usize, usize) + Sync,
    {
        let started = Instant::now();
        let confidence_threshold = check_confidence(confidence_threshold)?;
        let image_size = raster.dimensions();
        if raster.is_empty() {
            return Err(invalid_parameter(
                "raster",
                &format!("{}x{}", image_size.0, image_size.1),
                &"image must have a positive area",
            ));
        }

        let Some(backend) = self.select_backend(image_size) else {
            let reason = self.unavailable_reason();
            log::warn!("No detection model available: {reason}");
            return Ok(Analysis::empty(
                AnalysisStatus::ModelUnavailable { reason },
                image_size,
                started,
            ));
        };
        if backend == Backend::WholeImage && self.wants_tiling(image_size) {
            log::warn!(
                "Tiling backend unavailable, running whole-image inference on {}x{}",
                image_size.0,
                image_size.1
            );
        }

        let (work, scale) = match self.config.max_image_dimension {
            Some(max_dimension) if image_size.0.max(image_size.1) > max_dimension => {
                let (resized, scale) = raster.fit_within(max_dimension);
                log::debug!(
                    "Downscaled {}x{} to {}x{} before inference",
                    image_size.0,
                    image_size.1,
                    resized.width(),
                    resized.height()
                );
                (Cow::Owned(resized), scale)
            }
            _ => (Cow::Borrowed(raster), 1.0),
        };
        let work_size = work.dimensions();

        // The tiling slot may be running as a fallback with tiling disabled
        let tiles = if backend == Backend::Tiled && self.config.tiling.enabled {
            self.planner.plan_scaled(image_size, work_size)?
        } else {
            vec![Tile::whole(work_size)]
        };
        check_plan(&tiles, work_size)?;
        log::debug!(
            "{backend:?} inference on {}x{} over {} tile(s)",
            work_size.0,
            work_size.1,
            tiles.len()
        );

        let adapter = self.adapter(backend);
        let total = tiles.len();
        let done = AtomicUsize::new(0);
        let run_tile = |tile: &Tile| {
            let inference = if tile.covers(work_size) {
                adapter.detect(&work, confidence_threshold)
            } else {
                let view = work.crop(tile.origin.0, tile.origin.1, tile.size.0, tile.size.1);
                adapter.detect(&view, confidence_threshold)
            };
            on_tile(done.fetch_add(1, Ordering::Relaxed) + 1, total);
            (*tile, inference)
        };

        let results: Vec<_> = match &self.pool {
            Some(pool) => pool.install(|| tiles.par_iter().map(run_tile).collect()),
            None => tiles.iter().map(run_tile).collect(),
        };

        let mut failed_tiles = 0;
        let per_tile: Vec<(Tile, Vec<RawDetection>)> = results
            .into_iter()
            .map(|(tile, inference)| {
                if matches!(inference.status, InferenceStatus::Failed { .. }) {
                    failed_tiles += 1;
                }
                (tile, inference.detections)
            })
            .collect();
        if failed_tiles > 0 {
            log::warn!("{failed_tiles} of {total} tile(s) failed inference");
        }

        let aggregation = self.aggregator.aggregate(&per_tile, work_size);
        let detections = if scale < 1.0 {
            rescale(aggregation.detections, scale, image_size)
        } else {
            aggregation.detections
        };

        let analysis = Analysis {
            status: AnalysisStatus::Ok,
            detections,
            backend: Some(backend),
            tile_count: total,
            failed_tiles,
            duplicates_removed: aggregation.duplicates_removed,
            image_size,
            elapsed: started.elapsed(),
        };
        log::info!(
            "{} detection(s) from {} tile(s), {} duplicate(s) removed in {:.2?}",
            analysis.detection_count(),
            analysis.tile_count,
            analysis.duplicates_removed,
            analysis.elapsed
        );
        Ok(analysis)
    }

    /// Load an image file and detect objects in it
    ///
    /// An undecodable file yields an empty `DecodeFailure` analysis.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::analyze`]; the confidence is checked before the file
    /// is touched
    pub fn analyze_path<P: AsRef<Path>>(
        &self,
        path: P,
        confidence_threshold: f32,
    ) -> Result<Analysis> {
        let started = Instant::now();
        check_confidence(confidence_threshold)?;
        match load_raster(path.as_ref()) {
            Ok(raster) => {
                let mut analysis = self.analyze(&raster, confidence_threshold)?;
                analysis.elapsed = started.elapsed();
                Ok(analysis)
            }
            Err(error) => {
                log::warn!("Cannot analyze {}: {error}", path.as_ref().display());
                let mut analysis = Analysis::decode_failure(error.to_string());
                analysis.elapsed = started.elapsed();
                Ok(analysis)
            }
        }
    }

    /// Compare two rasters
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a threshold outside `[1, 100]` or an
    /// empty raster
    pub fn compare(
        &self,
        first: &Raster,
        second: &Raster,
        threshold: u32,
        method: ComparisonMethod,
    ) -> Result<ComparisonResult> {
        self.comparator.compare(first, second, threshold, method)
    }

    /// Load and compare two image files
    ///
    /// An undecodable file yields a zeroed `DecodeFailure` result.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a threshold outside `[1, 100]`, checked
    /// before either file is read
    pub fn compare_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        first: P,
        second: Q,
        threshold: u32,
        method: ComparisonMethod,
    ) -> Result<ComparisonResult> {
        self.compare_paths_with_mask(first, second, threshold, method)
            .map(|(result, _)| result)
    }

    /// Load and compare two image files, also returning the change mask
    ///
    /// The mask is `None` when either file fails to decode.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::compare_paths`]
    pub fn compare_paths_with_mask<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        first: P,
        second: Q,
        threshold: u32,
        method: ComparisonMethod,
    ) -> Result<(ComparisonResult, Option<BinaryMask>)> {
        let threshold = check_change_threshold(threshold)?;
        let loaded = load_raster(first.as_ref())
            .and_then(|a| load_raster(second.as_ref()).map(|b| (a, b)));

        match loaded {
            Ok((a, b)) => {
                let (result, mask) = self
                    .comparator
                    .compare_with_mask(&a, &b, threshold, method)?;
                Ok((result, Some(mask)))
            }
            Err(error) => {
                log::warn!("Comparison skipped: {error}");
                Ok((
                    ComparisonResult::decode_failure(method, threshold, error.to_string()),
                    None,
                ))
            }
        }
    }
}

// Map detections from a downscaled working raster back to source pixels
fn rescale(
    detections: Vec<AggregatedDetection>,
    scale: f64,
    image_size: (u32, u32),
) -> Vec<AggregatedDetection> {
    let factor = (1.0 / scale) as f32;
    detections
        .into_iter()
        .filter_map(|mut detection| {
            detection.bbox = detection
                .bbox
                .scaled(factor)
                .clamped(image_size.0, image_size.1)?;
            Some(detection)
        })
        .collect()
}
