//! Two-image change detection
//!
//! Pipeline: align (the second raster is always resized to the first one's
//! dimensions), reduce both to luminance, build a difference plane with the
//! selected method, mark pixels whose difference is strictly above the
//! threshold, then summarize the mask as a changed-pixel count plus
//! connected regions ordered by descending area.

use crate::analysis::components::{BinaryMask, ChangeRegion, regions_from_mask};
use crate::analysis::flow::motion_compensated_difference;
use crate::analysis::ssim::ssim_difference;
use crate::io::configuration::ComparisonConfig;
use crate::io::error::{Result, check_change_threshold, invalid_parameter};
use crate::spatial::Raster;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difference strategy used to build the change mask
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMethod {
    /// Plain per-pixel absolute luminance difference
    #[default]
    AbsDiff,
    /// Block-matching motion-compensated difference
    OpticalFlow,
    /// Local structural dissimilarity
    Ssim,
}

impl ComparisonMethod {
    /// Every supported method
    pub const ALL: [Self; 3] = [Self::AbsDiff, Self::OpticalFlow, Self::Ssim];

    /// Wire name of the method
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AbsDiff => "absdiff",
            Self::OpticalFlow => "opticalflow",
            Self::Ssim => "ssim",
        }
    }
}

impl fmt::Display for ComparisonMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown comparison method '{s}' (expected absdiff, opticalflow or ssim)")
            })
    }
}

/// Whether a comparison ran or stopped at decoding
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ComparisonStatus {
    /// Both images decoded and were compared
    #[default]
    Ok,
    /// One of the images could not be decoded
    DecodeFailure {
        /// Decoder error message
        reason: String,
    },
}

/// Summary of the differences between two images
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Strategy that produced the mask
    pub method: ComparisonMethod,
    /// Per-pixel difference threshold
    pub threshold: u32,
    /// Whether the comparison ran
    pub status: ComparisonStatus,
    /// Pixels whose difference exceeded the threshold
    pub changed_pixel_count: usize,
    /// `changed_pixel_count` over the compared pixel count
    pub changed_fraction: f64,
    /// Connected changed regions, largest first
    pub regions: Vec<ChangeRegion>,
    /// Original `(width, height)` of the first and second image
    pub image_sizes: [(u32, u32); 2],
    /// True when the second image was resized to match the first
    pub resized_second: bool,
    /// Mean local SSIM, reported only by the `ssim` method
    pub similarity_score: Option<f64>,
}

impl ComparisonResult {
    /// Zeroed result recording that an input could not be decoded
    pub fn decode_failure(
        method: ComparisonMethod,
        threshold: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            method,
            threshold,
            status: ComparisonStatus::DecodeFailure {
                reason: reason.into(),
            },
            changed_pixel_count: 0,
            changed_fraction: 0.0,
            regions: Vec::new(),
            image_sizes: [(0, 0); 2],
            resized_second: false,
            similarity_score: None,
        }
    }

    /// True when the comparison stopped at decoding
    pub const fn is_decode_failure(&self) -> bool {
        matches!(self.status, ComparisonStatus::DecodeFailure { .. })
    }
}

/// Per-pixel absolute difference of two same-shape planes
pub fn absolute_difference(a: &Array2<u8>, b: &Array2<u8>) -> Array2<u8> {
    Zip::from(a).and(b).map_collect(|&x, &y| x.abs_diff(y))
}

/// Compares two rasters with a fixed set of strategy parameters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeComparator {
    config: ComparisonConfig,
}

impl ChangeComparator {
    /// Create a comparator with the given strategy parameters
    pub const fn new(config: ComparisonConfig) -> Self {
        Self { config }
    }

    /// Strategy parameters in use
    pub const fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Difference plane and optional similarity score for two aligned luminance planes
    pub fn difference(
        &self,
        a: &Array2<u8>,
        b: &Array2<u8>,
        method: ComparisonMethod,
    ) -> (Array2<u8>, Option<f64>) {
        match method {
            ComparisonMethod::AbsDiff => (absolute_difference(a, b), None),
            ComparisonMethod::OpticalFlow => (
                motion_compensated_difference(
                    a,
                    b,
                    self.config.flow_block_size,
                    self.config.flow_search_radius,
                ),
                None,
            ),
            ComparisonMethod::Ssim => {
                let (plane, score) = ssim_difference(a, b, self.config.ssim_window.max(1));
                (plane, Some(score))
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
        self.compare_with_mask(first, second, threshold, method)
            .map(|(result, _)| result)
    }

    /// Compare two rasters and also return the binary change mask
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a threshold outside `[1, 100]` or an
    /// empty raster
    pub fn compare_with_mask(
        &self,
        first: &Raster,
        second: &Raster,
        threshold: u32,
        method: ComparisonMethod,
    ) -> Result<(ComparisonResult, BinaryMask)> {
        let threshold = check_change_threshold(threshold)?;
        for (name, raster) in [("first", first), ("second", second)] {
            if raster.is_empty() {
                return Err(invalid_parameter(
                    "raster",
                    &format!("{name} {}x{}", raster.width(), raster.height()),
                    &"image must have a positive area",
                ));
            }
        }

        let (width, height) = first.dimensions();
        let resized_second = second.dimensions() != (width, height);
        let aligned = second.resized(width, height);

        let luminance_first = first.luminance();
        let luminance_second = aligned.luminance();
        let (plane, similarity_score) =
            self.difference(&luminance_first, &luminance_second, method);

        let mask = BinaryMask::above_threshold(&plane, threshold);
        let changed_pixel_count = mask.count_ones();
        let regions = regions_from_mask(
            &mask,
            self.config.min_region_area.max(1),
            self.config.max_regions,
        );

        log::debug!(
            "{method}: {changed_pixel_count} changed pixels in {} regions (threshold {threshold})",
            regions.len()
        );

        let result = ComparisonResult {
            method,
            threshold,
            status: ComparisonStatus::Ok,
            changed_pixel_count,
            changed_fraction: changed_pixel_count as f64 / first.pixel_count() as f64,
            regions,
            image_sizes: [first.dimensions(), second.dimensions()],
            resized_second,
            similarity_score,
        };
        Ok((result, mask))
    }
}
