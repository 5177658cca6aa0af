//! Command-line interface for batch detection and two-image comparison

use crate::algorithm::engine::{Analysis, Engine, ModelSet};
use crate::analysis::change::ComparisonMethod;
use crate::inference::loader::load_model;
use crate::io::configuration::{
    ANNOTATED_SUFFIX, DEFAULT_CHANGE_THRESHOLD, DEFAULT_CONFIDENCE, DETECTIONS_SUFFIX,
    EngineConfig,
};
use crate::io::error::{Result, invalid_parameter};
use crate::io::image::{export_annotated_png, export_mask_png, load_raster};
use crate::io::progress::ProgressManager;
use crate::io::report::{AnalysisReport, to_json, write_json};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Parser, Debug)]
#[command(name = "aerial-watch")]
#[command(
    author,
    version,
    about = "Detect objects in aerial imagery and localize changes between two images"
)]
/// Command-line arguments
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress output and everything below errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect objects in an image or every image in a directory
    Detect(DetectArgs),
    /// Compare two images and report changed regions
    Compare(CompareArgs),
}

/// Arguments of the `detect` subcommand
#[derive(Args, Debug)]
// Each flag is an independent user toggle
#[allow(clippy::struct_excessive_bools)]
pub struct DetectArgs {
    /// Input PNG/JPEG file or directory to process
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Minimum detection confidence in [0, 1]
    #[arg(short, long, default_value_t = DEFAULT_CONFIDENCE)]
    pub confidence: f32,

    /// JSON model specification (built-in blob detector if omitted)
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// JSON engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Square tile size in pixels
    #[arg(long)]
    pub tile_size: Option<u32>,

    /// Tile overlap ratio in [0, 1)
    #[arg(long)]
    pub overlap: Option<f32>,

    /// Always run whole-image inference
    #[arg(long)]
    pub no_tiling: bool,

    /// Worker threads for per-tile inference
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Downscale images whose longer side exceeds this many pixels
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Also write an annotated copy of each image
    #[arg(short, long)]
    pub annotate: bool,

    /// Directory for reports and annotated images (defaults to the input's)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Process files even if their report exists
    #[arg(short, long)]
    pub no_skip: bool,
}

impl DetectArgs {
    /// Engine configuration from the optional file with command-line overrides applied
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the result is invalid
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(size) = self.tile_size {
            config.tiling.tile_width = size;
            config.tiling.tile_height = size;
        }
        if let Some(overlap) = self.overlap {
            config.tiling.overlap_ratio = overlap;
        }
        if self.no_tiling {
            config.tiling.enabled = false;
        }
        if let Some(threads) = self.threads {
            config.worker_threads = threads;
        }
        if self.max_dimension.is_some() {
            config.max_image_dimension = self.max_dimension;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check if existing reports should be skipped
    pub const fn skip_existing(&self) -> bool {
        !self.no_skip
    }

    fn output_path(&self, input_path: &Path, suffix: &str, extension: &str) -> PathBuf {
        let stem = input_path.file_stem().unwrap_or_default();
        let name = format!("{}{suffix}.{extension}", stem.to_string_lossy());
        match (&self.output_dir, input_path.parent()) {
            (Some(dir), _) => dir.join(name),
            (None, Some(parent)) => parent.join(name),
            (None, None) => PathBuf::from(name),
        }
    }

    /// Where the detection report for an input image is written
    pub fn report_path(&self, input_path: &Path) -> PathBuf {
        self.output_path(input_path, DETECTIONS_SUFFIX, "json")
    }

    /// Where the annotated copy of an input image is written
    pub fn annotated_path(&self, input_path: &Path) -> PathBuf {
        self.output_path(input_path, ANNOTATED_SUFFIX, "png")
    }
}

/// Arguments of the `compare` subcommand
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Reference image
    pub first: PathBuf,

    /// Image compared against the reference (resized to it if needed)
    pub second: PathBuf,

    /// Per-pixel difference threshold in [1, 100]
    #[arg(short, long, default_value_t = DEFAULT_CHANGE_THRESHOLD)]
    pub threshold: u32,

    /// Difference strategy: absdiff, opticalflow or ssim
    #[arg(short, long, default_value_t = ComparisonMethod::AbsDiff)]
    pub method: ComparisonMethod,

    /// JSON engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the change mask as a PNG
    #[arg(long)]
    pub mask: Option<PathBuf>,

    /// Write the result as JSON instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// True for file names with a supported image extension
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

// Annotated outputs from earlier runs sit next to their inputs
fn is_generated_output(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with(ANNOTATED_SUFFIX))
}

/// Orchestrates batch detection with progress tracking
pub struct FileProcessor {
    args: DetectArgs,
    progress_manager: Option<ProgressManager>,
}

impl FileProcessor {
    /// Create a processor for the `detect` arguments
    pub fn new(args: DetectArgs, quiet: bool) -> Self {
        let progress_manager = (!quiet).then(ProgressManager::new);
        Self {
            args,
            progress_manager,
        }
    }

    /// Analyze every selected image and write its report
    ///
    /// Returns the number of images processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is invalid, the configuration is
    /// invalid, or a report cannot be written
    pub fn process(&mut self) -> Result<usize> {
        let files = self.collect_files()?;
        if files.is_empty() {
            return Ok(0);
        }

        let config = self.args.engine_config()?;
        let engine = Engine::new(
            ModelSet::shared(load_model(self.args.model.as_deref())),
            config,
        )?;

        if let Some(pm) = &mut self.progress_manager {
            pm.initialize(files.len());
        }

        for (index, file) in files.iter().enumerate() {
            self.process_file(&engine, file, index)?;
        }

        if let Some(pm) = &self.progress_manager {
            pm.finish();
        }
        Ok(files.len())
    }

    /// Images the target resolves to, in name order, minus skipped ones
    ///
    /// # Errors
    ///
    /// Returns an error if the target is neither an image file nor a
    /// readable directory
    pub fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let target = &self.args.target;
        if target.is_file() {
            if !is_image_path(target) {
                return Err(invalid_parameter(
                    "target",
                    &target.display(),
                    &"file must be a PNG or JPEG image",
                ));
            }
            Ok(if self.should_process_file(target) {
                vec![target.clone()]
            } else {
                Vec::new()
            })
        } else if target.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(target)? {
                let path = entry?.path();
                if path.is_file()
                    && is_image_path(&path)
                    && !is_generated_output(&path)
                    && self.should_process_file(&path)
                {
                    files.push(path);
                }
            }
            files.sort();
            Ok(files)
        } else {
            Err(invalid_parameter(
                "target",
                &target.display(),
                &"must be an image file or a directory",
            ))
        }
    }

    fn should_process_file(&self, input_path: &Path) -> bool {
        if !self.args.skip_existing() || !self.args.report_path(input_path).exists() {
            return true;
        }
        log::info!("Skipping {} (report exists)", input_path.display());
        false
    }

    fn process_file(&self, engine: &Engine, input_path: &Path, index: usize) -> Result<()> {
        let progress = self.progress_manager.as_ref();
        if let Some(pm) = progress {
            pm.start_file(index, input_path);
        }

        let analysis = match load_raster(input_path) {
            Ok(raster) => {
                let analysis =
                    engine.analyze_with_progress(&raster, self.args.confidence, |done, total| {
                        if let Some(pm) = progress {
                            pm.update_tiles(index, done, total);
                        }
                    })?;
                if self.args.annotate {
                    export_annotated_png(
                        &raster,
                        &analysis.detections,
                        &self.args.annotated_path(input_path),
                    )?;
                }
                analysis
            }
            Err(error) => {
                log::warn!("Cannot analyze {}: {error}", input_path.display());
                Analysis::decode_failure(error.to_string())
            }
        };

        let task_id = input_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let report = AnalysisReport::from_analysis(task_id, input_path, &analysis);
        write_json(&report, &self.args.report_path(input_path))?;

        if let Some(pm) = progress {
            pm.complete_file(index);
        }
        log::info!(
            "{}: {} detection(s) in {:.2}s",
            input_path.display(),
            report.detection_count,
            report.processing_time_secs
        );
        Ok(())
    }
}

/// Run the `compare` subcommand
///
/// # Errors
///
/// Returns an error for an invalid threshold or configuration, or if an
/// output file cannot be written
// Printing the result is the command's output when no file is requested
#[allow(clippy::print_stdout)]
pub fn run_compare(args: &CompareArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::new(ModelSet::shared(load_model(None)), config)?;
    let (result, mask) =
        engine.compare_paths_with_mask(&args.first, &args.second, args.threshold, args.method)?;

    if let (Some(path), Some(mask)) = (&args.mask, &mask) {
        export_mask_png(mask, path)?;
    }
    match &args.output {
        Some(path) => write_json(&result, path)?,
        None => println!("{}", to_json(&result)?),
    }
    Ok(())
}

/// Dispatch a parsed command line
///
/// # Errors
///
/// Returns the first error raised by the selected subcommand
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Detect(args) => FileProcessor::new(args, cli.quiet).process().map(|_| ()),
        Command::Compare(args) => run_compare(&args),
    }
}
