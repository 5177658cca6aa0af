//! Multi-file progress display with per-file tile counters

use crate::io::configuration::MAX_INDIVIDUAL_PROGRESS_BARS;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::{LazyLock, Mutex};

/// Display name plus tiles done and tiles planned for one file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct FileState {
    name: String,
    done: usize,
    total: usize,
}

/// Coordinates progress display for batch detection
///
/// Small batches get one bar per file; larger ones add a batch bar and show
/// only the most recent files. Tile updates may arrive from worker threads.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    batch_bar: Option<ProgressBar>,
    file_bars: Vec<ProgressBar>,
    file_states: Mutex<Vec<FileState>>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

static TILE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:30.cyan/blue}] {prefix}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

static BATCH_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] Images: [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
});

impl ProgressManager {
    /// Create an empty progress manager
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            batch_bar: None,
            file_bars: Vec::new(),
            file_states: Mutex::new(Vec::new()),
        }
    }

    /// Create the bars for a batch of `file_count` images
    pub fn initialize(&mut self, file_count: usize) {
        if file_count > MAX_INDIVIDUAL_PROGRESS_BARS + 1 {
            let batch_bar = ProgressBar::new(file_count as u64);
            batch_bar.set_style(BATCH_STYLE.clone());
            self.batch_bar = Some(self.multi_progress.add(batch_bar));
        }

        for _ in 0..file_count.min(MAX_INDIVIDUAL_PROGRESS_BARS) {
            let bar = ProgressBar::new(0);
            bar.set_style(TILE_STYLE.clone());
            self.file_bars.push(self.multi_progress.add(bar));
        }
    }

    /// Register the file at `index` before its analysis starts
    pub fn start_file(&self, index: usize, path: &Path) {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        self.with_states(|states| {
            if index >= states.len() {
                states.resize(index + 1, FileState::default());
            }
            if let Some(state) = states.get_mut(index) {
                *state = FileState {
                    name,
                    done: 0,
                    total: 0,
                };
            }
        });
    }

    /// Record that `done` of `total` tiles of file `index` are finished
    pub fn update_tiles(&self, index: usize, done: usize, total: usize) {
        self.with_states(|states| {
            if let Some(state) = states.get_mut(index) {
                state.done = state.done.max(done);
                state.total = total;
            }
        });
    }

    /// Mark the file at `index` as finished
    pub fn complete_file(&self, index: usize) {
        if let Some(batch_bar) = &self.batch_bar {
            batch_bar.inc(1);
        }
        self.with_states(|states| {
            if let Some(state) = states.get_mut(index) {
                state.name = format!("✓ {}", state.name);
                state.done = state.total;
            }
        });
    }

    /// Number of files registered so far
    pub fn tracked_files(&self) -> usize {
        self.file_states.lock().map_or(0, |states| states.len())
    }

    /// Tear down every bar
    pub fn finish(&self) {
        if let Some(batch_bar) = &self.batch_bar {
            batch_bar.finish_with_message("All images processed");
        }
        let _ = self.multi_progress.clear();
    }

    fn with_states<F: FnOnce(&mut Vec<FileState>)>(&self, update: F) {
        if let Ok(mut states) = self.file_states.lock() {
            update(&mut states);
            self.update_bars(&states);
        }
    }

    // Show the last N files that have been started
    fn update_bars(&self, states: &[FileState]) {
        let active: Vec<&FileState> = states.iter().filter(|s| !s.name.is_empty()).collect();
        let start = active.len().saturating_sub(MAX_INDIVIDUAL_PROGRESS_BARS);
        let visible = active.get(start..).unwrap_or(&[]);

        for (bar, state) in self.file_bars.iter().zip(visible) {
            bar.set_length(state.total as u64);
            bar.set_position(state.done as u64);
            let width = state.total.to_string().len();
            bar.set_message(format!("{:>width$}/{} tiles", state.done, state.total));
            bar.set_prefix(state.name.clone());
        }

        for bar in self.file_bars.iter().skip(visible.len()) {
            bar.set_length(0);
            bar.set_position(0);
            bar.set_message(String::new());
            bar.set_prefix(String::new());
        }
    }
}
