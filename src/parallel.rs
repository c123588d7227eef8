use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::file_processor::{self, FileOutcome};
use crate::metrics::METRICS;
use crate::output::output_path;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// A discovered export and its path relative to the root it was found under.
/// The relative path is mirrored under the output directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct InputFile {
    pub path: PathBuf,
    pub relative: PathBuf,
}

impl InputFile {
    /// An input named directly; only its file name is mirrored.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let relative = file_name_of(&path);
        Self { path, relative }
    }

    /// An input found by walking or globbing below `root`.
    pub fn under(path: PathBuf, root: &Path) -> Self {
        let relative = path
            .strip_prefix(root)
            .ok()
            .filter(|relative| !relative.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| file_name_of(&path));
        Self { path, relative }
    }
}

impl From<PathBuf> for InputFile {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

fn file_name_of(path: &Path) -> PathBuf {
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf())
}

/// Result of processing a single file
#[derive(Debug)]
pub struct FileProcessResult {
    pub file_path: PathBuf,
    pub result: Result<FileOutcome, PipelineError>,
    pub processing_time_ms: u128,
}

/// Parallel file processor using Rayon
pub struct ParallelProcessor {
    num_workers: usize,
    show_progress: bool,
}

impl ParallelProcessor {
    pub fn new() -> Self {
        let num_workers = num_cpus::get();
        info!("Initializing ParallelProcessor with {} workers", num_workers);
        Self {
            num_workers,
            show_progress: true,
        }
    }

    pub fn with_workers(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        info!("Initializing ParallelProcessor with {} custom workers", num_workers);
        Self {
            num_workers,
            show_progress: true,
        }
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Process multiple hourly exports in parallel. Each file gets its own
    /// model, and one failing file never stops the others.
    ///
    /// Inputs that would write the same output file all fail with
    /// [`PipelineError::OutputCollision`] before anything is written.
    pub fn process_files(
        &self,
        inputs: &[InputFile],
        config: &PipelineConfig,
        output_dir: Option<&Path>,
    ) -> Vec<FileProcessResult> {
        let total_files = inputs.len();
        info!("Starting parallel processing of {} files", total_files);

        let targets: Vec<Option<PathBuf>> = inputs
            .iter()
            .map(|input| output_dir.map(|dir| output_path(&input.relative, dir, &config.output_suffix)))
            .collect();
        let collisions = colliding_outputs(inputs, &targets);
        for (output, sources) in &collisions {
            warn!("{} inputs map to {}, none of them will be processed", sources.len(), output.display());
        }

        let progress = if self.show_progress {
            ProgressBar::new(total_files as u64)
        } else {
            ProgressBar::hidden()
        };
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let run = || -> Vec<FileProcessResult> {
            inputs
                .par_iter()
                .zip(targets.par_iter())
                .map(|(input, target)| {
                    let shared = target
                        .as_ref()
                        .and_then(|target| collisions.get(target).map(|sources| (target, sources)));
                    let result = match shared {
                        Some((output, sources)) => reject_collision(&input.path, output, sources),
                        None => process_one(&input.path, config, target.as_deref()),
                    };
                    progress.inc(1);
                    result
                })
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_workers)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!("Could not build a {}-thread pool ({}), using the global pool", self.num_workers, e);
                run()
            }
        };

        progress.finish_with_message("File processing completed");
        results
    }
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new()
    }
}

// Output paths claimed by more than one input, with the inputs claiming them.
fn colliding_outputs(inputs: &[InputFile], targets: &[Option<PathBuf>]) -> HashMap<PathBuf, Vec<PathBuf>> {
    let mut by_output: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
    for (input, target) in inputs.iter().zip(targets) {
        if let Some(target) = target {
            by_output
                .entry(target.clone())
                .or_default()
                .push(input.path.clone());
        }
    }
    by_output.retain(|_, sources| sources.len() > 1);
    by_output
}

fn reject_collision(path: &Path, output: &Path, sources: &[PathBuf]) -> FileProcessResult {
    let result = Err(PipelineError::OutputCollision {
        output: output.to_path_buf(),
        inputs: sources.to_vec(),
    });
    finish(path, result, Instant::now())
}

fn process_one(path: &Path, config: &PipelineConfig, output_file: Option<&Path>) -> FileProcessResult {
    let start = Instant::now();
    let result = file_processor::process_file(path, config, output_file);
    finish(path, result, start)
}

fn finish(path: &Path, result: Result<FileOutcome, PipelineError>, start: Instant) -> FileProcessResult {
    let processing_time_ms = start.elapsed().as_millis();
    let mut metrics = METRICS.lock();
    metrics.record_file_attempt();

    match &result {
        Ok(outcome) => {
            info!(
                "Derived {} of {} rows from {} in {}ms",
                outcome.batch.records.len(),
                outcome.rows_read,
                path.display(),
                processing_time_ms
            );
            metrics.record_file_success(outcome.rows_read as u64, outcome.batch.records.len() as u64);
        }
        Err(e) => {
            error!("Failed to process {}: {}", path.display(), e);
            metrics.record_file_failure();
        }
    }

    FileProcessResult {
        file_path: path.to_path_buf(),
        result,
        processing_time_ms,
    }
}

/// Expands CLI inputs into a sorted, de-duplicated list of CSV files.
///
/// Inputs containing glob metacharacters are expanded with `glob`,
/// directories are walked recursively for `.csv` files, plain files are
/// kept as given. Walked and globbed files keep their path below the
/// directory or the literal part of the pattern.
pub fn expand_inputs(inputs: &[String]) -> Vec<InputFile> {
    let mut files: Vec<InputFile> = inputs
        .par_iter()
        .flat_map(|input| {
            if input.contains(GLOB_CHARS) {
                let root = glob_root(input);
                match glob::glob(input) {
                    Ok(paths) => {
                        let expanded: Vec<InputFile> = paths
                            .filter_map(|entry| entry.ok())
                            .filter(|path| path.is_file())
                            .map(|path| InputFile::under(path, &root))
                            .collect();
                        info!("Expanded glob {} to {} files", input, expanded.len());
                        expanded
                    }
                    Err(e) => {
                        error!("Invalid glob pattern {}: {}", input, e);
                        Vec::new()
                    }
                }
            } else {
                let path = PathBuf::from(input);
                if path.is_dir() {
                    csv_files_under(&path)
                        .into_iter()
                        .map(|file| InputFile::under(file, &path))
                        .collect::<Vec<_>>()
                } else if path.is_file() {
                    vec![InputFile::new(path)]
                } else {
                    warn!("Input {} does not exist, ignoring it", input);
                    Vec::new()
                }
            }
        })
        .collect();

    files.sort();
    files.dedup_by(|a, b| a.path == b.path);
    files
}

// Leading components of a pattern without metacharacters: `data/2024` for `data/2024/*/*.csv`.
fn glob_root(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|component| !component.as_os_str().to_string_lossy().contains(GLOB_CHARS))
        .collect()
}

fn csv_files_under(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect()
}
