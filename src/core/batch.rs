//! Batch rendering.
//!
//! Discovers templates under a set of roots and processes each one.
//! Failures are best-effort: one broken template never stops the others.
//! Environment-level errors (provider missing, cache unusable) raise the
//! cancel flag; no new work is started, in-flight work finishes, and the
//! error is returned.

use crossbeam_channel::{bounded, unbounded};
use glob::Pattern;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::core::constants;
use crate::core::processor::{ProcessOptions, ProcessingResult, Processor, Status};
use crate::error::{ConfigError, Error, Result};

/// Aggregated outcome of a batch run.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub rendered: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Stopped before every template was processed.
    pub cancelled: bool,
    /// Results in discovery order.
    pub results: Vec<ProcessingResult>,
}

impl BatchSummary {
    fn from_results(results: Vec<ProcessingResult>, cancelled: bool) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            rendered: count(Status::Rendered),
            skipped: count(Status::Skipped),
            failed: count(Status::Failed),
            cancelled,
            results,
        }
    }

    /// Failed results with their missing tokens.
    pub fn failures(&self) -> impl Iterator<Item = &ProcessingResult> {
        self.results.iter().filter(|r| r.is_failed())
    }

    pub fn exit_code(&self) -> i32 {
        exit_code(&self.results)
    }
}

/// Exit status for a set of results: 0 if nothing failed, 3 if any failure
/// needs a sign-in, 1 otherwise.
pub fn exit_code<'a>(results: impl IntoIterator<Item = &'a ProcessingResult>) -> i32 {
    let mut code = 0;
    for result in results {
        if result.needs_auth() {
            return 3;
        }
        if result.is_failed() {
            code = 1;
        }
    }
    code
}

/// Find template files under `roots`.
///
/// Symlinks are not followed and version-control metadata directories are
/// skipped; other dot-directories such as `.config` are searched. A file
/// qualifies when its name ends in one of `suffixes` and no `exclude` glob
/// matches its path (absolute, or relative to its root). Roots that are
/// files are taken as-is. The result is sorted and free of duplicates.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for an invalid glob.
pub fn discover(roots: &[PathBuf], suffixes: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let patterns = exclude
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| ConfigError::InvalidValue {
                field: "templates.exclude",
                reason: format!("{}: {}", p, e),
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let excluded = |root: &Path, path: &Path| {
        let relative = path.strip_prefix(root).unwrap_or(path);
        patterns
            .iter()
            .any(|p| p.matches_path(path) || p.matches_path(relative))
    };

    let mut found = Vec::new();
    for root in roots {
        if root.is_file() {
            found.push(root.clone());
            continue;
        }
        if !root.is_dir() {
            warn!(root = %root.display(), "template root does not exist, skipping");
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !(is_vcs_dir(entry) || excluded(root, entry.path()))
            });

        for entry in walker.filter_map(std::result::Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            let matches_suffix = suffixes
                .iter()
                .any(|s| name.len() > s.len() && name.ends_with(s.as_str()));
            if matches_suffix && !excluded(root, entry.path()) {
                found.push(entry.into_path());
            }
        }
    }

    found.sort();
    found.dedup();
    debug!(count = found.len(), "templates discovered");
    Ok(found)
}

fn is_vcs_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    constants::VCS_DIRS.contains(&name.as_ref())
}

/// Batch runner over one [`Processor`].
pub struct Batch<'a> {
    processor: &'a Processor,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl<'a> Batch<'a> {
    /// Runner with the configured worker count.
    pub fn new(processor: &'a Processor) -> Self {
        Self {
            processor,
            workers: processor.settings().templates.workers,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Share a cancel flag with the caller.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Discover templates under `roots` using the configured suffixes and
    /// exclusions.
    pub fn discover(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let templates = &self.processor.settings().templates;
        discover(roots, &templates.suffixes, &templates.exclude)
    }

    /// Discover and process every template under `roots`.
    pub fn run(&self, roots: &[PathBuf], options: &ProcessOptions) -> Result<BatchSummary> {
        let files = self.discover(roots)?;
        self.run_files(&files, options)
    }

    /// Process `files`, continuing past per-file failures.
    ///
    /// # Errors
    ///
    /// Returns the first environment-level error once in-flight work has
    /// finished.
    pub fn run_files(&self, files: &[PathBuf], options: &ProcessOptions) -> Result<BatchSummary> {
        let workers = self.workers.clamp(1, files.len().max(1));
        info!(templates = files.len(), workers, "batch started");

        let mut slots: Vec<Option<ProcessingResult>> = files.iter().map(|_| None).collect();
        let mut first_error: Option<Error> = None;

        if workers == 1 {
            for (index, path) in files.iter().enumerate() {
                if self.cancel.load(Ordering::SeqCst) {
                    break;
                }
                match self.processor.process(path, options) {
                    Ok(result) => slots[index] = Some(result),
                    Err(err) => {
                        self.cancel.store(true, Ordering::SeqCst);
                        first_error = Some(err);
                        break;
                    }
                }
            }
        } else {
            for (index, outcome) in self.run_pool(files, options, workers) {
                match outcome {
                    Ok(result) => slots[index] = Some(result),
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            warn!(error = %err, "batch aborted");
            return Err(err);
        }

        let cancelled = slots.iter().any(Option::is_none);
        let summary = BatchSummary::from_results(slots.into_iter().flatten().collect(), cancelled);
        info!(
            rendered = summary.rendered,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "batch finished"
        );
        Ok(summary)
    }

    /// Feed `files` through a bounded queue to `workers` scoped threads.
    fn run_pool(
        &self,
        files: &[PathBuf],
        options: &ProcessOptions,
        workers: usize,
    ) -> Vec<(usize, Result<ProcessingResult>)> {
        let (job_tx, job_rx) = bounded::<(usize, &Path)>(workers);
        let (done_tx, done_rx) = unbounded();

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for (index, path) in job_rx.iter() {
                        if self.cancel.load(Ordering::SeqCst) {
                            continue;
                        }
                        let outcome = self.processor.process(path, options);
                        if outcome.is_err() {
                            self.cancel.store(true, Ordering::SeqCst);
                        }
                        if done_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(done_tx);

            for (index, path) in files.iter().enumerate() {
                if self.cancel.load(Ordering::SeqCst) {
                    debug!(remaining = files.len() - index, "cancelled, not submitting more work");
                    break;
                }
                if job_tx.send((index, path.as_path())).is_err() {
                    break;
                }
            }
            drop(job_tx);
        });

        done_rx.iter().collect()
    }
}
