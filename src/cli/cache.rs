//! Cache commands: warm, clear, status.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::{output, Globals};
use crate::core::batch::Batch;
use crate::core::cache::{CacheManager, CacheStatus, FileStore};
use crate::core::processor::Processor;
use crate::core::reference::Lookup;
use crate::error::{ConfigError, Result};

/// Resolve every secret the templates under `paths` reference.
pub fn warm(globals: &Globals, paths: Vec<PathBuf>, vault: Option<String>) -> Result<i32> {
    let processor = globals.processor()?;
    if !processor.cache().is_enabled() {
        output::warn("cache is disabled; nothing to warm");
        return Ok(0);
    }

    let roots = if paths.is_empty() {
        processor.settings().templates.roots.clone()
    } else {
        paths
    };
    if roots.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "templates.roots",
            reason: "no template roots configured; pass a path or set templates.roots".to_string(),
        }
        .into());
    }

    let options = globals.options(None, vault);
    let mut files = Vec::new();
    for root in &roots {
        if root.is_dir() {
            files.extend(Batch::new(&processor).discover(std::slice::from_ref(root))?);
        } else {
            files.push(root.clone());
        }
    }

    let lookups = collect_lookups(&processor, &files, &options.defaults);
    let report = processor
        .cache()
        .warm(&lookups, |lookup| processor.resolve_uncached(lookup))?;

    output::success(&format!(
        "warmed {} secret(s) from {} template(s)",
        report.resolved + report.cached,
        files.len()
    ));
    output::kv("resolved:", report.resolved);
    output::kv("cached:  ", report.cached);
    if report.failed.is_empty() {
        return Ok(0);
    }

    output::warn(&format!("{} secret(s) could not be resolved", report.failed.len()));
    for (reference, reason) in &report.failed {
        eprintln!("  • {}: {}", output::key(reference), reason);
    }
    Ok(1)
}

fn collect_lookups(
    processor: &Processor,
    files: &[PathBuf],
    defaults: &crate::core::reference::ReferenceDefaults,
) -> Vec<Lookup> {
    let mut seen = std::collections::HashSet::new();
    let mut lookups = Vec::new();
    for path in files {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unreadable template");
                continue;
            }
        };
        let template = processor.parse(path, content, None);
        for lookup in processor.lookups(&template, defaults) {
            if seen.insert(lookup.key().to_string()) {
                lookups.push(lookup);
            }
        }
    }
    lookups
}

/// Delete every cached entry.
pub fn clear(globals: &Globals) -> Result<i32> {
    let settings = globals.settings()?;
    let dir = settings.cache_dir()?;
    if !dir.exists() {
        output::dimmed("cache is already empty");
        return Ok(0);
    }

    let removed = CacheManager::new(FileStore::open(&dir)?).clear()?;
    output::success(&format!("removed {} cached secret(s)", removed));
    Ok(0)
}

#[derive(Serialize)]
struct StatusView {
    dir: PathBuf,
    ttl_secs: u64,
    #[serde(flatten)]
    counts: CacheStatus,
}

/// Show where the cache lives and how many entries are live.
pub fn status(globals: &Globals, json: bool) -> Result<i32> {
    let settings = globals.settings()?;
    let dir = settings.cache_dir()?;
    let ttl_secs = settings.cache.ttl_secs;

    let mut counts = if dir.exists() {
        CacheManager::new(FileStore::open(&dir)?)
            .with_ttl(ttl_secs)
            .status()?
    } else {
        CacheStatus::default()
    };
    counts.enabled = settings.cache.enabled;

    let view = StatusView {
        dir,
        ttl_secs,
        counts,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(0);
    }

    output::header("Cache");
    output::kv("dir:    ", output::path(view.dir.display()));
    output::kv("enabled:", view.counts.enabled);
    output::kv("ttl:    ", format!("{}s", view.ttl_secs));
    output::kv("live:   ", view.counts.live);
    output::kv("purged: ", view.counts.purged);
    Ok(0)
}
