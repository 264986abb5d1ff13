//! Output file handling.
//!
//! Rendered files hold plaintext secrets, so they are written through a
//! temp file in the destination directory and renamed into place with mode
//! 0600. Readers never see a partial file.

use chrono::{DateTime, Local};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::constants;
use crate::error::OutputError;

/// Symlink hops followed before writing in place.
const MAX_LINK_DEPTH: usize = 40;

/// Whether `bytes` looks like binary data: a NUL byte in the first
/// [`BINARY_SNIFF_LEN`](constants::BINARY_SNIFF_LEN) bytes, or invalid
/// UTF-8 anywhere.
pub fn is_binary(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(constants::BINARY_SNIFF_LEN)];
    head.contains(&0) || std::str::from_utf8(bytes).is_err()
}

/// Destination for a template: its path with the template suffix removed.
///
/// `config.yml.tpl` renders to `config.yml`. Returns `None` when the name
/// carries none of `suffixes` or nothing would remain.
pub fn output_path_for(template: &Path, suffixes: &[String]) -> Option<PathBuf> {
    let name = template.file_name()?.to_str()?;
    suffixes.iter().find_map(|suffix| {
        let stem = name.strip_suffix(suffix.as_str())?;
        (!stem.is_empty()).then(|| template.with_file_name(stem))
    })
}

/// Backup name for `path` taken at `at`: `<name>.bak.<YYYYmmddHHMMSS>`.
pub fn backup_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = format!("{}.bak.{}", name, at.format("%Y%m%d%H%M%S"));

    let mut candidate = path.with_file_name(&base);
    let mut n = 1;
    while candidate.exists() {
        candidate = path.with_file_name(format!("{}.{}", base, n));
        n += 1;
    }
    candidate
}

/// Copy an existing file aside before it is overwritten.
///
/// Returns the backup location, or `None` if there was nothing to back up.
pub fn backup(path: &Path) -> Result<Option<PathBuf>, OutputError> {
    if !path.is_file() {
        return Ok(None);
    }
    let target = backup_path(path, Local::now());
    fs::copy(path, &target).map_err(|source| OutputError::Backup {
        path: path.to_path_buf(),
        source,
    })?;
    set_private(&target).map_err(|source| OutputError::Backup {
        path: target.clone(),
        source,
    })?;
    debug!(from = %path.display(), to = %target.display(), "backup written");
    Ok(Some(target))
}

/// Atomically replace `path` with `content`, mode 0600.
///
/// Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), OutputError> {
    let err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    // Write through symlinks so a linked dotfile stays linked.
    let target = link_target(path);
    let path = target.as_path();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(err)?;
    tmp.write_all(content).map_err(err)?;
    tmp.as_file().sync_all().map_err(err)?;
    set_private(tmp.path()).map_err(err)?;
    tmp.persist(path).map_err(|e| err(e.error))?;
    Ok(())
}

/// Follow `path` through any chain of symlinks to the file a write should
/// replace. The final target need not exist yet.
fn link_target(path: &Path) -> PathBuf {
    let mut target = path.to_path_buf();
    for _ in 0..MAX_LINK_DEPTH {
        match fs::read_link(&target) {
            Ok(link) => {
                target = match target.parent() {
                    Some(parent) => parent.join(link),
                    None => link,
                };
            }
            Err(_) => break,
        }
    }
    target
}

/// Whether `path` already holds exactly `content`.
pub fn matches_existing(path: &Path, content: &str) -> bool {
    fs::read(path).is_ok_and(|existing| existing == content.as_bytes())
}

fn set_private(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
