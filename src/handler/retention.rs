//! Archive naming and retention for rotating files.
//!
//! A file `app.log` rolls into `app.log.<YYYYmmdd-HHMMSS-micros>`, with a
//! `-<n>` suffix when that name is taken. Stamps are UTC, so names sort
//! lexically in roll order. The plain and the `.zip` form of one archive
//! count as a single archive.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use super::archiver::{part_path, zip_path};
use crate::error::{LogError, Result};

static ARCHIVE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{8}-\d{6}-\d{6}(-\d+)?(\.zip)?$")
        .expect("archive suffix regex is a compile-time constant and must be valid")
});

/// Which files count as archives of one active file, and how many to keep.
#[derive(Debug)]
pub(crate) struct Retention {
    dir: PathBuf,
    prefix: String,
    max_archive_files: usize,
}

impl Retention {
    pub(crate) fn new(active: &Path, max_archive_files: usize) -> Self {
        let dir = match active.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefix = active
            .file_name()
            .map(|n| format!("{}.", n.to_string_lossy()))
            .unwrap_or_default();
        Self {
            dir,
            prefix,
            max_archive_files,
        }
    }

    /// Fresh archive path for a roll happening now.
    pub(crate) fn next_archive_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S-%6f").to_string();
        let base = format!("{}{}", self.prefix, stamp);
        let taken = |name: &str| {
            let path = self.dir.join(name);
            path.exists() || zip_path(&path).exists() || part_path(&path).exists()
        };
        if !taken(&base) {
            return self.dir.join(base);
        }
        let mut n = 1;
        while taken(&format!("{base}-{n}")) {
            n += 1;
        }
        self.dir.join(format!("{base}-{n}"))
    }

    /// Archive base names currently on disk, oldest first.
    pub(crate) fn archives(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogError::io(&self.dir, e)),
        };
        let mut bases = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| LogError::io(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(suffix) = name.strip_prefix(&self.prefix) else {
                continue;
            };
            if ARCHIVE_SUFFIX.is_match(suffix) {
                let base = name.strip_suffix(".zip").unwrap_or(&name);
                bases.insert(base.to_string());
            }
        }
        Ok(bases.into_iter().collect())
    }

    /// Delete the oldest archives until at most `max_archive_files` remain.
    /// `expire` runs for each archive right before it is deleted.
    pub(crate) fn prune(&self, expire: impl Fn(&Path)) -> Result<()> {
        let archives = self.archives()?;
        let excess = archives.len().saturating_sub(self.max_archive_files);
        for base in archives.into_iter().take(excess) {
            let plain = self.dir.join(&base);
            expire(&plain);
            remove_if_present(&plain)?;
            remove_if_present(&zip_path(&plain))?;
            log::debug!("Removed expired log archive {:?}", plain);
        }
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LogError::io(path, e)),
    }
}
