//! Background compression of rolled log files.
//!
//! Each rotating handler owns at most one [`Archiver`]: a bounded queue
//! feeding a single named worker thread, so rolls of one handler are
//! compressed in the order they happened. The worker writes
//! `<archive>.zip.part` and renames it to `<archive>.zip` before removing
//! the plain copy. A failed attempt leaves the plain file in place and
//! removes the partial zip.
//!
//! Retention may expire an archive at any point. A queued archive is then
//! never picked up; one being compressed has its partial zip discarded
//! instead of published.
//!
//! Worker failures cannot be returned to anyone directly. They are logged
//! and parked until the owning handler collects them with
//! [`Archiver::take_failure`] or [`Archiver::close`].

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{LogError, Result};

/// Rolled files waiting for the worker before producers block.
const QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Default)]
struct Pending {
    /// Submitted and not yet picked up by the worker.
    queued: HashSet<PathBuf>,
    /// Being compressed right now.
    current: Option<PathBuf>,
    /// `current` was expired while being compressed.
    expired: bool,
}

/// State shared between the owning handler and the worker thread.
#[derive(Debug, Default)]
pub(crate) struct ArchiveQueue {
    pending: Mutex<Pending>,
    failures: Mutex<Vec<LogError>>,
}

impl ArchiveQueue {
    /// Withdraw `path` from compression ahead of its deletion.
    pub(crate) fn expire(&self, path: &Path) {
        let mut pending = self.pending.lock();
        if !pending.queued.remove(path) && pending.current.as_deref() == Some(path) {
            pending.expired = true;
        }
    }

    fn enqueue(&self, path: &Path) {
        self.pending.lock().queued.insert(path.to_path_buf());
    }

    /// Take `path` off the queue for compression. False when it expired.
    fn claim(&self, path: &Path) -> bool {
        let mut pending = self.pending.lock();
        if !pending.queued.remove(path) {
            return false;
        }
        pending.current = Some(path.to_path_buf());
        pending.expired = false;
        true
    }

    /// Finish the current archive: move `part` into place unless the
    /// archive expired meanwhile. Returns whether a zip was published.
    fn publish(&self, path: &Path, part: Option<PathBuf>) -> std::result::Result<bool, ZipError> {
        let mut pending = self.pending.lock();
        pending.current = None;
        let expired = std::mem::take(&mut pending.expired);
        let Some(part) = part else {
            return Ok(false);
        };
        if expired {
            drop(pending);
            remove_if_present(&part)?;
            return Ok(false);
        }
        if let Err(e) = fs::rename(&part, zip_path(path)) {
            let _ = fs::remove_file(&part);
            return Err(e.into());
        }
        drop(pending);
        remove_if_present(path)?;
        Ok(true)
    }

    fn release(&self) {
        let mut pending = self.pending.lock();
        pending.current = None;
        pending.expired = false;
    }
}

pub(crate) struct Archiver {
    sender: Option<SyncSender<PathBuf>>,
    worker: Option<JoinHandle<()>>,
    queue: Arc<ArchiveQueue>,
}

impl Archiver {
    /// Spawn the worker for the archives of `active`. `label` prefixes every
    /// zip entry name.
    pub(crate) fn spawn(label: &str, active: &Path) -> Result<Self> {
        let queue = Arc::new(ArchiveQueue::default());
        let (sender, receiver) = mpsc::sync_channel(QUEUE_CAPACITY);
        let worker_queue = Arc::clone(&queue);
        let entry_prefix = label.to_string();
        let worker = std::thread::Builder::new()
            .name(format!("nrt-archiver-{label}"))
            .spawn(move || run(receiver, &entry_prefix, &worker_queue))
            .map_err(|e| spawn_failed(active, e))?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            queue,
        })
    }

    pub(crate) fn queue(&self) -> &Arc<ArchiveQueue> {
        &self.queue
    }

    /// Hand `path` to the worker. Blocks only while the queue is full.
    pub(crate) fn submit(&self, path: PathBuf) -> Result<()> {
        let Some(sender) = &self.sender else {
            return Err(LogError::Internal("archiver used after close".into()));
        };
        self.queue.enqueue(&path);
        sender.send(path).map_err(|e| {
            self.queue.expire(&e.0);
            LogError::Internal(format!("archiver worker for '{}' is gone", e.0.display()))
        })
    }

    /// Oldest failure reported by the worker, if any.
    pub(crate) fn take_failure(&self) -> Option<LogError> {
        let mut failures = self.queue.failures.lock();
        if failures.is_empty() {
            None
        } else {
            Some(failures.remove(0))
        }
    }

    /// Drain the queue, join the worker and report the first failure.
    pub(crate) fn close(&mut self) -> Result<()> {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            return Err(LogError::Internal("archiver worker panicked".into()));
        }
        match self.take_failure() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Archiver {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("Archiver closed with error: {}", e);
        }
    }
}

/// Rolling `active` failed because its worker could not start.
fn spawn_failed(active: &Path, source: io::Error) -> LogError {
    log::error!("Cannot start archiver thread for {:?}: {}", active, source);
    LogError::io(active, source)
}

fn run(receiver: Receiver<PathBuf>, label: &str, queue: &ArchiveQueue) {
    for path in receiver {
        if !queue.claim(&path) {
            log::debug!("Skipped expired archive {:?}", path);
            continue;
        }
        let result = write_part(&path, label).and_then(|part| queue.publish(&path, part));
        match result {
            Ok(true) => log::debug!("Archived {:?}", path),
            Ok(false) => log::debug!("Dropped archive {:?} before publishing", path),
            Err(source) => {
                queue.release();
                log::error!("Failed to archive {:?}: {}", path, source);
                queue.failures.lock().push(LogError::Archive { path, source });
            }
        }
    }
}

/// Path of the zip written for the plain archive `path`.
pub(crate) fn zip_path(path: &Path) -> PathBuf {
    with_suffix(path, ".zip")
}

/// Path the zip for `path` is written to before it is published.
pub(crate) fn part_path(path: &Path) -> PathBuf {
    with_suffix(path, ".zip.part")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Compress `path` into `<path>.zip.part` with one entry named
/// `<label>_<file name>`. `None` when `path` is already gone.
fn write_part(path: &Path, label: &str) -> std::result::Result<Option<PathBuf>, ZipError> {
    let source = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Rolled log file {:?} vanished before compression", path);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let part = part_path(path);
    if let Err(e) = write_zip(source, &part, &format!("{label}_{file_name}")) {
        let _ = fs::remove_file(&part);
        return Err(e);
    }
    Ok(Some(part))
}

fn write_zip(mut source: File, target: &Path, entry: &str) -> std::result::Result<(), ZipError> {
    let mut zip = ZipWriter::new(File::create(target)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry, options)?;
    io::copy(&mut source, &mut zip)?;
    zip.finish()?;
    Ok(())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn rolled(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_published_zip_holds_single_entry() {
        let dir = TempDir::new().unwrap();
        let plain = rolled(&dir, "app.log.20260101-000000-000000", "- log: hello\n");
        let queue = ArchiveQueue::default();
        queue.enqueue(&plain);
        assert!(queue.claim(&plain));

        let part = write_part(&plain, "app").unwrap();
        assert!(queue.publish(&plain, part).unwrap());

        assert!(!plain.exists());
        assert!(!part_path(&plain).exists());
        let mut archive = ZipArchive::new(File::open(zip_path(&plain)).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "app_app.log.20260101-000000-000000");
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "- log: hello\n");
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("gone.log.1");
        assert!(write_part(&plain, "gone").unwrap().is_none());
        assert!(!part_path(&plain).exists());
    }

    #[test]
    fn test_expired_queued_archive_is_never_claimed() {
        let dir = TempDir::new().unwrap();
        let plain = rolled(&dir, "app.log.1", "x");
        let queue = ArchiveQueue::default();
        queue.enqueue(&plain);
        queue.expire(&plain);
        assert!(!queue.claim(&plain));
    }

    #[test]
    fn test_expired_current_archive_discards_its_zip() {
        let dir = TempDir::new().unwrap();
        let plain = rolled(&dir, "app.log.1", "- log: x\n");
        let queue = ArchiveQueue::default();
        queue.enqueue(&plain);
        assert!(queue.claim(&plain));
        let part = write_part(&plain, "app").unwrap();

        queue.expire(&plain);
        fs::remove_file(&plain).unwrap();
        assert!(!queue.publish(&plain, part).unwrap());

        assert!(!zip_path(&plain).exists());
        assert!(!part_path(&plain).exists());
    }

    #[test]
    fn test_spawn_failure_names_the_active_file() {
        let active = Path::new("logs/job.log");
        let err = spawn_failed(active, io::Error::other("no threads"));
        match err {
            LogError::Io { path, source } => {
                assert_eq!(path, active);
                assert_eq!(source.to_string(), "no threads");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_close_drains_queue() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("job.log");
        let mut archiver = Archiver::spawn("job", &active).unwrap();
        let mut paths = Vec::new();
        for i in 0..3 {
            let path = rolled(&dir, &format!("job.log.20260101-00000{i}-000000"), "- log: x\n");
            archiver.submit(path.clone()).unwrap();
            paths.push(path);
        }
        archiver.close().unwrap();
        for path in paths {
            assert!(!path.exists());
            assert!(zip_path(&path).exists());
        }
    }
}
