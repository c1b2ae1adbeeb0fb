//! Size-rotating file sink.
//!
//! The active file stays open between writes. Once the bytes written to it
//! pass `max_bytes`, the handler rolls it: the active file is renamed into
//! the archive set, a fresh one is started, and the archive is either
//! deleted (`max_archive_files == 0`), handed to the background
//! [`Archiver`], or kept as is. Retention runs after every roll.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use nrt_logging_config::RotationPolicy;

use super::archiver::Archiver;
use super::retention::Retention;
use crate::error::{LogError, Result};

pub(crate) struct RotatingFile {
    path: PathBuf,
    policy: RotationPolicy,
    retention: Retention,
    /// Zip entry prefix for compressed archives.
    label: String,
    file: Option<File>,
    /// Bytes in the active file, including what was there when opened.
    written: u64,
    archiver: Option<Archiver>,
}

impl RotatingFile {
    pub(crate) fn new(path: impl Into<PathBuf>, policy: RotationPolicy, label: impl Into<String>) -> Self {
        let path = path.into();
        let retention = Retention::new(&path, policy.max_archive_files);
        Self {
            path,
            policy,
            retention,
            label: label.into(),
            file: None,
            written: 0,
            archiver: None,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Takes effect for archivers started after the call.
    pub(crate) fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Surface a failure the archiver hit since the last call.
    pub(crate) fn check_background(&self) -> Result<()> {
        match self.archiver.as_ref().and_then(Archiver::take_failure) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub(crate) fn write(&mut self, text: &str) -> Result<()> {
        let result = {
            let file = self.open()?;
            file.write_all(text.as_bytes()).and_then(|()| file.flush())
        };
        result.map_err(|e| LogError::io(&self.path, e))?;
        self.written += text.len() as u64;
        Ok(())
    }

    pub(crate) fn should_roll(&self) -> bool {
        self.written > self.policy.max_bytes
    }

    /// Move the active file into the archive set and start a fresh one.
    pub(crate) fn roll(&mut self) -> Result<()> {
        drop(self.file.take());
        let archive = self.retention.next_archive_path();
        fs::rename(&self.path, &archive).map_err(|e| LogError::io(&self.path, e))?;
        self.written = 0;
        self.open()?;
        log::debug!("Rolled {:?} into {:?}", self.path, archive);

        if self.policy.max_archive_files == 0 {
            return fs::remove_file(&archive).map_err(|e| LogError::io(&archive, e));
        }
        if self.policy.compress {
            self.archiver()?.submit(archive)?;
        }
        match &self.archiver {
            Some(archiver) => {
                let queue = archiver.queue();
                self.retention.prune(|p| queue.expire(p))
            }
            None => self.retention.prune(|_| {}),
        }
    }

    /// Release the active file and drain pending compression.
    pub(crate) fn close(&mut self) -> Result<()> {
        drop(self.file.take());
        match self.archiver.take() {
            Some(mut archiver) => archiver.close(),
            None => Ok(()),
        }
    }

    fn open(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| LogError::io(&self.path, e))?;
            self.written = file.metadata().map_err(|e| LogError::io(&self.path, e))?.len();
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| LogError::Internal("rotating file failed to open".into()))
    }

    fn archiver(&mut self) -> Result<&Archiver> {
        if self.archiver.is_none() {
            self.archiver = Some(Archiver::spawn(&self.label, &self.path)?);
        }
        self.archiver
            .as_ref()
            .ok_or_else(|| LogError::Internal("archiver failed to start".into()))
    }
}
