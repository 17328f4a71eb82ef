use chrono::{Local, NaiveDateTime};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::pattern::{generate_filename, NameFields};
use super::policy::RotationPolicy;
use crate::conversion::{ConversionJob, ConversionSubmitter};
use crate::error::RecorderError;

/// Suffix appended to every generated segment name
pub const SEGMENT_EXTENSION: &str = "ts";

/// Segment recorder configuration
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Account identifier used by the `{account}` placeholder
    pub account: String,
    /// Filename pattern, without the segment suffix
    pub pattern: String,
    /// Rotation thresholds
    pub policy: RotationPolicy,
    /// First sequence number handed to the pattern
    pub initial_sequence: u64,
    /// Submit finished segments for conversion
    pub convert: bool,
}

impl SegmentConfig {
    pub fn new(account: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            pattern: pattern.into(),
            policy: RotationPolicy::unlimited(),
            initial_sequence: 0,
            convert: false,
        }
    }
}

/// A slice of the incoming stream
#[derive(Debug, Clone)]
pub struct StreamChunk {
    /// Raw stream bytes
    pub bytes: Vec<u8>,
    /// Media time covered by these bytes, in seconds
    pub duration_secs: f64,
}

struct ActiveSegment {
    writer: BufWriter<File>,
    path: PathBuf,
}

/// Writes the stream into rotating segment files.
///
/// Rotation calls are synchronous and must be driven by a single caller per
/// session. Finished, non-empty segments are handed to the configured
/// [`ConversionSubmitter`] without waiting for the conversion.
pub struct SegmentRecorder {
    config: SegmentConfig,
    submitter: Option<Arc<dyn ConversionSubmitter>>,
    started_at: Option<NaiveDateTime>,
    sequence: u64,
    active: Option<ActiveSegment>,
    filesize: u64,
    duration: f64,
}

impl SegmentRecorder {
    pub fn new(config: SegmentConfig) -> Self {
        Self {
            sequence: config.initial_sequence,
            config,
            submitter: None,
            started_at: None,
            active: None,
            filesize: 0,
            duration: 0.0,
        }
    }

    /// Attach the sink that receives conversion jobs
    pub fn with_submitter(mut self, submitter: Arc<dyn ConversionSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    /// Fix the session start instant used for date placeholders
    pub fn with_started_at(mut self, started_at: NaiveDateTime) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn filesize(&self) -> u64 {
        self.filesize
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn started_at(&self) -> Option<NaiveDateTime> {
        self.started_at
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Path of the segment currently being written
    pub fn current_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|s| s.path.as_path())
    }

    fn conversion_enabled(&self) -> bool {
        self.config.convert && self.submitter.is_some()
    }

    /// Whether either rotation threshold has been reached
    pub fn should_rotate(&self) -> bool {
        self.config.policy.should_rotate(self.filesize, self.duration)
    }

    /// Close the current segment (if any) and open the next one.
    ///
    /// Returns the path of the closed segment when it was kept on disk.
    pub fn rotate(&mut self) -> Result<Option<PathBuf>, RecorderError> {
        let finished = self.close()?;

        let started_at = *self
            .started_at
            .get_or_insert_with(|| Local::now().naive_local());
        let filename = generate_filename(
            &self.config.pattern,
            &NameFields {
                account: &self.config.account,
                started_at,
                sequence: self.sequence,
            },
        )?;

        self.open(&filename)?;
        self.sequence += 1;

        Ok(finished)
    }

    /// Flush and close the current segment.
    ///
    /// A no-op when nothing is open. Empty segments are deleted; non-empty
    /// ones are submitted for conversion when enabled and returned.
    pub fn close(&mut self) -> Result<Option<PathBuf>, RecorderError> {
        let Some(ActiveSegment { writer, path }) = self.active.take() else {
            return Ok(None);
        };
        self.filesize = 0;
        self.duration = 0.0;

        let file = writer
            .into_inner()
            .map_err(|e| RecorderError::fs("flush", &path, e.into_error()))?;
        file.sync_all()
            .map_err(|e| RecorderError::fs("sync", &path, e))?;
        drop(file);

        let size = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Segment vanished before close: {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(RecorderError::fs("stat", &path, e)),
        };

        if size == 0 {
            fs::remove_file(&path)
                .map_err(|e| RecorderError::fs("remove empty segment", &path, e))?;
            debug!("Removed empty segment {}", path.display());
            return Ok(None);
        }

        info!("Segment complete: {} ({} bytes)", path.display(), size);

        if self.conversion_enabled() {
            if let Some(submitter) = &self.submitter {
                submitter.submit(ConversionJob::new(path.clone()));
            }
        }

        Ok(Some(path))
    }

    /// Open `filename` plus the segment suffix in append mode.
    ///
    /// Any segment still open is closed first.
    pub fn open(&mut self, filename: &str) -> Result<(), RecorderError> {
        self.close()?;

        let base = Path::new(filename);
        if let Some(dir) = base.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| RecorderError::fs("create directory", dir, e))?;
        }

        let path = PathBuf::from(format!("{}.{}", filename, SEGMENT_EXTENSION));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| RecorderError::fs("open", &path, e))?;

        info!("Recording to {}", path.display());

        self.active = Some(ActiveSegment {
            writer: BufWriter::new(file),
            path,
        });
        Ok(())
    }

    /// Append bytes to the current segment
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), RecorderError> {
        let segment = self.active.as_mut().ok_or(RecorderError::NoActiveSegment)?;
        segment
            .writer
            .write_all(bytes)
            .map_err(|e| RecorderError::fs("write", &segment.path, e))?;
        self.filesize += bytes.len() as u64;
        Ok(())
    }

    /// Account for media time written to the current segment
    pub fn add_duration(&mut self, secs: f64) {
        self.duration += secs;
    }

    /// Drive the recorder from a stream of chunks until the sender closes.
    ///
    /// Returns the segments that were kept on disk, in order.
    pub async fn record(
        &mut self,
        mut rx: mpsc::Receiver<StreamChunk>,
    ) -> Result<Vec<PathBuf>, RecorderError> {
        let mut finished = Vec::new();

        info!("Starting segmented recording for {}", self.config.account);

        while let Some(chunk) = rx.recv().await {
            if !self.is_open() || self.should_rotate() {
                finished.extend(self.rotate()?);
            }

            self.write(&chunk.bytes)?;
            self.add_duration(chunk.duration_secs);
        }

        finished.extend(self.close()?);

        info!("Segmented recording complete: {} segments kept", finished.len());

        Ok(finished)
    }
}

impl Drop for SegmentRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close segment on drop: {}", e);
        }
    }
}
