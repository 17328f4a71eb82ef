// Test doubles for the probe, runner and submitter seams.
#![allow(dead_code)]

use async_trait::async_trait;
use segment_recorder::ffmpeg::commands::video_encoder;
use segment_recorder::{
    CancelSignal, ConversionJob, ConversionSubmitter, EncoderProbe, ProbeError, ProcessError,
    ToolRunner,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// ffmpeg-style encoder listing containing the given identifiers
pub fn listing(encoders: &[&str]) -> String {
    let mut out = String::from("Encoders:\n V..... = Video\n ------\n");
    for enc in encoders {
        out.push_str(&format!(" V....D {:<20} {} encoder\n", enc, enc));
    }
    out
}

/// Probe returning a fixed listing (or failing), counting calls
pub struct StaticProbe {
    listing: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticProbe {
    pub fn with_encoders(encoders: &[&str]) -> Self {
        Self {
            listing: Some(listing(encoders)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            listing: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EncoderProbe for StaticProbe {
    async fn list_encoders(&self) -> Result<String, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.listing.clone().ok_or(ProbeError::Failed {
            status: "exit status: 1".to_string(),
        })
    }
}

/// Runner that "converts" by writing the destination, failing for chosen
/// encoders (`"copy"` names the stream-copy invocation).
pub struct MockRunner {
    failing: HashSet<String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockRunner {
    pub fn succeeding() -> Self {
        Self::failing(&[])
    }

    pub fn failing(encoders: &[&str]) -> Self {
        Self {
            failing: encoders.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Encoder label of each invocation, in order
    pub fn attempted(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|args| video_encoder(args).unwrap_or("copy").to_string())
            .collect()
    }
}

#[async_trait]
impl ToolRunner for MockRunner {
    async fn run(&self, args: &[String], _cancel: &mut CancelSignal) -> Result<(), ProcessError> {
        self.calls.lock().unwrap().push(args.to_vec());

        let label = video_encoder(args).unwrap_or("copy").to_string();
        let destination = Path::new(args.last().expect("destination argument"));

        if self.failing.contains(&label) {
            std::fs::write(destination, b"partial").map_err(ProcessError::Wait)?;
            return Err(ProcessError::Exited {
                status: "exit status: 1".to_string(),
                stderr: format!("Unknown encoder '{}'", label),
            });
        }

        std::fs::write(destination, format!("converted by {}", label)).map_err(ProcessError::Wait)?;
        Ok(())
    }
}

/// Runner that never finishes on its own
pub struct BlockingRunner;

#[async_trait]
impl ToolRunner for BlockingRunner {
    async fn run(&self, _args: &[String], cancel: &mut CancelSignal) -> Result<(), ProcessError> {
        cancel.cancelled().await;
        Err(ProcessError::Cancelled)
    }
}

/// Submitter that just records jobs
#[derive(Default)]
pub struct CollectingSubmitter {
    jobs: Mutex<Vec<ConversionJob>>,
}

impl CollectingSubmitter {
    pub fn jobs(&self) -> Vec<ConversionJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl ConversionSubmitter for CollectingSubmitter {
    fn submit(&self, job: ConversionJob) {
        self.jobs.lock().unwrap().push(job);
    }
}
