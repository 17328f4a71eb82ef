use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::job::{ConversionJob, ConversionOutcome};
use crate::error::ConversionError;
use crate::ffmpeg::commands::{copy_args, reencode_args};
use crate::ffmpeg::{EncoderSelector, ToolRunner};
use crate::process::{CancelSignal, ProcessError};

/// Converts finished segments, falling back through the encoder tiers.
pub struct ConversionPipeline {
    selector: Arc<EncoderSelector>,
    runner: Arc<dyn ToolRunner>,
}

impl ConversionPipeline {
    pub fn new(selector: Arc<EncoderSelector>, runner: Arc<dyn ToolRunner>) -> Self {
        Self { selector, runner }
    }

    /// Run `job` to a terminal outcome.
    ///
    /// On success the source is removed; otherwise it is left untouched and
    /// any partial destination is removed.
    pub async fn run(&self, job: &ConversionJob, mut cancel: CancelSignal) -> ConversionOutcome {
        let source = job.source.clone();

        match tokio::fs::metadata(&job.source).await {
            Ok(meta) if meta.len() > 0 => {}
            Ok(_) => {
                warn!(source = %source.display(), "skipping conversion of empty segment");
                return ConversionOutcome::Failed { source, attempts: 0 };
            }
            Err(e) => {
                warn!(
                    source = %source.display(),
                    error = %e,
                    "skipping conversion of unreadable segment"
                );
                return ConversionOutcome::Failed { source, attempts: 0 };
            }
        }

        info!(
            source = %source.display(),
            destination = %job.destination.display(),
            "converting segment"
        );

        let result = match self.selector.best_encoder().await {
            Some(encoder) => {
                info!(encoder = %encoder, "using video encoder");
                self.reencode_with_fallback(job, &encoder, &mut cancel).await.map(Some)
            }
            None => {
                info!("no preferred encoder found; falling back to stream copy");
                self.attempt(job, None, &mut cancel).await.map(|()| None)
            }
        };

        match result {
            Ok(encoder) => self.finish(job, encoder).await,
            Err(err) => {
                self.discard_destination(job).await;
                match err {
                    ConversionError::Cancelled => {
                        warn!(source = %source.display(), "conversion cancelled; segment kept");
                        ConversionOutcome::Cancelled { source }
                    }
                    ConversionError::Exhausted { attempts } => {
                        error!(
                            source = %source.display(),
                            attempts,
                            "conversion failed with every encoder; segment kept"
                        );
                        ConversionOutcome::Failed { source, attempts }
                    }
                    other => {
                        error!(
                            source = %source.display(),
                            stderr = other.stderr(),
                            "conversion failed: {}",
                            other
                        );
                        ConversionOutcome::Failed { source, attempts: 1 }
                    }
                }
            }
        }
    }

    async fn reencode_with_fallback(
        &self,
        job: &ConversionJob,
        encoder: &str,
        cancel: &mut CancelSignal,
    ) -> Result<String, ConversionError> {
        match self.attempt(job, Some(encoder), cancel).await {
            Ok(()) => return Ok(encoder.to_string()),
            Err(ConversionError::Cancelled) => return Err(ConversionError::Cancelled),
            Err(e) => {
                error!(encoder = %encoder, stderr = e.stderr(), "conversion attempt failed: {}", e);
            }
        }

        let mut attempts = 1;
        for fallback in self.selector.preference().fallbacks(encoder) {
            attempts += 1;
            match self.attempt(job, Some(fallback.as_str()), cancel).await {
                Ok(()) => {
                    info!(encoder = %fallback, "converted using fallback encoder");
                    return Ok(fallback);
                }
                Err(ConversionError::Cancelled) => return Err(ConversionError::Cancelled),
                Err(e) => {
                    error!(
                        encoder = %fallback,
                        stderr = e.stderr(),
                        "fallback attempt failed: {}",
                        e
                    );
                }
            }
        }

        Err(ConversionError::Exhausted { attempts })
    }

    /// One tool invocation; `None` means stream copy.
    async fn attempt(
        &self,
        job: &ConversionJob,
        encoder: Option<&str>,
        cancel: &mut CancelSignal,
    ) -> Result<(), ConversionError> {
        let args = match encoder {
            Some(enc) => reencode_args(&job.source, &job.destination, enc),
            None => copy_args(&job.source, &job.destination),
        };

        self.runner.run(&args, cancel).await.map_err(|e| match e {
            ProcessError::Cancelled => ConversionError::Cancelled,
            ProcessError::Spawn(io) => ConversionError::Spawn(io),
            ProcessError::Exited { status, stderr } => ConversionError::Attempt {
                encoder: encoder.unwrap_or("copy").to_string(),
                status,
                stderr,
            },
            other => ConversionError::Attempt {
                encoder: encoder.unwrap_or("copy").to_string(),
                status: other.to_string(),
                stderr: String::new(),
            },
        })
    }

    async fn finish(&self, job: &ConversionJob, encoder: Option<String>) -> ConversionOutcome {
        let source_removed = match tokio::fs::remove_file(&job.source).await {
            Ok(()) => true,
            Err(source) => {
                let err = ConversionError::Cleanup {
                    path: job.source.clone(),
                    source,
                };
                error!(source = %job.source.display(), "{}", err);
                false
            }
        };

        info!(
            destination = %job.destination.display(),
            encoder = encoder.as_deref().unwrap_or("copy"),
            "converted segment"
        );

        ConversionOutcome::Converted {
            source: job.source.clone(),
            destination: job.destination.clone(),
            encoder,
            source_removed,
        }
    }

    async fn discard_destination(&self, job: &ConversionJob) {
        match tokio::fs::remove_file(&job.destination).await {
            Ok(()) => info!(
                destination = %job.destination.display(),
                "removed partial conversion output"
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                destination = %job.destination.display(),
                error = %e,
                "failed to remove partial conversion output"
            ),
        }
    }
}
