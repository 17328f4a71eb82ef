use async_trait::async_trait;
use std::ffi::OsString;

use crate::process::{CancelSignal, ProcessError, ProcessSupervisor};

/// Runs one invocation of the external tool to completion
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, args: &[String], cancel: &mut CancelSignal) -> Result<(), ProcessError>;
}

/// Runs ffmpeg under a [`ProcessSupervisor`]
pub struct FfmpegRunner {
    ffmpeg_path: OsString,
}

impl FfmpegRunner {
    pub fn new(ffmpeg_path: impl Into<OsString>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

#[async_trait]
impl ToolRunner for FfmpegRunner {
    async fn run(&self, args: &[String], cancel: &mut CancelSignal) -> Result<(), ProcessError> {
        let mut supervisor = ProcessSupervisor::new(self.ffmpeg_path.clone());
        supervisor.run(args, cancel).await
    }
}
