pub mod config;
pub mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod process;
pub mod recording;

pub use config::Config;
pub use conversion::{
    ConversionDispatcher, ConversionJob, ConversionOutcome, ConversionPipeline, ConversionSubmitter,
};
pub use error::{ConversionError, ProbeError, RecorderError, TemplateError};
pub use ffmpeg::{
    EncoderPreference, EncoderProbe, EncoderSelector, FfmpegProbe, FfmpegRunner, ToolRunner,
};
pub use process::{CancelHandle, CancelSignal, ProcessError, ProcessSupervisor};
pub use recording::{RotationPolicy, SegmentConfig, SegmentRecorder, StreamChunk};
