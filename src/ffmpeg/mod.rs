//! External encoder tool integration.

pub mod commands;
pub mod encoder;
pub mod runner;

pub use encoder::{EncoderPreference, EncoderProbe, EncoderSelector, FfmpegProbe};
pub use runner::{FfmpegRunner, ToolRunner};

/// Default tool name, resolved through `PATH`
pub const DEFAULT_FFMPEG: &str = "ffmpeg";
