//! Background conversion of finished segments.

mod dispatcher;
mod job;
mod pipeline;

pub use dispatcher::ConversionDispatcher;
pub use job::{ConversionJob, ConversionOutcome, ConversionSubmitter, CONVERTED_EXTENSION};
pub use pipeline::ConversionPipeline;
