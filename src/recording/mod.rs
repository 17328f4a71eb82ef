pub mod pattern;
pub mod policy;
pub mod segment;

pub use pattern::{generate_filename, NameFields, NamePattern};
pub use policy::RotationPolicy;
pub use segment::{SegmentConfig, SegmentRecorder, StreamChunk, SEGMENT_EXTENSION};
