use std::path::PathBuf;

/// Extension of converted segments
pub const CONVERTED_EXTENSION: &str = "mp4";

/// A closed, non-empty segment waiting to be converted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl ConversionJob {
    /// Destination keeps the source stem with the converted extension.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let destination = source.with_extension(CONVERTED_EXTENSION);
        Self {
            source,
            destination,
        }
    }
}

/// Terminal state of one conversion job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Destination written. `encoder` is `None` for a stream copy.
    Converted {
        source: PathBuf,
        destination: PathBuf,
        encoder: Option<String>,
        source_removed: bool,
    },
    /// Every attempt failed; the source was left in place.
    Failed { source: PathBuf, attempts: usize },
    /// Stopped by shutdown; the source was left in place.
    Cancelled { source: PathBuf },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Converted { .. })
    }

    pub fn source(&self) -> &PathBuf {
        match self {
            Self::Converted { source, .. }
            | Self::Failed { source, .. }
            | Self::Cancelled { source } => source,
        }
    }
}

/// Receives jobs for finished segments.
///
/// Implementations must not block; the job runs detached from the caller.
pub trait ConversionSubmitter: Send + Sync {
    fn submit(&self, job: ConversionJob);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_replaces_extension() {
        let job = ConversionJob::new("videos/alice_20240102_0.ts");
        assert_eq!(job.destination, PathBuf::from("videos/alice_20240102_0.mp4"));
    }

    #[test]
    fn test_destination_keeps_inner_dots() {
        let job = ConversionJob::new("v/a.b.ts");
        assert_eq!(job.destination, PathBuf::from("v/a.b.mp4"));
    }
}
