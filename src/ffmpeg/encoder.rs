use async_trait::async_trait;
use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::commands::probe_args;
use crate::error::ProbeError;

/// Ordered encoder tiers: AV1, then H.265, then H.264.
///
/// Tiers are tried top to bottom, identifiers within a tier left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderPreference {
    tiers: Vec<Vec<String>>,
}

impl Default for EncoderPreference {
    fn default() -> Self {
        Self::new(vec![
            vec!["libsvtav1", "libaom-av1", "librav1e"],
            vec!["libx265"],
            vec!["libx264"],
        ])
    }
}

impl EncoderPreference {
    pub fn new<S: Into<String>>(tiers: Vec<Vec<S>>) -> Self {
        Self {
            tiers: tiers
                .into_iter()
                .map(|tier| tier.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn tiers(&self) -> &[Vec<String>] {
        &self.tiers
    }

    /// Every identifier in priority order
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.tiers.iter().flatten().map(String::as_str)
    }

    /// Highest-priority identifier listed in `-encoders` output.
    pub fn select(&self, listing: &str) -> Option<String> {
        self.candidates()
            .find(|enc| listing.lines().any(|line| line.split_whitespace().any(|tok| tok == *enc)))
            .map(str::to_string)
    }

    /// Remaining identifiers to try after `tried` failed
    pub fn fallbacks(&self, tried: &str) -> Vec<String> {
        self.candidates()
            .filter(|enc| *enc != tried)
            .map(str::to_string)
            .collect()
    }
}

/// Source of the tool's encoder listing
#[async_trait]
pub trait EncoderProbe: Send + Sync {
    async fn list_encoders(&self) -> Result<String, ProbeError>;
}

/// Runs `ffmpeg -hide_banner -encoders`
pub struct FfmpegProbe {
    ffmpeg_path: OsString,
}

impl FfmpegProbe {
    pub fn new(ffmpeg_path: impl Into<OsString>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

#[async_trait]
impl EncoderProbe for FfmpegProbe {
    async fn list_encoders(&self) -> Result<String, ProbeError> {
        let output = Command::new(&self.ffmpeg_path)
            .args(probe_args())
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                status: output.status.to_string(),
            });
        }

        let mut listing = String::from_utf8_lossy(&output.stdout).to_string();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(listing)
    }
}

/// Picks the preferred encoder once and remembers it.
///
/// Concurrent first callers share a single probe.
pub struct EncoderSelector {
    probe: Arc<dyn EncoderProbe>,
    preference: EncoderPreference,
    selected: OnceCell<Option<String>>,
}

impl EncoderSelector {
    pub fn new(probe: Arc<dyn EncoderProbe>, preference: EncoderPreference) -> Self {
        Self {
            probe,
            preference,
            selected: OnceCell::new(),
        }
    }

    pub fn preference(&self) -> &EncoderPreference {
        &self.preference
    }

    /// Preferred encoder, or `None` to fall back to a stream copy.
    pub async fn best_encoder(&self) -> Option<String> {
        self.selected
            .get_or_init(|| async {
                match self.probe.list_encoders().await {
                    Ok(listing) => {
                        let selected = self.preference.select(&listing);
                        info!(encoder = ?selected, "detected video encoder");
                        selected
                    }
                    Err(e) => {
                        warn!(error = %e, "encoder probe failed; stream copy will be used");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// Forget the memoized result
    pub fn reset(&mut self) {
        self.selected.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "Encoders:\n V..... = Video\n ------\n\
         \x20V....D libx264              libx264 H.264 / AVC\n\
         \x20V....D libx265              libx265 H.265 / HEVC\n";

    #[test]
    fn test_select_highest_tier_present() {
        let pref = EncoderPreference::default();
        assert_eq!(pref.select(LISTING).as_deref(), Some("libx265"));
    }

    #[test]
    fn test_select_requires_whole_token() {
        let pref = EncoderPreference::default();
        assert_eq!(pref.select(" V....D libx264rgb    libx264 RGB"), Some("libx264".to_string()));
        assert_eq!(pref.select(" V....D libx264rgb    RGB"), None);
    }

    #[test]
    fn test_select_none_when_unknown() {
        let pref = EncoderPreference::default();
        assert_eq!(pref.select(" V....D mpeg4  MPEG-4 part 2"), None);
        assert_eq!(pref.select(""), None);
    }

    #[test]
    fn test_fallbacks_skip_tried_and_keep_order() {
        let pref = EncoderPreference::default();
        assert_eq!(
            pref.fallbacks("libx265"),
            vec!["libsvtav1", "libaom-av1", "librav1e", "libx264"]
        );
    }
}
