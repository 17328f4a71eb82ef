/// Size/duration thresholds that trigger a rotation.
///
/// A zero limit disables that check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Maximum segment size in bytes
    pub max_filesize_bytes: u64,
    /// Maximum segment duration in seconds
    pub max_duration_secs: u64,
}

impl RotationPolicy {
    /// Build a policy from the configured units (megabytes and minutes).
    pub fn from_limits(max_filesize_mb: u64, max_duration_min: u64) -> Self {
        Self {
            max_filesize_bytes: max_filesize_mb.saturating_mul(1024 * 1024),
            max_duration_secs: max_duration_min.saturating_mul(60),
        }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Inclusive on both limits.
    pub fn should_rotate(&self, filesize: u64, duration_secs: f64) -> bool {
        (self.max_duration_secs > 0 && duration_secs >= self.max_duration_secs as f64)
            || (self.max_filesize_bytes > 0 && filesize >= self.max_filesize_bytes)
    }
}
