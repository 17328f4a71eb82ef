// Tests for encoder detection and memoization

mod common;

use anyhow::Result;
use common::StaticProbe;
use segment_recorder::{EncoderPreference, EncoderSelector};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_prefers_av1_over_other_tiers() {
    let probe = Arc::new(StaticProbe::with_encoders(&[
        "libx264",
        "libx265",
        "librav1e",
        "libaom-av1",
    ]));
    let selector = EncoderSelector::new(probe, EncoderPreference::default());

    assert_eq!(selector.best_encoder().await.as_deref(), Some("libaom-av1"));
}

#[tokio::test]
async fn test_only_h264_listed() {
    let probe = Arc::new(StaticProbe::with_encoders(&["libx264"]));
    let selector = EncoderSelector::new(probe, EncoderPreference::default());

    assert_eq!(selector.best_encoder().await.as_deref(), Some("libx264"));
}

#[tokio::test]
async fn test_probe_failure_selects_nothing_and_is_cached() {
    let probe = Arc::new(StaticProbe::failing());
    let selector = EncoderSelector::new(probe.clone(), EncoderPreference::default());

    assert_eq!(selector.best_encoder().await, None);
    assert_eq!(selector.best_encoder().await, None);
    assert_eq!(probe.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_probe() -> Result<()> {
    let probe =
        Arc::new(StaticProbe::with_encoders(&["libx265"]).delayed(Duration::from_millis(100)));
    let selector = Arc::new(EncoderSelector::new(probe.clone(), EncoderPreference::default()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let selector = Arc::clone(&selector);
            tokio::spawn(async move { selector.best_encoder().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await?.as_deref(), Some("libx265"));
    }
    assert_eq!(probe.calls(), 1, "Probe must run exactly once");

    Ok(())
}

#[tokio::test]
async fn test_reset_forces_new_probe() {
    let probe = Arc::new(StaticProbe::with_encoders(&["libx264"]));
    let mut selector = EncoderSelector::new(probe.clone(), EncoderPreference::default());

    selector.best_encoder().await;
    selector.best_encoder().await;
    assert_eq!(probe.calls(), 1);

    selector.reset();
    selector.best_encoder().await;
    assert_eq!(probe.calls(), 2);
}

#[tokio::test]
async fn test_custom_preference_order() {
    let probe = Arc::new(StaticProbe::with_encoders(&["libx264", "libx265"]));
    let preference = EncoderPreference::new(vec![vec!["libx264"], vec!["libx265"]]);
    let selector = EncoderSelector::new(probe, preference);

    assert_eq!(selector.best_encoder().await.as_deref(), Some("libx264"));
    assert_eq!(selector.preference().fallbacks("libx264"), vec!["libx265"]);
}
