//! SamplerOptions tests.
//!
//! FFmpeg-backed tests require fixture files from
//! `tests/fixtures/generate_fixtures.sh`.

use std::path::Path;

use storyboard_continuity::{
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SAMPLES, DEFAULT_TARGET_HEIGHT, FrameSampler,
    SamplerOptions,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

// ── Builder ──────────────────────────────────────────────────────

#[test]
fn config_defaults() {
    let options = SamplerOptions::new();
    assert_eq!(options.max_samples(), DEFAULT_MAX_SAMPLES);
    assert_eq!(options.target_height(), DEFAULT_TARGET_HEIGHT);
    assert_eq!(options.jpeg_quality(), DEFAULT_JPEG_QUALITY);
    assert_eq!(DEFAULT_MAX_SAMPLES, 250);
    assert_eq!(DEFAULT_TARGET_HEIGHT, 448);
    assert_eq!(DEFAULT_JPEG_QUALITY, 45);

    let debug = format!("{options:?}");
    assert!(debug.contains("SamplerOptions"));
    assert!(debug.contains("batch_size: 1"));
}

#[test]
fn config_clamps_zero_values() {
    let options = SamplerOptions::new()
        .with_max_samples(0)
        .with_target_height(0)
        .with_jpeg_quality(0)
        .with_batch_size(0);

    assert_eq!(options.max_samples(), 1);
    assert_eq!(options.target_height(), 1);
    assert_eq!(options.jpeg_quality(), 1);
    assert!(format!("{options:?}").contains("batch_size: 1"));
}

#[test]
fn config_clamps_quality_above_100() {
    assert_eq!(SamplerOptions::new().with_jpeg_quality(250).jpeg_quality(), 100);
}

// ── Output dimensions ────────────────────────────────────────────

#[test]
fn downscales_tall_sources_to_the_cap() {
    let options = SamplerOptions::new();
    assert_eq!(options.output_dimensions(1920, 1080), (796, 448));
    assert_eq!(options.output_dimensions(3840, 2160), (796, 448));
    assert_eq!(options.output_dimensions(1280, 720), (796, 448));
}

#[test]
fn never_upscales() {
    let options = SamplerOptions::new();
    assert_eq!(options.output_dimensions(640, 360), (640, 360));
    assert_eq!(options.output_dimensions(796, 448), (796, 448));
    assert_eq!(options.output_dimensions(16, 9), (16, 9));
}

#[test]
fn extreme_aspect_ratios_keep_a_visible_width() {
    let options = SamplerOptions::new();
    assert_eq!(options.output_dimensions(1, 4000), (1, 448));
    assert_eq!(options.output_dimensions(8000, 500), (7168, 448));
}

#[test]
fn custom_target_height() {
    let options = SamplerOptions::new().with_target_height(240);
    assert_eq!(options.output_dimensions(1920, 1080), (427, 240));
}

// ── FFmpeg-backed ────────────────────────────────────────────────

#[test]
fn custom_options_apply_to_real_video() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let options = SamplerOptions::new()
        .with_max_samples(6)
        .with_target_height(120);
    let batch = FrameSampler::new(options)
        .sample(path)
        .expect("Failed to sample fixture");

    assert_eq!(batch.len(), 6);
    assert!(batch.frames().iter().all(|frame| frame.height() == 120));
}
