//! Sampling progress tests.

use std::sync::{Arc, Mutex};

use image::RgbImage;
use storyboard_continuity::{
    FrameSampler, FrameSource, ProgressCallback, ProgressInfo, SamplerOptions, StoryboardError,
    VideoMetadata,
};

struct FlatSource {
    metadata: VideoMetadata,
}

impl FlatSource {
    fn new(duration_seconds: f64) -> Self {
        Self {
            metadata: VideoMetadata {
                width: 32,
                height: 18,
                duration_seconds,
                frames_per_second: 25.0,
                codec: "flat".to_string(),
                format: "memory".to_string(),
            },
        }
    }
}

impl FrameSource for FlatSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn seek(&mut self, _seconds: f64) -> Result<(), StoryboardError> {
        Ok(())
    }

    fn render(&mut self, width: u32, height: u32) -> Result<RgbImage, StoryboardError> {
        Ok(RgbImage::new(width, height))
    }
}

#[derive(Default)]
struct Recorder {
    snapshots: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        self.snapshots.lock().unwrap().push(info.clone());
    }
}

#[test]
fn progress_callback_fires_per_frame_by_default() {
    let recorder = Arc::new(Recorder::default());
    let options = SamplerOptions::new()
        .with_max_samples(10)
        .with_progress(recorder.clone());
    FrameSampler::new(options)
        .sample_source(&mut FlatSource::new(20.0))
        .unwrap();

    let snapshots = recorder.snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 10);
    for (index, info) in snapshots.iter().enumerate() {
        assert_eq!(info.current, index as u64 + 1);
        assert_eq!(info.total, Some(10));
        assert_eq!(info.current_timestamp, Some(index as f64 * 2.0));
    }
    assert_eq!(snapshots.last().unwrap().percentage, Some(100.0));
    assert_eq!(
        snapshots.last().unwrap().estimated_remaining,
        Some(std::time::Duration::ZERO)
    );
}

#[test]
fn batch_size_limits_callbacks() {
    let recorder = Arc::new(Recorder::default());
    let options = SamplerOptions::new()
        .with_max_samples(25)
        .with_batch_size(10)
        .with_progress(recorder.clone());
    FrameSampler::new(options)
        .sample_source(&mut FlatSource::new(5.0))
        .unwrap();

    let snapshots = recorder.snapshots.lock().unwrap();
    let reported: Vec<u64> = snapshots.iter().map(|info| info.current).collect();
    // Two full batches plus the final partial one.
    assert_eq!(reported, vec![10, 20, 25]);
    assert_eq!(snapshots[2].current_timestamp, None);
}

#[test]
fn percentage_is_monotonic() {
    let recorder = Arc::new(Recorder::default());
    let options = SamplerOptions::new()
        .with_max_samples(40)
        .with_batch_size(3)
        .with_progress(recorder.clone());
    FrameSampler::new(options)
        .sample_source(&mut FlatSource::new(8.0))
        .unwrap();

    let percentages: Vec<f32> = recorder
        .snapshots
        .lock()
        .unwrap()
        .iter()
        .filter_map(|info| info.percentage)
        .collect();
    assert!(percentages.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percentages.last(), Some(&100.0));
}

#[test]
fn failed_run_reports_only_completed_frames() {
    struct FailingSource(FlatSource, u32);

    impl FrameSource for FailingSource {
        fn metadata(&self) -> &VideoMetadata {
            self.0.metadata()
        }

        fn seek(&mut self, seconds: f64) -> Result<(), StoryboardError> {
            if self.1 == 0 {
                return Err(StoryboardError::Decode("corrupt packet".to_string()));
            }
            self.1 -= 1;
            self.0.seek(seconds)
        }

        fn render(&mut self, width: u32, height: u32) -> Result<RgbImage, StoryboardError> {
            self.0.render(width, height)
        }
    }

    let recorder = Arc::new(Recorder::default());
    let options = SamplerOptions::new()
        .with_max_samples(10)
        .with_progress(recorder.clone());
    let result = FrameSampler::new(options).sample_source(&mut FailingSource(FlatSource::new(10.0), 4));

    assert!(result.is_err());
    let snapshots = recorder.snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 4);
    assert_eq!(snapshots.last().unwrap().current, 4);
}
