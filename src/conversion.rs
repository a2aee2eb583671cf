//! Internal conversion helpers.
//!
//! Pixel-plane copying and timestamp arithmetic shared by the decoder and the
//! sampler.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy an RGB24 plane out of an FFmpeg frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3), which
/// [`image::RgbImage::from_raw`] cannot accept.
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Convert seconds to a container-level seek target in AV_TIME_BASE
/// (microseconds).
///
/// `Input::seek` runs `avformat_seek_file` with `stream_index = -1`, which
/// expects AV_TIME_BASE units rather than the stream time base.
pub(crate) fn seconds_to_seek_timestamp(seconds: f64) -> i64 {
    (seconds.max(0.0) * 1_000_000.0) as i64
}

/// Rescale a PTS value from the stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Format seconds as an `mm:ss` label (minutes are not wrapped into hours).
pub(crate) fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
