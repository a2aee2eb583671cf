//! Segment coverage checks.
//!
//! The provider is asked to return segments that tile the whole video with
//! no gaps. Nothing in the pipeline depends on that holding, so this module
//! only reports: [`check_coverage`] walks the segments in order and collects
//! gaps, overlaps and timestamps it could not read into a
//! [`CoverageReport`]. Unreadable timestamps are data-quality warnings, never
//! errors.
//!
//! # Example
//!
//! ```
//! use storyboard_continuity::parse_timestamp;
//!
//! assert_eq!(parse_timestamp("01:05"), Some(65.0));
//! assert_eq!(parse_timestamp("1:02:03.5"), Some(3723.5));
//! assert_eq!(parse_timestamp("soon"), None);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::analysis::VideoSegment;

/// Slack, in seconds, allowed between adjacent segments and at the end of
/// the video. `mm:ss` labels cannot be more precise than this.
pub const COVERAGE_TOLERANCE: f64 = 1.0;

/// Parse a display timestamp into seconds.
///
/// Accepts `ss`, `mm:ss` and `hh:mm:ss`, each with an optional fractional
/// seconds part. Returns `None` for anything else, including negative or
/// out-of-range components.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds_str) = match parts.as_slice() {
        [seconds] => (0_u64, 0_u64, *seconds),
        [minutes, seconds] => (0, minutes.trim().parse::<u64>().ok()?, *seconds),
        [hours, minutes, seconds] => {
            let minutes = minutes.trim().parse::<u64>().ok()?;
            if minutes >= 60 {
                return None;
            }
            (hours.trim().parse::<u64>().ok()?, minutes, *seconds)
        }
        _ => return None,
    };

    let seconds = seconds_str.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 || (parts.len() > 1 && seconds >= 60.0) {
        return None;
    }

    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// An uncovered stretch of the video, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageGap {
    /// Where the uncovered stretch starts.
    pub start: f64,
    /// Where it ends.
    pub end: f64,
}

/// Result of checking a segment list against the video duration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageReport {
    /// Uncovered stretches, in order.
    pub gaps: Vec<CoverageGap>,
    /// Indices of segments that start before the previous one ended.
    pub overlaps: Vec<usize>,
    /// Indices of segments that start before the previous segment's start.
    pub out_of_order: Vec<usize>,
    /// Indices of segments whose timestamps could not be parsed.
    pub unparseable: Vec<usize>,
    /// Human-readable description of every finding.
    pub warnings: Vec<String>,
    /// Furthest end time reached by any parseable segment.
    pub covered_until: f64,
}

impl CoverageReport {
    /// Returns `true` if the segments are ordered, readable and leave no gap.
    ///
    /// Overlaps do not break coverage.
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty() && self.unparseable.is_empty() && self.out_of_order.is_empty()
    }
}

impl Display for CoverageReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for warning in &self.warnings {
            writeln!(f, "[WARN] {warning}")?;
        }
        if self.warnings.is_empty() {
            writeln!(f, "Segments cover the full video.")?;
        }
        Ok(())
    }
}

/// Walk `segments` in order and report how they cover `[0, duration]`.
pub fn check_coverage(segments: &[VideoSegment], duration: f64) -> CoverageReport {
    let mut report = CoverageReport::default();
    let mut cursor = 0.0_f64;
    let mut previous_start: Option<f64> = None;

    for (index, segment) in segments.iter().enumerate() {
        let start = parse_timestamp(&segment.start_time);
        let end = parse_timestamp(&segment.end_time);
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                report.unparseable.push(index);
                report.warnings.push(format!(
                    "Segment {} has unreadable timestamps ({:?} - {:?})",
                    index + 1,
                    segment.start_time,
                    segment.end_time,
                ));
                continue;
            }
        };

        if end < start {
            report.warnings.push(format!(
                "Segment {} ends ({}) before it starts ({})",
                index + 1,
                segment.end_time,
                segment.start_time,
            ));
        }

        if previous_start.is_some_and(|previous| start < previous) {
            report.out_of_order.push(index);
            report.warnings.push(format!(
                "Segment {} starts at {} before the previous segment",
                index + 1,
                segment.start_time,
            ));
        } else if start > cursor + COVERAGE_TOLERANCE {
            report.gaps.push(CoverageGap { start: cursor, end: start });
            report.warnings.push(format!(
                "Gap of {:.1}s before segment {} ({:.1}s - {:.1}s)",
                start - cursor,
                index + 1,
                cursor,
                start,
            ));
        } else if start < cursor - COVERAGE_TOLERANCE {
            report.overlaps.push(index);
            report.warnings.push(format!(
                "Segment {} overlaps the previous one by {:.1}s",
                index + 1,
                cursor - start,
            ));
        }

        previous_start = Some(start);
        cursor = cursor.max(end);
    }

    if duration > 0.0 && cursor < duration - COVERAGE_TOLERANCE {
        report.gaps.push(CoverageGap {
            start: cursor,
            end: duration,
        });
        report.warnings.push(format!(
            "Last {:.1}s of the video are not covered ({:.1}s - {:.1}s)",
            duration - cursor,
            cursor,
            duration,
        ));
    }

    report.covered_until = cursor;
    for warning in &report.warnings {
        log::warn!("Coverage: {warning}");
    }
    report
}
