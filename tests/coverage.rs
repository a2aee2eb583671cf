//! Segment coverage tests.

use storyboard_continuity::{
    AnalysisResult, CoverageGap, VideoSegment, check_coverage, parse_timestamp,
};

fn segment(start: &str, end: &str) -> VideoSegment {
    VideoSegment {
        start_time: start.to_string(),
        end_time: end.to_string(),
        ..VideoSegment::default()
    }
}

#[test]
fn contiguous_segments_cover_the_video() {
    let segments = [
        segment("00:00", "00:20"),
        segment("00:20", "00:45"),
        segment("00:45", "01:30"),
    ];
    let report = check_coverage(&segments, 90.0);

    assert!(report.is_complete(), "{report}");
    assert!(report.warnings.is_empty());
    assert_eq!(report.covered_until, 90.0);
    assert_eq!(report.to_string(), "Segments cover the full video.\n");
}

#[test]
fn sub_second_rounding_is_tolerated() {
    let segments = [segment("00:00", "00:10"), segment("00:10", "00:19")];
    let report = check_coverage(&segments, 19.6);
    assert!(report.is_complete(), "{report}");
}

#[test]
fn gaps_between_segments_are_reported() {
    let segments = [segment("00:00", "00:10"), segment("00:15", "00:30")];
    let report = check_coverage(&segments, 30.0);

    assert!(!report.is_complete());
    assert_eq!(
        report.gaps,
        vec![CoverageGap {
            start: 10.0,
            end: 15.0
        }]
    );
    assert!(report.to_string().starts_with("[WARN] Gap of 5.0s"));
}

#[test]
fn leading_and_trailing_gaps_are_reported() {
    let segments = [segment("00:05", "00:20")];
    let report = check_coverage(&segments, 40.0);

    assert_eq!(report.gaps.len(), 2);
    assert_eq!(report.gaps[0].start, 0.0);
    assert_eq!(report.gaps[1].end, 40.0);
    assert_eq!(report.covered_until, 20.0);
}

#[test]
fn overlaps_are_warnings_not_gaps() {
    let segments = [segment("00:00", "00:30"), segment("00:20", "00:40")];
    let report = check_coverage(&segments, 40.0);

    assert_eq!(report.overlaps, vec![1]);
    assert!(report.gaps.is_empty());
    assert!(report.is_complete());
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn out_of_order_segments_break_coverage() {
    let segments = [
        segment("00:00", "00:10"),
        segment("00:20", "00:30"),
        segment("00:10", "00:20"),
    ];
    let report = check_coverage(&segments, 30.0);

    assert_eq!(report.out_of_order, vec![2]);
    assert!(!report.is_complete());
}

#[test]
fn unreadable_timestamps_are_warnings() {
    let segments = [
        segment("00:00", "00:10"),
        segment("later", "the end"),
        segment("00:10", "00:20"),
    ];
    let report = check_coverage(&segments, 20.0);

    assert_eq!(report.unparseable, vec![1]);
    assert!(report.gaps.is_empty());
    assert!(report.warnings[0].contains("unreadable"));
}

#[test]
fn empty_result_leaves_everything_uncovered() {
    let report = AnalysisResult::default().coverage(12.0);
    assert_eq!(
        report.gaps,
        vec![CoverageGap {
            start: 0.0,
            end: 12.0
        }]
    );
}

#[test]
fn hour_long_timestamps() {
    assert_eq!(parse_timestamp("1:00:00"), Some(3600.0));
    assert_eq!(parse_timestamp("19:59"), Some(1199.0));
    assert_eq!(parse_timestamp("00:59.75"), Some(59.75));
    assert_eq!(parse_timestamp("12:60"), None);
}
