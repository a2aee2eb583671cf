//! Prompt and JSON export tests.

use storyboard_continuity::{
    AnalysisResult, AppState, EXPORT_FILE_NAME, VideoSegment, export, format_prompts,
};

fn result_with_segments(count: usize) -> AnalysisResult {
    let segments = (0..count)
        .map(|index| VideoSegment {
            start_time: format!("00:{:02}", index * 4),
            end_time: format!("00:{:02}", (index + 1) * 4),
            generated_prompt: format!("prompt {index}"),
            transition_bridge: format!("bridge {index}"),
            ..VideoSegment::default()
        })
        .collect();
    AnalysisResult {
        segments,
        ..AnalysisResult::default()
    }
}

#[test]
fn single_segment_has_no_separator() {
    assert_eq!(
        format_prompts(&result_with_segments(1)),
        "[Segment 1] 00:00-00:04\nPROMPT: prompt 0\nBRIDGE: bridge 0"
    );
}

#[test]
fn one_block_per_segment_in_order() {
    let text = format_prompts(&result_with_segments(6));
    let blocks: Vec<&str> = text.split("\n\n").collect();

    assert_eq!(blocks.len(), 6);
    for (index, block) in blocks.iter().enumerate() {
        assert!(block.starts_with(&format!("[Segment {}] ", index + 1)));
        assert!(block.contains(&format!("PROMPT: prompt {index}\n")));
        assert!(block.ends_with(&format!("BRIDGE: bridge {index}")));
    }
}

#[test]
fn no_segments_produce_empty_text() {
    assert_eq!(format_prompts(&AnalysisResult::default()), "");
}

#[test]
fn idle_state_exports_nothing() {
    let state = AppState::new();

    let mut sink = Vec::new();
    assert!(!state.copy_all_prompts(&mut sink).unwrap());
    assert!(sink.is_empty());

    let directory = tempfile::tempdir().unwrap();
    assert_eq!(state.download_json(directory.path()).unwrap(), None);
    assert_eq!(std::fs::read_dir(directory.path()).unwrap().count(), 0);
}

#[test]
fn json_export_uses_camel_case_and_fixed_name() {
    let directory = tempfile::tempdir().unwrap();
    let nested = directory.path().join("exports");
    let path = export::write_json_export(&result_with_segments(2), &nested).unwrap();

    assert_eq!(path, nested.join(EXPORT_FILE_NAME));
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["segments"][1]["generatedPrompt"], "prompt 1");
    assert_eq!(value["segments"][0]["transitionBridge"], "bridge 0");
    assert!(value.get("fullVideoPrompt").is_some());
}
