use serde_json::json;

use super::*;
use crate::canonical::{SourceFinishReason, ToolCallEvent, Usage};

fn call(id: &str, name: &str, input: serde_json::Value) -> ToolCallEvent {
    ToolCallEvent {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

#[test]
fn message_start_gate_flips_once() {
    let mut state = StreamState::new("m1", "echo:test", 0);
    assert!(!state.message_started());
    assert!(state.mark_message_started());
    assert!(!state.mark_message_started());
    assert!(state.message_started());
}

#[test]
fn text_takes_index_zero_and_appends() {
    let mut state = StreamState::new("m1", "echo:test", 0);
    assert_eq!(state.append_text("Hel"), BlockIndex::FIRST);
    assert_eq!(state.append_text("lo"), BlockIndex::FIRST);
    let text = state.text().unwrap();
    assert_eq!(text.kind(), BlockKind::Text);
    assert!(text.started());
    assert_eq!(text.content(), "Hello");
}

#[test]
fn tool_first_pushes_text_to_next_free_index() {
    let mut state = StreamState::new("m1", "echo:test", 0);
    state.record_tool_call(&call("t1", "lookup", json!({"q": "x"})));
    assert_eq!(state.tool_calls()[0].index, BlockIndex::FIRST);
    assert_eq!(state.append_text("after").get(), 1);
    state.record_tool_call(&call("t2", "lookup", json!({})));
    assert_eq!(state.tool_calls()[1].index.get(), 2);
}

#[test]
fn reasoning_lives_at_reserved_index() {
    let mut state = StreamState::new("m1", "echo:test", 0);
    state.append_reasoning("thi");
    state.append_reasoning("nk");
    state.set_reasoning_signature("sig-a".to_string());
    state.set_reasoning_signature("sig-b".to_string());
    state.append_text("ans");

    let reasoning = state.reasoning().unwrap();
    assert_eq!(reasoning.index(), BlockIndex::REASONING);
    assert_eq!(reasoning.kind(), BlockKind::Thinking);
    assert_eq!(reasoning.content(), "think");
    assert_eq!(reasoning.signature(), Some("sig-b"));
    // Text still gets index 0; reasoning does not consume a positive slot.
    assert_eq!(state.text().unwrap().index(), BlockIndex::FIRST);

    let kinds: Vec<BlockKind> = state.blocks().iter().map(ContentBlock::kind).collect();
    assert_eq!(kinds, vec![BlockKind::Thinking, BlockKind::Text]);
}

#[test]
fn repeated_tool_call_overwrites_arguments() {
    let mut state = StreamState::new("m1", "echo:test", 0);
    assert_eq!(
        state.record_tool_call(&call("t1", "lookup", json!({"q": "a"}))),
        ToolCallRecord::New { ordinal: 0 }
    );
    assert_eq!(
        state.record_tool_call(&call("t1", "lookup", json!({"q": "b"}))),
        ToolCallRecord::Repeated { ordinal: 0 }
    );
    assert_eq!(state.tool_calls().len(), 1);
    assert_eq!(state.tool_calls()[0].arguments, r#"{"q":"b"}"#);
    let block = state.blocks().get(BlockIndex::FIRST).unwrap();
    assert_eq!(block.tool_input(), Some(r#"{"q":"b"}"#));
    assert_eq!(block.content(), r#"{"q":"b"}"#);
}

#[test]
fn block_table_never_replaces_occupied_slot() {
    let mut table = BlockTable::default();
    assert!(table.insert(ContentBlock::new(BlockKind::Text, BlockIndex::FIRST)));
    assert!(!table.insert(ContentBlock::new(BlockKind::ToolUse, BlockIndex::FIRST)));
    assert_eq!(
        table.get(BlockIndex::FIRST).unwrap().kind(),
        BlockKind::Text
    );
    assert_eq!(table.next_free().get(), 1);
    assert_eq!(table.len(), 1);
}

#[test]
fn stop_reason_unset_until_finish() {
    let mut state = StreamState::new("m1", "echo:test", 0);
    state.append_text("hi");
    assert_eq!(state.stop_reason(), None);
    assert_eq!(state.finish_reason(), FinishReason::Stop);

    state.record_finish(Some(SourceFinishReason::Length), None);
    assert_eq!(state.stop_reason(), Some(FinishReason::Length));

    // First write wins.
    state.record_finish(Some(SourceFinishReason::Stop), None);
    assert_eq!(state.stop_reason(), Some(FinishReason::Length));
}

#[test]
fn tool_calls_take_priority_over_stop() {
    let mut state = StreamState::new("m1", "echo:test", 0);
    state.record_tool_call(&call("t1", "lookup", json!({})));
    assert_eq!(state.stop_reason(), None);
    assert_eq!(state.finish_reason(), FinishReason::ToolCalls);
    state.record_finish(Some(SourceFinishReason::Stop), None);
    assert_eq!(state.stop_reason(), Some(FinishReason::ToolCalls));
}

#[test]
fn unrecognized_reasons_normalize_to_stop() {
    for reason in [
        None,
        Some(SourceFinishReason::Other),
        Some(SourceFinishReason::Unknown),
        Some(SourceFinishReason::Error),
    ] {
        assert_eq!(FinishReason::normalize(reason), FinishReason::Stop);
    }
    assert_eq!(
        FinishReason::normalize(Some(SourceFinishReason::ContentFilter)),
        FinishReason::ContentFilter
    );
}

#[test]
fn usage_falls_back_to_step_sum_and_never_decreases() {
    let mut state = StreamState::new("m1", "echo:test", 0);
    state.record_finish_step(None, Some(Usage::new(10, 3)));
    state.record_finish_step(None, Some(Usage::new(12, 4)));
    state.record_finish(Some(SourceFinishReason::Stop), None);
    assert_eq!(state.usage(), Usage::new(22, 7));

    state.record_finish(None, Some(Usage::new(5, 1)));
    assert_eq!(state.usage(), Usage::new(22, 7));
}
