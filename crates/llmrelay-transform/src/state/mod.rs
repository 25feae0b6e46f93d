mod blocks;
mod finish;

#[cfg(test)]
mod tests;

pub use blocks::{BlockIndex, BlockKind, BlockTable, ContentBlock};
pub use finish::FinishReason;

use tracing::warn;

use crate::canonical::{SourceFinishReason, ToolCallEvent, Usage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallState {
    pub index: BlockIndex,
    pub id: String,
    pub name: String,
    /// Serialized JSON arguments, written once per call.
    pub arguments: String,
}

/// Outcome of recording a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallRecord {
    /// First time this id was seen; `ordinal` is its position among tool calls.
    New { ordinal: usize },
    /// The id was already recorded. Arguments were overwritten.
    Repeated { ordinal: usize },
}

/// Per-request accumulation shared by every dialect adapter.
///
/// Owned by exactly one processor. Adapters only read it; all mutation
/// happens in the processor before the matching adapter hook runs.
#[derive(Debug, Clone)]
pub struct StreamState {
    message_id: String,
    model: String,
    created: i64,
    message_started: bool,
    blocks: BlockTable,
    text_index: Option<BlockIndex>,
    tool_calls: Vec<ToolCallState>,
    input_tokens: u64,
    output_tokens: u64,
    step_usage: Usage,
    stop_reason: Option<FinishReason>,
    tool_call_seen: bool,
}

impl StreamState {
    pub fn new(message_id: impl Into<String>, model: impl Into<String>, created: i64) -> Self {
        Self {
            message_id: message_id.into(),
            model: model.into(),
            created,
            message_started: false,
            blocks: BlockTable::default(),
            text_index: None,
            tool_calls: Vec::new(),
            input_tokens: 0,
            output_tokens: 0,
            step_usage: Usage::default(),
            stop_reason: None,
            tool_call_seen: false,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Unix seconds at stream start.
    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn message_started(&self) -> bool {
        self.message_started
    }

    /// Returns `true` only for the call that opened the message.
    pub fn mark_message_started(&mut self) -> bool {
        !std::mem::replace(&mut self.message_started, true)
    }

    pub fn blocks(&self) -> &BlockTable {
        &self.blocks
    }

    pub fn tool_calls(&self) -> &[ToolCallState] {
        &self.tool_calls
    }

    pub fn text(&self) -> Option<&ContentBlock> {
        self.text_index.and_then(|index| self.blocks.get(index))
    }

    pub fn reasoning(&self) -> Option<&ContentBlock> {
        self.blocks.get(BlockIndex::REASONING)
    }

    /// Appends to the text block, creating it at index 0 (or the next free
    /// index when 0 is taken) on first use.
    pub fn append_text(&mut self, text: &str) -> BlockIndex {
        let index = self.ensure_text();
        if let Some(block) = self.blocks.get_mut(index) {
            block.append(text);
        }
        index
    }

    pub fn ensure_text(&mut self) -> BlockIndex {
        if let Some(index) = self.text_index {
            return index;
        }
        let index = if self.blocks.get(BlockIndex::FIRST).is_none() {
            BlockIndex::FIRST
        } else {
            self.blocks.next_free()
        };
        self.blocks.insert(ContentBlock::new(BlockKind::Text, index));
        self.text_index = Some(index);
        index
    }

    pub fn ensure_reasoning(&mut self) -> &mut ContentBlock {
        self.blocks.reasoning_mut()
    }

    pub fn append_reasoning(&mut self, text: &str) {
        self.blocks.reasoning_mut().append(text);
    }

    /// Last write wins.
    pub fn set_reasoning_signature(&mut self, signature: String) {
        self.blocks.reasoning_mut().set_signature(signature);
    }

    pub fn record_tool_call(&mut self, call: &ToolCallEvent) -> ToolCallRecord {
        self.tool_call_seen = true;
        let arguments = call.input.to_string();

        if let Some(ordinal) = self.tool_calls.iter().position(|tc| tc.id == call.id) {
            warn!(
                event = "tool_call_repeated",
                tool_call_id = %call.id,
                tool_name = %call.name,
                "tool call id seen twice; keeping latest arguments"
            );
            let existing = &mut self.tool_calls[ordinal];
            existing.arguments = arguments.clone();
            let index = existing.index;
            if let Some(block) = self.blocks.get_mut(index) {
                block.replace_tool_input(arguments);
            }
            return ToolCallRecord::Repeated { ordinal };
        }

        let index = self.blocks.next_free();
        let mut block = ContentBlock::new(BlockKind::ToolUse, index);
        block.set_tool(call.id.clone(), call.name.clone(), arguments.clone());
        self.blocks.insert(block);
        self.tool_calls.push(ToolCallState {
            index,
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        });
        ToolCallRecord::New {
            ordinal: self.tool_calls.len() - 1,
        }
    }

    /// A step boundary only contributes usage and a tool-calls signal.
    pub fn record_finish_step(
        &mut self,
        reason: Option<SourceFinishReason>,
        usage: Option<Usage>,
    ) {
        if let Some(usage) = usage {
            self.step_usage += usage;
        }
        if self.tool_call_seen || reason == Some(SourceFinishReason::ToolCalls) {
            self.stop_reason = Some(FinishReason::ToolCalls);
        }
    }

    pub fn record_finish(&mut self, reason: Option<SourceFinishReason>, usage: Option<Usage>) {
        let usage = usage.or((!self.step_usage.is_zero()).then_some(self.step_usage));
        if let Some(usage) = usage {
            self.input_tokens = self.input_tokens.max(usage.input_tokens);
            self.output_tokens = self.output_tokens.max(usage.output_tokens);
        }

        if self.tool_call_seen {
            self.stop_reason = Some(FinishReason::ToolCalls);
        } else if self.stop_reason.is_none() {
            self.stop_reason = Some(FinishReason::normalize(reason));
        }
    }

    /// `None` until a finish-class event was observed.
    pub fn stop_reason(&self) -> Option<FinishReason> {
        self.stop_reason
    }

    /// Reason written to the terminal frame. Falls back to `tool_calls` when
    /// a tool was called and to `stop` otherwise.
    pub fn finish_reason(&self) -> FinishReason {
        match self.stop_reason {
            Some(reason) => reason,
            None if self.tool_call_seen => FinishReason::ToolCalls,
            None => FinishReason::Stop,
        }
    }

    pub fn usage(&self) -> Usage {
        Usage::new(self.input_tokens, self.output_tokens)
    }
}
