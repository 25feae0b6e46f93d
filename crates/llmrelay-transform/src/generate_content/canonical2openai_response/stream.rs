use llmrelay_protocol::ApiErrorBody;
use llmrelay_protocol::openai::create_response::response::ResponseObject;
use llmrelay_protocol::openai::create_response::stream::ResponseStreamEvent;
use llmrelay_protocol::openai::create_response::types::{
    ItemStatus, OutputContent, OutputItem, OutputRole, ResponseStatus, SummaryPart,
};

use crate::generate_content::canonical2openai_response::response::{
    build_response, response_object, response_status,
};
use crate::middleware::{Dialect, DialectAdapter};
use crate::state::{BlockIndex, StreamState, ToolCallState};

#[derive(Debug, Clone, PartialEq, Eq)]
enum OpenItem {
    Message {
        item_id: String,
        output_index: u32,
        text: String,
    },
    Reasoning {
        item_id: String,
        output_index: u32,
        text: String,
        signature: Option<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct OpenAIResponseAdapter {
    sequence_number: u64,
    next_output_index: u32,
    open: Option<OpenItem>,
    output: Vec<OutputItem>,
}

impl OpenAIResponseAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&mut self) -> u64 {
        let current = self.sequence_number;
        self.sequence_number += 1;
        current
    }

    fn allocate_output_index(&mut self) -> u32 {
        let index = self.next_output_index;
        self.next_output_index += 1;
        index
    }

    fn open_message(&mut self, state: &StreamState, out: &mut Vec<ResponseStreamEvent>) {
        if matches!(self.open, Some(OpenItem::Message { .. })) {
            return;
        }
        self.close_open(out);
        let output_index = self.allocate_output_index();
        let item_id = item_id("msg", state, output_index);
        out.push(ResponseStreamEvent::OutputItemAdded {
            output_index,
            item: OutputItem::Message {
                id: item_id.clone(),
                role: OutputRole::Assistant,
                status: ItemStatus::InProgress,
                content: Vec::new(),
            },
            sequence_number: self.next_sequence(),
        });
        out.push(ResponseStreamEvent::ContentPartAdded {
            item_id: item_id.clone(),
            output_index,
            content_index: 0,
            part: output_text(String::new()),
            sequence_number: self.next_sequence(),
        });
        self.open = Some(OpenItem::Message {
            item_id,
            output_index,
            text: String::new(),
        });
    }

    fn open_reasoning(&mut self, state: &StreamState, out: &mut Vec<ResponseStreamEvent>) {
        if matches!(self.open, Some(OpenItem::Reasoning { .. })) {
            return;
        }
        self.close_open(out);
        let output_index = self.allocate_output_index();
        let item_id = item_id("rs", state, output_index);
        out.push(ResponseStreamEvent::OutputItemAdded {
            output_index,
            item: OutputItem::Reasoning {
                id: item_id.clone(),
                summary: Vec::new(),
                encrypted_content: None,
            },
            sequence_number: self.next_sequence(),
        });
        out.push(ResponseStreamEvent::ReasoningSummaryPartAdded {
            item_id: item_id.clone(),
            output_index,
            summary_index: 0,
            part: SummaryPart::SummaryText {
                text: String::new(),
            },
            sequence_number: self.next_sequence(),
        });
        self.open = Some(OpenItem::Reasoning {
            item_id,
            output_index,
            text: String::new(),
            signature: None,
        });
    }

    fn close_open(&mut self, out: &mut Vec<ResponseStreamEvent>) {
        match self.open.take() {
            Some(OpenItem::Message {
                item_id,
                output_index,
                text,
            }) => {
                out.push(ResponseStreamEvent::OutputTextDone {
                    item_id: item_id.clone(),
                    output_index,
                    content_index: 0,
                    text: text.clone(),
                    sequence_number: self.next_sequence(),
                });
                out.push(ResponseStreamEvent::ContentPartDone {
                    item_id: item_id.clone(),
                    output_index,
                    content_index: 0,
                    part: output_text(text.clone()),
                    sequence_number: self.next_sequence(),
                });
                let item = OutputItem::Message {
                    id: item_id,
                    role: OutputRole::Assistant,
                    status: ItemStatus::Completed,
                    content: vec![output_text(text)],
                };
                self.finish_item(output_index, item, out);
            }
            Some(OpenItem::Reasoning {
                item_id,
                output_index,
                text,
                signature,
            }) => {
                out.push(ResponseStreamEvent::ReasoningSummaryTextDone {
                    item_id: item_id.clone(),
                    output_index,
                    summary_index: 0,
                    text: text.clone(),
                    sequence_number: self.next_sequence(),
                });
                out.push(ResponseStreamEvent::ReasoningSummaryPartDone {
                    item_id: item_id.clone(),
                    output_index,
                    summary_index: 0,
                    part: SummaryPart::SummaryText { text: text.clone() },
                    sequence_number: self.next_sequence(),
                });
                let item = OutputItem::Reasoning {
                    id: item_id,
                    summary: vec![SummaryPart::SummaryText { text }],
                    encrypted_content: signature,
                };
                self.finish_item(output_index, item, out);
            }
            None => {}
        }
    }

    fn finish_item(
        &mut self,
        output_index: u32,
        item: OutputItem,
        out: &mut Vec<ResponseStreamEvent>,
    ) {
        out.push(ResponseStreamEvent::OutputItemDone {
            output_index,
            item: item.clone(),
            sequence_number: self.next_sequence(),
        });
        self.output.push(item);
    }
}

impl DialectAdapter for OpenAIResponseAdapter {
    type Chunk = ResponseStreamEvent;
    type Response = ResponseObject;

    const DIALECT: Dialect = Dialect::OpenAIResponse;

    fn message_start(&mut self, state: &StreamState) -> Vec<Self::Chunk> {
        let response = response_object(
            state,
            ResponseStatus::InProgress,
            Vec::new(),
            None,
            None,
        );
        vec![
            ResponseStreamEvent::Created {
                response: response.clone(),
                sequence_number: self.next_sequence(),
            },
            ResponseStreamEvent::InProgress {
                response,
                sequence_number: self.next_sequence(),
            },
        ]
    }

    fn text_start(&mut self, state: &StreamState) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        self.open_message(state, &mut out);
        out
    }

    fn text_delta(
        &mut self,
        state: &StreamState,
        _index: BlockIndex,
        text: &str,
    ) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        self.open_message(state, &mut out);
        let (item_id, output_index) = match &mut self.open {
            Some(OpenItem::Message {
                item_id,
                output_index,
                text: buffer,
            }) => {
                buffer.push_str(text);
                (item_id.clone(), *output_index)
            }
            _ => return out,
        };
        out.push(ResponseStreamEvent::OutputTextDelta {
            item_id,
            output_index,
            content_index: 0,
            delta: text.to_string(),
            sequence_number: self.next_sequence(),
        });
        out
    }

    fn text_end(&mut self, _state: &StreamState) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        if matches!(self.open, Some(OpenItem::Message { .. })) {
            self.close_open(&mut out);
        }
        out
    }

    fn reasoning_start(&mut self, state: &StreamState) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        self.open_reasoning(state, &mut out);
        out
    }

    fn reasoning_delta(
        &mut self,
        state: &StreamState,
        text: &str,
        signature: Option<&str>,
    ) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        self.open_reasoning(state, &mut out);
        let (item_id, output_index) = match &mut self.open {
            Some(OpenItem::Reasoning {
                item_id,
                output_index,
                text: buffer,
                signature: stored,
            }) => {
                if let Some(signature) = signature {
                    *stored = Some(signature.to_string());
                }
                buffer.push_str(text);
                (item_id.clone(), *output_index)
            }
            _ => return out,
        };
        if !text.is_empty() {
            out.push(ResponseStreamEvent::ReasoningSummaryTextDelta {
                item_id,
                output_index,
                summary_index: 0,
                delta: text.to_string(),
                sequence_number: self.next_sequence(),
            });
        }
        out
    }

    fn reasoning_end(&mut self, state: &StreamState, signature: Option<&str>) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        if signature.is_some() {
            self.open_reasoning(state, &mut out);
        }
        if let (Some(signature), Some(OpenItem::Reasoning { signature: stored, .. })) =
            (signature, self.open.as_mut())
        {
            *stored = Some(signature.to_string());
        }
        if matches!(self.open, Some(OpenItem::Reasoning { .. })) {
            self.close_open(&mut out);
        }
        out
    }

    fn tool_call(
        &mut self,
        state: &StreamState,
        call: &ToolCallState,
        _ordinal: usize,
    ) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        self.close_open(&mut out);
        let output_index = self.allocate_output_index();
        let item_id = item_id("fc", state, output_index);

        out.push(ResponseStreamEvent::OutputItemAdded {
            output_index,
            item: OutputItem::FunctionCall {
                id: item_id.clone(),
                call_id: call.id.clone(),
                name: call.name.clone(),
                arguments: String::new(),
                status: ItemStatus::InProgress,
            },
            sequence_number: self.next_sequence(),
        });
        out.push(ResponseStreamEvent::FunctionCallArgumentsDelta {
            item_id: item_id.clone(),
            output_index,
            delta: call.arguments.clone(),
            sequence_number: self.next_sequence(),
        });
        out.push(ResponseStreamEvent::FunctionCallArgumentsDone {
            item_id: item_id.clone(),
            output_index,
            arguments: call.arguments.clone(),
            sequence_number: self.next_sequence(),
        });
        let item = OutputItem::FunctionCall {
            id: item_id,
            call_id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            status: ItemStatus::Completed,
        };
        self.finish_item(output_index, item, &mut out);
        out
    }

    fn finalize(&mut self, state: &StreamState) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        self.close_open(&mut out);

        let (status, incomplete) = response_status(state.finish_reason());
        let is_incomplete = incomplete.is_some();
        let response = response_object(
            state,
            status,
            self.output.clone(),
            Some(state.usage()),
            incomplete,
        );
        let sequence_number = self.next_sequence();
        out.push(if is_incomplete {
            ResponseStreamEvent::Incomplete {
                response,
                sequence_number,
            }
        } else {
            ResponseStreamEvent::Completed {
                response,
                sequence_number,
            }
        });
        out
    }

    fn error_chunk(&mut self, _state: &StreamState, error: &ApiErrorBody) -> Self::Chunk {
        ResponseStreamEvent::Error {
            code: Some(error.error.code.clone()),
            message: error.error.message.clone(),
            param: None,
            sequence_number: self.next_sequence(),
        }
    }

    fn build_non_streaming_response(&self, state: &StreamState) -> Self::Response {
        build_response(state)
    }
}

pub(crate) fn item_id(prefix: &str, state: &StreamState, output_index: u32) -> String {
    format!("{prefix}_{}_{output_index}", state.message_id())
}

pub(crate) fn output_text(text: String) -> OutputContent {
    OutputContent::OutputText {
        text,
        annotations: Vec::new(),
    }
}
