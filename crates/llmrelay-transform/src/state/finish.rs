use crate::canonical::SourceFinishReason;

/// Normalized finish reason shared by all dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

impl FinishReason {
    pub fn normalize(reason: Option<SourceFinishReason>) -> Self {
        match reason {
            Some(SourceFinishReason::Length) => FinishReason::Length,
            Some(SourceFinishReason::ToolCalls) => FinishReason::ToolCalls,
            Some(SourceFinishReason::ContentFilter) => FinishReason::ContentFilter,
            Some(
                SourceFinishReason::Stop
                | SourceFinishReason::Error
                | SourceFinishReason::Other
                | SourceFinishReason::Unknown,
            )
            | None => FinishReason::Stop,
        }
    }
}
