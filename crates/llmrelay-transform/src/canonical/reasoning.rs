use llmrelay_protocol::claude::create_message::ThinkingConfig;
use llmrelay_protocol::openai::types::ReasoningEffort as OpenAIReasoningEffort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    /// Thinking budget used when a provider wants tokens rather than an effort.
    pub fn default_budget_tokens(self) -> u32 {
        match self {
            ReasoningEffort::Minimal => 512,
            ReasoningEffort::Low => 1024,
            ReasoningEffort::Medium => 4096,
            ReasoningEffort::High => 16384,
        }
    }

    pub fn from_budget_tokens(budget_tokens: u32) -> Self {
        if budget_tokens < 2048 {
            ReasoningEffort::Low
        } else if budget_tokens < 8192 {
            ReasoningEffort::Medium
        } else {
            ReasoningEffort::High
        }
    }
}

impl From<OpenAIReasoningEffort> for ReasoningEffort {
    fn from(value: OpenAIReasoningEffort) -> Self {
        match value {
            OpenAIReasoningEffort::Minimal => ReasoningEffort::Minimal,
            OpenAIReasoningEffort::Low => ReasoningEffort::Low,
            OpenAIReasoningEffort::Medium => ReasoningEffort::Medium,
            OpenAIReasoningEffort::High => ReasoningEffort::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasoningConfig {
    pub effort: ReasoningEffort,
    /// Explicit budget from the caller; `None` means derive from `effort`.
    pub budget_tokens: Option<u32>,
}

impl ReasoningConfig {
    pub fn from_effort(effort: impl Into<ReasoningEffort>) -> Self {
        Self {
            effort: effort.into(),
            budget_tokens: None,
        }
    }

    pub fn from_thinking(thinking: ThinkingConfig) -> Option<Self> {
        match thinking {
            ThinkingConfig::Enabled { budget_tokens } => Some(Self {
                effort: ReasoningEffort::from_budget_tokens(budget_tokens),
                budget_tokens: Some(budget_tokens),
            }),
            ThinkingConfig::Disabled => None,
        }
    }

    pub fn budget_tokens(&self) -> u32 {
        self.budget_tokens
            .unwrap_or_else(|| self.effort.default_budget_tokens())
    }
}
