use serde::{Deserialize, Serialize};

/// Error body returned before any stream output was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub code: String,
}

impl ApiErrorBody {
    pub fn new(
        message: impl Into<String>,
        r#type: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                message: message.into(),
                r#type: r#type.into(),
                code: code.into(),
            },
        }
    }
}
