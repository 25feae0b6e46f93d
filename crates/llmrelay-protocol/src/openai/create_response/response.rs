use serde::{Deserialize, Serialize};

use crate::openai::create_response::types::{
    IncompleteDetails, OutputItem, ResponseStatus, ResponseUsage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseObjectType {
    #[serde(rename = "response")]
    Response,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseObject {
    pub id: String,
    pub object: ResponseObjectType,
    pub created_at: i64,
    pub status: ResponseStatus,
    pub model: String,
    pub output: Vec<OutputItem>,
    pub usage: Option<ResponseUsage>,
    pub incomplete_details: Option<IncompleteDetails>,
}
