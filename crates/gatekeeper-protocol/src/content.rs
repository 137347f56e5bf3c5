//! MCP content blocks: the shapes a `tools/call` result carries in
//! `content[]`, plus the tool-call result envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    #[serde(rename = "resource")]
    Resource { resource: EmbeddedResource },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// An embedded resource item. `text` and `blob` are mutually exclusive on
/// the wire; both are modeled as optional rather than an enum because the
/// externalizer rewrites whichever one is present in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedResource {
    pub uri: String,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
    /// Set by the externalizer in place of an oversized `text`/`blob`;
    /// `{type:"external_file", url, mimeType, size}`.
    #[serde(rename = "externalFile", skip_serializing_if = "Option::is_none")]
    pub external_file: Option<Value>,
}

/// The body returned from a `tools/call`, before it is wrapped in a
/// `JsonRpcResponse`. `is_error` carries tool-level failure (policy deny,
/// non-zero exit, sandbox failure) - MCP keeps these out of the JSON-RPC
/// error channel so the agent sees them as a normal, inspectable result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError")]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub _meta: Option<Value>,
}

impl ToolCallResult {
    pub fn ok(content: Vec<ContentBlock>) -> Self {
        ToolCallResult {
            content,
            is_error: false,
            _meta: None,
        }
    }

    pub fn error(content: Vec<ContentBlock>) -> Self {
        ToolCallResult {
            content,
            is_error: true,
            _meta: None,
        }
    }

    pub fn denied(reason: &str) -> Self {
        ToolCallResult::error(vec![ContentBlock::text(format!("DENIED: {reason}"))])
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self._meta = Some(meta);
        self
    }
}
