//! Request and response payloads exchanged with callers

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::Path;

/// Caller-visible session identifier
pub type SessionId = String;

/// Maze canvas dimensions, passed through to the result cache untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex_width: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex_height: Option<f64>,
}

/// Solve request as received from a streaming connection or a direct call
///
/// Components stay raw JSON here; they are normalized during intake so one
/// malformed component cannot fail deserialization of the whole request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    #[serde(default)]
    pub components: Option<Vec<Value>>,

    #[serde(default)]
    pub dimensions: Dimensions,

    #[serde(default, alias = "session_id", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    #[serde(default, alias = "skip_fast_path")]
    pub skip_fast_path: bool,
}

/// Result returned on the direct call path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub session_id: SessionId,

    /// One path per input component, in input order
    pub data: Vec<Path>,
}

/// Messages pushed to a streaming connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The job was accepted into the queue
    Queued {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        /// 1-based position at the time of enqueueing
        position: usize,
    },

    /// The job finished
    Solution {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        data: Vec<Path>,
    },

    /// The job could not be accepted or failed unexpectedly
    Error {
        #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
        error: String,
    },
}

/// Generate a session id of the form `<prefix>_<unix-millis>_<8 hex>`
pub fn generate_session_id(prefix: &str) -> SessionId {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, millis, &suffix[..8])
}
