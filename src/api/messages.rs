//! WebSocket frame formats.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hub::EventKind;
use crate::sdk::{CommandReply, SdkRequest};

/// A request frame: `{ "id"?: any, "method": "...", ...params }`.
///
/// Frames without an `id` are fire-and-forget: the request still runs, but no
/// reply is sent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientFrame {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub request: SdkRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Reply {
        id: Value,
        success: bool,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    Event {
        channel: EventKind,
        payload: Value,
    },
}

impl ServerMessage {
    pub fn reply(id: Value, reply: CommandReply) -> Self {
        Self::Reply {
            id,
            success: reply.success,
            message: reply.message,
            error: reply.error,
            data: reply.data,
        }
    }
}
