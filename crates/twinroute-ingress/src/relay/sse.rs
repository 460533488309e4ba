//! SSE frame formatting

use bytes::Bytes;
use serde::Serialize;
use tracing::warn;

pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// `data: <json>\n\n`
pub fn data_frame<T: Serialize>(payload: &T) -> Option<Bytes> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Bytes::from(format!("data: {}\n\n", json))),
        Err(e) => {
            warn!("Dropping unserializable stream frame: {}", e);
            None
        }
    }
}

/// `event: <name>\ndata: <json>\n\n`
pub fn event_frame<T: Serialize>(name: &str, payload: &T) -> Option<Bytes> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Bytes::from(format!("event: {}\ndata: {}\n\n", name, json))),
        Err(e) => {
            warn!(event = name, "Dropping unserializable stream frame: {}", e);
            None
        }
    }
}

pub fn done_frame() -> Bytes {
    Bytes::from_static(DONE_FRAME.as_bytes())
}
