//! Realtime change feed over the Phoenix websocket protocol.
//!
//! One channel joins the shared chat topic and listens for message inserts
//! and conversation updates. Rows arrive in table shape and go through the
//! same codecs as HTTP responses before reaching the [`EventSink`].

use std::sync::Arc;
use std::time::Duration;

use dormglide_shared::constants::{REALTIME_CHAT_TOPIC, REALTIME_HEARTBEAT_SECS, TABLE_CONVERSATIONS, TABLE_MESSAGES};
use dormglide_shared::{Conversation, Message};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};

use crate::client::SupabaseClient;
use crate::rows;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// A change pushed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    MessageInserted(Message),
    ConversationUpdated(Conversation),
}

/// Receives decoded change events. Called from the channel task.
pub type EventSink = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// An open channel. Closing (or dropping) it stops delivery.
pub trait ChannelHandle: Send {
    fn close(&mut self);
}

/// Opens the shared change channel.
pub trait RealtimeConnector: Send + Sync {
    fn open(&self, sink: EventSink) -> Box<dyn ChannelHandle>;
}

// ---------------------------------------------------------------------------
// Phoenix frames
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(default)]
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
}

fn topic() -> String {
    format!("realtime:{REALTIME_CHAT_TOPIC}")
}

/// `phx_join` for the chat topic with the two postgres change filters.
pub fn join_frame(access_token: Option<&str>, reference: u64) -> String {
    let mut payload = json!({
        "config": {
            "broadcast": { "self": false },
            "presence": { "key": "" },
            "postgres_changes": [
                { "event": "INSERT", "schema": "public", "table": TABLE_MESSAGES },
                { "event": "UPDATE", "schema": "public", "table": TABLE_CONVERSATIONS },
            ],
        },
    });
    if let Some(token) = access_token {
        payload["access_token"] = Value::String(token.to_string());
    }
    json!({
        "topic": topic(),
        "event": "phx_join",
        "payload": payload,
        "ref": reference.to_string(),
    })
    .to_string()
}

pub fn heartbeat_frame(reference: u64) -> String {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": reference.to_string(),
    })
    .to_string()
}

/// Decode one text frame. Frames that are not row changes for the chat
/// tables yield `None`.
pub fn parse_frame(text: &str) -> Option<ChangeEvent> {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed realtime frame");
            return None;
        }
    };

    match frame.event.as_str() {
        "postgres_changes" => {}
        "phx_reply" => {
            if frame.payload["status"] == "error" {
                tracing::warn!(topic = %frame.topic, response = %frame.payload["response"], "realtime join rejected");
            }
            return None;
        }
        _ => return None,
    }

    let data = frame.payload.get("data")?;
    let table = data.get("table").and_then(Value::as_str)?;
    let kind = data.get("type").and_then(Value::as_str)?;
    let record = data.get("record").cloned().unwrap_or(Value::Null);

    let decoded = match (table, kind) {
        (TABLE_MESSAGES, "INSERT") => rows::decode_message(record).map(ChangeEvent::MessageInserted),
        (TABLE_CONVERSATIONS, "UPDATE") => {
            rows::decode_conversation(record).map(ChangeEvent::ConversationUpdated)
        }
        _ => return None,
    };

    match decoded {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "dropping undecodable realtime record");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Websocket connector
// ---------------------------------------------------------------------------

/// Connects to the project's realtime service with the client's current
/// credentials.
pub struct SupabaseRealtimeConnector {
    client: Arc<SupabaseClient>,
}

impl SupabaseRealtimeConnector {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }
}

struct SocketHandle {
    shutdown: Option<oneshot::Sender<()>>,
}

impl ChannelHandle for SocketHandle {
    fn close(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl RealtimeConnector for SupabaseRealtimeConnector {
    fn open(&self, sink: EventSink) -> Box<dyn ChannelHandle> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime, realtime channel not opened");
            return Box::new(SocketHandle { shutdown: None });
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let url = self.client.realtime_url();
        let token = self.client.access_token();
        runtime.spawn(run_channel(url, token, sink, shutdown_rx));

        tracing::info!(topic = %topic(), "realtime channel opened");
        Box::new(SocketHandle {
            shutdown: Some(shutdown_tx),
        })
    }
}

/// Keep a channel alive until shutdown, reconnecting after a fixed delay.
async fn run_channel(
    url: String,
    token: Option<String>,
    sink: EventSink,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = run_session(&url, token.as_deref(), &sink) => match result {
                Ok(()) => tracing::info!("realtime socket closed by server"),
                Err(e) => tracing::warn!(error = %e, "realtime socket failed"),
            },
        }

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
    tracing::info!("realtime channel closed");
}

async fn run_session(
    url: &str,
    token: Option<&str>,
    sink: &EventSink,
) -> Result<(), tungstenite::Error> {
    let (ws, _) = tokio_tungstenite::connect_async(url).await?;
    let (mut tx, mut rx) = ws.split();

    let mut next_ref = 1u64;
    tx.send(WsMessage::Text(join_frame(token, next_ref).into()))
        .await?;

    let mut heartbeat = tokio::time::interval(Duration::from_secs(REALTIME_HEARTBEAT_SECS));
    // The first tick completes immediately.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                next_ref += 1;
                tx.send(WsMessage::Text(heartbeat_frame(next_ref).into())).await?;
            }
            frame = rx.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Some(event) = parse_frame(&text) {
                        sink(event);
                    }
                }
                Some(Ok(WsMessage::Ping(data))) => tx.send(WsMessage::Pong(data)).await?,
                Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(table: &str, kind: &str, record: Value) -> String {
        json!({
            "topic": topic(),
            "event": "postgres_changes",
            "payload": {
                "ids": [1],
                "data": {
                    "schema": "public",
                    "table": table,
                    "type": kind,
                    "record": record,
                    "commit_timestamp": "2025-02-01T00:00:00Z"
                }
            },
            "ref": null
        })
        .to_string()
    }

    #[test]
    fn test_join_frame_subscribes_to_both_tables() {
        let frame: Value = serde_json::from_str(&join_frame(Some("jwt"), 1)).unwrap();
        assert_eq!(frame["event"], "phx_join");
        assert_eq!(frame["topic"], "realtime:dormglide-chat-global");
        assert_eq!(frame["payload"]["access_token"], "jwt");
        let changes = frame["payload"]["config"]["postgres_changes"].as_array().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0]["table"], "messages");
        assert_eq!(changes[1]["event"], "UPDATE");
    }

    #[test]
    fn test_heartbeat_frame() {
        let frame: Value = serde_json::from_str(&heartbeat_frame(7)).unwrap();
        assert_eq!(frame["topic"], "phoenix");
        assert_eq!(frame["ref"], "7");
    }

    #[test]
    fn test_message_insert_is_decoded() {
        let text = change(
            "messages",
            "INSERT",
            json!({
                "id": "m1",
                "conversation_id": "c1",
                "sender_id": "u1",
                "receiver_id": "u2",
                "body": "hi",
                "product_id": null,
                "created_at": "2025-02-01T00:00:00Z"
            }),
        );
        match parse_frame(&text) {
            Some(ChangeEvent::MessageInserted(msg)) => assert_eq!(msg.body, "hi"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_conversation_update_is_decoded() {
        let text = change(
            "conversations",
            "UPDATE",
            json!({
                "id": "c1",
                "participant_a": "u1",
                "participant_b": "u2",
                "last_message": "hi",
                "last_message_at": "2025-02-01T00:00:00Z",
                "created_at": "2025-01-01T00:00:00Z"
            }),
        );
        assert!(matches!(
            parse_frame(&text),
            Some(ChangeEvent::ConversationUpdated(ref c)) if c.id == "c1"
        ));
    }

    #[test]
    fn test_other_frames_are_ignored() {
        assert!(parse_frame(&change("products", "INSERT", json!({}))).is_none());
        assert!(parse_frame(&change("messages", "DELETE", json!({}))).is_none());
        assert!(parse_frame(&change("messages", "INSERT", json!({"id": "m1"}))).is_none());
        assert!(parse_frame(r#"{"topic":"phoenix","event":"phx_reply","payload":{"status":"ok"}}"#).is_none());
        assert!(parse_frame("not json").is_none());
    }
}
