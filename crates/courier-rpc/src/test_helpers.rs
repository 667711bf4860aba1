//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::time::Duration;

use courier_core::{ReplySink, SendError};
use serde_json::Value;
use tokio::sync::mpsc;

/// Sink that forwards every reply into an unbounded channel.
pub struct RecordingSink {
    id: String,
    tx: mpsc::UnboundedSender<Arc<String>>,
}

impl ReplySink for RecordingSink {
    fn id(&self) -> &str {
        &self.id
    }

    fn send_text(&self, text: Arc<String>) -> Result<(), SendError> {
        self.tx.send(text).map_err(|_| SendError::Closed)
    }
}

pub fn recording_sink() -> (Arc<dyn ReplySink>, mpsc::UnboundedReceiver<Arc<String>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = RecordingSink {
        id: "conn_test".into(),
        tx,
    };
    (Arc::new(sink), rx)
}

/// Wait for the next reply, failing the test after a second.
pub async fn next_reply(rx: &mut mpsc::UnboundedReceiver<Arc<String>>) -> Value {
    let text = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for reply")
        .expect("sink closed");
    serde_json::from_str(&text).unwrap()
}

/// Everything already queued.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Arc<String>>) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(text) = rx.try_recv() {
        out.push(serde_json::from_str(&text).unwrap());
    }
    out
}
