use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use ulid::Ulid;

/// One open WebSocket connection, as seen by gateway hooks.
///
/// Drivers implement this over their socket handle. Attributes are per-connection state
/// that hooks share across messages (e.g. the authenticated user).
pub trait Connection: Send + Sync {
    fn id(&self) -> &str;

    /// Queue a JSON frame for the client.
    fn send(&self, data: Value);

    fn close(&self);

    fn attribute(&self, key: &str) -> Option<Value>;

    fn set_attribute(&self, key: &str, value: Value);
}

/// In-process [`Connection`] that buffers outgoing frames.
///
/// Useful for drivers that flush frames after the hook returns, and for exercising
/// gateways without a socket.
#[derive(Debug)]
pub struct BufferedConnection {
    id: String,
    outbox: Mutex<Vec<Value>>,
    attributes: Mutex<HashMap<String, Value>>,
    closed: AtomicBool,
}

impl BufferedConnection {
    /// A connection with a generated `conn_<ulid>` id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(format!("conn_{}", Ulid::new()))
    }

    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outbox: Mutex::new(Vec::new()),
            attributes: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Frames sent so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<Value> {
        self.outbox.lock().clone()
    }

    /// Remove and return the buffered frames.
    pub fn drain(&self) -> Vec<Value> {
        std::mem::take(&mut *self.outbox.lock())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for BufferedConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for BufferedConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, data: Value) {
        if !self.is_closed() {
            self.outbox.lock().push(data);
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn attribute(&self, key: &str) -> Option<Value> {
        self.attributes.lock().get(key).cloned()
    }

    fn set_attribute(&self, key: &str, value: Value) {
        self.attributes.lock().insert(key.to_string(), value);
    }
}

/// A decoded client message and the connection it arrived on.
#[derive(Clone)]
pub struct Message {
    data: Value,
    connection: Arc<dyn Connection>,
}

impl Message {
    #[must_use]
    pub fn new(data: Value, connection: Arc<dyn Connection>) -> Self {
        Self { data, connection }
    }

    /// Decode a text frame.
    ///
    /// A JSON object is used as is; anything else is wrapped as
    /// `{"type": "unknown", "data": <text>}`.
    #[must_use]
    pub fn from_text(text: &str, connection: Arc<dyn Connection>) -> Self {
        let data = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Value::Object(map),
            _ => json!({ "type": "unknown", "data": text }),
        };
        Self::new(data, connection)
    }

    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// The message payload as an object, if it is one.
    #[must_use]
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.data.as_object()
    }

    #[must_use]
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// The string `type` field, used to pick a message handler.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.data.get("type").and_then(Value::as_str)
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("connection", &self.connection.id())
            .field("data", &self.data)
            .finish()
    }
}
