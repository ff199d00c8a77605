use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{Connection, Message};
use crate::container::{Injectable, Instance, ServiceId};
use crate::error::DispatchError;
use crate::router::build_path;

/// Mount prefix used when a gateway does not declare one.
pub const DEFAULT_PREFIX: &str = "ws";

type ConnectionFn =
    Arc<dyn Fn(&Instance, &Arc<dyn Connection>) -> Result<(), DispatchError> + Send + Sync>;
type MessageFn = Arc<dyn Fn(&Instance, &Message) -> Result<(), DispatchError> + Send + Sync>;

/// A type that handles WebSocket traffic on one path.
pub trait Gateway: Injectable {
    fn handlers(handlers: &mut GatewayHandlers<Self>);
}

fn downcast<G: Send + Sync + 'static>(instance: &Instance) -> Result<&G, DispatchError> {
    (**instance)
        .downcast_ref::<G>()
        .ok_or_else(|| DispatchError::handler(format!("gateway instance is not a {}", type_name::<G>())))
}

/// A connect or disconnect hook.
#[derive(Clone)]
pub struct ConnectionHook {
    name: &'static str,
    invoke: ConnectionFn,
}

impl ConnectionHook {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// # Errors
    ///
    /// Whatever the hook returns, or `Handler` if `gateway` has the wrong type.
    pub fn invoke(
        &self,
        gateway: &Instance,
        connection: &Arc<dyn Connection>,
    ) -> Result<(), DispatchError> {
        (self.invoke)(gateway, connection)
    }
}

/// A message handler, optionally restricted to one message `type`.
#[derive(Clone)]
pub struct MessageHandler {
    name: &'static str,
    message_type: Option<String>,
    invoke: MessageFn,
}

impl MessageHandler {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    /// `true` for a catch-all handler or when the types are equal.
    #[must_use]
    pub fn accepts(&self, message_type: Option<&str>) -> bool {
        match &self.message_type {
            None => true,
            Some(expected) => message_type == Some(expected.as_str()),
        }
    }

    /// # Errors
    ///
    /// Whatever the handler returns, or `Handler` if `gateway` has the wrong type.
    pub fn invoke(&self, gateway: &Instance, message: &Message) -> Result<(), DispatchError> {
        (self.invoke)(gateway, message)
    }
}

/// Hook declarations collected from one [`Gateway`].
pub struct GatewayHandlers<G> {
    path: String,
    prefix: String,
    on_connection: Option<ConnectionHook>,
    on_message: Vec<MessageHandler>,
    on_disconnection: Option<ConnectionHook>,
    _gateway: PhantomData<fn() -> G>,
}

impl<G: Gateway> GatewayHandlers<G> {
    pub(crate) fn new() -> Self {
        Self {
            path: String::new(),
            prefix: DEFAULT_PREFIX.to_string(),
            on_connection: None,
            on_message: Vec::new(),
            on_disconnection: None,
            _gateway: PhantomData,
        }
    }

    pub fn path(&mut self, path: &str) -> &mut Self {
        self.path = path.to_string();
        self
    }

    /// Replace the default `ws` prefix.
    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Hook run when a client connects. A later declaration replaces an earlier one.
    pub fn on_connection<F>(&mut self, name: &'static str, f: F) -> &mut Self
    where
        F: Fn(&G, &Arc<dyn Connection>) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.on_connection = Some(connection_hook::<G, F>(name, f));
        self
    }

    /// Catch-all message handler.
    pub fn on_message<F>(&mut self, name: &'static str, f: F) -> &mut Self
    where
        F: Fn(&G, &Message) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.push_message(name, None, f)
    }

    /// Handler for messages whose `type` field equals `message_type`.
    pub fn on_message_type<F>(&mut self, message_type: &str, name: &'static str, f: F) -> &mut Self
    where
        F: Fn(&G, &Message) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.push_message(name, Some(message_type.to_string()), f)
    }

    /// Hook run after a client disconnects. A later declaration replaces an earlier one.
    pub fn on_disconnection<F>(&mut self, name: &'static str, f: F) -> &mut Self
    where
        F: Fn(&G, &Arc<dyn Connection>) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.on_disconnection = Some(connection_hook::<G, F>(name, f));
        self
    }

    fn push_message<F>(&mut self, name: &'static str, message_type: Option<String>, f: F) -> &mut Self
    where
        F: Fn(&G, &Message) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        let invoke: MessageFn = Arc::new(move |instance: &Instance, message: &Message| {
            f(downcast::<G>(instance)?, message)
        });
        self.on_message.push(MessageHandler {
            name,
            message_type,
            invoke,
        });
        self
    }

    pub(crate) fn into_definition(self) -> GatewayDefinition {
        GatewayDefinition {
            id: ServiceId::of::<G>(),
            path: build_path(&self.prefix, &self.path),
            on_connection: self.on_connection,
            on_message: self.on_message,
            on_disconnection: self.on_disconnection,
        }
    }
}

fn connection_hook<G, F>(name: &'static str, f: F) -> ConnectionHook
where
    G: Gateway,
    F: Fn(&G, &Arc<dyn Connection>) -> Result<(), DispatchError> + Send + Sync + 'static,
{
    let invoke: ConnectionFn = Arc::new(move |instance: &Instance, connection: &Arc<dyn Connection>| {
        f(downcast::<G>(instance)?, connection)
    });
    ConnectionHook { name, invoke }
}

/// A registered gateway: its container id, full path and hooks.
#[derive(Clone)]
pub struct GatewayDefinition {
    id: ServiceId,
    path: String,
    on_connection: Option<ConnectionHook>,
    on_message: Vec<MessageHandler>,
    on_disconnection: Option<ConnectionHook>,
}

impl GatewayDefinition {
    /// Collect `G`'s declarations.
    #[must_use]
    pub fn of<G: Gateway>() -> Self {
        let mut handlers = GatewayHandlers::<G>::new();
        G::handlers(&mut handlers);
        handlers.into_definition()
    }

    #[must_use]
    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    /// Slash-normalized `prefix + path`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn on_connection(&self) -> Option<&ConnectionHook> {
        self.on_connection.as_ref()
    }

    #[must_use]
    pub fn message_handlers(&self) -> &[MessageHandler] {
        &self.on_message
    }

    #[must_use]
    pub fn on_disconnection(&self) -> Option<&ConnectionHook> {
        self.on_disconnection.as_ref()
    }

    /// The first handler accepting `message_type`.
    #[must_use]
    pub fn handler_for(&self, message_type: Option<&str>) -> Option<&MessageHandler> {
        self.on_message.iter().find(|h| h.accepts(message_type))
    }
}

impl std::fmt::Debug for GatewayDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayDefinition")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("on_connection", &self.on_connection.as_ref().map(ConnectionHook::name))
            .field(
                "on_message",
                &self
                    .on_message
                    .iter()
                    .map(|h| (h.name, h.message_type.as_deref()))
                    .collect::<Vec<_>>(),
            )
            .field(
                "on_disconnection",
                &self.on_disconnection.as_ref().map(ConnectionHook::name),
            )
            .finish()
    }
}
