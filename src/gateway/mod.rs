//! # Gateway Module
//!
//! Message-level dispatch for WebSocket gateways, the counterpart of the router and
//! dispatcher for HTTP.
//!
//! ## Overview
//!
//! A [`Gateway`] is a container-built type that declares, through [`GatewayHandlers`], the
//! path it is mounted on and its hooks:
//!
//! - an optional connection hook,
//! - an ordered list of message handlers, each either bound to a message `type` or
//!   accepting every message,
//! - an optional disconnection hook.
//!
//! [`GatewayRegistry`] keeps the declarations and finds the gateway for a handshake path.
//! [`GatewayDispatcher`] resolves the gateway instance from the [`Container`](crate::Container)
//! and invokes the matching hook. The transport (handshake, frames, fan-out) belongs to the
//! driver; it hands the dispatcher a [`Connection`] and decoded [`Message`]s.
//!
//! ## Message Matching
//!
//! Message handlers are tried in declaration order and only the **first** match runs:
//!
//! | Handler declared with | Runs for |
//! |---|---|
//! | `on_message_type("chat", ..)` | messages whose `type` field is `"chat"` |
//! | `on_message(..)` | any message, including ones without a `type` |
//!
//! ```rust,ignore
//! impl Gateway for ChatGateway {
//!     fn handlers(h: &mut GatewayHandlers<Self>) {
//!         h.path("/chat");
//!         h.on_connection("join", |g, conn| g.join(conn));
//!         h.on_message_type("ping", "pong", |_, msg| {
//!             msg.connection().send(json!({ "type": "pong" }));
//!             Ok(())
//!         });
//!         h.on_message("relay", |g, msg| g.relay(msg));
//!     }
//! }
//! // Mounted at /ws/chat
//! ```

mod connection;
mod core;
mod declare;

pub use connection::{BufferedConnection, Connection, Message};
pub use core::{GatewayDispatcher, GatewayRegistry};
pub use declare::{
    ConnectionHook, Gateway, GatewayDefinition, GatewayHandlers, MessageHandler, DEFAULT_PREFIX,
};
