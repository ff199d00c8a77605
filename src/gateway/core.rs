use std::sync::Arc;

use tracing::{debug, info};

use super::{Connection, Gateway, GatewayDefinition, Message};
use crate::container::{Container, ServiceId};
use crate::error::DispatchError;

/// Registered gateways, in registration order.
#[derive(Debug, Default)]
pub struct GatewayRegistry {
    gateways: Vec<Arc<GatewayDefinition>>,
}

impl GatewayRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect `G`'s declarations and add them.
    ///
    /// Registering the same gateway type again replaces its definition in place.
    pub fn register<G: Gateway>(&mut self) -> &mut Self {
        self.add(GatewayDefinition::of::<G>())
    }

    pub fn add(&mut self, definition: GatewayDefinition) -> &mut Self {
        info!(
            gateway = %definition.id().short_name(),
            path = %definition.path(),
            message_handlers = definition.message_handlers().len(),
            "Gateway registered"
        );
        let definition = Arc::new(definition);
        match self.gateways.iter_mut().find(|g| g.id() == definition.id()) {
            Some(existing) => *existing = definition,
            None => self.gateways.push(definition),
        }
        self
    }

    #[must_use]
    pub fn get(&self, id: &ServiceId) -> Option<Arc<GatewayDefinition>> {
        self.gateways.iter().find(|g| g.id() == id).cloned()
    }

    /// The first gateway mounted exactly on `path`.
    #[must_use]
    pub fn by_path(&self, path: &str) -> Option<Arc<GatewayDefinition>> {
        self.gateways.iter().find(|g| g.path() == path).cloned()
    }

    #[must_use]
    pub fn gateways(&self) -> &[Arc<GatewayDefinition>] {
        &self.gateways
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

/// Invokes gateway hooks on container-resolved gateway instances.
///
/// Gateways are resolved through the container on every call, so each gateway type is a
/// singleton shared by all of its connections.
#[derive(Debug, Clone, Copy)]
pub struct GatewayDispatcher<'a> {
    container: &'a Container,
}

impl<'a> GatewayDispatcher<'a> {
    #[must_use]
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Run the connection hook, if the gateway declares one.
    ///
    /// # Returns
    ///
    /// `true` if a hook ran. Without a hook the gateway is not resolved.
    ///
    /// # Errors
    ///
    /// `Container` if the gateway cannot be built, or the hook's own error.
    pub fn dispatch_connection(
        &self,
        gateway: &GatewayDefinition,
        connection: &Arc<dyn Connection>,
    ) -> Result<bool, DispatchError> {
        let Some(hook) = gateway.on_connection() else {
            return Ok(false);
        };
        let instance = self.container.resolve_id(gateway.id())?;
        hook.invoke(&instance, connection)?;
        debug!(
            gateway = %gateway.id().short_name(),
            connection = %connection.id(),
            hook = hook.name(),
            "Gateway connection dispatched"
        );
        Ok(true)
    }

    /// Run the first message handler that accepts the message's `type`.
    ///
    /// # Returns
    ///
    /// `true` if a handler ran, `false` if none matched.
    ///
    /// # Errors
    ///
    /// `Container` if the gateway cannot be built, or the handler's own error.
    pub fn dispatch_message(
        &self,
        gateway: &GatewayDefinition,
        message: &Message,
    ) -> Result<bool, DispatchError> {
        let instance = self.container.resolve_id(gateway.id())?;
        let Some(handler) = gateway.handler_for(message.message_type()) else {
            debug!(
                gateway = %gateway.id().short_name(),
                message_type = ?message.message_type(),
                "No message handler matched"
            );
            return Ok(false);
        };
        handler.invoke(&instance, message)?;
        debug!(
            gateway = %gateway.id().short_name(),
            connection = %message.connection().id(),
            message_type = ?message.message_type(),
            handler = handler.name(),
            "Gateway message dispatched"
        );
        Ok(true)
    }

    /// Run the disconnection hook, if the gateway declares one.
    ///
    /// # Returns
    ///
    /// `true` if a hook ran. Without a hook the gateway is not resolved.
    ///
    /// # Errors
    ///
    /// `Container` if the gateway cannot be built, or the hook's own error.
    pub fn dispatch_disconnection(
        &self,
        gateway: &GatewayDefinition,
        connection: &Arc<dyn Connection>,
    ) -> Result<bool, DispatchError> {
        let Some(hook) = gateway.on_disconnection() else {
            return Ok(false);
        };
        let instance = self.container.resolve_id(gateway.id())?;
        hook.invoke(&instance, connection)?;
        debug!(
            gateway = %gateway.id().short_name(),
            connection = %connection.id(),
            hook = hook.name(),
            "Gateway disconnection dispatched"
        );
        Ok(true)
    }
}
