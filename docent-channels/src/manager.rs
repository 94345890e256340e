//! Channel manager

use crate::base::{ChannelError, ChannelHandler, ChannelHandlerPtr, Result};
use crate::websocket::WebSocketGateway;
use docent_core::config::Config;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Channel manager that coordinates all channel handlers
pub struct ChannelManager {
    /// Configuration
    config: Config,
    /// Channel handlers
    handlers: RwLock<HashMap<String, ChannelHandlerPtr>>,
}

impl ChannelManager {
    /// Create a new channel manager
    pub fn new(config: Config) -> Self {
        Self {
            config,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Initialize channels based on configuration
    pub async fn initialize(&self) -> Result<()> {
        let mut handlers = self.handlers.write().await;

        // Initialize the WebSocket gateway
        if self.config.gateway.enabled {
            let handler = WebSocketGateway::new(self.config.clone());
            handlers.insert(
                "websocket".to_string(),
                Arc::new(RwLock::new(handler)) as Arc<RwLock<dyn ChannelHandler>>,
            );
            tracing::info!("WebSocket gateway initialized");
        } else {
            tracing::warn!("Gateway disabled; no chat channel will be started");
        }

        Ok(())
    }

    /// Start all channel handlers.
    ///
    /// A handler that fails to start is fatal: the service cannot run
    /// without its only user-facing channel.
    pub async fn start_all(&self) -> Result<()> {
        let handlers = self.handlers.read().await;

        for (name, handler) in handlers.iter() {
            tracing::info!("Starting {} channel...", name);
            let mut handler = handler.write().await;
            handler.start().await?;
        }

        Ok(())
    }

    /// Stop all channel handlers
    pub async fn stop_all(&self) -> Result<()> {
        let mut handlers = self.handlers.write().await;

        for (name, handler) in handlers.iter_mut() {
            tracing::info!("Stopping {} channel...", name);
            let mut handler = handler.write().await;
            if let Err(e) = handler.stop().await {
                tracing::error!("Failed to stop {} channel: {}", name, e);
            }
        }

        handlers.clear();
        Ok(())
    }

    /// Get a channel handler by name
    pub async fn get_handler(&self, name: &str) -> Option<ChannelHandlerPtr> {
        let handlers = self.handlers.read().await;
        handlers.get(name).cloned()
    }

    /// Check if a channel is running
    pub async fn is_channel_running(&self, name: &str) -> Result<bool> {
        let handlers = self.handlers.read().await;
        let handler = handlers
            .get(name)
            .ok_or_else(|| ChannelError::NotConfigured(name.to_string()))?;

        let handler = handler.read().await;
        Ok(handler.is_running())
    }

    /// Get list of active channels
    pub async fn list_channels(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        handlers.keys().cloned().collect()
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
