//! Base trait for channel handlers

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Trait for channel handlers
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Check if the channel is running
    fn is_running(&self) -> bool;

    /// Start the channel handler
    async fn start(&mut self) -> Result<()>;

    /// Stop the channel handler
    async fn stop(&mut self) -> Result<()>;
}

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel error: {0}")]
    Error(String),

    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Channel not running: {0}")]
    NotRunning(String),

    #[error("Send error: {0}")]
    SendError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// Shared channel handler type
pub type ChannelHandlerPtr = Arc<RwLock<dyn ChannelHandler>>;
