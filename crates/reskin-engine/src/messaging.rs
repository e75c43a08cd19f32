//! Runtime messages to the privileged background context

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Request sent by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeMessage {
    /// Open the extension options page
    OpenOptions,
}

/// Reply to a [`RuntimeMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
}

/// Privileged navigation performed by the background context
#[async_trait]
pub trait OptionsOpener: Send + Sync + Debug {
    /// Open the options page
    async fn open_options(&self);
}

/// Background message dispatcher
#[derive(Debug, Clone)]
pub struct BackgroundRouter {
    opener: Arc<dyn OptionsOpener>,
}

impl BackgroundRouter {
    /// Router delegating to `opener`
    #[must_use]
    pub fn new(opener: Arc<dyn OptionsOpener>) -> Self {
        Self { opener }
    }

    /// Handle a typed message
    pub async fn handle(&self, message: RuntimeMessage) -> MessageResponse {
        match message {
            RuntimeMessage::OpenOptions => {
                self.opener.open_options().await;
                MessageResponse { success: true }
            }
        }
    }

    /// Handle a raw JSON message; anything unrecognised fails softly
    pub async fn handle_raw(&self, raw: &Value) -> MessageResponse {
        match serde_json::from_value::<RuntimeMessage>(raw.clone()) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                tracing::debug!(error = %e, "unknown runtime message");
                MessageResponse { success: false }
            }
        }
    }
}
