use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::blocks::ModalView;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatClientError {
    #[error("chat platform request failed: {0}")]
    Transport(String),
    #[error("chat platform rejected `{action}` with status {status}")]
    Rejected { action: &'static str, status: u16 },
    #[error("chat platform response was malformed: {0}")]
    Malformed(String),
}

/// One outbound call to the chat platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChatAction {
    OpenModal { trigger_id: String, view: ModalView },
    UpdateView { view_id: String, view: ModalView },
    PostMessage { channel_id: String, text: String },
    PostEphemeral { channel_id: String, user_id: String, text: String },
    DmUser { user_id: String, text: String },
    FetchMessage { channel_id: String, message_id: String },
}

impl ChatAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenModal { .. } => "open_modal",
            Self::UpdateView { .. } => "update_view",
            Self::PostMessage { .. } => "post_message",
            Self::PostEphemeral { .. } => "post_ephemeral",
            Self::DmUser { .. } => "dm_user",
            Self::FetchMessage { .. } => "fetch_message",
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn open_modal(&self, trigger_id: &str, view: ModalView) -> Result<(), ChatClientError>;
    async fn update_view(&self, view_id: &str, view: ModalView) -> Result<(), ChatClientError>;
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), ChatClientError>;
    async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), ChatClientError>;
    async fn dm_user(&self, user_id: &str, text: &str) -> Result<(), ChatClientError>;
    /// Text of a stored message, `None` when it has no text.
    async fn fetch_message_text(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<Option<String>, ChatClientError>;
}

/// Client used when no platform bridge is configured; every call is logged and succeeds.
#[derive(Default)]
pub struct LoggingChatClient;

impl LoggingChatClient {
    fn record(&self, action: &ChatAction) {
        info!(
            event_name = "egress.chat.action_logged",
            action = action.name(),
            payload = %serde_json::to_string(action).unwrap_or_default(),
            "chat action (no platform bridge configured)"
        );
    }
}

#[async_trait]
impl ChatClient for LoggingChatClient {
    async fn open_modal(&self, trigger_id: &str, view: ModalView) -> Result<(), ChatClientError> {
        self.record(&ChatAction::OpenModal { trigger_id: trigger_id.to_owned(), view });
        Ok(())
    }

    async fn update_view(&self, view_id: &str, view: ModalView) -> Result<(), ChatClientError> {
        self.record(&ChatAction::UpdateView { view_id: view_id.to_owned(), view });
        Ok(())
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), ChatClientError> {
        self.record(&ChatAction::PostMessage {
            channel_id: channel_id.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), ChatClientError> {
        self.record(&ChatAction::PostEphemeral {
            channel_id: channel_id.to_owned(),
            user_id: user_id.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn dm_user(&self, user_id: &str, text: &str) -> Result<(), ChatClientError> {
        self.record(&ChatAction::DmUser { user_id: user_id.to_owned(), text: text.to_owned() });
        Ok(())
    }

    async fn fetch_message_text(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<Option<String>, ChatClientError> {
        self.record(&ChatAction::FetchMessage {
            channel_id: channel_id.to_owned(),
            message_id: message_id.to_owned(),
        });
        Ok(None)
    }
}
