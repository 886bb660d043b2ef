use std::time::Duration;

use async_trait::async_trait;
use linkbot_chat::{
    blocks::ModalView,
    client::{ChatAction, ChatClient, ChatClientError},
};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client, Response,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum BridgeBuildError {
    #[error("invalid chat callback url `{0}`")]
    InvalidCallbackUrl(String),
    #[error("chat bot token contains characters that are not valid in an HTTP header")]
    InvalidBotToken,
    #[error("could not build chat http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Sends every outbound chat action as JSON to the platform bridge at `callback_url`.
pub struct HttpChatClient {
    client: Client,
    callback_url: Url,
}

impl HttpChatClient {
    pub fn new(
        callback_url: &str,
        bot_token: Option<&SecretString>,
        timeout: Duration,
    ) -> Result<Self, BridgeBuildError> {
        let callback_url = Url::parse(callback_url)
            .map_err(|_| BridgeBuildError::InvalidCallbackUrl(callback_url.to_owned()))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = bot_token {
            let mut authorization =
                HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                    .map_err(|_| BridgeBuildError::InvalidBotToken)?;
            authorization.set_sensitive(true);
            headers.insert(AUTHORIZATION, authorization);
        }

        let client = Client::builder().default_headers(headers).timeout(timeout).build()?;
        Ok(Self { client, callback_url })
    }

    async fn send(&self, action: ChatAction) -> Result<Response, ChatClientError> {
        let name = action.name();
        let response = self
            .client
            .post(self.callback_url.clone())
            .json(&action)
            .send()
            .await
            .map_err(|error| ChatClientError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatClientError::Rejected { action: name, status: status.as_u16() });
        }

        debug!(event_name = "egress.chat.action_sent", action = name, "chat action delivered");
        Ok(response)
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn open_modal(&self, trigger_id: &str, view: ModalView) -> Result<(), ChatClientError> {
        self.send(ChatAction::OpenModal { trigger_id: trigger_id.to_owned(), view }).await?;
        Ok(())
    }

    async fn update_view(&self, view_id: &str, view: ModalView) -> Result<(), ChatClientError> {
        self.send(ChatAction::UpdateView { view_id: view_id.to_owned(), view }).await?;
        Ok(())
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), ChatClientError> {
        self.send(ChatAction::PostMessage {
            channel_id: channel_id.to_owned(),
            text: text.to_owned(),
        })
        .await?;
        Ok(())
    }

    async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), ChatClientError> {
        self.send(ChatAction::PostEphemeral {
            channel_id: channel_id.to_owned(),
            user_id: user_id.to_owned(),
            text: text.to_owned(),
        })
        .await?;
        Ok(())
    }

    async fn dm_user(&self, user_id: &str, text: &str) -> Result<(), ChatClientError> {
        self.send(ChatAction::DmUser { user_id: user_id.to_owned(), text: text.to_owned() })
            .await?;
        Ok(())
    }

    /// The bridge answers with `{"text": ...}`; a missing or blank text means none.
    async fn fetch_message_text(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<Option<String>, ChatClientError> {
        let response = self
            .send(ChatAction::FetchMessage {
                channel_id: channel_id.to_owned(),
                message_id: message_id.to_owned(),
            })
            .await?;
        let body: Value = response
            .json()
            .await
            .map_err(|error| ChatClientError::Malformed(error.to_string()))?;

        Ok(body
            .get("text")
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_owned))
    }
}
