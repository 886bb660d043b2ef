//! Chat surface flows: slash command, shortcuts, modal submission and message auto-shortening.

use std::sync::Arc;

use async_trait::async_trait;
use linkbot_core::{
    DeliveryContext, DeliveryError, DomainDirectory, ShortenError, ShortenOrchestrator,
    ShortenRequest, ShortenResult,
};
use tracing::{info, warn};

use crate::{
    blocks::{
        shorten_modal, success_modal, ShortenModalParams, DOMAIN_ACTION_ID, DOMAIN_BLOCK_ID,
        URL_ACTION_ID, URL_BLOCK_ID,
    },
    client::{ChatClient, ChatClientError},
    commands::{parse_shorturl_command, ShortUrlCommand, SlashCommandPayload},
    events::{
        BlockActionEvent, EventContext, EventHandlerError, GlobalShortcutEvent, MessageService,
        MessageShortcutEvent, ModalService, NewMessageEvent, ShortcutService,
        SlashCommandService,
    },
    input::{extract_first_url, normalize_http_url},
    state::validate_shorten_form,
};

pub const MODAL_FALLBACK_TEXT: &str = "Failed to open modal. Try: /shorturl https://example.com";
pub const NO_MESSAGE_TEXT: &str = "No URL found in the selected message.";
pub const NO_URL_IN_MESSAGE: &str =
    "No URL found. Select a message that contains a link, or use /shorturl <link>.";

pub struct ShortenChatService {
    orchestrator: Arc<ShortenOrchestrator>,
    client: Arc<dyn ChatClient>,
    domains: Arc<DomainDirectory>,
}

impl ShortenChatService {
    pub fn new(
        orchestrator: Arc<ShortenOrchestrator>,
        client: Arc<dyn ChatClient>,
        domains: Arc<DomainDirectory>,
    ) -> Self {
        Self { orchestrator, client, domains }
    }

    fn blank_modal(&self) -> crate::blocks::ModalView {
        shorten_modal(ShortenModalParams {
            domains: self.domains.domains(),
            selected_domain_id: self.default_domain_id(),
            ..ShortenModalParams::default()
        })
    }

    fn default_domain_id(&self) -> Option<&str> {
        self.domains
            .initial_choice(&self.orchestrator.settings().default_domain_id)
            .map(|domain| domain.id.as_str())
    }

    /// Private notice to the user: ephemeral in a channel, a direct message otherwise.
    async fn notify(
        &self,
        channel_id: Option<&str>,
        user_id: &str,
        text: &str,
    ) -> Result<(), ChatClientError> {
        match channel_id {
            Some(channel_id) => self.client.post_ephemeral(channel_id, user_id, text).await,
            None => self.client.dm_user(user_id, text).await,
        }
    }

    /// Posts the short url to the channel, or to the user directly when there is none.
    async fn deliver(
        &self,
        short_url: &str,
        channel_id: Option<&str>,
        user_id: &str,
        context: &DeliveryContext,
    ) -> Result<(), DeliveryError> {
        let outcome = match channel_id {
            Some(channel_id) => self.client.post_message(channel_id, short_url).await,
            None => self.client.dm_user(user_id, short_url).await,
        };
        outcome.map_err(|error| {
            warn!(
                event_name = "egress.chat.delivery_failed",
                request_id = %context.request_id,
                user_id,
                error = %error,
                "could not deliver short link"
            );
            DeliveryError::new(error.to_string())
        })
    }

    async fn shorten_and_deliver(
        &self,
        long_url: String,
        channel_id: Option<&str>,
        user_id: &str,
    ) -> Result<ShortenResult, ShortenError> {
        self.orchestrator
            .run(ShortenRequest::new(long_url), None, |short_url, context| async move {
                self.deliver(&short_url, channel_id, user_id, &context).await
            })
            .await
    }

    async fn report_failure(
        &self,
        channel_id: Option<&str>,
        user_id: &str,
        error: &ShortenError,
        ctx: &EventContext,
    ) -> Result<(), ChatClientError> {
        warn!(
            event_name = "chat.shorten.failed",
            correlation_id = %ctx.correlation_id,
            error = %error,
            "shortening failed"
        );
        self.notify(channel_id, user_id, &format!("REDR error: {}", error.user_message())).await
    }
}

#[async_trait]
impl SlashCommandService for ShortenChatService {
    async fn handle_slash_command(
        &self,
        payload: &SlashCommandPayload,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let channel_id = payload.channel_id.as_deref();

        match parse_shorturl_command(payload)? {
            ShortUrlCommand::OpenModal => {
                let opened = self.client.open_modal(&payload.trigger_id, self.blank_modal()).await;
                if let Err(error) = opened {
                    warn!(
                        event_name = "chat.modal.open_failed",
                        correlation_id = %ctx.correlation_id,
                        error = %error,
                        "could not open shorten modal"
                    );
                    self.notify(channel_id, &payload.user_id, MODAL_FALLBACK_TEXT).await?;
                }
            }
            ShortUrlCommand::InvalidUrl { raw, error } => {
                self.notify(channel_id, &payload.user_id, &format!("Invalid URL: {error}")).await?;
                let modal = shorten_modal(ShortenModalParams {
                    initial_url: Some(&raw),
                    domains: self.domains.domains(),
                    selected_domain_id: self.default_domain_id(),
                    ..ShortenModalParams::default()
                });
                self.client.open_modal(&payload.trigger_id, modal).await?;
            }
            ShortUrlCommand::Shorten { long_url } => {
                let outcome =
                    self.shorten_and_deliver(long_url, channel_id, &payload.user_id).await;
                if let Err(error) = outcome {
                    self.report_failure(channel_id, &payload.user_id, &error, ctx).await?;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ShortcutService for ShortenChatService {
    async fn handle_global_shortcut(
        &self,
        event: &GlobalShortcutEvent,
        _ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        self.client.open_modal(&event.trigger_id, self.blank_modal()).await?;
        Ok(())
    }

    async fn handle_message_shortcut(
        &self,
        event: &MessageShortcutEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let channel_id = Some(event.channel_id.as_str());
        let text = match &event.text {
            Some(text) => Some(text.clone()),
            None => self.client.fetch_message_text(&event.channel_id, &event.message_id).await?,
        };

        let Some(text) = text.filter(|text| !text.trim().is_empty()) else {
            self.notify(channel_id, &event.user_id, NO_MESSAGE_TEXT).await?;
            return Ok(());
        };
        let Some(raw) = extract_first_url(&text) else {
            self.notify(channel_id, &event.user_id, NO_URL_IN_MESSAGE).await?;
            return Ok(());
        };
        let long_url = match normalize_http_url(&raw) {
            Ok(long_url) => long_url,
            Err(error) => {
                let message = format!("Invalid URL in message: {error}");
                self.notify(channel_id, &event.user_id, &message).await?;
                return Ok(());
            }
        };

        if let Err(error) = self.shorten_and_deliver(long_url, channel_id, &event.user_id).await {
            self.report_failure(channel_id, &event.user_id, &error, ctx).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ModalService for ShortenChatService {
    async fn handle_modal_submit(
        &self,
        event: &BlockActionEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let channel_id = event.channel_id.as_deref();
        let initial_url = event.state.read_input(URL_BLOCK_ID, URL_ACTION_ID);
        let selected_domain_id = event
            .state
            .read_static_select(DOMAIN_BLOCK_ID, DOMAIN_ACTION_ID)
            .or_else(|| self.default_domain_id().map(str::to_owned));

        let request = match validate_shorten_form(&event.state) {
            Ok(request) => request,
            Err(errors) => {
                let Some(view_id) = &event.view_id else {
                    warn!(
                        event_name = "chat.modal.missing_view",
                        correlation_id = %ctx.correlation_id,
                        "cannot show form errors without a view id"
                    );
                    return Ok(());
                };
                let modal = shorten_modal(ShortenModalParams {
                    initial_url: (!initial_url.is_empty()).then_some(initial_url.as_str()),
                    errors: Some(&errors),
                    domains: self.domains.domains(),
                    selected_domain_id: selected_domain_id.as_deref(),
                })
                .with_view_id(view_id.as_str());
                self.client.update_view(view_id, modal).await?;
                return Ok(());
            }
        };

        let view_id = event.view_id.as_deref();
        let outcome = self
            .orchestrator
            .run(request, selected_domain_id.as_deref(), |short_url, context| async move {
                if let Some(channel_id) = channel_id {
                    self.deliver(&short_url, Some(channel_id), &event.user_id, &context).await?;
                }
                if let Some(view_id) = view_id {
                    let success = success_modal(&short_url).with_view_id(view_id);
                    self.client
                        .update_view(view_id, success)
                        .await
                        .map_err(|error| DeliveryError::new(error.to_string()))?;
                }
                Ok::<(), DeliveryError>(())
            })
            .await;

        match outcome {
            Ok(result) => {
                info!(
                    event_name = "chat.modal.shortened",
                    correlation_id = %ctx.correlation_id,
                    request_id = %result.request_id,
                    "modal submission shortened"
                );
            }
            Err(error) => {
                warn!(
                    event_name = "chat.shorten.failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "modal shortening failed"
                );
                if let Some(channel_id) = channel_id {
                    let message = format!("REDR error: {}", error.user_message());
                    self.client.post_ephemeral(channel_id, &event.user_id, &message).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageService for ShortenChatService {
    async fn handle_new_message(
        &self,
        event: &NewMessageEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let Some(raw) = extract_first_url(&event.text) else {
            return Ok(());
        };
        let Ok(long_url) = normalize_http_url(&raw) else {
            return Ok(());
        };

        let outcome = self
            .orchestrator
            .run(ShortenRequest::new(long_url), None, |short_url, context| async move {
                self.deliver(&short_url, Some(&event.channel_id), &event.user_id, &context).await
            })
            .await;

        if let Err(error) = outcome {
            warn!(
                event_name = "chat.auto_shorten.failed",
                correlation_id = %ctx.correlation_id,
                channel_id = %event.channel_id,
                error = %error,
                "auto-shortening failed"
            );
        }
        Ok(())
    }
}
