use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    blocks::{SHORTEN_MODAL_CALLBACK_ID, SUBMIT_ACTION_ID},
    client::ChatClientError,
    commands::{CommandParseError, SlashCommandPayload},
    state::ModalViewState,
};

#[derive(Clone, Debug, PartialEq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    SlashCommand(SlashCommandPayload),
    GlobalShortcut(GlobalShortcutEvent),
    MessageShortcut(MessageShortcutEvent),
    BlockAction(BlockActionEvent),
    ViewAction(ViewActionEvent),
    NewMessage(NewMessageEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::SlashCommand(_) => ChatEventType::SlashCommand,
            Self::GlobalShortcut(_) => ChatEventType::GlobalShortcut,
            Self::MessageShortcut(_) => ChatEventType::MessageShortcut,
            Self::BlockAction(_) => ChatEventType::BlockAction,
            Self::ViewAction(_) => ChatEventType::ViewAction,
            Self::NewMessage(_) => ChatEventType::NewMessage,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    SlashCommand,
    GlobalShortcut,
    MessageShortcut,
    BlockAction,
    ViewAction,
    NewMessage,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalShortcutEvent {
    pub name: String,
    pub user_id: String,
    pub trigger_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageShortcutEvent {
    pub name: String,
    pub channel_id: String,
    pub message_id: String,
    pub user_id: String,
    /// Present when the platform inlines the message; otherwise it is fetched.
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockActionEvent {
    pub action_id: String,
    pub view_id: Option<String>,
    pub channel_id: Option<String>,
    pub user_id: String,
    pub state: ModalViewState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewActionKind {
    Submit,
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewActionEvent {
    pub callback_id: String,
    pub kind: ViewActionKind,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMessageEvent {
    pub channel_id: String,
    pub message_id: String,
    pub user_id: String,
    pub text: String,
    pub from_bot: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Chat(#[from] ChatClientError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Registers a handler for every surface, all backed by the same `service`.
pub fn default_dispatcher<S>(service: Arc<S>) -> EventDispatcher
where
    S: SlashCommandService + ShortcutService + ModalService + MessageService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(Arc::clone(&service)));
    dispatcher.register(GlobalShortcutHandler::new(Arc::clone(&service)));
    dispatcher.register(MessageShortcutHandler::new(Arc::clone(&service)));
    dispatcher.register(BlockActionHandler::new(Arc::clone(&service)));
    dispatcher.register(ViewActionHandler);
    dispatcher.register(NewMessageHandler::new(service));
    dispatcher
}

#[async_trait]
pub trait SlashCommandService: Send + Sync {
    async fn handle_slash_command(
        &self,
        payload: &SlashCommandPayload,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

#[async_trait]
pub trait ShortcutService: Send + Sync {
    async fn handle_global_shortcut(
        &self,
        event: &GlobalShortcutEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;

    async fn handle_message_shortcut(
        &self,
        event: &MessageShortcutEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

#[async_trait]
pub trait ModalService: Send + Sync {
    async fn handle_modal_submit(
        &self,
        event: &BlockActionEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

#[async_trait]
pub trait MessageService: Send + Sync {
    async fn handle_new_message(
        &self,
        event: &NewMessageEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

pub struct SlashCommandHandler<S> {
    service: Arc<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: SlashCommandService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: SlashCommandService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_slash_command(payload, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

pub struct GlobalShortcutHandler<S> {
    service: Arc<S>,
}

impl<S> GlobalShortcutHandler<S>
where
    S: ShortcutService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for GlobalShortcutHandler<S>
where
    S: ShortcutService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::GlobalShortcut
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::GlobalShortcut(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_global_shortcut(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

pub struct MessageShortcutHandler<S> {
    service: Arc<S>,
}

impl<S> MessageShortcutHandler<S>
where
    S: ShortcutService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for MessageShortcutHandler<S>
where
    S: ShortcutService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::MessageShortcut
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::MessageShortcut(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_message_shortcut(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

/// Routes the shorten form's submit button; other block actions are ignored.
pub struct BlockActionHandler<S> {
    service: Arc<S>,
}

impl<S> BlockActionHandler<S>
where
    S: ModalService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for BlockActionHandler<S>
where
    S: ModalService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.action_id != SUBMIT_ACTION_ID {
            return Ok(HandlerResult::Ignored);
        }

        self.service.handle_modal_submit(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

/// Submit and close of the shorten modal need no work beyond the acknowledgement.
pub struct ViewActionHandler;

#[async_trait]
impl EventHandler for ViewActionHandler {
    fn event_type(&self) -> ChatEventType {
        ChatEventType::ViewAction
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        match &envelope.event {
            ChatEvent::ViewAction(event) if event.callback_id == SHORTEN_MODAL_CALLBACK_ID => {
                Ok(HandlerResult::Processed)
            }
            _ => Ok(HandlerResult::Ignored),
        }
    }
}

pub struct NewMessageHandler<S> {
    service: Arc<S>,
}

impl<S> NewMessageHandler<S>
where
    S: MessageService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for NewMessageHandler<S>
where
    S: MessageService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::NewMessage
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::NewMessage(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.from_bot || !mentions_http_link(&event.text) {
            return Ok(HandlerResult::Ignored);
        }

        self.service.handle_new_message(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

fn mentions_http_link(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    ["http://", "https://"].iter().any(|scheme| {
        lower.match_indices(scheme).any(|(index, _)| {
            lower[index + scheme.len()..].chars().next().is_some_and(|ch| !ch.is_whitespace())
        })
    })
}
