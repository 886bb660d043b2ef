use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::events::{ChatEnvelope, ChatEvent, EventContext, EventDispatcher};

/// Pumps envelopes queued by the webhook into the dispatcher.
///
/// Every envelope is handled on its own task, so a slow remote call for one user never holds
/// up another user's command. The HTTP response of the webhook already acknowledges delivery.
pub struct EventLoopRunner {
    receiver: mpsc::Receiver<ChatEnvelope>,
    dispatcher: Arc<EventDispatcher>,
}

impl EventLoopRunner {
    pub fn new(receiver: mpsc::Receiver<ChatEnvelope>, dispatcher: EventDispatcher) -> Self {
        Self { receiver, dispatcher: Arc::new(dispatcher) }
    }

    /// Returns the sending half for the webhook together with the runner.
    pub fn channel(
        capacity: usize,
        dispatcher: EventDispatcher,
    ) -> (mpsc::Sender<ChatEnvelope>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, Self::new(receiver, dispatcher))
    }

    /// Runs until every sender is dropped, then waits for the handlers still in flight.
    pub async fn run(self) {
        let Self { mut receiver, dispatcher } = self;
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                next = receiver.recv() => match next {
                    Some(envelope) => {
                        in_flight.spawn(dispatch(Arc::clone(&dispatcher), envelope));
                    }
                    None => break,
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join_failure(joined);
                }
            }
        }

        info!(
            event_name = "ingress.chat.queue_closed",
            in_flight = in_flight.len(),
            "chat event queue closed; draining in-flight handlers"
        );
        while let Some(joined) = in_flight.join_next().await {
            log_join_failure(joined);
        }
    }
}

async fn dispatch(dispatcher: Arc<EventDispatcher>, envelope: ChatEnvelope) {
    let (channel_id, user_id) = correlation_fields(&envelope);

    info!(
        event_name = "ingress.chat.envelope_received",
        envelope_id = %envelope.envelope_id,
        event_type = ?envelope.event.event_type(),
        correlation_id = %envelope.envelope_id,
        channel_id = channel_id.unwrap_or("unknown"),
        user_id = user_id.unwrap_or("unknown"),
        "received chat envelope"
    );

    let context = EventContext { correlation_id: envelope.envelope_id.clone() };
    match dispatcher.dispatch(&envelope, &context).await {
        Ok(result) => debug!(
            event_name = "ingress.chat.dispatched",
            correlation_id = %envelope.envelope_id,
            result = ?result,
            "chat envelope dispatched"
        ),
        Err(error) => warn!(
            envelope_id = %envelope.envelope_id,
            correlation_id = %envelope.envelope_id,
            channel_id = channel_id.unwrap_or("unknown"),
            user_id = user_id.unwrap_or("unknown"),
            error = %error,
            "event dispatch failed; continuing event loop"
        ),
    }
}

fn log_join_failure(joined: Result<(), JoinError>) {
    if let Err(error) = joined {
        warn!(
            event_name = "ingress.chat.handler_aborted",
            error = %error,
            "chat handler task did not complete"
        );
    }
}

fn correlation_fields(envelope: &ChatEnvelope) -> (Option<&str>, Option<&str>) {
    match &envelope.event {
        ChatEvent::SlashCommand(payload) => {
            (payload.channel_id.as_deref(), Some(payload.user_id.as_str()))
        }
        ChatEvent::GlobalShortcut(event) => (None, Some(event.user_id.as_str())),
        ChatEvent::MessageShortcut(event) => {
            (Some(event.channel_id.as_str()), Some(event.user_id.as_str()))
        }
        ChatEvent::BlockAction(event) => {
            (event.channel_id.as_deref(), Some(event.user_id.as_str()))
        }
        ChatEvent::ViewAction(event) => (None, Some(event.user_id.as_str())),
        ChatEvent::NewMessage(event) => {
            (Some(event.channel_id.as_str()), Some(event.user_id.as_str()))
        }
        ChatEvent::Unsupported { .. } => (None, None),
    }
}
