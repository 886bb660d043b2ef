//! Decoding of webhook payloads delivered to the events path.
//!
//! Every payload is a JSON object with a `type` discriminator and camelCase fields. Unknown
//! types decode to [`ChatEvent::Unsupported`] so the platform can add event kinds without
//! breaking the bot.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::commands::SlashCommandPayload;
use crate::events::{
    BlockActionEvent, ChatEnvelope, ChatEvent, GlobalShortcutEvent, MessageShortcutEvent,
    NewMessageEvent, ViewActionEvent, ViewActionKind,
};
use crate::state::ModalViewState;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WirePayloadError {
    #[error("webhook payload is not valid JSON: {0}")]
    Json(String),
    #[error("webhook payload has no `type`")]
    MissingType,
    #[error("malformed `{event_type}` payload: {reason}")]
    Malformed { event_type: String, reason: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSlashCommand {
    slash_command: String,
    #[serde(default)]
    text: String,
    channel_id: Option<String>,
    user_id: String,
    trigger_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGlobalShortcut {
    shortcut: String,
    user_id: String,
    trigger_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessageShortcut {
    shortcut: String,
    channel_id: String,
    message_id: String,
    user_id: String,
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlockInteraction {
    action_id: String,
    view_id: Option<String>,
    channel_id: Option<String>,
    user_id: String,
    view: Option<WireView>,
}

#[derive(Deserialize)]
struct WireView {
    state: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireViewAction {
    callback_id: String,
    action: WireViewActionKind,
    user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireViewActionKind {
    Submit,
    Close,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireNewMessage {
    channel_id: String,
    message_id: String,
    user_id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    from_bot: bool,
}

/// Decodes one webhook body. The envelope id comes from `envelopeId`, falling back to a fresh
/// UUID when the platform does not send one.
pub fn parse_envelope(body: &[u8]) -> Result<ChatEnvelope, WirePayloadError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|error| WirePayloadError::Json(error.to_string()))?;
    let event_type = payload
        .get("type")
        .and_then(Value::as_str)
        .filter(|event_type| !event_type.is_empty())
        .ok_or(WirePayloadError::MissingType)?
        .to_owned();
    let envelope_id = payload
        .get("envelopeId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let event = match event_type.as_str() {
        "SLASH_COMMAND" => {
            let wire: WireSlashCommand = decode(&event_type, payload)?;
            ChatEvent::SlashCommand(SlashCommandPayload {
                command: wire.slash_command,
                text: wire.text,
                channel_id: wire.channel_id,
                user_id: wire.user_id,
                trigger_id: wire.trigger_id,
                request_id: envelope_id.clone(),
            })
        }
        "GLOBAL_SHORTCUT" => {
            let wire: WireGlobalShortcut = decode(&event_type, payload)?;
            ChatEvent::GlobalShortcut(GlobalShortcutEvent {
                name: wire.shortcut,
                user_id: wire.user_id,
                trigger_id: wire.trigger_id,
            })
        }
        "MESSAGE_SHORTCUT" => {
            let wire: WireMessageShortcut = decode(&event_type, payload)?;
            ChatEvent::MessageShortcut(MessageShortcutEvent {
                name: wire.shortcut,
                channel_id: wire.channel_id,
                message_id: wire.message_id,
                user_id: wire.user_id,
                text: wire.text,
            })
        }
        "BLOCK_INTERACTION" => {
            let wire: WireBlockInteraction = decode(&event_type, payload)?;
            let state = wire
                .view
                .and_then(|view| view.state)
                .map(ModalViewState::new)
                .unwrap_or_else(ModalViewState::empty);
            ChatEvent::BlockAction(BlockActionEvent {
                action_id: wire.action_id,
                view_id: wire.view_id,
                channel_id: wire.channel_id,
                user_id: wire.user_id,
                state,
            })
        }
        "VIEW_ACTION" => {
            let wire: WireViewAction = decode(&event_type, payload)?;
            ChatEvent::ViewAction(ViewActionEvent {
                callback_id: wire.callback_id,
                kind: match wire.action {
                    WireViewActionKind::Submit => ViewActionKind::Submit,
                    WireViewActionKind::Close => ViewActionKind::Close,
                },
                user_id: wire.user_id,
            })
        }
        "NEW_MESSAGE" => {
            let wire: WireNewMessage = decode(&event_type, payload)?;
            ChatEvent::NewMessage(NewMessageEvent {
                channel_id: wire.channel_id,
                message_id: wire.message_id,
                user_id: wire.user_id,
                text: wire.text,
                from_bot: wire.from_bot,
            })
        }
        _ => ChatEvent::Unsupported { event_type },
    };

    Ok(ChatEnvelope { envelope_id, event })
}

fn decode<T>(event_type: &str, payload: Value) -> Result<T, WirePayloadError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(payload).map_err(|error| WirePayloadError::Malformed {
        event_type: event_type.to_owned(),
        reason: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_envelope, WirePayloadError};
    use crate::events::{ChatEvent, ViewActionKind};

    fn parse(value: serde_json::Value) -> Result<crate::events::ChatEnvelope, WirePayloadError> {
        parse_envelope(value.to_string().as_bytes())
    }

    #[test]
    fn slash_command_carries_envelope_id_as_request_id() {
        let envelope = parse(json!({
            "type": "SLASH_COMMAND",
            "envelopeId": "env-1",
            "slashCommand": "/shorturl",
            "text": "example.com",
            "channelId": "C1",
            "userId": "U1",
            "triggerId": "T1"
        }))
        .expect("slash command");

        assert_eq!(envelope.envelope_id, "env-1");
        let ChatEvent::SlashCommand(payload) = envelope.event else {
            panic!("expected slash command");
        };
        assert_eq!(payload.command, "/shorturl");
        assert_eq!(payload.request_id, "env-1");
        assert_eq!(payload.channel_id.as_deref(), Some("C1"));
    }

    #[test]
    fn block_interaction_keeps_modal_state() {
        let envelope = parse(json!({
            "type": "BLOCK_INTERACTION",
            "actionId": "a_shorten_submit",
            "viewId": "V1",
            "userId": "U1",
            "view": {"state": {"values": {"b_long_url": {"a_long_url": {"value": "a.io"}}}}}
        }))
        .expect("block interaction");

        let ChatEvent::BlockAction(event) = envelope.event else {
            panic!("expected block action");
        };
        assert_eq!(event.view_id.as_deref(), Some("V1"));
        assert_eq!(event.channel_id, None);
        assert_eq!(event.state.read_input("b_long_url", "a_long_url"), "a.io");
    }

    #[test]
    fn view_actions_and_messages_decode() {
        let close = parse(json!({
            "type": "VIEW_ACTION", "callbackId": "shorturl_modal", "action": "close", "userId": "U1"
        }))
        .expect("view action");
        assert!(matches!(
            close.event,
            ChatEvent::ViewAction(event) if event.kind == ViewActionKind::Close
        ));

        let message = parse(json!({
            "type": "NEW_MESSAGE", "channelId": "C1", "messageId": "M1", "userId": "B1",
            "text": "https://example.com", "fromBot": true
        }))
        .expect("message");
        assert!(matches!(message.event, ChatEvent::NewMessage(event) if event.from_bot));
    }

    #[test]
    fn unknown_types_are_unsupported_and_get_an_id() {
        let envelope = parse(json!({"type": "APP_UNINSTALLED"})).expect("unsupported");
        assert_eq!(
            envelope.event,
            ChatEvent::Unsupported { event_type: "APP_UNINSTALLED".to_owned() }
        );
        assert!(!envelope.envelope_id.is_empty());
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(parse_envelope(b"not json"), Err(WirePayloadError::Json(_))));
        assert_eq!(parse(json!({"text": "hi"})), Err(WirePayloadError::MissingType));
        assert!(matches!(
            parse(json!({"type": "GLOBAL_SHORTCUT", "userId": "U1"})),
            Err(WirePayloadError::Malformed { event_type, .. }) if event_type == "GLOBAL_SHORTCUT"
        ));
    }
}
