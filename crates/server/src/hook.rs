use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router};
use linkbot_chat::{events::ChatEnvelope, wire::parse_envelope};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct HookState {
    sender: mpsc::Sender<ChatEnvelope>,
}

/// Webhook receiver. A 2xx response is the platform acknowledgement; handling happens on the
/// event loop afterwards.
pub fn router(events_path: &str, sender: mpsc::Sender<ChatEnvelope>) -> Router {
    Router::new().route(events_path, post(receive)).with_state(HookState { sender })
}

pub async fn receive(State(state): State<HookState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let envelope = match parse_envelope(&body) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(
                event_name = "ingress.chat.payload_rejected",
                error = %error,
                "rejected webhook payload"
            );
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": error.to_string() })));
        }
    };

    let envelope_id = envelope.envelope_id.clone();
    if state.sender.send(envelope).await.is_err() {
        warn!(
            event_name = "ingress.chat.queue_closed",
            correlation_id = %envelope_id,
            "event loop is no longer accepting envelopes"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "event loop is shutting down" })),
        );
    }

    debug!(
        event_name = "ingress.chat.ack_sent",
        correlation_id = %envelope_id,
        "webhook acknowledged"
    );
    (StatusCode::OK, Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
        Router,
    };
    use linkbot_chat::events::ChatEvent;
    use serde_json::json;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use super::router;

    fn post(path: &str, body: String) -> Request<Body> {
        Request::post(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request")
    }

    async fn status_of(app: Router, request: Request<Body>) -> StatusCode {
        app.oneshot(request).await.expect("response").status()
    }

    #[tokio::test]
    async fn accepted_payloads_are_queued_for_the_event_loop() {
        let (sender, mut receiver) = mpsc::channel(4);
        let payload = json!({
            "type": "GLOBAL_SHORTCUT",
            "envelopeId": "env-9",
            "shortcut": "Shorten URL",
            "userId": "U1",
            "triggerId": "T1"
        });

        let status = status_of(router("/hook", sender), post("/hook", payload.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        let envelope = receiver.recv().await.expect("queued envelope");
        assert_eq!(envelope.envelope_id, "env-9");
        assert!(matches!(envelope.event, ChatEvent::GlobalShortcut(_)));
    }

    #[tokio::test]
    async fn malformed_payloads_are_rejected() {
        let (sender, mut receiver) = mpsc::channel(4);

        let status = status_of(router("/hook", sender), post("/hook", "{}".to_owned())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_event_loop_returns_service_unavailable() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let payload = json!({"type": "APP_UNINSTALLED"}).to_string();

        let status = status_of(router("/events", sender), post("/events", payload)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn events_path_is_configurable() {
        let (sender, _receiver) = mpsc::channel(1);
        let payload = json!({"type": "APP_UNINSTALLED"}).to_string();

        let status = status_of(router("/custom", sender), post("/hook", payload)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
