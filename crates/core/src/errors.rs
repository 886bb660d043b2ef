use serde_json::Value;
use thiserror::Error;

/// Failure raised by the remote link service client.
///
/// `Network` and `Timeout` mean no response was received. `Api` means the service answered
/// outside the 2xx range, and `Validation` means it answered 2xx with an unusable body.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LinkServiceError {
    #[error("REDR network error: {message}")]
    Network { message: String },
    #[error("REDR request timed out: {message}")]
    Timeout { message: String },
    #[error("REDR {context} HTTP {status}")]
    Api { status: u16, context: String, body: String },
    #[error("{}", validation_text(.reason, .details))]
    Validation { reason: String, details: Option<String> },
}

fn validation_text(reason: &str, details: &Option<String>) -> String {
    match details {
        Some(details) => format!("{reason}: {details}"),
        None => reason.to_owned(),
    }
}

impl LinkServiceError {
    pub fn api(status: u16, context: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Api { status, context: context.into(), body: body.into() }
    }

    pub fn validation(reason: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into(), details: Some(details.into()) }
    }

    /// True for transport-level failures; a timeout is a kind of network failure.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this failure says the resource already exists on the remote side.
    ///
    /// The service reports this both as HTTP 409 and as an "already exists" message under other
    /// statuses, so both signals are accepted.
    pub fn is_conflict(&self) -> bool {
        if self.status() == Some(409) {
            return true;
        }

        let mentions_conflict = |text: &str| text.to_ascii_lowercase().contains("already exists");
        match self {
            Self::Api { body, .. } => {
                mentions_conflict(&self.to_string())
                    || body_message(body).is_some_and(|message| mentions_conflict(&message))
            }
            _ => mentions_conflict(&self.to_string()),
        }
    }

    /// Human-readable description of what the remote service said.
    ///
    /// For HTTP failures the `error` or `message` field of a JSON body wins; otherwise a
    /// status-coded default is substituted.
    pub fn remote_message(&self) -> String {
        match self {
            Self::Api { status, body, .. } => {
                body_message(body).unwrap_or_else(|| default_status_message(*status))
            }
            other => other.to_string(),
        }
    }

    /// Text safe to show to a chat user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => {
                "Could not connect to REDR service. Please try again later.".to_owned()
            }
            Self::Api { status, .. } if *status >= 500 => {
                "REDR service is temporarily unavailable. Please try again later.".to_owned()
            }
            Self::Api { status: 401 | 403, .. } => {
                "REDR authentication failed. Please contact your workspace admin.".to_owned()
            }
            Self::Api { status: 429, .. } => {
                "Too many requests to REDR. Please wait a moment and try again.".to_owned()
            }
            Self::Api { status, body, .. } if (400..500).contains(status) => {
                match body_message(body) {
                    Some(message) => message,
                    None => "Invalid request. Please check your URL and try again.".to_owned(),
                }
            }
            Self::Api { .. } => self.remote_message(),
            Self::Validation { .. } => self.to_string(),
        }
    }
}

pub fn default_status_message(status: u16) -> String {
    match status {
        500..=599 => "service temporarily unavailable".to_owned(),
        401 | 403 => "authentication failed".to_owned(),
        429 => "too many requests".to_owned(),
        other => format!("HTTP {other}"),
    }
}

fn body_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<Value>(body).ok()?;
    ["error", "message"].iter().find_map(|key| {
        parsed
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_owned)
    })
}

/// Failure reported by the caller-supplied success continuation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct DeliveryError(pub String);

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ShortenError {
    #[error(transparent)]
    Service(#[from] LinkServiceError),
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl ShortenError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Service(error) => error.user_message(),
            Self::Delivery(_) => {
                "The short link was created but could not be delivered.".to_owned()
            }
        }
    }
}
