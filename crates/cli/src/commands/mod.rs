pub mod config;
pub mod domains;
pub mod shorten;

use linkbot_core::{
    config::{AppConfig, LoadOptions},
    remote::{build_http_client, Endpoints},
    HttpLinkService, LinkServiceError,
};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_INVALID_INPUT: u8 = 4;
pub const EXIT_REMOTE: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_details(command, message, None)
    }

    pub fn success_with_details(
        command: &str,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            details,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            details: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Failure for an error returned by the REDR service.
    pub fn remote_failure(command: &str, error: &LinkServiceError) -> Self {
        let error_class = match error {
            LinkServiceError::Network { .. } => "redr_network",
            LinkServiceError::Timeout { .. } => "redr_timeout",
            LinkServiceError::Api { .. } => "redr_api",
            LinkServiceError::Validation { .. } => "redr_response",
        };
        let message = match error {
            LinkServiceError::Api { .. } => format!("{error}: {}", error.remote_message()),
            _ => error.to_string(),
        };
        Self::failure(command, error_class, message, EXIT_REMOTE)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            concat!(
                "{{\"command\":\"unknown\",\"status\":\"error\",",
                "\"error_class\":\"serialization\",\"message\":\"{}\"}}"
            ),
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

pub(crate) fn link_service(
    command: &str,
    config: &AppConfig,
) -> Result<HttpLinkService, CommandResult> {
    let endpoints = Endpoints::from_api_url(&config.redr.api_url).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    })?;
    let client = build_http_client(&config.redr.api_key, config.redr.http_timeout()).map_err(
        |error| CommandResult::failure(command, "http_client", error.to_string(), EXIT_RUNTIME),
    )?;
    Ok(HttpLinkService::new(client, endpoints))
}
