use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use linkbot_core::config::{config_file_candidates, AppConfig};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// One displayed setting: dotted key, rendered value and the env vars that can set it.
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    CommandResult {
        exit_code: 0,
        output: render(&config, config_file_doc.as_ref(), config_file_path.as_deref()),
    }
}

pub fn render(config: &AppConfig, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(config) {
        let source = field_source(field.key, field.env_keys, file_doc, file_path);
        lines.push(render_line(field.key, &field.value, source));
    }
    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let field = |key: &'static str, value: String, env_keys: &'static [&'static str]| Field {
        key,
        value,
        env_keys,
    };
    let unset = || "<unset>".to_string();

    vec![
        field("redr.api_url", config.redr.api_url.clone(), &["REDR_API_URL"]),
        field("redr.api_key", redact_secret(&config.redr.api_key), &["REDR_API_KEY"]),
        field("redr.domain_id", config.redr.domain_id.clone(), &["REDR_DOMAIN_ID"]),
        field(
            "redr.folder_id",
            config.redr.folder_id.clone().unwrap_or_else(unset),
            &["REDR_FOLDER_ID"],
        ),
        field("redr.folder_name", config.redr.folder_name.clone(), &["REDR_FOLDER_NAME"]),
        field(
            "redr.http_timeout_ms",
            config.redr.http_timeout_ms.to_string(),
            &["REDR_HTTP_TIMEOUT_MS"],
        ),
        field("chat.events_path", config.chat.events_path.clone(), &["LINKBOT_CHAT_EVENTS_PATH"]),
        field(
            "chat.callback_url",
            config.chat.callback_url.clone().unwrap_or_else(unset),
            &["LINKBOT_CHAT_CALLBACK_URL"],
        ),
        field(
            "chat.bot_token",
            config.chat.bot_token.as_ref().map(redact_secret).unwrap_or_else(unset),
            &["LINKBOT_CHAT_BOT_TOKEN"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["LINKBOT_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["LINKBOT_SERVER_PORT", "PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["LINKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["LINKBOT_LOGGING_LEVEL", "LINKBOT_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["LINKBOT_LOGGING_FORMAT", "LINKBOT_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    config_file_candidates().into_iter().find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps at most the last four characters of long secrets.
fn redact_secret(secret: &SecretString) -> String {
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() < 12 {
        return "<redacted>".to_string();
    }

    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}
