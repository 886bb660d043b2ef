use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::remote::Endpoints;

pub const DEFAULT_FOLDER_NAME: &str = "pumble-redr";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 25_000;
const MAX_HTTP_TIMEOUT_MS: u64 = 300_000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub redr: RedrConfig,
    pub chat: ChatConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct RedrConfig {
    pub api_url: String,
    pub api_key: SecretString,
    pub domain_id: String,
    /// Pre-provisioned folder id; when set, folder lookup and creation are skipped.
    pub folder_id: Option<String>,
    pub folder_name: String,
    pub http_timeout_ms: u64,
}

impl RedrConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub events_path: String,
    /// Where outbound chat actions are posted. Unset means they are only logged.
    pub callback_url: Option<String>,
    pub bot_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub redr_api_url: Option<String>,
    pub redr_api_key: Option<String>,
    pub redr_domain_id: Option<String>,
    pub redr_folder_id: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redr: RedrConfig {
                api_url: String::new(),
                api_key: String::new().into(),
                domain_id: String::new(),
                folder_id: None,
                folder_name: DEFAULT_FOLDER_NAME.to_string(),
                http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            },
            chat: ChatConfig {
                events_path: "/hook".to_string(),
                callback_url: None,
                bot_token: None,
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = resolve_config_path(options.config_path.as_deref()) {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("linkbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(redr) = patch.redr {
            if let Some(api_url) = redr.api_url {
                self.redr.api_url = api_url;
            }
            if let Some(api_key) = redr.api_key {
                self.redr.api_key = api_key.into();
            }
            if let Some(domain_id) = redr.domain_id {
                self.redr.domain_id = domain_id;
            }
            if let Some(folder_id) = redr.folder_id {
                self.redr.folder_id = non_blank(folder_id);
            }
            if let Some(folder_name) = redr.folder_name {
                self.redr.folder_name = folder_name;
            }
            if let Some(http_timeout_ms) = redr.http_timeout_ms {
                self.redr.http_timeout_ms = http_timeout_ms;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(events_path) = chat.events_path {
                self.chat.events_path = events_path;
            }
            if let Some(callback_url) = chat.callback_url {
                self.chat.callback_url = non_blank(callback_url);
            }
            if let Some(bot_token) = chat.bot_token {
                self.chat.bot_token = Some(bot_token.into());
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("REDR_API_URL") {
            self.redr.api_url = value;
        }
        if let Some(value) = read_env("REDR_API_KEY") {
            self.redr.api_key = value.into();
        }
        if let Some(value) = read_env("REDR_DOMAIN_ID") {
            self.redr.domain_id = value;
        }
        if let Some(value) = read_env("REDR_FOLDER_ID") {
            self.redr.folder_id = Some(value);
        }
        if let Some(value) = read_env("REDR_FOLDER_NAME") {
            self.redr.folder_name = value;
        }
        if let Some(value) = read_env("REDR_HTTP_TIMEOUT_MS") {
            self.redr.http_timeout_ms = parse_u64("REDR_HTTP_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = read_env("LINKBOT_CHAT_EVENTS_PATH") {
            self.chat.events_path = value;
        }
        if let Some(value) = read_env("LINKBOT_CHAT_CALLBACK_URL") {
            self.chat.callback_url = Some(value);
        }
        if let Some(value) = read_env("LINKBOT_CHAT_BOT_TOKEN") {
            self.chat.bot_token = Some(value.into());
        }

        if let Some(value) = read_env("LINKBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("LINKBOT_SERVER_PORT").or_else(|| read_env("PORT"));
        if let Some(value) = port {
            self.server.port = parse_u16("LINKBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("LINKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("LINKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("LINKBOT_LOGGING_LEVEL").or_else(|| read_env("LINKBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LINKBOT_LOGGING_FORMAT").or_else(|| read_env("LINKBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_url) = overrides.redr_api_url {
            self.redr.api_url = api_url;
        }
        if let Some(api_key) = overrides.redr_api_key {
            self.redr.api_key = api_key.into();
        }
        if let Some(domain_id) = overrides.redr_domain_id {
            self.redr.domain_id = domain_id;
        }
        if let Some(folder_id) = overrides.redr_folder_id {
            self.redr.folder_id = non_blank(folder_id);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_redr(&self.redr)?;
        validate_chat(&self.chat)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    config_file_candidates().into_iter().find(|path| path.exists())
}

/// Paths searched for a config file when none is given explicitly, in order.
pub fn config_file_candidates() -> [PathBuf; 2] {
    [PathBuf::from("linkbot.toml"), PathBuf::from("config/linkbot.toml")]
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_redr(redr: &RedrConfig) -> Result<(), ConfigError> {
    let api_url = redr.api_url.trim();
    if api_url.is_empty() {
        return Err(ConfigError::Validation(
            "redr.api_url is required (set REDR_API_URL to the link creation endpoint)".to_string(),
        ));
    }
    if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "redr.api_url must start with http:// or https://".to_string(),
        ));
    }
    if let Err(error) = Endpoints::from_api_url(api_url) {
        return Err(ConfigError::Validation(format!("redr.api_url is not a valid url: {error}")));
    }

    if redr.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "redr.api_key is required (set REDR_API_KEY)".to_string(),
        ));
    }

    if redr.domain_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "redr.domain_id is required (set REDR_DOMAIN_ID)".to_string(),
        ));
    }

    if redr.folder_name.trim().is_empty() {
        return Err(ConfigError::Validation("redr.folder_name must not be empty".to_string()));
    }

    if redr.http_timeout_ms == 0 || redr.http_timeout_ms > MAX_HTTP_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "redr.http_timeout_ms must be in range 1..={MAX_HTTP_TIMEOUT_MS}"
        )));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if !chat.events_path.starts_with('/') {
        return Err(ConfigError::Validation("chat.events_path must start with `/`".to_string()));
    }

    if let Some(callback_url) = &chat.callback_url {
        if !callback_url.starts_with("http://") && !callback_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "chat.callback_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    redr: Option<RedrPatch>,
    chat: Option<ChatPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct RedrPatch {
    api_url: Option<String>,
    api_key: Option<String>,
    domain_id: Option<String>,
    folder_id: Option<String>,
    folder_name: Option<String>,
    http_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    events_path: Option<String>,
    callback_url: Option<String>,
    bot_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const REQUIRED_VARS: [(&str, &str); 3] = [
        ("REDR_API_URL", "https://redr.example/api/short-links"),
        ("REDR_API_KEY", "key-from-env"),
        ("REDR_DOMAIN_ID", "dom-env"),
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn set_required_vars() {
        for (key, value) in REQUIRED_VARS {
            env::set_var(key, value);
        }
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn clear_required_vars() {
        clear_vars(&["REDR_API_URL", "REDR_API_KEY", "REDR_DOMAIN_ID"]);
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.redr.folder_name == "pumble-redr", "default folder name")?;
            ensure(config.redr.http_timeout_ms == 25_000, "default http timeout")?;
            ensure(config.redr.folder_id.is_none(), "folder override unset by default")?;
            ensure(config.chat.events_path == "/hook", "default events path")?;
            ensure(config.server.port == 8080, "default port")?;
            ensure(matches!(config.logging.format, LogFormat::Compact), "default log format")?;
            Ok(())
        })();

        clear_required_vars();
        result
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_REDR_KEY", "key-from-interpolation");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("linkbot.toml");
            fs::write(
                &path,
                r#"
[redr]
api_url = "https://redr.example/api/short-links"
api_key = "${TEST_REDR_KEY}"
domain_id = "dom-file"
folder_name = "team-links"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.redr.api_key.expose_secret() == "key-from-interpolation",
                "api key should be interpolated from environment",
            )?;
            ensure(config.redr.folder_name == "team-links", "folder name read from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_REDR_KEY"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("REDR_DOMAIN_ID", "dom-env");
        env::set_var("REDR_FOLDER_ID", "folder-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("linkbot.toml");
            fs::write(
                &path,
                r#"
[redr]
api_url = "https://redr.example/api/short-links"
api_key = "key-from-file"
domain_id = "dom-file"
http_timeout_ms = 5000

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    redr_folder_id: Some("folder-override".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.redr.folder_id.as_deref() == Some("folder-override"),
                "override folder id should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.redr.domain_id == "dom-env", "env domain should win over file")?;
            ensure(config.redr.http_timeout_ms == 5000, "file timeout should win over default")?;
            Ok(())
        })();

        clear_vars(&["REDR_DOMAIN_ID", "REDR_FOLDER_ID"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();
        env::set_var("LINKBOT_LOG_LEVEL", "warn");
        env::set_var("LINKBOT_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_required_vars();
        clear_vars(&["LINKBOT_LOG_LEVEL", "LINKBOT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn missing_api_url_fails_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        env::set_var("REDR_API_KEY", "key");
        env::set_var("REDR_DOMAIN_ID", "dom");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("REDR_API_URL")
            );
            ensure(has_message, "validation failure should mention REDR_API_URL")
        })();

        clear_required_vars();
        result
    }

    #[test]
    fn non_numeric_timeout_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();
        env::set_var("REDR_HTTP_TIMEOUT_MS", "soon");

        let result = (|| -> Result<(), String> {
            let outcome = AppConfig::load(LoadOptions::default());
            ensure(
                matches!(
                    outcome,
                    Err(ConfigError::InvalidEnvOverride { ref key, .. })
                        if key == "REDR_HTTP_TIMEOUT_MS"
                ),
                "non-numeric timeout should be an invalid override",
            )
        })();

        clear_required_vars();
        clear_vars(&["REDR_HTTP_TIMEOUT_MS"]);
        result
    }

    #[test]
    fn out_of_range_timeout_and_bad_scheme_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();

        let result = (|| -> Result<(), String> {
            env::set_var("REDR_HTTP_TIMEOUT_MS", "0");
            ensure(
                matches!(AppConfig::load(LoadOptions::default()), Err(ConfigError::Validation(_))),
                "zero timeout should fail validation",
            )?;
            env::remove_var("REDR_HTTP_TIMEOUT_MS");

            env::set_var("REDR_API_URL", "ftp://redr.example/api");
            ensure(
                matches!(
                    AppConfig::load(LoadOptions::default()),
                    Err(ConfigError::Validation(ref message)) if message.contains("http://")
                ),
                "non-http api url should fail validation",
            )
        })();

        clear_required_vars();
        clear_vars(&["REDR_HTTP_TIMEOUT_MS"]);
        result
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");

        let outcome = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        });
        ensure(
            matches!(outcome, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should be reported",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_required_vars();
        env::set_var("LINKBOT_CHAT_BOT_TOKEN", "bot-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("key-from-env"), "debug output should not contain api key")?;
            ensure(
                !debug.contains("bot-secret-value"),
                "debug output should not contain bot token",
            )?;
            Ok(())
        })();

        clear_required_vars();
        clear_vars(&["LINKBOT_CHAT_BOT_TOKEN"]);
        result
    }
}
