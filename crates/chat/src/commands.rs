use thiserror::Error;

use crate::input::{extract_first_url, normalize_http_url, UrlInputError};

pub const SHORTURL_COMMAND: &str = "/shorturl";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: Option<String>,
    pub user_id: String,
    pub trigger_id: String,
    pub request_id: String,
}

/// What a `/shorturl` invocation asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShortUrlCommand {
    OpenModal,
    Shorten { long_url: String },
    InvalidUrl { raw: String, error: UrlInputError },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

pub fn parse_shorturl_command(
    payload: &SlashCommandPayload,
) -> Result<ShortUrlCommand, CommandParseError> {
    if !payload.command.trim().eq_ignore_ascii_case(SHORTURL_COMMAND) {
        return Err(CommandParseError::UnsupportedCommand(payload.command.clone()));
    }

    let text = payload.text.trim();
    if text.is_empty() {
        return Ok(ShortUrlCommand::OpenModal);
    }

    let raw = extract_first_url(text)
        .or_else(|| text.split_whitespace().next().map(str::to_owned))
        .unwrap_or_default();

    Ok(match normalize_http_url(&raw) {
        Ok(long_url) => ShortUrlCommand::Shorten { long_url },
        Err(error) => ShortUrlCommand::InvalidUrl { raw, error },
    })
}
