use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;
use linkbot_chat::{input::normalize_http_url, state::password_error};
use linkbot_core::{
    expiry_end_of_day, DeliveryError, FolderResolver, LinkService, ShortenError,
    ShortenOrchestrator, ShortenRequest, ShortenSettings,
};
use serde_json::json;

use crate::commands::{
    build_runtime, link_service, load_config, CommandResult, EXIT_INVALID_INPUT, EXIT_REMOTE,
};

#[derive(Debug, Clone, Default, Args)]
pub struct ShortenArgs {
    #[arg(help = "Long URL to shorten; https:// is assumed when no scheme is given")]
    pub url: String,
    #[arg(long, help = "Hide the destination from visitors")]
    pub masked: bool,
    #[arg(long, help = "Password visitors must enter (3 to 64 characters, no spaces)")]
    pub password: Option<String>,
    #[arg(long, value_name = "YYYY-MM-DD", help = "Expire the link at the end of this UTC day")]
    pub expires: Option<String>,
    #[arg(long, value_name = "URL", help = "Where visitors go once the link has expired")]
    pub default_redirect: Option<String>,
    #[arg(long, value_name = "ID", help = "Sending domain; defaults to REDR_DOMAIN_ID")]
    pub domain: Option<String>,
}

pub fn run(args: ShortenArgs) -> CommandResult {
    let request = match build_request(&args) {
        Ok(request) => request,
        Err(message) => {
            return CommandResult::failure("shorten", "invalid_input", message, EXIT_INVALID_INPUT)
        }
    };
    let config = match load_config("shorten") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let service: Arc<dyn LinkService> = match link_service("shorten", &config) {
        Ok(service) => Arc::new(service),
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("shorten") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let folders =
        Arc::new(FolderResolver::new(Arc::clone(&service), config.redr.folder_id.clone()));
    let orchestrator = ShortenOrchestrator::new(
        service,
        folders,
        ShortenSettings {
            folder_name: config.redr.folder_name.clone(),
            default_domain_id: config.redr.domain_id.clone(),
        },
    );

    runtime.block_on(execute(&orchestrator, request, args.domain.as_deref()))
}

/// Validates the arguments the same way the chat form does.
pub fn build_request(args: &ShortenArgs) -> Result<ShortenRequest, String> {
    let long_url = normalize_http_url(&args.url).map_err(|error| format!("Invalid URL: {error}"))?;

    let password = args.password.as_deref().map(str::trim).filter(|password| !password.is_empty());
    if let Some(message) = password.and_then(password_error) {
        return Err(message.to_string());
    }

    let default_redirect_url = match args.default_redirect.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            normalize_http_url(raw).map_err(|error| format!("Invalid default redirect: {error}"))?,
        ),
        _ => None,
    };

    let expires_at = args.expires.as_deref().map(parse_expiry).transpose()?;

    Ok(ShortenRequest {
        long_url,
        masked: args.masked,
        expires_at,
        password: password.map(str::to_owned),
        default_redirect_url,
    })
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, String> {
    expiry_end_of_day(raw)
        .ok_or_else(|| format!("Invalid expiry date `{raw}`; expected YYYY-MM-DD"))
}

pub async fn execute(
    orchestrator: &ShortenOrchestrator,
    request: ShortenRequest,
    domain_id: Option<&str>,
) -> CommandResult {
    let outcome = orchestrator
        .run(request, domain_id, |_, _| async { Ok::<(), DeliveryError>(()) })
        .await;

    match outcome {
        Ok(result) => CommandResult::success_with_details(
            "shorten",
            result.short_url.clone(),
            Some(json!({ "short_url": result.short_url, "request_id": result.request_id })),
        ),
        Err(ShortenError::Service(error)) => CommandResult::remote_failure("shorten", &error),
        Err(error @ ShortenError::Delivery(_)) => {
            CommandResult::failure("shorten", "delivery", error.to_string(), EXIT_REMOTE)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{build_request, ShortenArgs};

    fn args(url: &str) -> ShortenArgs {
        ShortenArgs { url: url.to_owned(), ..ShortenArgs::default() }
    }

    #[test]
    fn builds_request_from_arguments() {
        let request = build_request(&ShortenArgs {
            masked: true,
            password: Some(" hunter2 ".to_owned()),
            expires: Some("2026-12-31".to_owned()),
            default_redirect: Some("example.org/gone".to_owned()),
            ..args("example.com/launch")
        })
        .expect("valid arguments");

        assert_eq!(request.long_url, "https://example.com/launch");
        assert!(request.masked);
        assert_eq!(request.password.as_deref(), Some("hunter2"));
        assert_eq!(request.expires_at, Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).single());
        assert_eq!(request.default_redirect_url.as_deref(), Some("https://example.org/gone"));
    }

    #[test]
    fn rejects_invalid_arguments_with_chat_wording() {
        assert_eq!(
            build_request(&args("ftp://example.com")).expect_err("scheme"),
            "Invalid URL: Only http/https URLs are allowed."
        );
        assert_eq!(
            build_request(&ShortenArgs { password: Some("ab".to_owned()), ..args("a.io") })
                .expect_err("password"),
            "Password must be at least 3 characters."
        );
        let bad_date = ShortenArgs { expires: Some("31/12/2026".to_owned()), ..args("a.io") };
        assert!(build_request(&bad_date).expect_err("date").contains("YYYY-MM-DD"));
    }
}
