use linkbot_core::{DomainDirectory, LinkService};
use serde_json::json;

use crate::commands::{build_runtime, link_service, load_config, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("domains") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let service = match link_service("domains", &config) {
        Ok(service) => service,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("domains") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(list(&service, &config.redr.domain_id))
}

/// Lists the account's domains, marking the one chat users get by default.
pub async fn list(service: &dyn LinkService, default_domain_id: &str) -> CommandResult {
    let directory = match DomainDirectory::load(service).await {
        Ok(directory) => directory,
        Err(error) => return CommandResult::remote_failure("domains", &error),
    };

    let default_id = directory.initial_choice(default_domain_id).map(|domain| domain.id.clone());
    let domains: Vec<_> = directory
        .domains()
        .iter()
        .map(|domain| {
            json!({
                "id": domain.id,
                "url": domain.url,
                "label": domain.label(),
                "default": default_id.as_deref() == Some(domain.id.as_str()),
            })
        })
        .collect();

    let message = match domains.len() {
        1 => "1 domain available".to_string(),
        count => format!("{count} domains available"),
    };
    CommandResult::success_with_details("domains", message, Some(json!({ "domains": domains })))
}
