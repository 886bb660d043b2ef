use std::sync::Arc;

use linkbot_chat::{
    client::{ChatClient, LoggingChatClient},
    events::{default_dispatcher, EventDispatcher},
    service::ShortenChatService,
};
use linkbot_core::{
    config::{AppConfig, ConfigError, LoadOptions},
    remote::{build_http_client, ClientBuildError, Endpoints},
    DomainDirectory, FolderResolver, HttpLinkService, LinkService, LinkServiceError,
    ShortenOrchestrator, ShortenSettings,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::bridge::{BridgeBuildError, HttpChatClient};

pub struct Application {
    pub config: AppConfig,
    pub domains: Arc<DomainDirectory>,
    pub dispatcher: EventDispatcher,
    pub chat_bridge: ChatBridgeMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatBridgeMode {
    Http,
    Logging,
}

impl ChatBridgeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Logging => "logging",
        }
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid REDR api url: {0}")]
    Endpoints(#[source] url::ParseError),
    #[error(transparent)]
    HttpClient(#[from] ClientBuildError),
    #[error(transparent)]
    ChatBridge(#[from] BridgeBuildError),
    #[error("could not load REDR domains: {0}")]
    Domains(#[source] LinkServiceError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let endpoints =
        Endpoints::from_api_url(&config.redr.api_url).map_err(BootstrapError::Endpoints)?;
    let client = build_http_client(&config.redr.api_key, config.redr.http_timeout())?;
    let service: Arc<dyn LinkService> = Arc::new(HttpLinkService::new(client, endpoints));

    let (chat_client, chat_bridge): (Arc<dyn ChatClient>, ChatBridgeMode) =
        match &config.chat.callback_url {
            Some(callback_url) => {
                let client = HttpChatClient::new(
                    callback_url,
                    config.chat.bot_token.as_ref(),
                    config.redr.http_timeout(),
                )?;
                (Arc::new(client), ChatBridgeMode::Http)
            }
            None => (Arc::new(LoggingChatClient), ChatBridgeMode::Logging),
        };

    assemble(config, service, chat_client, chat_bridge).await
}

/// Wires the shortening pipeline behind the chat dispatcher. Failing to load domains is fatal.
pub async fn assemble(
    config: AppConfig,
    service: Arc<dyn LinkService>,
    chat_client: Arc<dyn ChatClient>,
    chat_bridge: ChatBridgeMode,
) -> Result<Application, BootstrapError> {
    let domains = DomainDirectory::load(service.as_ref()).await.map_err(BootstrapError::Domains)?;
    if domains.find(&config.redr.domain_id).is_none() {
        warn!(
            event_name = "system.bootstrap.default_domain_unlisted",
            correlation_id = "bootstrap",
            domain_id = %config.redr.domain_id,
            "configured default domain is not in the REDR domain list"
        );
    }
    let domains = Arc::new(domains);

    let folders =
        Arc::new(FolderResolver::new(Arc::clone(&service), config.redr.folder_id.clone()));
    let orchestrator = Arc::new(ShortenOrchestrator::new(
        service,
        folders,
        ShortenSettings {
            folder_name: config.redr.folder_name.clone(),
            default_domain_id: config.redr.domain_id.clone(),
        },
    ));
    let chat_service =
        Arc::new(ShortenChatService::new(orchestrator, chat_client, Arc::clone(&domains)));
    let dispatcher = default_dispatcher(chat_service);

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        domain_count = domains.domains().len(),
        handler_count = dispatcher.handler_count(),
        chat_bridge = chat_bridge.as_str(),
        "application bootstrap complete"
    );

    Ok(Application { config, domains, dispatcher, chat_bridge })
}
