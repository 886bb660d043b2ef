//! HTTP client for the REDR link service.
//!
//! Four calls are exposed through [`LinkService`]: list folders, create folder, list domains and
//! create short link. Every non-2xx answer is an [`LinkServiceError::Api`] (redirects are never
//! followed), and a 2xx answer without its required field is a
//! [`LinkServiceError::Validation`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{redirect::Policy, Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::domain::{required_wire_string, DomainRef, FolderRef, RawDomain, RawFolder};
use crate::errors::LinkServiceError;

const FOLDERS_PATH: &str = "/api/folders";
const DOMAINS_PATH: &str = "/api/domains";

#[async_trait]
pub trait LinkService: Send + Sync {
    async fn list_folders(&self) -> Result<Vec<FolderRef>, LinkServiceError>;
    async fn create_folder(&self, name: &str) -> Result<String, LinkServiceError>;
    async fn list_domains(&self) -> Result<Vec<DomainRef>, LinkServiceError>;
    async fn create_short_link(&self, body: &ShortLinkBody) -> Result<String, LinkServiceError>;
}

/// Request body for link creation. Optional fields are left out entirely when unset, and
/// `masked` is only sent when true.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShortLinkBody {
    pub domain: String,
    pub source: String,
    pub folder: String,
    #[serde(skip_serializing_if = "is_false")]
    pub masked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Endpoint urls derived from the configured API url.
///
/// Links are created at the API url itself; folders and domains live at fixed paths on the same
/// origin with the query string dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub short_links: Url,
    pub folders: Url,
    pub domains: Url,
}

impl Endpoints {
    pub fn from_api_url(api_url: &str) -> Result<Self, url::ParseError> {
        let short_links = Url::parse(api_url.trim())?;
        Ok(Self {
            folders: sibling_endpoint(&short_links, FOLDERS_PATH),
            domains: sibling_endpoint(&short_links, DOMAINS_PATH),
            short_links,
        })
    }
}

fn sibling_endpoint(base: &Url, path: &str) -> Url {
    let mut endpoint = base.clone();
    endpoint.set_path(path);
    endpoint.set_query(None);
    endpoint
}

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("REDR api key contains characters that are not valid in an HTTP header")]
    InvalidApiKey,
    #[error("could not build REDR http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Builds the pooled HTTP client used for every REDR call.
pub fn build_http_client(
    api_key: &SecretString,
    timeout: Duration,
) -> Result<Client, ClientBuildError> {
    let mut authorization = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
        .map_err(|_| ClientBuildError::InvalidApiKey)?;
    authorization.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let client = Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .redirect(Policy::none())
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()?;
    Ok(client)
}

pub struct HttpLinkService {
    client: Client,
    endpoints: Endpoints,
}

impl HttpLinkService {
    pub fn new(client: Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        context: &'static str,
    ) -> Result<String, LinkServiceError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        debug!(
            event_name = "redr.response",
            context,
            status = status.as_u16(),
            "REDR call returned"
        );

        ensure_success(status, context, body)
    }
}

#[async_trait]
impl LinkService for HttpLinkService {
    async fn list_folders(&self) -> Result<Vec<FolderRef>, LinkServiceError> {
        let request = self.client.get(self.endpoints.folders.as_str());
        let body = self.execute(request, "folders").await?;
        Ok(parse_folder_list(&body))
    }

    async fn create_folder(&self, name: &str) -> Result<String, LinkServiceError> {
        let request = self
            .client
            .post(self.endpoints.folders.as_str())
            .json(&serde_json::json!({ "name": name }));
        let body = self.execute(request, "create folder").await?;
        parse_created_folder_id(&body)
    }

    async fn list_domains(&self) -> Result<Vec<DomainRef>, LinkServiceError> {
        let request = self.client.get(self.endpoints.domains.as_str());
        let body = self.execute(request, "domains").await?;
        Ok(parse_domain_list(&body))
    }

    async fn create_short_link(&self, body: &ShortLinkBody) -> Result<String, LinkServiceError> {
        let request = self.client.post(self.endpoints.short_links.as_str()).json(body);
        let response_body = self.execute(request, "create short link").await?;
        parse_short_url(&response_body)
    }
}

fn transport_error(error: reqwest::Error) -> LinkServiceError {
    if error.is_timeout() {
        LinkServiceError::Timeout { message: error.to_string() }
    } else {
        LinkServiceError::Network { message: error.to_string() }
    }
}

fn ensure_success(
    status: StatusCode,
    context: &'static str,
    body: String,
) -> Result<String, LinkServiceError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(LinkServiceError::api(status.as_u16(), context, body))
    }
}

/// Keeps only well-formed folder items; a non-array body is an empty list.
pub fn parse_folder_list(body: &str) -> Vec<FolderRef> {
    parse_items::<RawFolder, FolderRef>(body)
}

/// Keeps only well-formed domain items; a non-array body is an empty list.
pub fn parse_domain_list(body: &str) -> Vec<DomainRef> {
    parse_items::<RawDomain, DomainRef>(body)
}

fn parse_items<R, T>(body: &str) -> Vec<T>
where
    R: DeserializeOwned,
    T: TryFrom<R>,
{
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<R>(item).ok())
        .filter_map(|raw| T::try_from(raw).ok())
        .collect();

    if parsed.len() < total {
        debug!(dropped = total - parsed.len(), kept = parsed.len(), "dropped malformed list items");
    }
    parsed
}

pub fn parse_created_folder_id(body: &str) -> Result<String, LinkServiceError> {
    let parsed = serde_json::from_str::<Value>(body).unwrap_or(Value::Null);
    required_wire_string(parsed.get("id"), "id")
        .map_err(|_| LinkServiceError::validation("REDR create folder response missing id", body))
}

pub fn parse_short_url(body: &str) -> Result<String, LinkServiceError> {
    let parsed = serde_json::from_str::<Value>(body).unwrap_or(Value::Null);
    match parsed.get("redirect_url").and_then(Value::as_str) {
        Some(short_url) if !short_url.trim().is_empty() => Ok(short_url.to_owned()),
        _ => Err(LinkServiceError::validation("REDR response missing short url", body)),
    }
}
