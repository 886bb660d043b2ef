use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{format_expiry, ShortenRequest, ShortenResult};
use crate::errors::{DeliveryError, ShortenError};
use crate::folders::FolderResolver;
use crate::remote::{LinkService, ShortLinkBody};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortenSettings {
    pub folder_name: String,
    pub default_domain_id: String,
}

/// Correlation data handed to the success continuation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryContext {
    pub request_id: String,
}

/// Composes folder resolution, domain selection, link creation and result delivery.
pub struct ShortenOrchestrator {
    service: Arc<dyn LinkService>,
    folders: Arc<FolderResolver>,
    settings: ShortenSettings,
}

impl ShortenOrchestrator {
    pub fn new(
        service: Arc<dyn LinkService>,
        folders: Arc<FolderResolver>,
        settings: ShortenSettings,
    ) -> Self {
        Self { service, folders, settings }
    }

    pub fn settings(&self) -> &ShortenSettings {
        &self.settings
    }

    /// Shortens `request.long_url` and hands the short url to `on_success` exactly once.
    ///
    /// An empty or absent `domain_override` selects the configured default domain. When folder
    /// resolution or link creation fails, `on_success` is never called.
    pub async fn run<F, Fut>(
        &self,
        request: ShortenRequest,
        domain_override: Option<&str>,
        on_success: F,
    ) -> Result<ShortenResult, ShortenError>
    where
        F: FnOnce(String, DeliveryContext) -> Fut,
        Fut: Future<Output = Result<(), DeliveryError>>,
    {
        let request_id = Uuid::new_v4().to_string();
        let domain_id = domain_override
            .map(str::trim)
            .filter(|domain_id| !domain_id.is_empty())
            .unwrap_or(self.settings.default_domain_id.as_str())
            .to_owned();

        let folder_id = match self.folders.resolve(&self.settings.folder_name).await {
            Ok(folder_id) => folder_id,
            Err(error) => {
                warn!(
                    event_name = "shorten.folder_failed",
                    request_id = %request_id,
                    error = %error,
                    "folder resolution failed"
                );
                return Err(error.into());
            }
        };

        let body = build_short_link_body(&domain_id, &folder_id, &request);
        let short_url = match self.service.create_short_link(&body).await {
            Ok(short_url) => short_url,
            Err(error) => {
                warn!(
                    event_name = "shorten.create_failed",
                    request_id = %request_id,
                    domain_id = %domain_id,
                    error = %error,
                    "short link creation failed"
                );
                return Err(error.into());
            }
        };

        info!(
            event_name = "shorten.created",
            request_id = %request_id,
            domain_id = %domain_id,
            short_url = %short_url,
            "short link created"
        );

        let context = DeliveryContext { request_id: request_id.clone() };
        if let Err(error) = on_success(short_url.clone(), context).await {
            warn!(
                event_name = "shorten.delivery_failed",
                request_id = %request_id,
                error = %error,
                "short link delivery failed"
            );
            return Err(error.into());
        }

        Ok(ShortenResult { short_url, request_id })
    }
}

/// Builds the remote request body; absent and empty optional fields are omitted.
pub fn build_short_link_body(
    domain_id: &str,
    folder_id: &str,
    request: &ShortenRequest,
) -> ShortLinkBody {
    let non_empty = |value: &Option<String>| value.clone().filter(|text| !text.is_empty());

    ShortLinkBody {
        domain: domain_id.to_owned(),
        source: request.long_url.clone(),
        folder: folder_id.to_owned(),
        masked: request.masked,
        default_redirect: non_empty(&request.default_redirect_url),
        expired_at: request.expires_at.as_ref().map(format_expiry),
        password: non_empty(&request.password),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{build_short_link_body, ShortenOrchestrator, ShortenSettings};
    use crate::domain::{DomainRef, FolderRef, ShortenRequest};
    use crate::errors::{DeliveryError, LinkServiceError, ShortenError};
    use crate::folders::FolderResolver;
    use crate::remote::{LinkService, ShortLinkBody};

    #[derive(Default)]
    struct RecordingService {
        folders: Vec<FolderRef>,
        link_result: Option<Result<String, LinkServiceError>>,
        bodies: Mutex<Vec<ShortLinkBody>>,
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl LinkService for RecordingService {
        async fn list_folders(&self) -> Result<Vec<FolderRef>, LinkServiceError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.folders.clone())
        }

        async fn create_folder(&self, _name: &str) -> Result<String, LinkServiceError> {
            Err(LinkServiceError::api(500, "create folder", "{}"))
        }

        async fn list_domains(&self) -> Result<Vec<DomainRef>, LinkServiceError> {
            Ok(Vec::new())
        }

        async fn create_short_link(
            &self,
            body: &ShortLinkBody,
        ) -> Result<String, LinkServiceError> {
            self.bodies.lock().expect("lock").push(body.clone());
            self.link_result.clone().unwrap_or_else(|| Ok("https://s.io/abc".to_owned()))
        }
    }

    fn orchestrator(service: &Arc<RecordingService>) -> ShortenOrchestrator {
        let dyn_service: Arc<dyn LinkService> = service.clone();
        let folders = Arc::new(FolderResolver::new(Arc::clone(&dyn_service), None));
        ShortenOrchestrator::new(
            dyn_service,
            folders,
            ShortenSettings {
                folder_name: "pumble-redr".to_owned(),
                default_domain_id: "D".to_owned(),
            },
        )
    }

    fn links_folder() -> Vec<FolderRef> {
        vec![FolderRef { id: "F".to_owned(), name: "pumble-redr".to_owned() }]
    }

    #[test]
    fn body_omits_unset_fields() {
        let body = build_short_link_body("D", "F", &ShortenRequest::new("https://a.b"));
        let serialized = serde_json::to_value(&body).expect("serialize");
        assert_eq!(serialized, json!({"domain": "D", "source": "https://a.b", "folder": "F"}));
    }

    #[test]
    fn body_maps_optional_fields() {
        let request = ShortenRequest {
            long_url: "https://a.b".to_owned(),
            masked: true,
            expires_at: Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).single(),
            password: Some("s3cret".to_owned()),
            default_redirect_url: Some(String::new()),
        };
        let serialized =
            serde_json::to_value(build_short_link_body("D", "F", &request)).expect("serialize");

        assert_eq!(
            serialized,
            json!({
                "domain": "D",
                "source": "https://a.b",
                "folder": "F",
                "masked": true,
                "expired_at": "2026-03-01T23:59:59.000Z",
                "password": "s3cret"
            })
        );
    }

    #[tokio::test]
    async fn run_delivers_short_url_exactly_once() {
        let service = Arc::new(RecordingService { folders: links_folder(), ..Default::default() });
        let orchestrator = orchestrator(&service);
        let deliveries = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&deliveries);
        let result = orchestrator
            .run(ShortenRequest::new("https://a.b"), None, |short_url, context| async move {
                recorded.lock().expect("lock").push((short_url, context.request_id));
                Ok(())
            })
            .await
            .expect("shorten");

        assert_eq!(result.short_url, "https://s.io/abc");
        let deliveries = deliveries.lock().expect("lock");
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0], (result.short_url.clone(), result.request_id.clone()));
        assert_eq!(result.request_id.len(), 36);

        let bodies = service.bodies.lock().expect("lock");
        assert_eq!(
            bodies.as_slice(),
            &[ShortLinkBody {
                domain: "D".to_owned(),
                source: "https://a.b".to_owned(),
                folder: "F".to_owned(),
                masked: false,
                default_redirect: None,
                expired_at: None,
                password: None,
            }]
        );
    }

    #[tokio::test]
    async fn domain_override_wins_unless_empty() {
        let service = Arc::new(RecordingService { folders: links_folder(), ..Default::default() });
        let orchestrator = orchestrator(&service);

        for domain_override in [Some("D2"), Some(""), None] {
            orchestrator
                .run(ShortenRequest::new("https://a.b"), domain_override, |_, _| async { Ok(()) })
                .await
                .expect("shorten");
        }

        let domains: Vec<String> =
            service.bodies.lock().expect("lock").iter().map(|body| body.domain.clone()).collect();
        assert_eq!(domains, vec!["D2", "D", "D"]);
        assert_eq!(service.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn request_ids_are_fresh_per_run() {
        let service = Arc::new(RecordingService { folders: links_folder(), ..Default::default() });
        let orchestrator = orchestrator(&service);

        let first = orchestrator
            .run(ShortenRequest::new("https://a.b"), None, |_, _| async { Ok(()) })
            .await
            .expect("first");
        let second = orchestrator
            .run(ShortenRequest::new("https://a.b"), None, |_, _| async { Ok(()) })
            .await
            .expect("second");

        assert_ne!(first.request_id, second.request_id);
    }

    #[tokio::test]
    async fn creation_failure_skips_delivery() {
        let failure = LinkServiceError::api(422, "create short link", r#"{"error":"bad url"}"#);
        let service = Arc::new(RecordingService {
            folders: links_folder(),
            link_result: Some(Err(failure.clone())),
            ..Default::default()
        });
        let orchestrator = orchestrator(&service);
        let delivered = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&delivered);
        let outcome = orchestrator
            .run(ShortenRequest::new("https://a.b"), None, |_, _| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(outcome, Err(ShortenError::Service(failure)));
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn folder_failure_skips_link_creation() {
        let service = Arc::new(RecordingService::default());
        let orchestrator = orchestrator(&service);

        let outcome = orchestrator
            .run(ShortenRequest::new("https://a.b"), None, |_, _| async { Ok(()) })
            .await;

        assert!(matches!(
            outcome,
            Err(ShortenError::Service(LinkServiceError::Api { status: 500, .. }))
        ));
        assert!(service.bodies.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_is_reported() {
        let service = Arc::new(RecordingService { folders: links_folder(), ..Default::default() });
        let orchestrator = orchestrator(&service);

        let outcome = orchestrator
            .run(ShortenRequest::new("https://a.b"), None, |_, _| async {
                Err(DeliveryError::new("channel not found"))
            })
            .await;

        assert_eq!(outcome, Err(ShortenError::Delivery(DeliveryError::new("channel not found"))));
        assert_eq!(service.bodies.lock().expect("lock").len(), 1);
    }
}
