use tracing::info;

use crate::domain::DomainRef;
use crate::errors::LinkServiceError;
use crate::remote::LinkService;

/// Snapshot of the sending domains available to the configured account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainDirectory {
    domains: Vec<DomainRef>,
}

impl DomainDirectory {
    pub async fn load(service: &dyn LinkService) -> Result<Self, LinkServiceError> {
        let domains = service.list_domains().await?;
        info!(event_name = "domains.loaded", count = domains.len(), "loaded sending domains");
        Ok(Self { domains })
    }

    pub fn from_domains(domains: Vec<DomainRef>) -> Self {
        Self { domains }
    }

    pub fn domains(&self) -> &[DomainRef] {
        &self.domains
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn find(&self, domain_id: &str) -> Option<&DomainRef> {
        self.domains.iter().find(|domain| domain.id == domain_id)
    }

    pub fn default_domain(&self) -> Option<&DomainRef> {
        self.domains.first()
    }

    /// The configured default if it is listed, otherwise the first domain.
    pub fn initial_choice(&self, default_domain_id: &str) -> Option<&DomainRef> {
        self.find(default_domain_id).or_else(|| self.default_domain())
    }
}
