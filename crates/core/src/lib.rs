//! Link shortening core: the remote service client, the folder resolver cache, the domain
//! directory and the shortening orchestrator that ties them together.

pub mod config;
pub mod domain;
pub mod domains;
pub mod errors;
pub mod folders;
pub mod remote;
pub mod shorten;

pub use domain::{expiry_end_of_day, DomainRef, FolderRef, ShortenRequest, ShortenResult};
pub use domains::DomainDirectory;
pub use errors::{DeliveryError, LinkServiceError, ShortenError};
pub use folders::FolderResolver;
pub use remote::{HttpLinkService, LinkService, ShortLinkBody};
pub use shorten::{DeliveryContext, ShortenOrchestrator, ShortenSettings};
