//! Folder id resolution with memoization and in-flight deduplication.
//!
//! The cache moves through `Idle -> Resolving -> Resolved`; a failed resolution drops back to
//! `Idle` so the next caller starts over. The check of the current state and the publication of
//! a new pending resolution happen under one lock, so no two callers can both start a remote
//! lookup.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use crate::errors::LinkServiceError;
use crate::remote::LinkService;

type PendingResolution = Shared<BoxFuture<'static, Result<String, LinkServiceError>>>;

enum FolderSlot {
    Idle,
    Resolving(PendingResolution),
    Resolved(String),
}

pub struct FolderResolver {
    service: Arc<dyn LinkService>,
    folder_id_override: Option<String>,
    slot: Arc<Mutex<FolderSlot>>,
}

impl FolderResolver {
    /// `folder_id_override` short-circuits every lookup when an operator pre-provisioned the
    /// folder.
    pub fn new(service: Arc<dyn LinkService>, folder_id_override: Option<String>) -> Self {
        Self {
            service,
            folder_id_override: folder_id_override.filter(|id| !id.trim().is_empty()),
            slot: Arc::new(Mutex::new(FolderSlot::Idle)),
        }
    }

    /// Returns the folder id for `folder_name`, finding or creating the folder on first use.
    ///
    /// Concurrent callers that arrive while a resolution is running share its outcome, success
    /// or failure, instead of issuing their own remote calls.
    pub async fn resolve(&self, folder_name: &str) -> Result<String, LinkServiceError> {
        if let Some(folder_id) = &self.folder_id_override {
            return Ok(folder_id.clone());
        }

        let pending = {
            let mut slot = lock_slot(&self.slot);
            match &*slot {
                FolderSlot::Resolved(folder_id) => return Ok(folder_id.clone()),
                FolderSlot::Resolving(pending) => {
                    debug!(
                        event_name = "folder.resolve.joined",
                        "joining in-flight folder resolution"
                    );
                    pending.clone()
                }
                FolderSlot::Idle => {
                    let pending = self.start_resolution(folder_name);
                    *slot = FolderSlot::Resolving(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// The memoized folder id, if a resolution already succeeded.
    pub fn resolved_id(&self) -> Option<String> {
        if let Some(folder_id) = &self.folder_id_override {
            return Some(folder_id.clone());
        }
        match &*lock_slot(&self.slot) {
            FolderSlot::Resolved(folder_id) => Some(folder_id.clone()),
            FolderSlot::Idle | FolderSlot::Resolving(_) => None,
        }
    }

    fn start_resolution(&self, folder_name: &str) -> PendingResolution {
        let service = Arc::clone(&self.service);
        let slot = Arc::clone(&self.slot);
        let folder_name = folder_name.to_owned();

        async move {
            let outcome = find_or_create_folder(service.as_ref(), &folder_name).await;
            let mut guard = lock_slot(&slot);
            *guard = match &outcome {
                Ok(folder_id) => FolderSlot::Resolved(folder_id.clone()),
                Err(_) => FolderSlot::Idle,
            };
            outcome
        }
        .boxed()
        .shared()
    }
}

fn lock_slot(slot: &Mutex<FolderSlot>) -> MutexGuard<'_, FolderSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn normalize_folder_name(name: &str) -> String {
    name.trim().to_lowercase()
}

async fn find_or_create_folder(
    service: &dyn LinkService,
    folder_name: &str,
) -> Result<String, LinkServiceError> {
    let desired = normalize_folder_name(folder_name);

    if let Some(folder_id) = find_folder_id(service, &desired).await? {
        info!(event_name = "folder.resolve.found", folder_id = %folder_id, "folder found");
        return Ok(folder_id);
    }

    match service.create_folder(folder_name).await {
        Ok(folder_id) => {
            info!(event_name = "folder.resolve.created", folder_id = %folder_id, "folder created");
            Ok(folder_id)
        }
        Err(create_error) if create_error.is_conflict() => {
            warn!(
                event_name = "folder.resolve.conflict",
                error = %create_error,
                "folder creation conflicted; looking the folder up again"
            );
            match find_folder_id(service, &desired).await? {
                Some(folder_id) => Ok(folder_id),
                None => Err(create_error),
            }
        }
        Err(create_error) => Err(create_error),
    }
}

async fn find_folder_id(
    service: &dyn LinkService,
    desired: &str,
) -> Result<Option<String>, LinkServiceError> {
    let folders = service.list_folders().await?;
    Ok(folders
        .into_iter()
        .find(|folder| normalize_folder_name(&folder.name) == desired)
        .map(|folder| folder.id))
}
