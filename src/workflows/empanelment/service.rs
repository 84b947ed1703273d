use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use super::domain::{Application, ApplicationId, DeviceTypeId, OemProfile, RoleContext};
use super::lifecycle::{EmpanelmentEvent, LifecycleEngine, TransitionError};
use super::payment::{self, PaymentError};
use super::repository::{
    ApplicationRepository, DecisionNotifier, EmpanelmentAlert, NotifyError, RepositoryError,
    StoredApplication,
};

/// Intake payload opening a new draft application.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationIntake {
    pub oem: OemProfile,
    pub device_types: Vec<DeviceTypeId>,
    pub opened_on: NaiveDate,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("apcd-{id:06}"))
}

/// Service composing the lifecycle engine, repository, and notifier.
///
/// Every mutation of one application runs as a serialized
/// load -> transition -> persist unit under that application's own lock;
/// unrelated applications proceed concurrently. Reads take the latest
/// committed snapshot without touching the lock arena.
pub struct EmpanelmentService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    engine: Arc<LifecycleEngine>,
    locks: Mutex<HashMap<ApplicationId, Arc<Mutex<()>>>>,
}

impl<R, N> EmpanelmentService<R, N>
where
    R: ApplicationRepository + 'static,
    N: DecisionNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, engine: LifecycleEngine) -> Self {
        Self {
            repository,
            notifier,
            engine: Arc::new(engine),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Open a fresh draft for the given OEM and device selection.
    pub fn open(&self, intake: ApplicationIntake) -> Result<StoredApplication, ApplicationServiceError> {
        let id = next_application_id();
        let application = Application::open(id, intake.oem, intake.device_types, intake.opened_on);
        let stored = self.repository.insert(application)?;
        info!(application_id = %stored.application.id.0, "application opened");
        Ok(stored)
    }

    /// Apply one lifecycle event under the per-application lock.
    pub fn apply(
        &self,
        id: &ApplicationId,
        event: EmpanelmentEvent,
        ctx: &RoleContext,
    ) -> Result<StoredApplication, ApplicationServiceError> {
        let event_label = event.label();
        let lock = self.application_lock(id);
        let _serial = lock.lock().expect("application lock poisoned");

        let stored = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        let next = self.engine.apply(&stored.application, event, ctx)?;
        let updated = self.repository.update(next, stored.version)?;

        info!(
            application_id = %id.0,
            event = event_label,
            status = %updated.application.status,
            "transition committed"
        );

        if updated.application.status.is_terminal() {
            self.publish_decision(&updated)?;
            self.release_application_lock(id);
        }

        Ok(updated)
    }

    /// Payment-webhook entry point: settle one device-type fee. Runs under
    /// the same per-application lock as lifecycle events.
    pub fn record_payment(
        &self,
        id: &ApplicationId,
        device_type: DeviceTypeId,
        amount_inr: u32,
        reference: String,
        settled_on: NaiveDate,
    ) -> Result<StoredApplication, ApplicationServiceError> {
        let lock = self.application_lock(id);
        let _serial = lock.lock().expect("application lock poisoned");

        let stored = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        let mut application = stored.application;
        payment::record_payment(&mut application, device_type, amount_inr, reference, settled_on)?;
        let updated = self.repository.update(application, stored.version)?;
        Ok(updated)
    }

    /// Note an applicant edit so `resubmit_after_info_request` can observe
    /// that the submission changed. In production the persistence layer
    /// advances this marker on profile/document updates.
    pub fn record_applicant_update(
        &self,
        id: &ApplicationId,
    ) -> Result<StoredApplication, ApplicationServiceError> {
        let lock = self.application_lock(id);
        let _serial = lock.lock().expect("application lock poisoned");

        let stored = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        let mut application = stored.application;
        application.revision += 1;
        let updated = self.repository.update(application, stored.version)?;
        Ok(updated)
    }

    /// Fetch the latest committed snapshot for API responses.
    pub fn get(&self, id: &ApplicationId) -> Result<StoredApplication, ApplicationServiceError> {
        let stored = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(stored)
    }

    fn application_lock(&self, id: &ApplicationId) -> Arc<Mutex<()>> {
        let mut arena = self.locks.lock().expect("lock arena mutex poisoned");
        arena.entry(id.clone()).or_default().clone()
    }

    /// Terminal applications accept no further events, so their lock entry
    /// is dropped. Callers still holding the `Arc` serialize as before; a
    /// late caller allocates a fresh lock and fails on the terminal status.
    fn release_application_lock(&self, id: &ApplicationId) {
        let mut arena = self.locks.lock().expect("lock arena mutex poisoned");
        arena.remove(id);
    }

    #[cfg(test)]
    pub(crate) fn lock_arena_len(&self) -> usize {
        self.locks.lock().expect("lock arena mutex poisoned").len()
    }

    fn publish_decision(&self, stored: &StoredApplication) -> Result<(), NotifyError> {
        let mut details = BTreeMap::new();
        details.insert(
            "status".to_string(),
            stored.application.status.label().to_string(),
        );
        if let Some(recommendation) = stored.application.recommendation {
            details.insert(
                "recommendation".to_string(),
                recommendation.label().to_string(),
            );
        }
        self.notifier.publish(EmpanelmentAlert {
            template: "empanelment_decided".to_string(),
            application_id: stored.application.id.clone(),
            details,
        })
    }
}

/// Error raised by the empanelment service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}
