use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, ApplicationStatus};

/// Snapshot plus the optimistic-concurrency stamp the persistence layer
/// must honor: updates name the version they were derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredApplication {
    pub application: Application,
    pub version: u64,
}

impl StoredApplication {
    pub fn status_view(&self) -> ApplicationStatusView {
        let evaluation = self.application.evaluation.as_ref();
        ApplicationStatusView {
            application_id: self.application.id.clone(),
            status: self.application.status.label(),
            version: self.version,
            recommendation: self
                .application
                .recommendation
                .map(|recommendation| recommendation.label()),
            total_score: evaluation.map(|outcome| outcome.total),
            max_attainable: evaluation.map(|outcome| outcome.max_attainable),
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attainable: Option<u32>,
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<StoredApplication, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<StoredApplication>, RepositoryError>;
    fn update(
        &self,
        application: Application,
        expected_version: u64,
    ) -> Result<StoredApplication, RepositoryError>;
    fn pending(&self, limit: usize) -> Result<Vec<StoredApplication>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("snapshot is stale (expected version {expected}, found {found})")]
    StaleVersion { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook fired on terminal decisions (portal e-mail,
/// SMS adapters and the like).
pub trait DecisionNotifier: Send + Sync {
    fn publish(&self, alert: EmpanelmentAlert) -> Result<(), NotifyError>;
}

/// Simple alert payload so routes/tests can assert integration boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmpanelmentAlert {
    pub template: String,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

/// Alert dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// In-memory repository backing the served binary and the test suite.
#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, StoredApplication>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: Application) -> Result<StoredApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        let stored = StoredApplication {
            application,
            version: 1,
        };
        guard.insert(stored.application.id.clone(), stored.clone());
        Ok(stored)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<StoredApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(
        &self,
        application: Application,
        expected_version: u64,
    ) -> Result<StoredApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let current = guard
            .get(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::StaleVersion {
                expected: expected_version,
                found: current.version,
            });
        }
        let stored = StoredApplication {
            application,
            version: expected_version + 1,
        };
        guard.insert(stored.application.id.clone(), stored.clone());
        Ok(stored)
    }

    fn pending(&self, limit: usize) -> Result<Vec<StoredApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|stored| stored.application.status == ApplicationStatus::UnderEvaluation)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// In-memory notifier capturing published alerts for inspection.
#[derive(Default, Clone)]
pub struct InMemoryDecisionNotifier {
    events: Arc<Mutex<Vec<EmpanelmentAlert>>>,
}

impl InMemoryDecisionNotifier {
    pub fn events(&self) -> Vec<EmpanelmentAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl DecisionNotifier for InMemoryDecisionNotifier {
    fn publish(&self, alert: EmpanelmentAlert) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}
