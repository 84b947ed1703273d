//! OEM empanelment: score aggregation, gate checks, and the application
//! lifecycle engine, plus the service/router shell around them.
//!
//! The engine itself performs no I/O: the service loads the current
//! snapshot, applies one event, and persists the result as a single
//! serialized unit per application id.

pub mod domain;
pub mod evaluation;
pub mod lifecycle;
pub mod payment;
pub mod repository;
pub mod router;
pub mod rubric;
pub mod service;
pub mod verification;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, DeviceTypeId, FindingsOutcome, OemProfile,
    PaymentRecord, Recommendation, ReviewerRole, RoleContext, ScoreEntry, VerificationFindings,
    VerificationRecord,
};
pub use evaluation::{
    aggregate, EvaluationConfig, EvaluationError, EvaluationOutcome, ProvisionalRecommendation,
    ScoreComponent,
};
pub use lifecycle::{CriterionAward, EmpanelmentEvent, LifecycleEngine, TransitionError};
pub use payment::PaymentError;
pub use repository::{
    ApplicationRepository, ApplicationStatusView, DecisionNotifier, EmpanelmentAlert,
    InMemoryApplicationRepository, InMemoryDecisionNotifier, NotifyError, RepositoryError,
    StoredApplication,
};
pub use router::empanelment_router;
pub use rubric::{CriterionDefinition, CriterionId, CriterionRegistry};
pub use service::{ApplicationIntake, ApplicationServiceError, EmpanelmentService};
pub use verification::{VerificationError, VerificationGate, VerificationPolicy};
