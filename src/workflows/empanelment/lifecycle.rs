use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{
    Application, ApplicationStatus, DeviceTypeId, FindingsOutcome, Recommendation, ReviewerRole,
    RoleContext, ScoreEntry, VerificationFindings,
};
use super::evaluation::{
    aggregate, validate_award, EvaluationConfig, EvaluationError, ProvisionalRecommendation,
};
use super::payment::{self, PaymentError};
use super::rubric::{CriterionId, CriterionRegistry};
use super::verification::{VerificationError, VerificationGate};

/// One award in a `record_scores` batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionAward {
    pub criterion: CriterionId,
    pub awarded: u16,
}

/// Events accepted by the lifecycle engine. The API layer submits one event
/// per call together with the caller's role context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmpanelmentEvent {
    Submit,
    RouteForVerification,
    RouteForEvaluation,
    AssignVerifier {
        verifier_id: String,
        scheduled_on: NaiveDate,
    },
    RecordVerification {
        findings: VerificationFindings,
        visited_on: NaiveDate,
    },
    RecordScores {
        awards: Vec<CriterionAward>,
    },
    Finalize,
    ResubmitAfterInfoRequest,
}

impl EmpanelmentEvent {
    pub fn label(&self) -> &'static str {
        match self {
            EmpanelmentEvent::Submit => "submit",
            EmpanelmentEvent::RouteForVerification => "route_for_verification",
            EmpanelmentEvent::RouteForEvaluation => "route_for_evaluation",
            EmpanelmentEvent::AssignVerifier { .. } => "assign_verifier",
            EmpanelmentEvent::RecordVerification { .. } => "record_verification",
            EmpanelmentEvent::RecordScores { .. } => "record_scores",
            EmpanelmentEvent::Finalize => "finalize",
            EmpanelmentEvent::ResubmitAfterInfoRequest => "resubmit_after_info_request",
        }
    }

    fn required_role(&self) -> ReviewerRole {
        match self {
            EmpanelmentEvent::Submit | EmpanelmentEvent::ResubmitAfterInfoRequest => {
                ReviewerRole::Applicant
            }
            EmpanelmentEvent::AssignVerifier { .. } | EmpanelmentEvent::RecordVerification { .. } => {
                ReviewerRole::FieldVerifier
            }
            EmpanelmentEvent::RouteForVerification
            | EmpanelmentEvent::RouteForEvaluation
            | EmpanelmentEvent::RecordScores { .. }
            | EmpanelmentEvent::Finalize => ReviewerRole::Evaluator,
        }
    }
}

/// Guard failures surfaced to the caller unchanged; none indicate a crash
/// condition, and the application snapshot is never partially mutated.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("event '{event}' is not legal while the application is {status}")]
    IllegalTransition {
        status: ApplicationStatus,
        event: &'static str,
    },
    #[error("role '{actual}' may not perform '{event}' (requires '{required}')")]
    Forbidden {
        event: &'static str,
        required: ReviewerRole,
        actual: ReviewerRole,
    },
    #[error("empanelment fees are not settled for every selected device type")]
    PaymentIncomplete { unpaid: Vec<DeviceTypeId> },
    #[error("field verification has not been completed")]
    VerificationPending,
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// The status-transition engine: consumes the rubric, the gates, and the
/// caller's role to decide legal transitions.
///
/// `apply` is pure over the snapshot it is given: all guards are checked
/// against a clone, and the clone is returned only on full success.
pub struct LifecycleEngine {
    registry: Arc<CriterionRegistry>,
    gate: VerificationGate,
    config: EvaluationConfig,
}

impl LifecycleEngine {
    pub fn new(
        registry: Arc<CriterionRegistry>,
        gate: VerificationGate,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            registry,
            gate,
            config,
        }
    }

    pub fn registry(&self) -> &CriterionRegistry {
        &self.registry
    }

    pub fn apply(
        &self,
        application: &Application,
        event: EmpanelmentEvent,
        ctx: &RoleContext,
    ) -> Result<Application, TransitionError> {
        let event_label = event.label();

        // The role guard runs before every other guard.
        let required = event.required_role();
        if ctx.role != required {
            return Err(TransitionError::Forbidden {
                event: event_label,
                required,
                actual: ctx.role,
            });
        }

        let mut next = application.clone();

        match (application.status, event) {
            (ApplicationStatus::Draft, EmpanelmentEvent::Submit) => {
                let unpaid = payment::unpaid_device_types(&next);
                if next.selected_device_types.is_empty() || !unpaid.is_empty() {
                    return Err(TransitionError::PaymentIncomplete { unpaid });
                }
                next.status = ApplicationStatus::Submitted;
            }

            (ApplicationStatus::Submitted, EmpanelmentEvent::RouteForVerification) => {
                if !self.gate.is_required(&next) {
                    return Err(TransitionError::IllegalTransition {
                        status: application.status,
                        event: event_label,
                    });
                }
                next.status = ApplicationStatus::FieldVerificationPending;
            }

            (ApplicationStatus::Submitted, EmpanelmentEvent::RouteForEvaluation) => {
                if self.gate.is_required(&next) {
                    return Err(TransitionError::VerificationPending);
                }
                next.status = ApplicationStatus::UnderEvaluation;
            }

            (
                ApplicationStatus::FieldVerificationPending,
                EmpanelmentEvent::RouteForEvaluation,
            ) => {
                if !self.gate.is_satisfied(&next) {
                    return Err(TransitionError::VerificationPending);
                }
                next.status = ApplicationStatus::UnderEvaluation;
            }

            (
                ApplicationStatus::FieldVerificationPending,
                EmpanelmentEvent::AssignVerifier {
                    verifier_id,
                    scheduled_on,
                },
            ) => {
                self.gate.assign(&mut next, verifier_id, scheduled_on)?;
            }

            (
                ApplicationStatus::FieldVerificationPending,
                EmpanelmentEvent::RecordVerification {
                    findings,
                    visited_on,
                },
            ) => {
                self.gate.record_completion(&mut next, findings, visited_on)?;
            }

            (ApplicationStatus::UnderEvaluation, EmpanelmentEvent::RecordScores { awards }) => {
                // Validate the whole batch before committing any award.
                for award in &awards {
                    validate_award(&award.criterion, award.awarded, &self.registry)?;
                }
                for award in awards {
                    next.scores.insert(
                        award.criterion,
                        ScoreEntry {
                            awarded: award.awarded,
                            evaluator: ctx.user_id.clone(),
                        },
                    );
                }
            }

            (ApplicationStatus::UnderEvaluation, EmpanelmentEvent::Finalize) => {
                let outcome = aggregate(&next.scores, &self.registry, &self.config)?;

                let verification_failed = next
                    .verification
                    .as_ref()
                    .and_then(|record| record.findings.as_ref())
                    .map(|findings| findings.outcome == FindingsOutcome::Failed)
                    .unwrap_or(false);

                // A failed site inspection forces rejection regardless of score.
                let (status, recommendation) = if verification_failed {
                    (ApplicationStatus::Rejected, Recommendation::Reject)
                } else {
                    match outcome.provisional {
                        ProvisionalRecommendation::Approve => {
                            (ApplicationStatus::Approved, Recommendation::Approve)
                        }
                        ProvisionalRecommendation::Reject => {
                            (ApplicationStatus::Rejected, Recommendation::Reject)
                        }
                        ProvisionalRecommendation::NeedMoreInfo
                        | ProvisionalRecommendation::FieldVerificationRequired => (
                            ApplicationStatus::NeedsMoreInfo,
                            Recommendation::NeedMoreInfo,
                        ),
                    }
                };

                debug!(
                    application_id = %next.id.0,
                    total = outcome.total,
                    max_attainable = outcome.max_attainable,
                    provisional = outcome.provisional.label(),
                    verification_failed,
                    "finalized evaluation"
                );

                if status == ApplicationStatus::NeedsMoreInfo {
                    next.info_requested_revision = Some(next.revision);
                }
                next.evaluation = Some(outcome);
                next.recommendation = Some(recommendation);
                next.status = status;
            }

            (ApplicationStatus::NeedsMoreInfo, EmpanelmentEvent::ResubmitAfterInfoRequest) => {
                let marker = next.info_requested_revision.unwrap_or(next.revision);
                if next.revision <= marker {
                    // Nothing changed since the information request.
                    return Err(TransitionError::IllegalTransition {
                        status: application.status,
                        event: event_label,
                    });
                }
                next.status = ApplicationStatus::UnderEvaluation;
                next.recommendation = None;
                next.info_requested_revision = None;
            }

            (status, _) => {
                return Err(TransitionError::IllegalTransition {
                    status,
                    event: event_label,
                });
            }
        }

        Ok(next)
    }
}
