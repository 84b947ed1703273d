use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::workflows::empanelment::domain::{
    Application, ApplicationId, ApplicationStatus, DeviceTypeId, OemProfile, ReviewerRole,
    RoleContext, ScoreEntry,
};
use crate::workflows::empanelment::evaluation::EvaluationConfig;
use crate::workflows::empanelment::lifecycle::{CriterionAward, LifecycleEngine};
use crate::workflows::empanelment::payment;
use crate::workflows::empanelment::repository::{
    InMemoryApplicationRepository, InMemoryDecisionNotifier,
};
use crate::workflows::empanelment::rubric::{CriterionId, CriterionRegistry};
use crate::workflows::empanelment::service::EmpanelmentService;
use crate::workflows::empanelment::verification::{VerificationGate, VerificationPolicy};

pub(super) const MANDATORY_CRITERIA: [&str; 7] = [
    "financial_standing",
    "manufacturing_capacity",
    "technical_manpower",
    "quality_certifications",
    "testing_facilities",
    "past_supply_record",
    "service_network",
];

pub(super) fn day(year: i32, month: u32, dayn: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, dayn).expect("valid date")
}

pub(super) fn oem() -> OemProfile {
    OemProfile {
        legal_name: "ClearSky Controls Pvt Ltd".to_string(),
        contact_email: "compliance@clearsky.example".to_string(),
    }
}

pub(super) fn applicant() -> RoleContext {
    RoleContext {
        user_id: "oem-42".to_string(),
        role: ReviewerRole::Applicant,
    }
}

pub(super) fn evaluator() -> RoleContext {
    RoleContext {
        user_id: "eval-7".to_string(),
        role: ReviewerRole::Evaluator,
    }
}

pub(super) fn verifier() -> RoleContext {
    RoleContext {
        user_id: "inspector-3".to_string(),
        role: ReviewerRole::FieldVerifier,
    }
}

pub(super) fn device(id: &str) -> DeviceTypeId {
    DeviceTypeId(id.to_string())
}

/// Draft with a single device type that needs no site inspection.
pub(super) fn draft_application(suffix: &str) -> Application {
    Application::open(
        ApplicationId(format!("app-{suffix}")),
        oem(),
        [device("esp")],
        day(2026, 1, 5),
    )
}

/// Draft selecting a device type the policy flags for inspection.
pub(super) fn flagged_draft(suffix: &str) -> Application {
    Application::open(
        ApplicationId(format!("app-{suffix}")),
        oem(),
        [device("esp"), device("scrubber")],
        day(2026, 1, 5),
    )
}

pub(super) fn settle_all_fees(application: &mut Application) {
    let selected: Vec<DeviceTypeId> = application.selected_device_types.iter().cloned().collect();
    for (index, device_type) in selected.into_iter().enumerate() {
        payment::record_payment(
            application,
            device_type,
            25_000,
            format!("utr-{index:04}"),
            day(2026, 1, 6),
        )
        .expect("fee settles");
    }
}

pub(super) fn under_evaluation(suffix: &str) -> Application {
    let mut application = draft_application(suffix);
    settle_all_fees(&mut application);
    application.status = ApplicationStatus::UnderEvaluation;
    application
}

pub(super) fn awards(values: &[u16]) -> Vec<CriterionAward> {
    MANDATORY_CRITERIA
        .iter()
        .zip(values)
        .map(|(criterion, awarded)| CriterionAward {
            criterion: CriterionId::new(*criterion),
            awarded: *awarded,
        })
        .collect()
}

pub(super) fn score_map(values: &[u16]) -> BTreeMap<CriterionId, ScoreEntry> {
    MANDATORY_CRITERIA
        .iter()
        .zip(values)
        .map(|(criterion, awarded)| {
            (
                CriterionId::new(*criterion),
                ScoreEntry {
                    awarded: *awarded,
                    evaluator: "eval-7".to_string(),
                },
            )
        })
        .collect()
}

/// Mandatory awards summing to 48 of 70 (approve band).
pub(super) const APPROVE_AWARDS: [u16; 7] = [6, 7, 8, 6, 7, 8, 6];
/// Mandatory awards summing to 24 of 70 (reject band).
pub(super) const REJECT_AWARDS: [u16; 7] = [3, 4, 3, 4, 3, 4, 3];
/// Mandatory awards summing to 35 of 70 (needs-more-info band).
pub(super) const MIDBAND_AWARDS: [u16; 7] = [5, 5, 5, 5, 5, 5, 5];

pub(super) fn registry() -> Arc<CriterionRegistry> {
    Arc::new(CriterionRegistry::standard())
}

pub(super) fn inspection_gate() -> VerificationGate {
    VerificationGate::new(VerificationPolicy::new([device("scrubber")]))
}

pub(super) fn engine() -> LifecycleEngine {
    LifecycleEngine::new(registry(), inspection_gate(), EvaluationConfig::default())
}

pub(super) type TestService =
    EmpanelmentService<InMemoryApplicationRepository, InMemoryDecisionNotifier>;

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<InMemoryApplicationRepository>,
    Arc<InMemoryDecisionNotifier>,
) {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let notifier = Arc::new(InMemoryDecisionNotifier::default());
    let service = Arc::new(EmpanelmentService::new(
        repository.clone(),
        notifier.clone(),
        engine(),
    ));
    (service, repository, notifier)
}
