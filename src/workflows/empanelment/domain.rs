use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::evaluation::EvaluationOutcome;
use super::rubric::CriterionId;

/// Identifier wrapper for empanelment applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier for an APCD device category selected at intake.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceTypeId(pub String);

impl fmt::Display for DeviceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Manufacturer identity captured when the application is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OemProfile {
    pub legal_name: String,
    pub contact_email: String,
}

/// Reviewer roles recognized by the lifecycle engine. The auth layer supplies
/// the role; the engine trusts it as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerRole {
    Applicant,
    Evaluator,
    FieldVerifier,
}

impl ReviewerRole {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewerRole::Applicant => "applicant",
            ReviewerRole::Evaluator => "evaluator",
            ReviewerRole::FieldVerifier => "field_verifier",
        }
    }
}

impl fmt::Display for ReviewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Caller identity attached to every lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleContext {
    pub user_id: String,
    pub role: ReviewerRole,
}

/// Lifecycle states of an empanelment application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    FieldVerificationPending,
    UnderEvaluation,
    NeedsMoreInfo,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::FieldVerificationPending => "field_verification_pending",
            ApplicationStatus::UnderEvaluation => "under_evaluation",
            ApplicationStatus::NeedsMoreInfo => "needs_more_info",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final disposition recorded by `finalize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    Reject,
    NeedMoreInfo,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Recommendation::Approve => "approve",
            Recommendation::Reject => "reject",
            Recommendation::NeedMoreInfo => "need_more_info",
        }
    }
}

/// A single evaluator award against one rubric criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub awarded: u16,
    pub evaluator: String,
}

/// Settled empanelment fee for one selected device type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount_inr: u32,
    pub reference: String,
    pub settled_on: NaiveDate,
}

/// Whether the site inspection upheld the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingsOutcome {
    Passed,
    Failed,
}

/// Field-verifier report filed after the site visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFindings {
    pub outcome: FindingsOutcome,
    pub remarks: String,
}

/// Assignment and completion record for field verification. An assigned
/// record with no findings is open; findings mark it complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub verifier_id: String,
    pub scheduled_on: NaiveDate,
    pub visited_on: Option<NaiveDate>,
    pub findings: Option<VerificationFindings>,
}

impl VerificationRecord {
    pub fn is_completed(&self) -> bool {
        self.findings.is_some()
    }
}

/// Immutable snapshot of one OEM's empanelment attempt. Mutated only by
/// cloning through the lifecycle engine; a failed transition leaves the
/// stored snapshot untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub oem: OemProfile,
    pub status: ApplicationStatus,
    pub selected_device_types: BTreeSet<DeviceTypeId>,
    pub payments: BTreeMap<DeviceTypeId, PaymentRecord>,
    pub verification: Option<VerificationRecord>,
    pub scores: BTreeMap<CriterionId, ScoreEntry>,
    pub evaluation: Option<EvaluationOutcome>,
    pub recommendation: Option<Recommendation>,
    /// Bumped by the persistence layer whenever the applicant edits the
    /// submission; gates `resubmitAfterInfoRequest`.
    pub revision: u64,
    pub info_requested_revision: Option<u64>,
    pub opened_on: NaiveDate,
}

impl Application {
    /// Open a fresh draft for the given OEM and device selection.
    pub fn open(
        id: ApplicationId,
        oem: OemProfile,
        device_types: impl IntoIterator<Item = DeviceTypeId>,
        opened_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            oem,
            status: ApplicationStatus::Draft,
            selected_device_types: device_types.into_iter().collect(),
            payments: BTreeMap::new(),
            verification: None,
            scores: BTreeMap::new(),
            evaluation: None,
            recommendation: None,
            revision: 0,
            info_requested_revision: None,
            opened_on,
        }
    }
}
