use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::domain::{Application, DeviceTypeId, VerificationFindings, VerificationRecord};
use super::evaluation::ProvisionalRecommendation;

/// Errors raised by the field-verification gate.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("verification already assigned to '{verifier_id}' and not yet completed")]
    AlreadyAssigned { verifier_id: String },
    #[error("verification findings already recorded")]
    AlreadyCompleted,
    #[error("no field verification has been assigned")]
    NotAssigned,
}

/// External configuration naming device types that always need a site visit.
#[derive(Debug, Clone, Default)]
pub struct VerificationPolicy {
    inspection_required: BTreeSet<DeviceTypeId>,
}

impl VerificationPolicy {
    pub fn new(inspection_required: impl IntoIterator<Item = DeviceTypeId>) -> Self {
        Self {
            inspection_required: inspection_required.into_iter().collect(),
        }
    }

    pub fn requires_inspection(&self, device_type: &DeviceTypeId) -> bool {
        self.inspection_required.contains(device_type)
    }
}

/// Tracks whether field verification is required and, if so, its completion.
#[derive(Debug, Clone, Default)]
pub struct VerificationGate {
    policy: VerificationPolicy,
}

impl VerificationGate {
    pub fn new(policy: VerificationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// A site visit is required when a selected device type is flagged by
    /// policy, or when a recorded evaluation disposition demands one.
    pub fn is_required(&self, application: &Application) -> bool {
        let flagged = application
            .selected_device_types
            .iter()
            .any(|device_type| self.policy.requires_inspection(device_type));

        let recommended = matches!(
            application.evaluation.as_ref().map(|outcome| outcome.provisional),
            Some(ProvisionalRecommendation::FieldVerificationRequired)
        );

        flagged || recommended
    }

    /// Create the verification assignment. Re-assignment is allowed only
    /// once the previous visit has been completed.
    pub fn assign(
        &self,
        application: &mut Application,
        verifier_id: String,
        scheduled_on: NaiveDate,
    ) -> Result<(), VerificationError> {
        if let Some(record) = &application.verification {
            if !record.is_completed() {
                return Err(VerificationError::AlreadyAssigned {
                    verifier_id: record.verifier_id.clone(),
                });
            }
        }

        application.verification = Some(VerificationRecord {
            verifier_id,
            scheduled_on,
            visited_on: None,
            findings: None,
        });
        Ok(())
    }

    /// Store the visit findings and mark the record complete.
    pub fn record_completion(
        &self,
        application: &mut Application,
        findings: VerificationFindings,
        visited_on: NaiveDate,
    ) -> Result<(), VerificationError> {
        match application.verification.as_mut() {
            None => Err(VerificationError::NotAssigned),
            Some(record) if record.is_completed() => Err(VerificationError::AlreadyCompleted),
            Some(record) => {
                record.findings = Some(findings);
                record.visited_on = Some(visited_on);
                Ok(())
            }
        }
    }

    /// True when verification is not required, or required and completed.
    pub fn is_satisfied(&self, application: &Application) -> bool {
        if !self.is_required(application) {
            return true;
        }

        application
            .verification
            .as_ref()
            .map(VerificationRecord::is_completed)
            .unwrap_or(false)
    }
}
