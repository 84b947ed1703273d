use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::ScoreEntry;
use super::rubric::{CriterionId, CriterionRegistry};

/// Cutoff ratios separating the provisional dispositions. The 0.6/0.4
/// defaults are the scheme's working placeholders and can be overridden
/// through configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub approval_ratio: f32,
    pub rejection_ratio: f32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            approval_ratio: 0.6,
            rejection_ratio: 0.4,
        }
    }
}

/// Advisory disposition derived from the aggregate score. Input to the
/// lifecycle engine, which may override it on verification findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionalRecommendation {
    Approve,
    Reject,
    NeedMoreInfo,
    FieldVerificationRequired,
}

impl ProvisionalRecommendation {
    pub const fn label(self) -> &'static str {
        match self {
            ProvisionalRecommendation::Approve => "approve",
            ProvisionalRecommendation::Reject => "reject",
            ProvisionalRecommendation::NeedMoreInfo => "need_more_info",
            ProvisionalRecommendation::FieldVerificationRequired => "field_verification_required",
        }
    }
}

/// Discrete contribution to an evaluation, allowing transparent audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub criterion: CriterionId,
    pub awarded: u16,
    pub max_score: u16,
    pub optional: bool,
}

/// Composite evaluation result. Derived fresh from an application's scores;
/// replaced rather than edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub total: u32,
    pub max_attainable: u32,
    pub components: Vec<ScoreComponent>,
    pub provisional: ProvisionalRecommendation,
}

impl EvaluationOutcome {
    pub fn ratio(&self) -> f32 {
        if self.max_attainable == 0 {
            0.0
        } else {
            self.total as f32 / self.max_attainable as f32
        }
    }
}

/// Validation errors raised while aggregating scores.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("mandatory criterion '{criterion}' has no recorded score")]
    IncompleteScoring { criterion: CriterionId },
    #[error("score {awarded} for criterion '{criterion}' exceeds maximum {max_score}")]
    ScoreOutOfRange {
        criterion: CriterionId,
        awarded: u16,
        max_score: u16,
    },
}

/// Check a single award against the registry before it is recorded.
/// An award against a criterion outside the registry surfaces as
/// `ScoreOutOfRange` with a zero maximum.
pub fn validate_award(
    criterion: &CriterionId,
    awarded: u16,
    registry: &CriterionRegistry,
) -> Result<(), EvaluationError> {
    match registry.definition(criterion) {
        None => Err(EvaluationError::ScoreOutOfRange {
            criterion: criterion.clone(),
            awarded,
            max_score: 0,
        }),
        Some(definition) if awarded > definition.max_score => {
            Err(EvaluationError::ScoreOutOfRange {
                criterion: criterion.clone(),
                awarded,
                max_score: definition.max_score,
            })
        }
        Some(_) => Ok(()),
    }
}

/// Combine recorded scores into a composite outcome. Pure over its inputs;
/// the caller persists the result.
pub fn aggregate(
    scores: &BTreeMap<CriterionId, ScoreEntry>,
    registry: &CriterionRegistry,
    config: &EvaluationConfig,
) -> Result<EvaluationOutcome, EvaluationError> {
    for (criterion, entry) in scores {
        validate_award(criterion, entry.awarded, registry)?;
    }

    let mut components = Vec::with_capacity(registry.criteria().len());
    let mut total: u32 = 0;
    let mut optional_scored = false;

    for definition in registry.criteria() {
        match scores.get(&definition.id) {
            Some(entry) => {
                components.push(ScoreComponent {
                    criterion: definition.id.clone(),
                    awarded: entry.awarded,
                    max_score: definition.max_score,
                    optional: definition.optional,
                });
                total += u32::from(entry.awarded);
                if definition.optional {
                    optional_scored = true;
                }
            }
            // Optional criteria left unscored do not penalize the applicant.
            None if definition.optional => {}
            None => {
                return Err(EvaluationError::IncompleteScoring {
                    criterion: definition.id.clone(),
                })
            }
        }
    }

    let max_attainable = registry.max_possible_score(optional_scored);
    let ratio = if max_attainable == 0 {
        0.0
    } else {
        total as f32 / max_attainable as f32
    };

    let provisional = if ratio >= config.approval_ratio {
        ProvisionalRecommendation::Approve
    } else if ratio < config.rejection_ratio {
        ProvisionalRecommendation::Reject
    } else {
        ProvisionalRecommendation::NeedMoreInfo
    };

    Ok(EvaluationOutcome {
        total,
        max_attainable,
        components,
        provisional,
    })
}
