use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one scored dimension of the empanelment rubric.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CriterionId(pub String);

impl CriterionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for CriterionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One catalogue entry of the scoring rubric: defined at startup, never
/// mutated, shared by every application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionDefinition {
    pub id: CriterionId,
    pub label: String,
    pub max_score: u16,
    pub optional: bool,
}

impl CriterionDefinition {
    pub fn mandatory(id: &str, label: &str, max_score: u16) -> Self {
        Self {
            id: CriterionId::new(id),
            label: label.to_string(),
            max_score,
            optional: false,
        }
    }

    pub fn optional(id: &str, label: &str, max_score: u16) -> Self {
        Self {
            id: CriterionId::new(id),
            label: label.to_string(),
            max_score,
            optional: true,
        }
    }
}

/// Ordered, immutable criterion catalogue. Injected into the evaluation
/// engine so tests can substitute alternate rubrics; a rubric change means
/// replacing the registry wholesale, not patching entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionRegistry {
    criteria: Vec<CriterionDefinition>,
}

impl CriterionRegistry {
    pub fn new(criteria: Vec<CriterionDefinition>) -> Self {
        Self { criteria }
    }

    /// The ordered catalogue, stable for the registry's lifetime.
    pub fn criteria(&self) -> &[CriterionDefinition] {
        &self.criteria
    }

    pub fn definition(&self, id: &CriterionId) -> Option<&CriterionDefinition> {
        self.criteria.iter().find(|definition| &definition.id == id)
    }

    /// Sum of criterion maxima, excluding optional criteria unless asked for.
    pub fn max_possible_score(&self, include_optional: bool) -> u32 {
        self.criteria
            .iter()
            .filter(|definition| include_optional || !definition.optional)
            .map(|definition| u32::from(definition.max_score))
            .sum()
    }

    /// The scheme rubric: seven mandatory criteria and one optional bonus
    /// criterion, ten marks each.
    pub fn standard() -> Self {
        Self::new(vec![
            CriterionDefinition::mandatory("financial_standing", "Financial standing", 10),
            CriterionDefinition::mandatory(
                "manufacturing_capacity",
                "Manufacturing capacity and plant",
                10,
            ),
            CriterionDefinition::mandatory("technical_manpower", "Qualified technical manpower", 10),
            CriterionDefinition::mandatory(
                "quality_certifications",
                "Quality management certifications",
                10,
            ),
            CriterionDefinition::mandatory(
                "testing_facilities",
                "In-house testing facilities",
                10,
            ),
            CriterionDefinition::mandatory("past_supply_record", "Past supply record", 10),
            CriterionDefinition::mandatory(
                "service_network",
                "After-sales service network",
                10,
            ),
            CriterionDefinition::optional(
                "industry_recognition",
                "Industry awards and recognition",
                10,
            ),
        ])
    }
}
