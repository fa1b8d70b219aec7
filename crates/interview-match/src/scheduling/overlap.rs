use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::normalize_field;

/// Weights applied when blending exact field agreement with skill overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlapWeights {
    pub field: f64,
    pub skills: f64,
}

impl Default for OverlapWeights {
    fn default() -> Self {
        Self {
            field: 0.6,
            skills: 0.4,
        }
    }
}

/// Breakdown of a skill-overlap evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapScore {
    pub field_score: f64,
    pub skill_score: f64,
    pub combined: f64,
}

/// Default single-signal matching score used for eligibility gating.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillOverlapScorer {
    weights: OverlapWeights,
}

impl SkillOverlapScorer {
    pub fn new(weights: OverlapWeights) -> Self {
        Self { weights }
    }

    pub fn score(
        &self,
        candidate_field: &str,
        candidate_skills: &BTreeSet<String>,
        interviewer_field: &str,
        interviewer_skills: &BTreeSet<String>,
    ) -> OverlapScore {
        let common = candidate_skills.intersection(interviewer_skills).count();
        let skill_score = common as f64 / candidate_skills.len().max(1) as f64;
        let field_score = if normalize_field(candidate_field) == normalize_field(interviewer_field)
        {
            1.0
        } else {
            0.0
        };

        OverlapScore {
            field_score,
            skill_score,
            combined: self.weights.field * field_score + self.weights.skills * skill_score,
        }
    }
}
