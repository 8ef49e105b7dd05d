//! Exception classification for mentor/mentee pairs.
//!
//! Pure functions over [`PreparedInputs`]: label a pair E1/E2/E3 or clean,
//! price the label, and rank severities. Only the highest-priority
//! applicable label is ever returned: same organization beats
//! neither-ranked beats one-sided.

use crate::models::{ExceptionKind, ParticipantId};
use crate::prepare::PreparedInputs;
use serde::{Deserialize, Serialize};

/// Acceptability of a pair, derived from preference-edge presence.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Acceptability {
    /// Both sides ranked each other.
    Mutual,
    /// Only the mentor ranked the mentee.
    OneSidedMentorOnly,
    /// Only the mentee ranked the mentor.
    OneSidedMenteeOnly,
    /// Neither side ranked the other.
    Neither,
}

/// Result of classifying one pair: the violated policy, if any, plus a
/// human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: Option<ExceptionKind>,
    pub reason: String,
}

impl Classification {
    fn clean() -> Self {
        Classification {
            kind: None,
            reason: String::new(),
        }
    }

    pub fn is_exception(&self) -> bool {
        self.kind.is_some()
    }
}

/// Classifies a pair against the cohort's policies.
pub fn classify_pair(
    mentor_id: ParticipantId,
    mentee_id: ParticipantId,
    inputs: &PreparedInputs,
) -> Classification {
    if inputs.same_org(mentor_id, mentee_id) {
        return Classification {
            kind: Some(ExceptionKind::E3),
            reason: format!(
                "Same organization: {}",
                inputs.organization(mentor_id)
            ),
        };
    }

    match inputs.acceptability(mentor_id, mentee_id) {
        Acceptability::Neither => Classification {
            kind: Some(ExceptionKind::E2),
            reason: "Neither participant ranked the other".into(),
        },
        Acceptability::OneSidedMentorOnly => Classification {
            kind: Some(ExceptionKind::E1),
            reason: "Mentee did not rank mentor".into(),
        },
        Acceptability::OneSidedMenteeOnly => Classification {
            kind: Some(ExceptionKind::E1),
            reason: "Mentor did not rank mentee".into(),
        },
        Acceptability::Mutual => Classification::clean(),
    }
}

/// Objective penalty for matching this pair; 0 when clean.
pub fn penalty_for(
    mentor_id: ParticipantId,
    mentee_id: ParticipantId,
    inputs: &PreparedInputs,
) -> i64 {
    match classify_pair(mentor_id, mentee_id, inputs).kind {
        Some(ExceptionKind::E3) => inputs.config.penalty_org,
        Some(ExceptionKind::E2) => inputs.config.penalty_neither,
        Some(ExceptionKind::E1) => inputs.config.penalty_one_sided,
        None => 0,
    }
}
