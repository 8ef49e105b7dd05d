//! Manual overrides and active-run arbitration.
//!
//! Extends [`MatchEngine`] with the administrative surface: validating and
//! applying pair substitutions, proposing swaps that keep the matching
//! one-to-one, maintaining the single active run per cohort, and answering
//! "who is my current match".

use crate::classify::classify_pair;
use crate::engine::MatchEngine;
use crate::models::{
    ActiveMatchRun, CohortId, Match, MatchRun, Participant, ParticipantId, Role, RunStatus,
};
use crate::prepare::prepare;
use crate::store::StoreError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Why an override or active-run request was rejected.
#[derive(Error, Debug)]
pub enum OverrideError {
    #[error("Both participants must be in the same cohort")]
    CrossCohort,
    #[error("First participant must be a mentor")]
    NotAMentor,
    #[error("Second participant must be a mentee")]
    NotAMentee,
    #[error("Both participants must have submitted their preferences")]
    NotSubmitted,
    #[error("Override reason is required when creating an exception match")]
    MissingReason,
    #[error("Match run must belong to the specified cohort")]
    RunCohortMismatch,
    #[error("Only successful match runs can be set as active")]
    RunNotSuccessful,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The pair that would be re-joined if a proposed override displaces two
/// existing matches.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapSuggestion {
    pub mentor_id: ParticipantId,
    pub mentee_id: ParticipantId,
}

impl MatchEngine {
    /// Checks that a proposed override pair is admissible for the cohort:
    /// both members belong to it, roles are mentor-then-mentee, and both
    /// have submitted.
    pub fn validate_override(
        &self,
        mentor_id: ParticipantId,
        mentee_id: ParticipantId,
        cohort_id: CohortId,
    ) -> Result<(), OverrideError> {
        let mentor = self.store.participant(mentor_id)?;
        let mentee = self.store.participant(mentee_id)?;
        validate_pair(&mentor, &mentee, cohort_id)
    }

    /// Proposes the counterpart swap for an override request.
    ///
    /// Returns the two displaced partners when both requested participants
    /// already sit in different matches of the run. Returns `None` when the
    /// pair already exists or when at most one side is matched (the single
    /// partner is displaced without a forced swap).
    pub fn suggest_swap(
        &self,
        run_id: Uuid,
        mentor_id: ParticipantId,
        mentee_id: ParticipantId,
    ) -> Result<Option<SwapSuggestion>, StoreError> {
        let matches = self.store.matches(run_id)?;
        let mentor_current_mentee = matches
            .iter()
            .find(|m| m.mentor_id == mentor_id)
            .map(|m| m.mentee_id);
        let mentee_current_mentor = matches
            .iter()
            .find(|m| m.mentee_id == mentee_id)
            .map(|m| m.mentor_id);

        match (mentor_current_mentee, mentee_current_mentor) {
            (Some(current_mentee), Some(current_mentor)) if current_mentee != mentee_id => {
                Ok(Some(SwapSuggestion {
                    mentor_id: current_mentor,
                    mentee_id: current_mentee,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Applies a manual pair substitution to a run, atomically.
    ///
    /// The mentor's existing row is rewritten in place (new rows start at
    /// zero score); any other row holding the mentee is displaced. If the
    /// pair classifies as an exception, a non-empty `reason` is required.
    pub fn create_manual_override(
        &self,
        run_id: Uuid,
        mentor_id: ParticipantId,
        mentee_id: ParticipantId,
        reason: &str,
        initiator: &str,
    ) -> Result<Match, OverrideError> {
        let run = self.store.run(run_id)?;
        let lock = self.cohort_lock(run.cohort_id);
        let _guard = lock.lock().expect("cohort run lock poisoned");

        let mentor = self.store.participant(mentor_id)?;
        let mentee = self.store.participant(mentee_id)?;
        validate_pair(&mentor, &mentee, run.cohort_id)?;

        let cohort = self.store.cohort(run.cohort_id)?;
        let inputs = prepare(self.store.as_ref(), &cohort)?;
        let classification = classify_pair(mentor_id, mentee_id, &inputs);
        if classification.is_exception() && reason.trim().is_empty() {
            return Err(OverrideError::MissingReason);
        }

        let existing = self
            .store
            .matches(run_id)?
            .into_iter()
            .find(|m| m.mentor_id == mentor_id);
        let mut row = match existing {
            Some(mut m) => {
                m.mentee_id = mentee_id;
                m
            }
            None => Match {
                mentor_id,
                mentee_id,
                // Manual pairings carry no computed score.
                score_percent: 0,
                ambiguity_flag: false,
                ambiguity_reason: String::new(),
                exception_flag: false,
                exception_type: None,
                exception_reason: String::new(),
                is_manual_override: false,
                override_reason: String::new(),
            },
        };
        row.is_manual_override = true;
        row.override_reason = reason.to_string();
        row.exception_flag = classification.is_exception();
        row.exception_type = classification.kind;
        row.exception_reason = classification.reason;

        let committed = self.store.commit_override(run_id, row)?;
        log::info!(
            "manual override on run {run_id}: mentor {mentor_id} -> mentee {mentee_id} by {initiator}"
        );
        Ok(committed)
    }

    /// Points the cohort's active-run singleton at a successful run.
    /// Idempotent; re-pointing replaces the previous pointer atomically.
    pub fn set_active_match_run(
        &self,
        cohort_id: CohortId,
        run_id: Uuid,
        initiator: &str,
    ) -> Result<(), OverrideError> {
        let run = self.store.run(run_id)?;
        if run.cohort_id != cohort_id {
            return Err(OverrideError::RunCohortMismatch);
        }
        if run.status != RunStatus::Success {
            return Err(OverrideError::RunNotSuccessful);
        }
        self.store.set_active_run(ActiveMatchRun {
            cohort_id,
            run_id,
            set_by: initiator.to_string(),
            set_at: Utc::now(),
        })?;
        log::info!("active run for cohort {cohort_id} set to {run_id} by {initiator}");
        Ok(())
    }

    /// The run a cohort currently presents to participants, if any.
    pub fn active_match_run(&self, cohort_id: CohortId) -> Result<Option<MatchRun>, StoreError> {
        match self.store.active_run(cohort_id)? {
            Some(active) => Ok(Some(self.store.run(active.run_id)?)),
            None => Ok(None),
        }
    }

    /// The participant's match in their cohort's active run, if both exist.
    pub fn active_match_for(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Option<Match>, StoreError> {
        let participant = self.store.participant(participant_id)?;
        let Some(active) = self.store.active_run(participant.cohort_id)? else {
            return Ok(None);
        };
        let matches = self.store.matches(active.run_id)?;
        Ok(matches.into_iter().find(|m| match participant.role {
            Role::Mentor => m.mentor_id == participant_id,
            Role::Mentee => m.mentee_id == participant_id,
        }))
    }
}

fn validate_pair(
    mentor: &Participant,
    mentee: &Participant,
    cohort_id: CohortId,
) -> Result<(), OverrideError> {
    if mentor.cohort_id != cohort_id || mentee.cohort_id != cohort_id {
        return Err(OverrideError::CrossCohort);
    }
    if mentor.role != Role::Mentor {
        return Err(OverrideError::NotAMentor);
    }
    if mentee.role != Role::Mentee {
        return Err(OverrideError::NotAMentee);
    }
    if !mentor.submitted || !mentee.submitted {
        return Err(OverrideError::NotSubmitted);
    }
    Ok(())
}
