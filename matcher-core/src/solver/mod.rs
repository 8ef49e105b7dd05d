//! The two matching solvers and their shared outcome type.
//!
//! Both modes consume a [`PreparedInputs`] and produce a [`SolveOutcome`]:
//! either a complete one-to-one [`Solution`] or a structured
//! [`FailureReport`]. The orchestrator branches on the variant, never on
//! the mode string.

pub mod assignment;
mod exception;
mod strict;

pub use exception::solve_exception;
pub use strict::solve_strict;

use crate::classify::Classification;
use crate::models::{ExceptionSummary, FailureReport, MatchMode, ParticipantId};
use crate::prepare::PreparedInputs;

/// One pairing chosen by a solver.
#[derive(Debug, Clone)]
pub struct SolvedPair {
    pub mentor_id: ParticipantId,
    pub mentee_id: ParticipantId,
    /// Quality in percent (scaled score divided back by `score_scale`).
    pub score: f64,
    /// Policy classification of the chosen pair; `None` until the
    /// exception solver re-derives it.
    pub classification: Option<Classification>,
}

/// A complete matching with its aggregate metrics.
#[derive(Debug, Clone)]
pub struct Solution {
    pub matches: Vec<SolvedPair>,
    pub total_score: f64,
    pub avg_score: f64,
    /// Seconds spent inside the assignment kernel.
    pub solve_time: f64,
    pub exception_count: Option<u32>,
    pub exception_summary: Option<ExceptionSummary>,
}

/// What a solver produced.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Success(Solution),
    Failure(FailureReport),
}

/// Runs the solver for the requested mode.
pub fn solve(mode: MatchMode, inputs: &PreparedInputs) -> SolveOutcome {
    match mode {
        MatchMode::Strict => solve_strict(inputs),
        MatchMode::Exception => solve_exception(inputs),
    }
}

/// Structural preflight shared by both modes: the assignment model needs a
/// balanced, non-empty instance before anything else is worth checking.
fn preflight(inputs: &PreparedInputs) -> Option<FailureReport> {
    let mentors = inputs.mentor_count();
    let mentees = inputs.mentee_count();
    if mentors != mentees {
        return Some(FailureReport::CountMismatch {
            mentors_count: mentors,
            mentees_count: mentees,
            message: format!("Unequal counts: {mentors} mentors vs {mentees} mentees"),
        });
    }
    if mentors == 0 {
        return Some(FailureReport::NoParticipants {
            message: "No submitted participants found".into(),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::test_support::inputs_2x2;

    #[test]
    fn preflight_reports_count_mismatch() {
        let mut inputs = inputs_2x2(|_| {});
        inputs.mentee_ids.pop();
        match preflight(&inputs) {
            Some(FailureReport::CountMismatch {
                mentors_count,
                mentees_count,
                message,
            }) => {
                assert_eq!(mentors_count, 2);
                assert_eq!(mentees_count, 1);
                assert_eq!(message, "Unequal counts: 2 mentors vs 1 mentees");
            }
            other => panic!("expected COUNT_MISMATCH, got {other:?}"),
        }
    }

    #[test]
    fn preflight_reports_empty_cohort() {
        let mut inputs = inputs_2x2(|_| {});
        inputs.mentor_ids.clear();
        inputs.mentee_ids.clear();
        assert!(matches!(
            preflight(&inputs),
            Some(FailureReport::NoParticipants { .. })
        ));
    }

    #[test]
    fn preflight_accepts_balanced_instances() {
        assert!(preflight(&inputs_2x2(|_| {})).is_none());
    }
}
