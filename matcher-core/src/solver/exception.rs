//! Exception-mode solver: complete matching with penalized violations.
//!
//! Every pair gets a variable; the objective subtracts the classifier's
//! penalty from the pair score. Because the penalty magnitudes dominate any
//! aggregate score and each other in severity order, a single weighted sum
//! minimizes E3 usage first, then E2, then E1, then maximizes score.

use super::assignment::{solve_min_cost, DeadlineExceeded};
use super::{preflight, SolveOutcome, SolvedPair, Solution};
use crate::classify::{classify_pair, penalty_for};
use crate::models::{ExceptionSummary, FailureReport};
use crate::prepare::PreparedInputs;
use std::time::{Duration, Instant};

pub fn solve_exception(inputs: &PreparedInputs) -> SolveOutcome {
    log::info!(
        "solving exception matching for {} mentors and {} mentees",
        inputs.mentor_count(),
        inputs.mentee_count()
    );

    if let Some(report) = preflight(inputs) {
        return SolveOutcome::Failure(report);
    }

    let n = inputs.mentor_count();
    let worst_aggregate = inputs.config.score_scale * 100 * n as i64;
    if inputs.config.min_penalty() <= worst_aggregate {
        log::warn!(
            "penalties are not lexicographic for this cohort size: \
             min penalty {} <= max aggregate score {}",
            inputs.config.min_penalty(),
            worst_aggregate
        );
    }

    let cost: Vec<Vec<i64>> = inputs
        .mentor_ids
        .iter()
        .map(|&mentor_id| {
            inputs
                .mentee_ids
                .iter()
                .map(|&mentee_id| {
                    penalty_for(mentor_id, mentee_id, inputs)
                        - inputs.score(mentor_id, mentee_id)
                })
                .collect()
        })
        .collect();

    let started = Instant::now();
    let deadline = started + Duration::from_secs(inputs.config.exception_time_limit);
    let assignment = match solve_min_cost(&cost, Some(deadline)) {
        Ok(assignment) => assignment,
        Err(DeadlineExceeded) => {
            let solve_time = started.elapsed().as_secs_f64();
            log::info!("exception solve failed: TIMEOUT after {solve_time:.2}s");
            return SolveOutcome::Failure(FailureReport::Timeout {
                mentors_count: n,
                mentees_count: n,
                feasible_pairs_count: n * n,
                zero_mentor_options: Vec::new(),
                zero_mentee_options: Vec::new(),
                solve_time,
            });
        }
    };
    let solve_time = started.elapsed().as_secs_f64();

    let scale = inputs.config.score_scale as f64;
    let mut summary = ExceptionSummary::default();
    let matches: Vec<SolvedPair> = assignment
        .iter()
        .enumerate()
        .map(|(i, &j)| {
            let mentor_id = inputs.mentor_ids[i];
            let mentee_id = inputs.mentee_ids[j];
            let classification = classify_pair(mentor_id, mentee_id, inputs);
            if let Some(kind) = classification.kind {
                summary.record(kind);
            }
            SolvedPair {
                mentor_id,
                mentee_id,
                score: inputs.score(mentor_id, mentee_id) as f64 / scale,
                classification: Some(classification),
            }
        })
        .collect();
    let total_score: f64 = matches.iter().map(|m| m.score).sum();
    let avg_score = total_score / matches.len() as f64;
    let exception_count = summary.total();

    log::info!(
        "exception matching completed with {} matches, {} exceptions, total score: {total_score}",
        matches.len(),
        exception_count
    );

    SolveOutcome::Success(Solution {
        matches,
        total_score,
        avg_score,
        solve_time,
        exception_count: Some(exception_count),
        exception_summary: Some(summary),
    })
}
