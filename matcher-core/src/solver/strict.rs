//! Strict-mode solver: hard mutuality and cross-organization constraints.
//!
//! Decision variables exist only for feasible pairs (mutual acceptability,
//! different organizations). The model either produces an optimal complete
//! matching or a diagnostic failure naming the participants that block one.

use super::assignment::{solve_min_cost, DeadlineExceeded, FORBIDDEN};
use super::{preflight, SolveOutcome, SolvedPair, Solution};
use crate::models::{FailureReport, ParticipantId};
use crate::prepare::PreparedInputs;
use std::time::{Duration, Instant};

pub fn solve_strict(inputs: &PreparedInputs) -> SolveOutcome {
    log::info!(
        "solving strict matching for {} mentors and {} mentees",
        inputs.mentor_count(),
        inputs.mentee_count()
    );

    if let Some(report) = preflight(inputs) {
        return SolveOutcome::Failure(report);
    }

    let n = inputs.mentor_count();
    let feasible: Vec<Vec<bool>> = inputs
        .mentor_ids
        .iter()
        .map(|&mentor_id| {
            inputs
                .mentee_ids
                .iter()
                .map(|&mentee_id| {
                    !inputs.same_org(mentor_id, mentee_id)
                        && inputs.acceptability(mentor_id, mentee_id)
                            == crate::classify::Acceptability::Mutual
                })
                .collect()
        })
        .collect();
    let feasible_pairs_count: usize = feasible
        .iter()
        .map(|row| row.iter().filter(|&&f| f).count())
        .sum();
    log::info!(
        "found {} feasible pairs out of {} total",
        feasible_pairs_count,
        n * n
    );

    let zero_mentor_options = zero_mentor_options(&inputs.mentor_ids, &feasible);
    let zero_mentee_options = zero_mentee_options(&inputs.mentee_ids, &feasible);

    // A participant with no feasible partner proves infeasibility before
    // the kernel runs.
    if !zero_mentor_options.is_empty() || !zero_mentee_options.is_empty() {
        log::info!("strict solve failed: INFEASIBLE (zero-option participants)");
        return SolveOutcome::Failure(FailureReport::Infeasible {
            mentors_count: n,
            mentees_count: n,
            feasible_pairs_count,
            zero_mentor_options,
            zero_mentee_options,
            solve_time: 0.0,
        });
    }

    let cost: Vec<Vec<i64>> = inputs
        .mentor_ids
        .iter()
        .enumerate()
        .map(|(i, &mentor_id)| {
            inputs
                .mentee_ids
                .iter()
                .enumerate()
                .map(|(j, &mentee_id)| {
                    if feasible[i][j] {
                        -inputs.score(mentor_id, mentee_id)
                    } else {
                        FORBIDDEN
                    }
                })
                .collect()
        })
        .collect();

    let started = Instant::now();
    let deadline = started + Duration::from_secs(inputs.config.strict_time_limit);
    let assignment = match solve_min_cost(&cost, Some(deadline)) {
        Ok(assignment) => assignment,
        Err(DeadlineExceeded) => {
            let solve_time = started.elapsed().as_secs_f64();
            log::info!("strict solve failed: TIMEOUT after {solve_time:.2}s");
            return SolveOutcome::Failure(FailureReport::Timeout {
                mentors_count: n,
                mentees_count: n,
                feasible_pairs_count,
                zero_mentor_options,
                zero_mentee_options,
                solve_time,
            });
        }
    };
    let solve_time = started.elapsed().as_secs_f64();

    // The optimum only uses a forbidden edge when no feasible perfect
    // matching exists (Hall violation beyond the zero-option pre-check).
    if assignment.iter().enumerate().any(|(i, &j)| !feasible[i][j]) {
        log::info!("strict solve failed: INFEASIBLE");
        return SolveOutcome::Failure(FailureReport::Infeasible {
            mentors_count: n,
            mentees_count: n,
            feasible_pairs_count,
            zero_mentor_options,
            zero_mentee_options,
            solve_time,
        });
    }

    let scale = inputs.config.score_scale as f64;
    let matches: Vec<SolvedPair> = assignment
        .iter()
        .enumerate()
        .map(|(i, &j)| {
            let mentor_id = inputs.mentor_ids[i];
            let mentee_id = inputs.mentee_ids[j];
            SolvedPair {
                mentor_id,
                mentee_id,
                score: inputs.score(mentor_id, mentee_id) as f64 / scale,
                classification: None,
            }
        })
        .collect();
    let total_score: f64 = matches.iter().map(|m| m.score).sum();
    let avg_score = total_score / matches.len() as f64;

    log::info!(
        "strict matching completed with {} matches, total score: {total_score}",
        matches.len()
    );

    SolveOutcome::Success(Solution {
        matches,
        total_score,
        avg_score,
        solve_time,
        exception_count: None,
        exception_summary: None,
    })
}

fn zero_mentor_options(ids: &[ParticipantId], feasible: &[Vec<bool>]) -> Vec<ParticipantId> {
    ids.iter()
        .enumerate()
        .filter(|(i, _)| !feasible[*i].iter().any(|&f| f))
        .map(|(_, &id)| id)
        .collect()
}

fn zero_mentee_options(ids: &[ParticipantId], feasible: &[Vec<bool>]) -> Vec<ParticipantId> {
    ids.iter()
        .enumerate()
        .filter(|(j, _)| !feasible.iter().any(|row| row[*j]))
        .map(|(_, &id)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::test_support::inputs_2x2;

    #[test]
    fn picks_the_highest_scoring_clean_matching() {
        let inputs = inputs_2x2(|b| {
            b.score(1, 11, 90_000);
            b.score(2, 12, 85_000);
            b.score(1, 12, 70_000);
            b.score(2, 11, 65_000);
        });
        match solve_strict(&inputs) {
            SolveOutcome::Success(solution) => {
                let pairs: Vec<(u64, u64)> = solution
                    .matches
                    .iter()
                    .map(|m| (m.mentor_id, m.mentee_id))
                    .collect();
                assert_eq!(pairs, vec![(1, 11), (2, 12)]);
                assert_eq!(solution.total_score, 175.0);
                assert_eq!(solution.avg_score, 87.5);
            }
            SolveOutcome::Failure(report) => panic!("expected success, got {report:?}"),
        }
    }

    #[test]
    fn same_org_everywhere_is_infeasible_with_diagnostics() {
        let inputs = inputs_2x2(|b| {
            for m in [1, 2] {
                for t in [11, 12] {
                    b.same_org(m, t, true);
                }
            }
        });
        match solve_strict(&inputs) {
            SolveOutcome::Failure(FailureReport::Infeasible {
                feasible_pairs_count,
                zero_mentor_options,
                zero_mentee_options,
                ..
            }) => {
                assert_eq!(feasible_pairs_count, 0);
                assert_eq!(zero_mentor_options, vec![1, 2]);
                assert_eq!(zero_mentee_options, vec![11, 12]);
            }
            other => panic!("expected INFEASIBLE, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_mentee_is_reported_as_zero_option() {
        let inputs = inputs_2x2(|b| {
            b.acceptability(1, 12, crate::classify::Acceptability::Neither);
            b.acceptability(2, 12, crate::classify::Acceptability::Neither);
        });
        match solve_strict(&inputs) {
            SolveOutcome::Failure(FailureReport::Infeasible {
                zero_mentee_options,
                ..
            }) => {
                assert_eq!(zero_mentee_options, vec![12]);
            }
            other => panic!("expected INFEASIBLE, got {other:?}"),
        }
    }

    #[test]
    fn hall_violation_without_zero_options_is_still_infeasible() {
        // Mentors 1..3 all reach only mentees 11 and 12; mentor 4 reaches
        // everyone. Every row and column has an option, yet three mentors
        // compete for two mentees, so no perfect matching exists.
        use crate::classify::Acceptability;
        use crate::config::EngineConfig;
        use std::collections::BTreeMap;

        let mentor_ids = vec![1, 2, 3, 4];
        let mentee_ids = vec![11, 12, 13, 14];
        let mut acceptability = BTreeMap::new();
        let mut same_org = BTreeMap::new();
        let mut score = BTreeMap::new();
        for &m in &mentor_ids {
            for &t in &mentee_ids {
                let reachable = m == 4 || t == 11 || t == 12;
                acceptability.insert(
                    (m, t),
                    if reachable {
                        Acceptability::Mutual
                    } else {
                        Acceptability::Neither
                    },
                );
                same_org.insert((m, t), false);
                score.insert((m, t), 0);
            }
        }
        let inputs = crate::prepare::PreparedInputs {
            mentor_ids,
            mentee_ids,
            same_org,
            acceptability,
            score,
            organizations: BTreeMap::new(),
            config: EngineConfig::default(),
        };

        match solve_strict(&inputs) {
            SolveOutcome::Failure(FailureReport::Infeasible {
                zero_mentor_options,
                zero_mentee_options,
                ..
            }) => {
                assert!(zero_mentor_options.is_empty());
                assert!(zero_mentee_options.is_empty());
            }
            other => panic!("expected INFEASIBLE, got {other:?}"),
        }
    }

    #[test]
    fn unbalanced_instance_fails_preflight() {
        let mut inputs = inputs_2x2(|_| {});
        inputs.mentee_ids.pop();
        assert!(matches!(
            solve_strict(&inputs),
            SolveOutcome::Failure(FailureReport::CountMismatch { .. })
        ));
    }
}
