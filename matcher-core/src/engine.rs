//! The orchestrator: binds preparation, solving, ambiguity detection and
//! persistence into a run.
//!
//! Runs are single-flight per cohort: an exclusive cohort lock is held from
//! preparation entry through the final commit, and an optional global gate
//! caps how many cohorts solve concurrently. The override and active-run
//! arbitration methods live in [`crate::arbiter`] on the same type.

use crate::ambiguity::detect_ambiguity;
use crate::config::EngineConfig;
use crate::models::{
    Cohort, CohortId, FailureReport, Match, MatchMode, MatchRun, ObjectiveSummary, PairScore,
    Participant, Role, RunStatus,
};
use crate::prepare::prepare;
use crate::readiness::{readiness_report, ReadinessReport};
use crate::scoring::{score_pair, MentorFacts, RankContext};
use crate::signature::input_signature;
use crate::solver::{solve, SolveOutcome};
use crate::store::{MatchStore, StoreError};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;
use uuid::Uuid;

/// Counting gate bounding how many cohorts may solve at once.
struct ConcurrencyGate {
    cap: usize,
    in_flight: Mutex<usize>,
    released: Condvar,
}

impl ConcurrencyGate {
    fn new(cap: usize) -> Self {
        ConcurrencyGate {
            cap: cap.max(1),
            in_flight: Mutex::new(0),
            released: Condvar::new(),
        }
    }

    fn acquire(&self) -> GatePermit<'_> {
        let mut in_flight = self.in_flight.lock().expect("gate mutex poisoned");
        while *in_flight >= self.cap {
            in_flight = self.released.wait(in_flight).expect("gate mutex poisoned");
        }
        *in_flight += 1;
        GatePermit { gate: self }
    }
}

struct GatePermit<'a> {
    gate: &'a ConcurrencyGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.gate.in_flight.lock().expect("gate mutex poisoned");
        *in_flight -= 1;
        self.gate.released.notify_one();
    }
}

/// The matching engine. Owns the storage handle and the per-cohort run
/// locks; all public operations are synchronous.
pub struct MatchEngine {
    pub(crate) store: Arc<dyn MatchStore>,
    run_locks: Mutex<HashMap<CohortId, Arc<Mutex<()>>>>,
    gate: Option<ConcurrencyGate>,
}

impl MatchEngine {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        MatchEngine {
            store,
            run_locks: Mutex::new(HashMap::new()),
            gate: None,
        }
    }

    /// Like [`MatchEngine::new`] with a global cap on concurrently solving
    /// cohorts.
    pub fn with_concurrency_cap(store: Arc<dyn MatchStore>, cap: usize) -> Self {
        MatchEngine {
            store,
            run_locks: Mutex::new(HashMap::new()),
            gate: Some(ConcurrencyGate::new(cap)),
        }
    }

    pub fn store(&self) -> &dyn MatchStore {
        self.store.as_ref()
    }

    pub(crate) fn cohort_lock(&self, cohort_id: CohortId) -> Arc<Mutex<()>> {
        let mut locks = self.run_locks.lock().expect("run-lock map poisoned");
        locks.entry(cohort_id).or_default().clone()
    }

    /// Runs matching for a cohort in the requested mode.
    ///
    /// Always returns the persisted [`MatchRun`]: solver failures and
    /// internal errors end up in its `failure_report`, never as an `Err`.
    /// The only error path left is storage itself failing.
    pub fn run(
        &self,
        cohort_id: CohortId,
        initiator: &str,
        mode: MatchMode,
    ) -> Result<MatchRun, StoreError> {
        let _permit = self.gate.as_ref().map(|g| g.acquire());
        let lock = self.cohort_lock(cohort_id);
        let _guard = lock.lock().expect("cohort run lock poisoned");

        log::info!("running {mode} matching for cohort {cohort_id}");

        let cohort = self.store.cohort(cohort_id)?;
        let participants = self.store.participants(cohort_id)?;
        let preferences = self.store.preferences(cohort_id)?;

        let mut run = MatchRun {
            id: Uuid::new_v4(),
            cohort_id,
            mode,
            // Provisional status; flipped exactly once at the end.
            status: RunStatus::Failed,
            objective_summary: None,
            failure_report: None,
            input_signature: input_signature(&participants, &preferences, &cohort.config),
            created_by: initiator.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_run(run.clone())?;

        let started = Instant::now();
        match self.execute_run(&mut run, &cohort, started) {
            Ok(()) => Ok(run),
            Err(err) => {
                log::error!("error during {mode} matching: {err}");
                run.status = RunStatus::Failed;
                run.objective_summary = None;
                run.failure_report = Some(FailureReport::InternalError {
                    message: err.to_string(),
                });
                self.store.update_run(run.clone())?;
                Ok(run)
            }
        }
    }

    /// Prepare, solve, detect ambiguity, persist. Any `Err` from here is
    /// converted to an `INTERNAL_ERROR` report by the caller.
    fn execute_run(
        &self,
        run: &mut MatchRun,
        cohort: &Cohort,
        started: Instant,
    ) -> Result<(), StoreError> {
        let inputs = prepare(self.store.as_ref(), cohort)?;

        match solve(run.mode, &inputs) {
            SolveOutcome::Failure(report) => {
                log::info!("{} matching failed: {}", run.mode, report.reason());
                run.status = RunStatus::Failed;
                run.failure_report = Some(report);
                self.store.update_run(run.clone())?;
            }
            SolveOutcome::Success(solution) => {
                let ambiguities = detect_ambiguity(&solution.matches, &inputs);
                let ambiguous: HashMap<(u64, u64), String> = ambiguities
                    .iter()
                    .map(|a| ((a.mentor_id, a.mentee_id), a.reason.clone()))
                    .collect();

                let rows: Vec<Match> = solution
                    .matches
                    .iter()
                    .map(|pair| {
                        let reason = ambiguous.get(&(pair.mentor_id, pair.mentee_id));
                        let classification = pair.classification.as_ref();
                        Match {
                            mentor_id: pair.mentor_id,
                            mentee_id: pair.mentee_id,
                            score_percent: pair.score.round().max(0.0) as u32,
                            ambiguity_flag: reason.is_some(),
                            ambiguity_reason: reason.cloned().unwrap_or_default(),
                            exception_flag: classification.is_some_and(|c| c.is_exception()),
                            exception_type: classification.and_then(|c| c.kind),
                            exception_reason: classification
                                .map(|c| c.reason.clone())
                                .unwrap_or_default(),
                            is_manual_override: false,
                            override_reason: String::new(),
                        }
                    })
                    .collect();

                let total_duration = started.elapsed().as_secs_f64();
                run.status = RunStatus::Success;
                run.objective_summary = Some(ObjectiveSummary {
                    total_score: solution.total_score,
                    avg_score: solution.avg_score,
                    match_count: rows.len(),
                    ambiguity_count: ambiguities.len(),
                    solve_time: solution.solve_time,
                    total_duration,
                    exception_count: solution.exception_count,
                    exception_summary: solution.exception_summary,
                });
                self.store.update_run(run.clone())?;
                self.store.insert_matches(run.id, rows)?;

                log::info!(
                    "{} matching completed for cohort {} in {total_duration:.2}s with {} matches",
                    run.mode,
                    run.cohort_id,
                    solution.matches.len()
                );
            }
        }
        Ok(())
    }

    /// Reads the cohort and builds the readiness diagnostics report.
    pub fn readiness(&self, cohort_id: CohortId) -> Result<ReadinessReport, StoreError> {
        let cohort = self.store.cohort(cohort_id)?;
        let participants = self.store.participants(cohort_id)?;
        let preferences = self.store.preferences(cohort_id)?;
        let config = EngineConfig::from_overrides(&cohort.config);
        Ok(readiness_report(&participants, &preferences, &config))
    }

    /// Scores-only mode: recomputes every pair score of the cohort and
    /// atomically replaces the stored rows, under the cohort run lock.
    pub fn rebuild_pair_scores(&self, cohort_id: CohortId) -> Result<Vec<PairScore>, StoreError> {
        let lock = self.cohort_lock(cohort_id);
        let _guard = lock.lock().expect("cohort run lock poisoned");

        let cohort = self.store.cohort(cohort_id)?;
        let config = EngineConfig::from_overrides(&cohort.config);
        let participants = self.store.participants(cohort_id)?;
        let preferences = self.store.preferences(cohort_id)?;

        let mentors: Vec<&Participant> = participants
            .iter()
            .filter(|p| p.role == Role::Mentor)
            .collect();
        let mentees: Vec<&Participant> = participants
            .iter()
            .filter(|p| p.role == Role::Mentee)
            .collect();

        let mut rank_of: HashMap<(u64, u64), u32> = HashMap::new();
        let mut max_rank: HashMap<u64, u32> = HashMap::new();
        for pref in &preferences {
            rank_of.insert((pref.from, pref.to), pref.rank);
            let entry = max_rank.entry(pref.from).or_insert(0);
            *entry = (*entry).max(pref.rank);
        }
        let rank_context = |from: u64, to: u64| -> Option<RankContext> {
            let rank = rank_of.get(&(from, to)).copied()?;
            Some(RankContext {
                rank,
                max_rank: max_rank.get(&from).copied().unwrap_or(0),
            })
        };

        let mut scores = Vec::with_capacity(mentors.len() * mentees.len());
        for mentor in &mentors {
            let profile = self.store.mentor_profile(mentor.id)?;
            let facts = MentorFacts::from_profile(profile.as_ref());
            for mentee in &mentees {
                let desired = self
                    .store
                    .mentee_profile(mentee.id)?
                    .map(|p| p.desired_attributes)
                    .unwrap_or_default();
                let breakdown = score_pair(
                    rank_context(mentor.id, mentee.id),
                    rank_context(mentee.id, mentor.id),
                    &facts,
                    &desired,
                    &config,
                );
                scores.push(PairScore {
                    mentor_id: mentor.id,
                    mentee_id: mentee.id,
                    score: breakdown.overall_score,
                    breakdown,
                });
            }
        }

        log::info!(
            "rebuilt {} pair scores for cohort {cohort_id}",
            scores.len()
        );
        self.store.replace_pair_scores(cohort_id, scores.clone())?;
        Ok(scores)
    }
}
