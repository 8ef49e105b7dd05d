//! Persistence boundary for the matching engine.
//!
//! Only the preparer, the orchestrator and the override arbiter speak to a
//! [`MatchStore`]; every other component is a pure function of its inputs.
//! [`MemoryStore`] is the reference implementation and the backing store for
//! snapshot-driven runs (CLI, tests). A database-backed collaborator
//! implements the same trait.
//!
//! Reads are bulk and bounded: one call per entity family per run. Writes
//! that must be atomic (`insert_matches`, `commit_override`,
//! `replace_pair_scores`) are single trait calls so implementations can wrap
//! them in one transaction.

use crate::models::{
    ActiveMatchRun, Cohort, CohortId, CohortSnapshot, Match, MatchRun, MenteeProfile,
    MentorProfile, PairScore, Participant, ParticipantId, Preference,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by a store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cohort {0} not found")]
    CohortNotFound(CohortId),
    #[error("participant {0} not found")]
    ParticipantNotFound(ParticipantId),
    #[error("match run {0} not found")]
    RunNotFound(Uuid),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Storage operations the engine needs from a collaborator.
///
/// All sequence-returning reads are sorted by id (preferences by
/// `(from, to)`) so downstream iteration and signatures are stable across
/// platforms; `matches` returns storage order, which is also the export
/// order.
pub trait MatchStore: Send + Sync {
    fn cohort(&self, cohort_id: CohortId) -> Result<Cohort, StoreError>;

    /// All participants of the cohort, submitted or not, ascending by id.
    fn participants(&self, cohort_id: CohortId) -> Result<Vec<Participant>, StoreError>;

    fn participant(&self, id: ParticipantId) -> Result<Participant, StoreError>;

    /// All preference edges originating from participants of the cohort,
    /// ascending by `(from, to)`.
    fn preferences(&self, cohort_id: CohortId) -> Result<Vec<Preference>, StoreError>;

    fn mentor_profile(&self, id: ParticipantId) -> Result<Option<MentorProfile>, StoreError>;

    fn mentee_profile(&self, id: ParticipantId) -> Result<Option<MenteeProfile>, StoreError>;

    fn pair_scores(&self, cohort_id: CohortId) -> Result<Vec<PairScore>, StoreError>;

    /// Atomically replaces every stored pair score of the cohort.
    fn replace_pair_scores(
        &self,
        cohort_id: CohortId,
        scores: Vec<PairScore>,
    ) -> Result<(), StoreError>;

    fn insert_run(&self, run: MatchRun) -> Result<(), StoreError>;

    /// Overwrites the stored run with the same id.
    fn update_run(&self, run: MatchRun) -> Result<(), StoreError>;

    fn run(&self, run_id: Uuid) -> Result<MatchRun, StoreError>;

    /// Runs of a cohort in creation order.
    fn runs(&self, cohort_id: CohortId) -> Result<Vec<MatchRun>, StoreError>;

    /// Persists the full match set of a run in one atomic commit.
    fn insert_matches(&self, run_id: Uuid, matches: Vec<Match>) -> Result<(), StoreError>;

    fn matches(&self, run_id: Uuid) -> Result<Vec<Match>, StoreError>;

    /// Atomic override surgery: replace the row holding `row.mentor_id` (or
    /// append a new one), then drop any other row holding `row.mentee_id`.
    /// Leaves each mentor and mentee on at most one row of the run.
    fn commit_override(&self, run_id: Uuid, row: Match) -> Result<Match, StoreError>;

    /// Upserts the singleton active-run pointer for the cohort.
    fn set_active_run(&self, active: ActiveMatchRun) -> Result<(), StoreError>;

    fn active_run(&self, cohort_id: CohortId) -> Result<Option<ActiveMatchRun>, StoreError>;

    /// Deletes a run, its matches, and any active-run pointer referencing it.
    fn delete_run(&self, run_id: Uuid) -> Result<(), StoreError>;
}

#[derive(Default)]
struct Inner {
    cohorts: BTreeMap<CohortId, Cohort>,
    participants: BTreeMap<ParticipantId, Participant>,
    preferences: BTreeMap<(ParticipantId, ParticipantId), Preference>,
    mentor_profiles: BTreeMap<ParticipantId, MentorProfile>,
    mentee_profiles: BTreeMap<ParticipantId, MenteeProfile>,
    pair_scores: BTreeMap<CohortId, Vec<PairScore>>,
    runs: BTreeMap<Uuid, MatchRun>,
    run_order: BTreeMap<CohortId, Vec<Uuid>>,
    matches: HashMap<Uuid, Vec<Match>>,
    active_runs: BTreeMap<CohortId, ActiveMatchRun>,
}

/// In-memory reference store. Thread-safe; every trait method takes the
/// interior mutex once, so composite writes are atomic with respect to
/// other store calls.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Builds a store holding exactly one cohort snapshot.
    pub fn from_snapshot(snapshot: CohortSnapshot) -> Self {
        let store = MemoryStore::new();
        store.load_snapshot(snapshot);
        store
    }

    /// Loads a snapshot into the store, overwriting entities with the same
    /// ids. Multiple cohorts can be loaded side by side.
    pub fn load_snapshot(&self, snapshot: CohortSnapshot) {
        let mut inner = self.lock();
        inner.cohorts.insert(snapshot.cohort.id, snapshot.cohort);
        for participant in snapshot.participants {
            inner.participants.insert(participant.id, participant);
        }
        for preference in snapshot.preferences {
            inner
                .preferences
                .insert((preference.from, preference.to), preference);
        }
        for profile in snapshot.mentor_profiles {
            inner.mentor_profiles.insert(profile.participant_id, profile);
        }
        for profile in snapshot.mentee_profiles {
            inner.mentee_profiles.insert(profile.participant_id, profile);
        }
    }

    /// Inserts a single participant; test and collaborator convenience.
    pub fn upsert_participant(&self, participant: Participant) {
        self.lock().participants.insert(participant.id, participant);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

impl MatchStore for MemoryStore {
    fn cohort(&self, cohort_id: CohortId) -> Result<Cohort, StoreError> {
        self.lock()
            .cohorts
            .get(&cohort_id)
            .cloned()
            .ok_or(StoreError::CohortNotFound(cohort_id))
    }

    fn participants(&self, cohort_id: CohortId) -> Result<Vec<Participant>, StoreError> {
        let inner = self.lock();
        if !inner.cohorts.contains_key(&cohort_id) {
            return Err(StoreError::CohortNotFound(cohort_id));
        }
        Ok(inner
            .participants
            .values()
            .filter(|p| p.cohort_id == cohort_id)
            .cloned()
            .collect())
    }

    fn participant(&self, id: ParticipantId) -> Result<Participant, StoreError> {
        self.lock()
            .participants
            .get(&id)
            .cloned()
            .ok_or(StoreError::ParticipantNotFound(id))
    }

    fn preferences(&self, cohort_id: CohortId) -> Result<Vec<Preference>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .preferences
            .values()
            .filter(|pref| {
                inner
                    .participants
                    .get(&pref.from)
                    .is_some_and(|p| p.cohort_id == cohort_id)
            })
            .cloned()
            .collect())
    }

    fn mentor_profile(&self, id: ParticipantId) -> Result<Option<MentorProfile>, StoreError> {
        Ok(self.lock().mentor_profiles.get(&id).cloned())
    }

    fn mentee_profile(&self, id: ParticipantId) -> Result<Option<MenteeProfile>, StoreError> {
        Ok(self.lock().mentee_profiles.get(&id).cloned())
    }

    fn pair_scores(&self, cohort_id: CohortId) -> Result<Vec<PairScore>, StoreError> {
        Ok(self
            .lock()
            .pair_scores
            .get(&cohort_id)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_pair_scores(
        &self,
        cohort_id: CohortId,
        scores: Vec<PairScore>,
    ) -> Result<(), StoreError> {
        self.lock().pair_scores.insert(cohort_id, scores);
        Ok(())
    }

    fn insert_run(&self, run: MatchRun) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .run_order
            .entry(run.cohort_id)
            .or_default()
            .push(run.id);
        inner.runs.insert(run.id, run);
        Ok(())
    }

    fn update_run(&self, run: MatchRun) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.runs.contains_key(&run.id) {
            return Err(StoreError::RunNotFound(run.id));
        }
        inner.runs.insert(run.id, run);
        Ok(())
    }

    fn run(&self, run_id: Uuid) -> Result<MatchRun, StoreError> {
        self.lock()
            .runs
            .get(&run_id)
            .cloned()
            .ok_or(StoreError::RunNotFound(run_id))
    }

    fn runs(&self, cohort_id: CohortId) -> Result<Vec<MatchRun>, StoreError> {
        let inner = self.lock();
        let order = inner.run_order.get(&cohort_id).cloned().unwrap_or_default();
        Ok(order
            .iter()
            .filter_map(|id| inner.runs.get(id).cloned())
            .collect())
    }

    fn insert_matches(&self, run_id: Uuid, matches: Vec<Match>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.runs.contains_key(&run_id) {
            return Err(StoreError::RunNotFound(run_id));
        }
        inner.matches.insert(run_id, matches);
        Ok(())
    }

    fn matches(&self, run_id: Uuid) -> Result<Vec<Match>, StoreError> {
        Ok(self.lock().matches.get(&run_id).cloned().unwrap_or_default())
    }

    fn commit_override(&self, run_id: Uuid, row: Match) -> Result<Match, StoreError> {
        let mut inner = self.lock();
        if !inner.runs.contains_key(&run_id) {
            return Err(StoreError::RunNotFound(run_id));
        }
        let rows = inner.matches.entry(run_id).or_default();
        match rows.iter_mut().find(|m| m.mentor_id == row.mentor_id) {
            Some(existing) => *existing = row.clone(),
            None => rows.push(row.clone()),
        }
        rows.retain(|m| m.mentee_id != row.mentee_id || m.mentor_id == row.mentor_id);
        Ok(row)
    }

    fn set_active_run(&self, active: ActiveMatchRun) -> Result<(), StoreError> {
        self.lock().active_runs.insert(active.cohort_id, active);
        Ok(())
    }

    fn active_run(&self, cohort_id: CohortId) -> Result<Option<ActiveMatchRun>, StoreError> {
        Ok(self.lock().active_runs.get(&cohort_id).cloned())
    }

    fn delete_run(&self, run_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let run = inner
            .runs
            .remove(&run_id)
            .ok_or(StoreError::RunNotFound(run_id))?;
        inner.matches.remove(&run_id);
        if let Some(order) = inner.run_order.get_mut(&run.cohort_id) {
            order.retain(|id| *id != run_id);
        }
        let points_here = inner
            .active_runs
            .get(&run.cohort_id)
            .is_some_and(|active| active.run_id == run_id);
        if points_here {
            inner.active_runs.remove(&run.cohort_id);
        }
        Ok(())
    }
}
