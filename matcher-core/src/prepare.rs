//! Data preparation: transforms a cohort snapshot into a pure in-memory
//! problem instance.
//!
//! [`prepare`] performs the bounded bulk reads (participants, preferences,
//! pair scores, configuration) and builds the matrices the solvers operate
//! on. Everything downstream of here is storage-free; a [`PreparedInputs`]
//! built from literal values exercises the solvers, classifier and
//! ambiguity detector without any store.

use crate::classify::Acceptability;
use crate::config::EngineConfig;
use crate::models::{Cohort, ParticipantId, Role};
use crate::scoring::scaled_score;
use crate::store::{MatchStore, StoreError};
use std::collections::{BTreeMap, HashMap, HashSet};

/// The solver's entire universe for one run.
///
/// Identifier sequences are ascending; the matrices are keyed by
/// `(mentor_id, mentee_id)` and complete over the cross product. Lookup
/// helpers fall back to the conservative default (`Neither`, not same-org,
/// score 0) for absent keys so hand-built partial instances stay usable in
/// tests.
#[derive(Debug, Clone)]
pub struct PreparedInputs {
    pub mentor_ids: Vec<ParticipantId>,
    pub mentee_ids: Vec<ParticipantId>,
    pub same_org: BTreeMap<(ParticipantId, ParticipantId), bool>,
    pub acceptability: BTreeMap<(ParticipantId, ParticipantId), Acceptability>,
    /// Quality percentage times `config.score_scale`, rounded.
    pub score: BTreeMap<(ParticipantId, ParticipantId), i64>,
    /// Organization per participant, for diagnostics and exception reasons.
    pub organizations: BTreeMap<ParticipantId, String>,
    pub config: EngineConfig,
}

impl PreparedInputs {
    pub fn same_org(&self, mentor_id: ParticipantId, mentee_id: ParticipantId) -> bool {
        self.same_org
            .get(&(mentor_id, mentee_id))
            .copied()
            .unwrap_or(false)
    }

    pub fn acceptability(
        &self,
        mentor_id: ParticipantId,
        mentee_id: ParticipantId,
    ) -> Acceptability {
        self.acceptability
            .get(&(mentor_id, mentee_id))
            .copied()
            .unwrap_or(Acceptability::Neither)
    }

    pub fn score(&self, mentor_id: ParticipantId, mentee_id: ParticipantId) -> i64 {
        self.score
            .get(&(mentor_id, mentee_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn organization(&self, id: ParticipantId) -> &str {
        self.organizations
            .get(&id)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn mentor_count(&self) -> usize {
        self.mentor_ids.len()
    }

    pub fn mentee_count(&self) -> usize {
        self.mentee_ids.len()
    }
}

/// Reads the cohort once and builds the pure problem instance.
///
/// Only submitted participants enter the instance. Structural validity
/// (balanced counts and the like) is the readiness reporter's concern; an
/// unbalanced instance is handed to the solver, which reports it.
pub fn prepare(store: &dyn MatchStore, cohort: &Cohort) -> Result<PreparedInputs, StoreError> {
    log::info!("preparing inputs for cohort {}", cohort.id);

    let participants = store.participants(cohort.id)?;
    let mut mentor_ids: Vec<ParticipantId> = Vec::new();
    let mut mentee_ids: Vec<ParticipantId> = Vec::new();
    let mut organizations = BTreeMap::new();
    for p in participants.iter().filter(|p| p.submitted) {
        match p.role {
            Role::Mentor => mentor_ids.push(p.id),
            Role::Mentee => mentee_ids.push(p.id),
        }
        organizations.insert(p.id, p.organization.clone());
    }
    mentor_ids.sort_unstable();
    mentee_ids.sort_unstable();
    debug_assert!(
        mentor_ids.iter().all(|id| !mentee_ids.contains(id)),
        "mentor and mentee id sets must be disjoint"
    );

    log::info!(
        "found {} mentors and {} mentees",
        mentor_ids.len(),
        mentee_ids.len()
    );

    // One bulk read for preferences; presence of an edge is acceptance.
    let preferences = store.preferences(cohort.id)?;
    let mut gives: HashMap<ParticipantId, HashSet<ParticipantId>> = HashMap::new();
    for pref in &preferences {
        gives.entry(pref.from).or_default().insert(pref.to);
    }

    let mut same_org = BTreeMap::new();
    let mut acceptability = BTreeMap::new();
    for &mentor_id in &mentor_ids {
        let mentor_org = &organizations[&mentor_id];
        let mentor_gives = gives.get(&mentor_id);
        for &mentee_id in &mentee_ids {
            let mentee_org = &organizations[&mentee_id];
            same_org.insert((mentor_id, mentee_id), mentor_org == mentee_org);

            let mentor_ranks = mentor_gives.is_some_and(|set| set.contains(&mentee_id));
            let mentee_ranks = gives
                .get(&mentee_id)
                .is_some_and(|set| set.contains(&mentor_id));
            let value = match (mentor_ranks, mentee_ranks) {
                (true, true) => Acceptability::Mutual,
                (true, false) => Acceptability::OneSidedMentorOnly,
                (false, true) => Acceptability::OneSidedMenteeOnly,
                (false, false) => Acceptability::Neither,
            };
            acceptability.insert((mentor_id, mentee_id), value);
        }
    }

    let config = EngineConfig::from_overrides(&cohort.config);

    // Stored pair scores, scaled to solver integers; unscored pairs are 0.
    let pair_scores = store.pair_scores(cohort.id)?;
    let mut stored: HashMap<(ParticipantId, ParticipantId), f64> = HashMap::new();
    for ps in &pair_scores {
        stored.insert((ps.mentor_id, ps.mentee_id), ps.score);
    }
    let mut score = BTreeMap::new();
    for &mentor_id in &mentor_ids {
        for &mentee_id in &mentee_ids {
            let raw = stored.get(&(mentor_id, mentee_id)).copied().unwrap_or(0.0);
            score.insert((mentor_id, mentee_id), scaled_score(raw, config.score_scale));
        }
    }

    Ok(PreparedInputs {
        mentor_ids,
        mentee_ids,
        same_org,
        acceptability,
        score,
        organizations,
        config,
    })
}

#[cfg(test)]
pub mod test_support {
    //! Literal-value instance builders shared by the unit tests.

    use super::*;

    pub struct InputsBuilder {
        pub inputs: PreparedInputs,
    }

    impl InputsBuilder {
        pub fn same_org(&mut self, mentor_id: ParticipantId, mentee_id: ParticipantId, v: bool) {
            self.inputs.same_org.insert((mentor_id, mentee_id), v);
        }

        pub fn acceptability(
            &mut self,
            mentor_id: ParticipantId,
            mentee_id: ParticipantId,
            a: Acceptability,
        ) {
            self.inputs.acceptability.insert((mentor_id, mentee_id), a);
        }

        pub fn score(&mut self, mentor_id: ParticipantId, mentee_id: ParticipantId, scaled: i64) {
            self.inputs.score.insert((mentor_id, mentee_id), scaled);
        }
    }

    /// Two mentors (1, 2) and two mentees (11, 12), all pairs mutual and
    /// cross-org, scores zero. The closure customizes the instance.
    pub fn inputs_2x2(customize: impl FnOnce(&mut InputsBuilder)) -> PreparedInputs {
        let mentor_ids = vec![1, 2];
        let mentee_ids = vec![11, 12];
        let mut same_org = BTreeMap::new();
        let mut acceptability = BTreeMap::new();
        let mut score = BTreeMap::new();
        for &m in &mentor_ids {
            for &t in &mentee_ids {
                same_org.insert((m, t), false);
                acceptability.insert((m, t), Acceptability::Mutual);
                score.insert((m, t), 0);
            }
        }
        let mut organizations = BTreeMap::new();
        organizations.insert(1, "OrgA".to_string());
        organizations.insert(2, "OrgB".to_string());
        organizations.insert(11, "OrgB".to_string());
        organizations.insert(12, "OrgA".to_string());

        let mut builder = InputsBuilder {
            inputs: PreparedInputs {
                mentor_ids,
                mentee_ids,
                same_org,
                acceptability,
                score,
                organizations,
                config: EngineConfig::default(),
            },
        };
        customize(&mut builder);
        builder.inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CohortSnapshot, Participant, Preference};
    use crate::store::MemoryStore;

    fn participant(
        id: ParticipantId,
        role: Role,
        org: &str,
        submitted: bool,
    ) -> Participant {
        Participant {
            id,
            cohort_id: 1,
            external_user_id: id,
            role,
            display_name: format!("p{id}"),
            email: format!("p{id}@example.org"),
            organization: org.into(),
            submitted,
        }
    }

    fn snapshot() -> CohortSnapshot {
        CohortSnapshot {
            cohort: Cohort {
                id: 1,
                name: "pilot".into(),
                config: serde_json::Map::new(),
            },
            participants: vec![
                participant(1, Role::Mentor, "OrgA", true),
                participant(2, Role::Mentor, "OrgB", true),
                participant(3, Role::Mentor, "OrgC", false),
                participant(11, Role::Mentee, "OrgB", true),
                participant(12, Role::Mentee, "OrgA", true),
            ],
            preferences: vec![
                Preference { from: 1, to: 11, rank: 1 },
                Preference { from: 11, to: 1, rank: 1 },
                Preference { from: 2, to: 12, rank: 1 },
            ],
            mentor_profiles: vec![],
            mentee_profiles: vec![],
        }
    }

    #[test]
    fn unsubmitted_participants_are_excluded() {
        let store = MemoryStore::from_snapshot(snapshot());
        let cohort = store.cohort(1).unwrap();
        let inputs = prepare(&store, &cohort).unwrap();
        assert_eq!(inputs.mentor_ids, vec![1, 2]);
        assert_eq!(inputs.mentee_ids, vec![11, 12]);
    }

    #[test]
    fn acceptability_reflects_preference_edges() {
        let store = MemoryStore::from_snapshot(snapshot());
        let cohort = store.cohort(1).unwrap();
        let inputs = prepare(&store, &cohort).unwrap();
        assert_eq!(inputs.acceptability(1, 11), Acceptability::Mutual);
        assert_eq!(inputs.acceptability(2, 12), Acceptability::OneSidedMentorOnly);
        assert_eq!(inputs.acceptability(2, 11), Acceptability::Neither);
        assert_eq!(inputs.acceptability(1, 12), Acceptability::Neither);
    }

    #[test]
    fn same_org_matrix_compares_organizations() {
        let store = MemoryStore::from_snapshot(snapshot());
        let cohort = store.cohort(1).unwrap();
        let inputs = prepare(&store, &cohort).unwrap();
        assert!(inputs.same_org(1, 12)); // OrgA / OrgA
        assert!(!inputs.same_org(1, 11)); // OrgA / OrgB
        assert!(inputs.same_org(2, 11)); // OrgB / OrgB
    }

    #[test]
    fn scores_are_scaled_and_default_to_zero() {
        let store = MemoryStore::from_snapshot(snapshot());
        store
            .replace_pair_scores(
                1,
                vec![crate::models::PairScore {
                    mentor_id: 1,
                    mentee_id: 11,
                    score: 87.5,
                    breakdown: Default::default(),
                }],
            )
            .unwrap();
        let cohort = store.cohort(1).unwrap();
        let inputs = prepare(&store, &cohort).unwrap();
        assert_eq!(inputs.score(1, 11), 87_500);
        assert_eq!(inputs.score(1, 12), 0);
    }
}
