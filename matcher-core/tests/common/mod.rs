//! Shared fixture builders for the integration tests.
#![allow(dead_code)]

use matcher_core::classify::Acceptability;
use matcher_core::config::EngineConfig;
use matcher_core::engine::MatchEngine;
use matcher_core::models::{
    Cohort, CohortId, CohortSnapshot, PairScore, Participant, ParticipantId, Preference, Role,
};
use matcher_core::prepare::PreparedInputs;
use matcher_core::store::{MatchStore, MemoryStore};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const COHORT: CohortId = 1;

pub fn participant(id: ParticipantId, role: Role, name: &str, org: &str) -> Participant {
    Participant {
        id,
        cohort_id: COHORT,
        external_user_id: id,
        role,
        display_name: name.into(),
        email: format!("{}@example.org", name.to_lowercase()),
        organization: org.into(),
        submitted: true,
    }
}

/// Both directions of a mutual ranking.
pub fn mutual(a: ParticipantId, b: ParticipantId, rank: u32) -> [Preference; 2] {
    [
        Preference { from: a, to: b, rank },
        Preference { from: b, to: a, rank },
    ]
}

pub fn snapshot(participants: Vec<Participant>, preferences: Vec<Preference>) -> CohortSnapshot {
    CohortSnapshot {
        cohort: Cohort {
            id: COHORT,
            name: "integration".into(),
            config: serde_json::Map::new(),
        },
        participants,
        preferences,
        mentor_profiles: vec![],
        mentee_profiles: vec![],
    }
}

pub fn engine_with(snapshot: CohortSnapshot) -> (MatchEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::from_snapshot(snapshot));
    (MatchEngine::new(store.clone()), store)
}

/// Stores literal pair scores (percentages) for the cohort.
pub fn seed_scores(store: &MemoryStore, scores: &[(ParticipantId, ParticipantId, f64)]) {
    let rows = scores
        .iter()
        .map(|&(mentor_id, mentee_id, score)| PairScore {
            mentor_id,
            mentee_id,
            score,
            breakdown: Default::default(),
        })
        .collect();
    store.replace_pair_scores(COHORT, rows).unwrap();
}

/// Builds a literal `PreparedInputs` over dense index-based matrices; used
/// by the property tests. Mentor ids are `1..=n`, mentee ids `101..=100+n`.
pub fn build_inputs(
    n: usize,
    same_org: &[Vec<bool>],
    acceptability: &[Vec<Acceptability>],
    scores: &[Vec<i64>],
) -> PreparedInputs {
    let mentor_ids: Vec<ParticipantId> = (1..=n as u64).collect();
    let mentee_ids: Vec<ParticipantId> = (101..=100 + n as u64).collect();
    let mut same_org_map = BTreeMap::new();
    let mut acceptability_map = BTreeMap::new();
    let mut score_map = BTreeMap::new();
    let mut organizations = BTreeMap::new();
    for (i, &m) in mentor_ids.iter().enumerate() {
        organizations.insert(m, format!("org-m{i}"));
        for (j, &t) in mentee_ids.iter().enumerate() {
            same_org_map.insert((m, t), same_org[i][j]);
            acceptability_map.insert((m, t), acceptability[i][j]);
            score_map.insert((m, t), scores[i][j]);
        }
    }
    for (j, &t) in mentee_ids.iter().enumerate() {
        organizations.insert(t, format!("org-t{j}"));
    }
    PreparedInputs {
        mentor_ids,
        mentee_ids,
        same_org: same_org_map,
        acceptability: acceptability_map,
        score: score_map,
        organizations,
        config: EngineConfig::default(),
    }
}
