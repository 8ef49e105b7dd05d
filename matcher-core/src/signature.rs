//! Canonical input signatures for run traceability.
//!
//! Two runs with equal signatures saw provably-equal prepared inputs;
//! collaborators compare signatures to decide whether a re-run can change
//! anything. The canonical form is order-insensitive: participants sort by
//! id, preferences by `(from, to)`, and the config map serializes with
//! sorted keys (`serde_json::Map` is `BTreeMap`-backed).

use crate::models::{Participant, Preference};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Computes the lowercase hex SHA-256 signature over the cohort's matching
/// inputs: every participant's `(id, role, organization)`, every preference
/// edge with its rank, and the raw config overrides as JSON.
pub fn input_signature(
    participants: &[Participant],
    preferences: &[Preference],
    config: &serde_json::Map<String, serde_json::Value>,
) -> String {
    let mut sorted_participants: Vec<&Participant> = participants.iter().collect();
    sorted_participants.sort_by_key(|p| p.id);

    let mut prefs_by_from: HashMap<u64, Vec<&Preference>> = HashMap::new();
    for pref in preferences {
        prefs_by_from.entry(pref.from).or_default().push(pref);
    }

    let mut parts: Vec<String> = Vec::new();
    for p in &sorted_participants {
        parts.push(format!("{}:{}:{}", p.id, p.role, p.organization));
        if let Some(prefs) = prefs_by_from.get_mut(&p.id) {
            prefs.sort_by_key(|pref| pref.to);
            for pref in prefs.iter() {
                parts.push(format!("pref:{}->{}:{}", pref.from, pref.to, pref.rank));
            }
        }
    }

    let config_json = serde_json::Value::Object(config.clone()).to_string();
    parts.push(format!("config:{config_json}"));

    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use serde_json::json;

    fn participant(id: u64, role: Role, org: &str) -> Participant {
        Participant {
            id,
            cohort_id: 1,
            external_user_id: id,
            role,
            display_name: format!("p{id}"),
            email: String::new(),
            organization: org.into(),
            submitted: true,
        }
    }

    #[test]
    fn signature_is_stable_under_input_reordering() {
        let a = participant(1, Role::Mentor, "OrgA");
        let b = participant(11, Role::Mentee, "OrgB");
        let p1 = Preference { from: 1, to: 11, rank: 1 };
        let p2 = Preference { from: 11, to: 1, rank: 2 };
        let config = serde_json::Map::new();

        let forward = input_signature(
            &[a.clone(), b.clone()],
            &[p1.clone(), p2.clone()],
            &config,
        );
        let reversed = input_signature(&[b, a], &[p2, p1], &config);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn signature_is_lowercase_hex_sha256() {
        let signature = input_signature(&[], &[], &serde_json::Map::new());
        assert_eq!(signature.len(), 64);
        assert!(signature
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn any_input_change_changes_the_signature() {
        let a = participant(1, Role::Mentor, "OrgA");
        let b = participant(11, Role::Mentee, "OrgB");
        let pref = Preference { from: 1, to: 11, rank: 1 };
        let config = serde_json::Map::new();

        let base = input_signature(&[a.clone(), b.clone()], &[pref.clone()], &config);

        let mut moved = a.clone();
        moved.organization = "OrgC".into();
        assert_ne!(
            base,
            input_signature(&[moved, b.clone()], &[pref.clone()], &config)
        );

        let reranked = Preference { from: 1, to: 11, rank: 2 };
        assert_ne!(
            base,
            input_signature(&[a.clone(), b.clone()], &[reranked], &config)
        );

        let mut overrides = serde_json::Map::new();
        overrides.insert("rank_weight".into(), json!(0.9));
        assert_ne!(base, input_signature(&[a, b], &[pref], &overrides));
    }
}
