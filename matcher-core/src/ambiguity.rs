//! Ambiguity detection: flags matches whose best alternative is within the
//! configured score gap.
//!
//! A match can look ambiguous from either side; duplicates are suppressed
//! by canonicalizing on the matched `(mentor, mentee)` pair, so each match
//! is flagged at most once. Scores compare in percent, after dividing the
//! scaled solver integers back by `score_scale`.

use crate::models::ParticipantId;
use crate::prepare::PreparedInputs;
use crate::solver::SolvedPair;
use std::collections::{HashMap, HashSet};

/// One near-tie finding. `participant_id` is the side the tie was seen
/// from; `(mentor_id, mentee_id)` is the canonical matched pair.
#[derive(Debug, Clone)]
pub struct Ambiguity {
    pub participant_id: ParticipantId,
    pub matched_with_id: ParticipantId,
    pub mentor_id: ParticipantId,
    pub mentee_id: ParticipantId,
    pub matched_score: f64,
    pub alternative_id: ParticipantId,
    pub alternative_score: f64,
    pub gap: f64,
    pub reason: String,
}

/// Finds every match whose holder has a close-scoring alternative partner.
pub fn detect_ambiguity(matches: &[SolvedPair], inputs: &PreparedInputs) -> Vec<Ambiguity> {
    if matches.is_empty() {
        return Vec::new();
    }

    let threshold = inputs.config.ambiguity_gap_threshold;
    let scale = inputs.config.score_scale as f64;
    let mentor_of: HashMap<ParticipantId, ParticipantId> = matches
        .iter()
        .map(|m| (m.mentee_id, m.mentor_id))
        .collect();
    let mentee_of: HashMap<ParticipantId, ParticipantId> = matches
        .iter()
        .map(|m| (m.mentor_id, m.mentee_id))
        .collect();

    let mut flagged: HashSet<(ParticipantId, ParticipantId)> = HashSet::new();
    let mut ambiguities = Vec::new();

    // Mentee side first, then mentor side with canonical dedup.
    for &mentee_id in &inputs.mentee_ids {
        let Some(&mentor_id) = mentor_of.get(&mentee_id) else {
            continue;
        };
        let matched_score = inputs.score(mentor_id, mentee_id) as f64 / scale;
        let alternative = inputs
            .mentor_ids
            .iter()
            .filter(|&&alt| alt != mentor_id)
            .map(|&alt| (alt, inputs.score(alt, mentee_id)))
            .max_by_key(|&(alt, score)| (score, std::cmp::Reverse(alt)));
        if let Some((alternative_id, alt_scaled)) = alternative {
            let alternative_score = alt_scaled as f64 / scale;
            let gap = matched_score - alternative_score;
            if gap <= threshold {
                flagged.insert((mentor_id, mentee_id));
                ambiguities.push(Ambiguity {
                    participant_id: mentee_id,
                    matched_with_id: mentor_id,
                    mentor_id,
                    mentee_id,
                    matched_score,
                    alternative_id,
                    alternative_score,
                    gap,
                    reason: gap_reason(matched_score, alternative_score, gap, threshold),
                });
            }
        }
    }

    for &mentor_id in &inputs.mentor_ids {
        let Some(&mentee_id) = mentee_of.get(&mentor_id) else {
            continue;
        };
        if flagged.contains(&(mentor_id, mentee_id)) {
            continue;
        }
        let matched_score = inputs.score(mentor_id, mentee_id) as f64 / scale;
        let alternative = inputs
            .mentee_ids
            .iter()
            .filter(|&&alt| alt != mentee_id)
            .map(|&alt| (alt, inputs.score(mentor_id, alt)))
            .max_by_key(|&(alt, score)| (score, std::cmp::Reverse(alt)));
        if let Some((alternative_id, alt_scaled)) = alternative {
            let alternative_score = alt_scaled as f64 / scale;
            let gap = matched_score - alternative_score;
            if gap <= threshold {
                flagged.insert((mentor_id, mentee_id));
                ambiguities.push(Ambiguity {
                    participant_id: mentor_id,
                    matched_with_id: mentee_id,
                    mentor_id,
                    mentee_id,
                    matched_score,
                    alternative_id,
                    alternative_score,
                    gap,
                    reason: gap_reason(matched_score, alternative_score, gap, threshold),
                });
            }
        }
    }

    ambiguities
}

fn gap_reason(matched: f64, alternative: f64, gap: f64, threshold: f64) -> String {
    format!(
        "Matched score ({matched:.1}) vs alternative ({alternative:.1}) gap is small ({gap:.1} <= {threshold})"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::test_support::inputs_2x2;

    fn pair(mentor_id: ParticipantId, mentee_id: ParticipantId, score: f64) -> SolvedPair {
        SolvedPair {
            mentor_id,
            mentee_id,
            score,
            classification: None,
        }
    }

    #[test]
    fn near_tie_is_flagged_once_with_gap_in_reason() {
        let inputs = inputs_2x2(|b| {
            b.score(1, 11, 90_000);
            b.score(1, 12, 88_000);
            b.score(2, 11, 20_000);
            b.score(2, 12, 30_000);
        });
        let matches = vec![pair(1, 11, 90.0), pair(2, 12, 30.0)];
        let ambiguities = detect_ambiguity(&matches, &inputs);

        let m1: Vec<&Ambiguity> = ambiguities
            .iter()
            .filter(|a| a.mentor_id == 1 && a.mentee_id == 11)
            .collect();
        assert_eq!(m1.len(), 1, "match (1, 11) must be flagged exactly once");
        assert!((m1[0].gap - 2.0).abs() < 1e-9);
        assert!(m1[0].reason.contains("gap is small (2.0 <= 5)"));
    }

    #[test]
    fn wide_gap_is_not_flagged() {
        let inputs = inputs_2x2(|b| {
            b.score(1, 11, 90_000);
            b.score(1, 12, 10_000);
            b.score(2, 11, 10_000);
            b.score(2, 12, 80_000);
        });
        let matches = vec![pair(1, 11, 90.0), pair(2, 12, 80.0)];
        assert!(detect_ambiguity(&matches, &inputs).is_empty());
    }

    #[test]
    fn both_sides_ambiguous_still_one_finding_per_match() {
        // All scores equal: every side sees a zero gap.
        let inputs = inputs_2x2(|b| {
            for m in [1, 2] {
                for t in [11, 12] {
                    b.score(m, t, 50_000);
                }
            }
        });
        let matches = vec![pair(1, 11, 50.0), pair(2, 12, 50.0)];
        let ambiguities = detect_ambiguity(&matches, &inputs);
        let mut pairs: Vec<(ParticipantId, ParticipantId)> = ambiguities
            .iter()
            .map(|a| (a.mentor_id, a.mentee_id))
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        assert_eq!(pairs.len(), ambiguities.len(), "no duplicate flags");
        assert_eq!(pairs, vec![(1, 11), (2, 12)]);
    }

    #[test]
    fn no_matches_no_findings() {
        let inputs = inputs_2x2(|_| {});
        assert!(detect_ambiguity(&[], &inputs).is_empty());
    }
}
