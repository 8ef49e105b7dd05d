//! Pair-quality scoring.
//!
//! Pure functions from rank positions, expertise tags and desired
//! attributes to a percentage in `[0, 100]` with a per-component breakdown.
//! The orchestration that reads profiles and persists [`PairScore`] rows
//! lives in [`crate::engine`]; nothing here touches storage.

use crate::config::EngineConfig;
use crate::models::{DesiredValue, MentorProfile, ScoreBreakdown};
use std::collections::{BTreeMap, BTreeSet};

/// A participant's rank of a partner together with the largest rank among
/// that participant's stored preferences (the normalization base).
#[derive(Debug, Clone, Copy)]
pub struct RankContext {
    pub rank: u32,
    pub max_rank: u32,
}

/// Mentor profile data flattened for attribute lookup during scoring.
#[derive(Debug, Clone, Default)]
pub struct MentorFacts {
    pub expertise_tags: Vec<String>,
    pub languages: Vec<String>,
    pub coaching_topics: Vec<String>,
    pub job_title: String,
    pub function: String,
    pub location: String,
    pub years_experience: Option<u32>,
}

/// A mentor field addressed by a desired-attribute key.
enum FieldValue<'a> {
    Text(&'a str),
    List(&'a [String]),
    Number(u32),
}

impl MentorFacts {
    pub fn from_profile(profile: Option<&MentorProfile>) -> Self {
        match profile {
            Some(p) => MentorFacts {
                expertise_tags: p.expertise_tags.clone(),
                languages: p.languages.clone(),
                coaching_topics: p.coaching_topics.clone(),
                job_title: p.job_title.clone(),
                function: p.function.clone(),
                location: p.location.clone(),
                years_experience: p.years_experience,
            },
            None => MentorFacts::default(),
        }
    }

    /// Looks up the mentor field a desired-attribute key addresses, after
    /// stripping the `preferred_` prefix mentees use.
    fn field(&self, key: &str) -> Option<FieldValue<'_>> {
        let key = key.strip_prefix("preferred_").unwrap_or(key);
        match key {
            "expertise_tags" | "expertise" => Some(FieldValue::List(&self.expertise_tags)),
            "languages" | "language" => Some(FieldValue::List(&self.languages)),
            "coaching_topics" | "topics" => Some(FieldValue::List(&self.coaching_topics)),
            "job_title" => Some(FieldValue::Text(&self.job_title)),
            "function" => Some(FieldValue::Text(&self.function)),
            "location" => Some(FieldValue::Text(&self.location)),
            "years_experience" => self.years_experience.map(FieldValue::Number),
            _ => None,
        }
    }

    /// Whether the field addressed by `key` carries a non-empty value.
    fn truthy(&self, key: &str) -> bool {
        match self.field(key) {
            Some(FieldValue::Text(t)) => !t.trim().is_empty(),
            Some(FieldValue::List(l)) => !l.is_empty(),
            Some(FieldValue::Number(n)) => n > 0,
            None => false,
        }
    }
}

/// Rank-position score: rank 1 maps to 100, `max_rank` to the smallest
/// positive slice. Zero when either value is out of range.
pub fn compute_rank_score(rank: u32, max_rank: u32) -> f64 {
    if rank == 0 || max_rank == 0 {
        return 0.0;
    }
    let score = (max_rank as f64 - rank as f64 + 1.0) / max_rank as f64 * 100.0;
    score.max(0.0)
}

/// Jaccard similarity of two tag lists, as a percentage. Tags are case- and
/// whitespace-normalized; empty entries are dropped.
pub fn compute_tag_overlap(mentor_tags: &[String], mentee_tags: &[String]) -> f64 {
    let a = normalize_tags(mentor_tags);
    let b = normalize_tags(mentee_tags);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64 * 100.0
}

fn normalize_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Desired-attribute score: the fraction of a mentee's desired attributes
/// the mentor satisfies, as a percentage.
///
/// Each entry contributes by variant: a `true` flag matches when the
/// addressed mentor field is non-empty; a string matches on case-insensitive
/// equality (membership for list fields such as languages); a list
/// contributes its fractional Jaccard overlap. Zero when nothing is desired.
pub fn compute_attribute_match(
    desired: &BTreeMap<String, DesiredValue>,
    mentor: &MentorFacts,
) -> f64 {
    let mut matched = 0.0_f64;
    let mut total = 0usize;

    for (key, value) in desired {
        match value {
            DesiredValue::Flag(true) => {
                total += 1;
                if mentor.truthy(key) {
                    matched += 1.0;
                }
            }
            DesiredValue::Flag(false) => {}
            DesiredValue::Text(wanted) if !wanted.trim().is_empty() => {
                total += 1;
                match mentor.field(key) {
                    Some(FieldValue::Text(have)) => {
                        if wanted.trim().eq_ignore_ascii_case(have.trim()) {
                            matched += 1.0;
                        }
                    }
                    Some(FieldValue::List(have)) => {
                        if have
                            .iter()
                            .any(|item| item.trim().eq_ignore_ascii_case(wanted.trim()))
                        {
                            matched += 1.0;
                        }
                    }
                    Some(FieldValue::Number(have)) => {
                        if wanted.trim() == have.to_string() {
                            matched += 1.0;
                        }
                    }
                    None => {}
                }
            }
            DesiredValue::Text(_) => {}
            DesiredValue::List(wanted) if !wanted.is_empty() => {
                total += 1;
                if let Some(FieldValue::List(have)) = mentor.field(key) {
                    let a = normalize_tags(wanted);
                    let b = normalize_tags(have);
                    if !a.is_empty() && !b.is_empty() {
                        let intersection = a.intersection(&b).count();
                        let union = a.union(&b).count();
                        if union > 0 {
                            matched += intersection as f64 / union as f64;
                        }
                    }
                }
            }
            DesiredValue::List(_) => {}
        }
    }

    if total == 0 {
        return 0.0;
    }
    matched / total as f64 * 100.0
}

/// Scores one mentor/mentee pair.
///
/// Mutuality gates everything: when either direction's rank is missing the
/// pair scores 0 regardless of tags and attributes. Otherwise the weighted
/// components are combined and clamped to `[0, 100]`; every breakdown entry
/// is rounded to two decimals.
pub fn score_pair(
    mentor_rank: Option<RankContext>,
    mentee_rank: Option<RankContext>,
    mentor: &MentorFacts,
    desired: &BTreeMap<String, DesiredValue>,
    config: &EngineConfig,
) -> ScoreBreakdown {
    let (mentor_rank, mentee_rank) = match (mentor_rank, mentee_rank) {
        (Some(m), Some(t)) => (m, t),
        _ => return ScoreBreakdown::default(),
    };

    let rank_score = (compute_rank_score(mentor_rank.rank, mentor_rank.max_rank)
        + compute_rank_score(mentee_rank.rank, mentee_rank.max_rank))
        / 2.0;

    let mentee_topics = match desired.get("preferred_expertise") {
        Some(DesiredValue::List(topics)) => topics.as_slice(),
        _ => &[],
    };
    let tag_score = compute_tag_overlap(&mentor.expertise_tags, mentee_topics);
    let attr_score = compute_attribute_match(desired, mentor);

    let rank_component = rank_score * config.rank_weight;
    let tag_component = tag_score * config.tag_overlap_weight;
    let attr_component = attr_score * config.attribute_match_weight;
    let overall = (rank_component + tag_component + attr_component).clamp(0.0, 100.0);

    ScoreBreakdown {
        rank_score: round2(rank_score),
        rank_component: round2(rank_component),
        tag_overlap_score: round2(tag_score),
        tag_component: round2(tag_component),
        attribute_match_score: round2(attr_score),
        attribute_component: round2(attr_component),
        overall_score: round2(overall),
    }
}

/// Integer form of a percentage at the configured solver granularity.
pub fn scaled_score(percentage: f64, score_scale: i64) -> i64 {
    (percentage * score_scale as f64).round() as i64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
