//! Data models for the matching engine API.
//!
//! This module contains the public data structures used to describe a cohort,
//! its participants and their preferences, and to receive matching results.
//! Everything is serializable (JSON/YAML) so snapshots and run results can be
//! moved in and out of the engine without touching storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Stable participant identifier assigned by the collaborator.
pub type ParticipantId = u64;

/// Stable cohort identifier assigned by the collaborator.
pub type CohortId = u64;

/// The role a participant plays inside a cohort.
///
/// A cohort is made of two disjoint populations; every participant is on
/// exactly one side and matches always pair one mentor with one mentee.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Mentor,
    Mentee,
}

impl Role {
    /// The opposite side of the pairing.
    pub fn opposite(self) -> Role {
        match self {
            Role::Mentor => Role::Mentee,
            Role::Mentee => Role::Mentor,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Mentor => write!(f, "MENTOR"),
            Role::Mentee => write!(f, "MENTEE"),
        }
    }
}

/// The matching universe: a named group of mentors and mentees plus the
/// per-cohort configuration overrides (see [`crate::config::EngineConfig`]).
///
/// The `config` map holds raw overrides as JSON values; unknown keys are
/// ignored when the effective configuration is built.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Cohort {
    pub id: CohortId,
    pub name: String,
    /// Raw configuration overrides, merged over the engine defaults.
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

/// A user participating in a cohort as either mentor or mentee.
///
/// `(cohort_id, external_user_id)` is unique; `organization` may be empty,
/// which blocks readiness but not solving.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub cohort_id: CohortId,
    /// Identity handle on the collaborator side (user id, email key, ...).
    pub external_user_id: u64,
    pub role: Role,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub organization: String,
    /// Whether the participant finished preference entry.
    #[serde(default)]
    pub submitted: bool,
}

/// A directed ranked preference edge between two participants of the same
/// cohort. Rank 1 is the strongest choice; `(from, to)` is unique.
///
/// Presence of the edge doubles as acceptability: a participant accepts
/// exactly the partners they ranked.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub rank: u32,
}

/// Extended profile data for a mentor, consumed only by the scorer.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MentorProfile {
    pub participant_id: ParticipantId,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub expertise_tags: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub years_experience: Option<u32>,
    #[serde(default)]
    pub coaching_topics: Vec<String>,
    #[serde(default)]
    pub bio: String,
}

/// One desired-attribute entry on a mentee profile.
///
/// Attribute values are heterogeneous by design: a boolean flag ("must have
/// management experience"), a single string ("preferred_location"), or a
/// list ("preferred_expertise"). The scorer pattern-matches on the variant
/// instead of round-tripping everything through strings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum DesiredValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

/// Extended profile data for a mentee, consumed only by the scorer.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MenteeProfile {
    pub participant_id: ParticipantId,
    /// Free-form desired attributes, keyed by attribute name. Keys may use
    /// the `preferred_` prefix to address a mentor profile field.
    #[serde(default)]
    pub desired_attributes: BTreeMap<String, DesiredValue>,
    #[serde(default)]
    pub notes: String,
}

/// Per-component breakdown of a pair score. All values are percentages
/// rounded to two decimals; `*_component` entries are already weighted.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub rank_score: f64,
    pub rank_component: f64,
    pub tag_overlap_score: f64,
    pub tag_component: f64,
    pub attribute_match_score: f64,
    pub attribute_component: f64,
    pub overall_score: f64,
}

/// Precomputed quality of one mentor/mentee pair, in `[0, 100]`.
///
/// Derived data: rebuildable at any time from preferences and profiles,
/// keyed by `(mentor_id, mentee_id)` within a cohort.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PairScore {
    pub mentor_id: ParticipantId,
    pub mentee_id: ParticipantId,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Which solver a run used.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMode {
    /// Hard constraints only; may be infeasible.
    Strict,
    /// Complete matching with lexicographically penalized violations.
    Exception,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Strict => write!(f, "STRICT"),
            MatchMode::Exception => write!(f, "EXCEPTION"),
        }
    }
}

/// Terminal status of a run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Policy violation severity for a matched pair, ascending.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// One side did not rank the other.
    E1,
    /// Neither side ranked the other.
    E2,
    /// Both participants belong to the same organization.
    E3,
}

impl ExceptionKind {
    /// Severity level; higher wins when several labels apply.
    pub fn priority(self) -> u8 {
        match self {
            ExceptionKind::E1 => 1,
            ExceptionKind::E2 => 2,
            ExceptionKind::E3 => 3,
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionKind::E1 => write!(f, "E1"),
            ExceptionKind::E2 => write!(f, "E2"),
            ExceptionKind::E3 => write!(f, "E3"),
        }
    }
}

/// Occurrence counts per exception kind in a successful exception-mode run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExceptionSummary {
    #[serde(rename = "E1")]
    pub e1: u32,
    #[serde(rename = "E2")]
    pub e2: u32,
    #[serde(rename = "E3")]
    pub e3: u32,
}

impl ExceptionSummary {
    pub fn record(&mut self, kind: ExceptionKind) {
        match kind {
            ExceptionKind::E1 => self.e1 += 1,
            ExceptionKind::E2 => self.e2 += 1,
            ExceptionKind::E3 => self.e3 += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.e1 + self.e2 + self.e3
    }
}

/// Aggregate metrics persisted on a successful run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ObjectiveSummary {
    /// Sum of match percentages.
    pub total_score: f64,
    pub avg_score: f64,
    pub match_count: usize,
    pub ambiguity_count: usize,
    /// Seconds spent inside the solver.
    pub solve_time: f64,
    /// Seconds from preparation entry through final persist.
    pub total_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_summary: Option<ExceptionSummary>,
}

/// Structured diagnostics persisted on a failed run.
///
/// The `reason` tag is the discriminant collaborators branch on; the
/// payload differs per reason as specified by the run-result interface.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReport {
    CountMismatch {
        mentors_count: usize,
        mentees_count: usize,
        message: String,
    },
    NoParticipants {
        message: String,
    },
    Infeasible {
        mentors_count: usize,
        mentees_count: usize,
        feasible_pairs_count: usize,
        zero_mentor_options: Vec<ParticipantId>,
        zero_mentee_options: Vec<ParticipantId>,
        solve_time: f64,
    },
    Timeout {
        mentors_count: usize,
        mentees_count: usize,
        feasible_pairs_count: usize,
        zero_mentor_options: Vec<ParticipantId>,
        zero_mentee_options: Vec<ParticipantId>,
        solve_time: f64,
    },
    InternalError {
        message: String,
    },
}

impl FailureReport {
    /// Short discriminant string, e.g. for log lines.
    pub fn reason(&self) -> &'static str {
        match self {
            FailureReport::CountMismatch { .. } => "COUNT_MISMATCH",
            FailureReport::NoParticipants { .. } => "NO_PARTICIPANTS",
            FailureReport::Infeasible { .. } => "INFEASIBLE",
            FailureReport::Timeout { .. } => "TIMEOUT",
            FailureReport::InternalError { .. } => "INTERNAL_ERROR",
        }
    }
}

/// One matching attempt against a cohort.
///
/// Created with provisional `Failed` status before preparation begins and
/// finalized exactly once; `input_signature` binds the run to the inputs it
/// saw (equal signatures imply provably equal prepared inputs).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MatchRun {
    pub id: Uuid,
    pub cohort_id: CohortId,
    pub mode: MatchMode,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_summary: Option<ObjectiveSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_report: Option<FailureReport>,
    /// Lowercase hex SHA-256 over the canonical input serialization.
    pub input_signature: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// A single mentor/mentee pairing inside a successful run.
///
/// Within one run each mentor appears at most once and each mentee appears
/// at most once; the store enforces this during override surgery.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Match {
    pub mentor_id: ParticipantId,
    pub mentee_id: ParticipantId,
    /// Integer match percentage in `[0, 100]`; 0 for manual pairings.
    pub score_percent: u32,
    #[serde(default)]
    pub ambiguity_flag: bool,
    #[serde(default)]
    pub ambiguity_reason: String,
    #[serde(default)]
    pub exception_flag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<ExceptionKind>,
    #[serde(default)]
    pub exception_reason: String,
    #[serde(default)]
    pub is_manual_override: bool,
    #[serde(default)]
    pub override_reason: String,
}

/// The single run per cohort currently shown to participants as
/// authoritative. Holds a non-owning reference to a `Success` run.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ActiveMatchRun {
    pub cohort_id: CohortId,
    pub run_id: Uuid,
    pub set_by: String,
    pub set_at: DateTime<Utc>,
}

/// A complete, already-validated cohort snapshot: the engine's whole world
/// for one cohort. This is the file format the CLI loads into a
/// [`crate::store::MemoryStore`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CohortSnapshot {
    pub cohort: Cohort,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub preferences: Vec<Preference>,
    #[serde(default)]
    pub mentor_profiles: Vec<MentorProfile>,
    #[serde(default)]
    pub mentee_profiles: Vec<MenteeProfile>,
}
