//! Readiness diagnostics: deterministic checks that decide whether a
//! matching run is sensible.
//!
//! Pure over participant and preference slices; the engine supplies them
//! from storage. Nothing here blocks solving: callers read the report and
//! decide whether to invoke a run anyway.

use crate::config::EngineConfig;
use crate::models::{Participant, ParticipantId, Preference, Role};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// How many lowest-option participants the report lists.
const LOWEST_OPTIONS_LIMIT: usize = 5;

/// Outcome of one readiness check.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReadinessCheck {
    pub ready: bool,
    pub message: String,
}

/// The four checks gating a strict run.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReadinessChecks {
    /// Submitted mentor and mentee counts are equal.
    pub balanced_counts: ReadinessCheck,
    /// No submitted participant has an empty organization.
    pub organizations_present: ReadinessCheck,
    /// Every participant has submitted preferences.
    pub all_submitted: ReadinessCheck,
    /// Every participant has enough cross-org mutual options.
    pub sufficient_options: ReadinessCheck,
}

/// A participant together with their cross-org mutual option count.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParticipantOptions {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub role: Role,
    pub organization: String,
    pub mutual_count: usize,
}

/// Role split of one organization's participants.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct OrgCounts {
    pub mentors: usize,
    pub mentees: usize,
    pub total: usize,
}

/// The full diagnostics object consumed by dashboards and the CLI.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReadinessReport {
    pub checks: ReadinessChecks,
    pub overall_ready: bool,
    pub zero_option_participants: Vec<ParticipantOptions>,
    pub lowest_option_participants: Vec<ParticipantOptions>,
    pub org_distribution: BTreeMap<String, OrgCounts>,
    pub suggested_actions: Vec<String>,
}

/// Builds the readiness report for a cohort's participants and preferences.
pub fn readiness_report(
    participants: &[Participant],
    preferences: &[Preference],
    config: &EngineConfig,
) -> ReadinessReport {
    let options = mutual_option_counts(participants, preferences);

    let checks = ReadinessChecks {
        balanced_counts: check_balanced_counts(participants),
        organizations_present: check_organizations_present(participants),
        all_submitted: check_all_submitted(participants),
        sufficient_options: check_sufficient_options(&options, config.min_options_strict),
    };
    let overall_ready = checks.balanced_counts.ready
        && checks.organizations_present.ready
        && checks.all_submitted.ready
        && checks.sufficient_options.ready;

    let zero_option_participants: Vec<ParticipantOptions> = options
        .iter()
        .filter(|o| o.mutual_count == 0)
        .cloned()
        .collect();

    let mut lowest_option_participants = options.clone();
    lowest_option_participants.sort_by_key(|o| (o.mutual_count, o.participant_id));
    lowest_option_participants.truncate(LOWEST_OPTIONS_LIMIT);

    let mut org_distribution: BTreeMap<String, OrgCounts> = BTreeMap::new();
    for p in participants {
        let org = if p.organization.is_empty() {
            "No Organization".to_string()
        } else {
            p.organization.clone()
        };
        let counts = org_distribution.entry(org).or_default();
        match p.role {
            Role::Mentor => counts.mentors += 1,
            Role::Mentee => counts.mentees += 1,
        }
        counts.total += 1;
    }

    let suggested_actions =
        suggest_actions(&checks, &zero_option_participants);

    ReadinessReport {
        checks,
        overall_ready,
        zero_option_participants,
        lowest_option_participants,
        org_distribution,
        suggested_actions,
    }
}

/// Cross-org mutual option count for every participant, ascending by id.
fn mutual_option_counts(
    participants: &[Participant],
    preferences: &[Preference],
) -> Vec<ParticipantOptions> {
    let mut gives: HashMap<ParticipantId, HashSet<ParticipantId>> = HashMap::new();
    for pref in preferences {
        gives.entry(pref.from).or_default().insert(pref.to);
    }
    let mutual = |a: ParticipantId, b: ParticipantId| {
        gives.get(&a).is_some_and(|s| s.contains(&b))
            && gives.get(&b).is_some_and(|s| s.contains(&a))
    };

    let mut sorted: Vec<&Participant> = participants.iter().collect();
    sorted.sort_by_key(|p| p.id);

    sorted
        .iter()
        .map(|p| {
            let mutual_count = sorted
                .iter()
                .filter(|q| {
                    q.role == p.role.opposite()
                        && q.organization != p.organization
                        && mutual(p.id, q.id)
                })
                .count();
            ParticipantOptions {
                participant_id: p.id,
                display_name: p.display_name.clone(),
                role: p.role,
                organization: p.organization.clone(),
                mutual_count,
            }
        })
        .collect()
}

fn check_balanced_counts(participants: &[Participant]) -> ReadinessCheck {
    let mentors = participants
        .iter()
        .filter(|p| p.submitted && p.role == Role::Mentor)
        .count();
    let mentees = participants
        .iter()
        .filter(|p| p.submitted && p.role == Role::Mentee)
        .count();
    if mentors != mentees {
        ReadinessCheck {
            ready: false,
            message: format!("Counts mismatch: {mentors} mentors vs {mentees} mentees"),
        }
    } else {
        ReadinessCheck {
            ready: true,
            message: format!("Counts balanced: {mentors} mentors and {mentees} mentees"),
        }
    }
}

fn check_organizations_present(participants: &[Participant]) -> ReadinessCheck {
    let missing = participants
        .iter()
        .filter(|p| p.submitted && p.organization.is_empty())
        .count();
    if missing > 0 {
        ReadinessCheck {
            ready: false,
            message: format!("{missing} participants missing organization"),
        }
    } else {
        ReadinessCheck {
            ready: true,
            message: "All participants have organization set".into(),
        }
    }
}

fn check_all_submitted(participants: &[Participant]) -> ReadinessCheck {
    let unsubmitted = participants.iter().filter(|p| !p.submitted).count();
    if unsubmitted > 0 {
        ReadinessCheck {
            ready: false,
            message: format!("{unsubmitted} participants haven't submitted preferences"),
        }
    } else {
        ReadinessCheck {
            ready: true,
            message: "All participants have submitted preferences".into(),
        }
    }
}

fn check_sufficient_options(
    options: &[ParticipantOptions],
    min_options: usize,
) -> ReadinessCheck {
    let problematic: Vec<&ParticipantOptions> = options
        .iter()
        .filter(|o| o.mutual_count < min_options)
        .collect();
    if problematic.is_empty() {
        ReadinessCheck {
            ready: true,
            message: format!(
                "All participants have at least {min_options} mutual cross-org options"
            ),
        }
    } else {
        let details = problematic
            .iter()
            .map(|o| format!("{} ({}/{min_options} options)", o.display_name, o.mutual_count))
            .collect::<Vec<_>>()
            .join(", ");
        ReadinessCheck {
            ready: false,
            message: format!("Participants with insufficient mutual options: {details}"),
        }
    }
}

fn suggest_actions(
    checks: &ReadinessChecks,
    zero_options: &[ParticipantOptions],
) -> Vec<String> {
    let mut actions = Vec::new();
    if !checks.balanced_counts.ready {
        actions.push("Balance mentor/mentee counts".to_string());
    }
    if !checks.organizations_present.ready {
        actions.push("Set organization for all participants".to_string());
    }
    if !checks.all_submitted.ready {
        actions.push("Have all participants submit preferences".to_string());
    }
    if !checks.sufficient_options.ready {
        actions.push("Review participants with insufficient mutual options".to_string());
    }
    if !zero_options.is_empty() {
        let names = zero_options
            .iter()
            .map(|o| o.display_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        actions.push(format!("Help participants with zero options: {names}"));
    }
    actions
}
