//! Results export: flat rows for spreadsheets and the CSV writer.
//!
//! Row order is storage order of the run's matches. Only successful runs
//! export rows; a failed run exports an empty set, never a partial one.

use crate::engine::MatchEngine;
use crate::models::{Match, Participant};
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use uuid::Uuid;

/// One export line, column-for-column the external results interface.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExportRow {
    pub mentor_name: String,
    pub mentor_email: String,
    pub mentor_org: String,
    pub mentee_name: String,
    pub mentee_email: String,
    pub mentee_org: String,
    pub match_percent: u32,
    pub ambiguity_flag: bool,
    pub ambiguity_reason: String,
    pub exception_flag: bool,
    pub exception_type: String,
    pub exception_reason: String,
    pub is_manual_override: bool,
    pub override_reason: String,
}

impl ExportRow {
    pub fn new(m: &Match, mentor: &Participant, mentee: &Participant) -> Self {
        ExportRow {
            mentor_name: mentor.display_name.clone(),
            mentor_email: mentor.email.clone(),
            mentor_org: mentor.organization.clone(),
            mentee_name: mentee.display_name.clone(),
            mentee_email: mentee.email.clone(),
            mentee_org: mentee.organization.clone(),
            match_percent: m.score_percent,
            ambiguity_flag: m.ambiguity_flag,
            ambiguity_reason: m.ambiguity_reason.clone(),
            exception_flag: m.exception_flag,
            exception_type: m
                .exception_type
                .map(|k| k.to_string())
                .unwrap_or_default(),
            exception_reason: m.exception_reason.clone(),
            is_manual_override: m.is_manual_override,
            override_reason: m.override_reason.clone(),
        }
    }
}

/// Writes rows as UTF-8 CSV with a header line.
pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

impl MatchEngine {
    /// Export rows for a run, in storage order. Empty unless the run
    /// succeeded.
    pub fn export_rows(&self, run_id: Uuid) -> Result<Vec<ExportRow>, StoreError> {
        let run = self.store.run(run_id)?;
        if run.status != crate::models::RunStatus::Success {
            return Ok(Vec::new());
        }
        let matches = self.store.matches(run_id)?;
        let mut rows = Vec::with_capacity(matches.len());
        for m in &matches {
            let mentor = self.store.participant(m.mentor_id)?;
            let mentee = self.store.participant(m.mentee_id)?;
            rows.push(ExportRow::new(m, &mentor, &mentee));
        }
        Ok(rows)
    }

    /// Writes a run's results as CSV to the given writer.
    pub fn export_csv<W: Write>(&self, run_id: Uuid, writer: W) -> Result<(), StoreError> {
        let rows = self.export_rows(run_id)?;
        write_csv(&rows, writer).map_err(|e| StoreError::Backend(e.to_string()))
    }
}
