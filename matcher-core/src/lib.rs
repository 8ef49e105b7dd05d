//! # Matcher-Core: Cohort Mentor/Mentee Matching Engine
//!
//! This crate pairs the mentors and mentees of a cohort one-to-one,
//! maximizing an aggregate quality score under policy constraints. It
//! separates persistence from pure solver logic: the preparer turns a
//! cohort snapshot into an in-memory [`prepare::PreparedInputs`], the two
//! solvers (strict and exception mode) operate only on that value, and the
//! orchestrator persists a fully audited [`models::MatchRun`] with its
//! matches, input signature and diagnostics.
//!
//! ## Quick Example
//!
//! ```no_run
//! use matcher_core::engine::MatchEngine;
//! use matcher_core::models::{CohortSnapshot, MatchMode, RunStatus};
//! use matcher_core::store::MemoryStore;
//! use std::sync::Arc;
//!
//! # fn example(snapshot: CohortSnapshot) -> Result<(), matcher_core::store::StoreError> {
//! let store = Arc::new(MemoryStore::from_snapshot(snapshot));
//! let engine = MatchEngine::new(store);
//!
//! engine.rebuild_pair_scores(1)?;
//! let run = engine.run(1, "admin", MatchMode::Strict)?;
//! match run.status {
//!     RunStatus::Success => {
//!         for m in engine.store().matches(run.id)? {
//!             println!("{} -> {} ({}%)", m.mentor_id, m.mentee_id, m.score_percent);
//!         }
//!     }
//!     RunStatus::Failed => {
//!         println!("run failed: {:?}", run.failure_report);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pure core, storage at the edges
//!
//! Scoring, classification, both solvers, ambiguity detection and the
//! readiness reporter are pure functions; they can be exercised with
//! literal values and no store at all. Only [`prepare::prepare`] and the
//! [`engine::MatchEngine`] methods touch a [`store::MatchStore`].

pub mod ambiguity;
pub mod arbiter;
pub mod classify;
pub mod config;
pub mod engine;
pub mod export;
pub mod models;
pub mod prepare;
pub mod readiness;
pub mod scoring;
pub mod signature;
pub mod solver;
pub mod store;

pub use engine::MatchEngine;
pub use solver::{solve, SolveOutcome};
