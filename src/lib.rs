//! Stable identifiers for "Valid Usage" statements
//!
//! Normative statements are scraped from a specification document, numbered in
//! document order, and then reconciled against a previously published database
//! so that unchanged statements keep their identifiers from one revision of the
//! document to the next.

pub mod domain;
pub use domain::{
    Advisory, Config, ErrorId, IdMinter, Reconciliation, RequirementRecord, RequirementSet,
    Watermark, extract, reconcile,
};

/// Persistence and rendering collaborators: the XHTML document adapter, the
/// delimited database file and the generated header.
pub mod storage;
pub use storage::{Database, DatabaseEntry};
