//! Domain models for validation error identifiers.
//!
//! This module contains the core domain types: identifiers, requirement sets,
//! the extraction pass over a document tree and the reconciliation of a freshly
//! extracted set against a published baseline.

mod config;
pub use config::{Config, ConfigError};

/// Validation error identifier types and parsing.
pub mod error_id;
pub use error_id::{Error as ErrorIdError, ErrorId, IdPrefix};

/// The extraction pass over a specification document.
pub mod extract;
pub use extract::{DocumentNode, ExtractError, extract};

/// Reconciliation of extracted identifiers against a published baseline.
pub mod reconcile;
pub use reconcile::{Advisory, ReconcileError, Reconciliation, Summary, reconcile};

mod requirement_set;
pub use requirement_set::{DuplicateIdError, RequirementRecord, RequirementSet, Stats};

mod watermark;
pub use watermark::{IdMinter, Watermark};
