//! Identifier reconciliation.
//!
//! A freshly extracted [`RequirementSet`] numbers statements by their position
//! in the document, so identifiers shift whenever statements are added, removed
//! or reordered. [`reconcile`] rewrites those identifiers against a published
//! baseline:
//!
//! - a statement whose identifier and message both match the baseline keeps
//!   its identifier;
//! - a statement whose exact message is known under another identifier is
//!   re-anchored to that identifier;
//! - anything else is a new statement and receives a fresh identifier above
//!   the baseline's watermark.
//!
//! Findings that need a human decision are recorded as [`Advisory`] values
//! rather than resolved silently.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::domain::{ErrorId, IdMinter, RequirementRecord, RequirementSet, Watermark};

/// A non-fatal reconciliation finding that needs human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// The candidate identifier exists in the baseline with a different
    /// message, and the new message is not known anywhere in the baseline.
    ///
    /// A fresh identifier was minted. Confirm the statement is genuinely new
    /// and not a rewording of the old one.
    MessageChanged {
        /// The identifier the statement was extracted under.
        candidate: ErrorId,
        /// The identifier minted for it.
        minted: ErrorId,
        /// The new message.
        message: String,
    },

    /// Two candidate statements resolved to the same identifier. The later one
    /// was discarded.
    Collision {
        /// The contested identifier.
        id: ErrorId,
        /// The identifier the discarded statement was extracted under.
        candidate: ErrorId,
        /// The discarded message.
        message: String,
    },

    /// A statement was re-anchored using a message that appears under several
    /// baseline identifiers. The last one in the baseline was used.
    AmbiguousAnchor {
        /// The identifier that was chosen.
        chosen: ErrorId,
        /// The other baseline identifiers carrying the same message.
        shadowed: Vec<ErrorId>,
        /// The shared message.
        message: String,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageChanged {
                candidate,
                minted,
                message,
            } => write!(
                f,
                "MANUALLY VERIFY: {candidate} renumbered to {minted}. Make sure the message is \
                 genuinely new and not just changed: {message}"
            ),
            Self::Collision {
                id,
                candidate,
                message,
            } => write!(
                f,
                "COLLISION: {candidate} resolved to {id}, which is already assigned; discarded: \
                 {message}"
            ),
            Self::AmbiguousAnchor {
                chosen,
                shadowed,
                message,
            } => {
                write!(f, "AMBIGUOUS: re-anchored to {chosen}, but the message is also held by ")?;
                for (i, id) in shadowed.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{id}")?;
                }
                write!(f, ": {message}")
            }
        }
    }
}

/// How many candidate statements fell into each resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Identifier and message both matched the baseline.
    pub exact: usize,
    /// Moved onto the baseline identifier carrying the same message.
    pub re_anchored: usize,
    /// Received a freshly minted identifier.
    pub minted: usize,
    /// Discarded because the resolved identifier was already taken.
    pub collisions: usize,
}

/// The whole-run rejection raised by [`Reconciliation::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The reconciled set does not hold one record per candidate record.
    #[error(
        "reconciliation lost records: expected {expected} identifiers but produced {actual}"
    )]
    CardinalityMismatch {
        /// The number of candidate records.
        expected: usize,
        /// The number of reconciled records.
        actual: usize,
    },

    /// New statements could not be given an identifier because no suffix is
    /// left above the watermark.
    #[error(
        "identifier space exhausted: {unassigned} new statements have no identifier above \
         {watermark}"
    )]
    IdentifiersExhausted {
        /// The watermark the minter was seeded with.
        watermark: Watermark,
        /// The number of statements left without an identifier.
        unassigned: usize,
    },
}

/// The outcome of a reconciliation run.
///
/// The reconciled set must only be adopted after [`Reconciliation::validate`]
/// succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    requirements: RequirementSet,
    advisories: Vec<Advisory>,
    summary: Summary,
    watermark: Watermark,
    expected: usize,
    unassigned: usize,
    seed: Watermark,
}

impl Reconciliation {
    /// The reconciled identifiers, in candidate order.
    #[must_use]
    pub const fn requirements(&self) -> &RequirementSet {
        &self.requirements
    }

    /// Findings that need human review, in the order they were found.
    #[must_use]
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    /// Counts of each resolution.
    #[must_use]
    pub const fn summary(&self) -> Summary {
        self.summary
    }

    /// The highest suffix known after the run, including minted identifiers.
    #[must_use]
    pub const fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// Checks that no record was lost.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::IdentifiersExhausted`] if a new statement
    /// could not be given an identifier, and
    /// [`ReconcileError::CardinalityMismatch`] if the reconciled set does not
    /// hold exactly one record per candidate record. The caller must not adopt
    /// the reconciled set in either case.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.unassigned > 0 {
            return Err(ReconcileError::IdentifiersExhausted {
                watermark: self.seed,
                unassigned: self.unassigned,
            });
        }
        let actual = self.requirements.len();
        if actual == self.expected {
            Ok(())
        } else {
            Err(ReconcileError::CardinalityMismatch {
                expected: self.expected,
                actual,
            })
        }
    }
}

/// Reverse index from message to baseline identifier.
///
/// When several identifiers carry the same message, the last one wins and the
/// others are remembered so the ambiguity can be reported.
struct BaselineIndex<'a> {
    by_message: HashMap<&'a str, &'a ErrorId>,
    shadowed: HashMap<&'a str, Vec<&'a ErrorId>>,
    reported: HashSet<&'a str>,
}

impl<'a> BaselineIndex<'a> {
    fn new(baseline: &'a RequirementSet) -> Self {
        let by_message = baseline.message_index();
        let mut shadowed: HashMap<&str, Vec<&ErrorId>> = HashMap::new();
        for (id, message) in baseline {
            if by_message.get(message.as_str()) != Some(&id) {
                shadowed.entry(message.as_str()).or_default().push(id);
            }
        }
        Self {
            by_message,
            shadowed,
            reported: HashSet::new(),
        }
    }

    /// Looks up the baseline identifier for `message`, recording an advisory
    /// the first time an ambiguous message is used.
    fn anchor_for(&mut self, message: &str, advisories: &mut Vec<Advisory>) -> Option<&'a ErrorId> {
        let (&key, &chosen) = self.by_message.get_key_value(message)?;
        if let Some(shadowed) = self.shadowed.get(key) {
            if self.reported.insert(key) {
                let advisory = Advisory::AmbiguousAnchor {
                    chosen: chosen.clone(),
                    shadowed: shadowed.iter().map(|&id| id.clone()).collect(),
                    message: message.to_string(),
                };
                tracing::warn!("{advisory}");
                advisories.push(advisory);
            }
        }
        Some(chosen)
    }
}

/// Stabilises the identifiers of a freshly extracted `candidate` set against a
/// published `baseline`.
///
/// New identifiers are drawn from `minter`, which is normally seeded from the
/// baseline's watermark (see [`Watermark::minter`]). The result keeps the
/// candidate's order. The function never fails; findings are recorded on the
/// returned [`Reconciliation`], which must be checked with
/// [`Reconciliation::validate`] before use.
#[instrument(level = "debug", skip_all, fields(candidate = candidate.len(), baseline = baseline.len()))]
pub fn reconcile(
    candidate: &RequirementSet,
    baseline: &RequirementSet,
    mut minter: IdMinter,
) -> Reconciliation {
    let mut index = BaselineIndex::new(baseline);
    let mut requirements = RequirementSet::with_capacity(candidate.len());
    let mut advisories = Vec::new();
    let mut summary = Summary::default();
    let mut unassigned = 0;
    let seed = minter.watermark();

    for (candidate_id, message) in candidate {
        let known = baseline.get(candidate_id);
        let resolved = if known == Some(message.as_str()) {
            summary.exact += 1;
            candidate_id.clone()
        } else {
            match index.anchor_for(message, &mut advisories) {
                Some(anchor) => {
                    summary.re_anchored += 1;
                    candidate_id.with_suffix(anchor.suffix())
                }
                None => {
                    let Some(suffix) = minter.mint() else {
                        unassigned += 1;
                        tracing::warn!(
                            candidate = %candidate_id,
                            "no identifier left above the watermark"
                        );
                        continue;
                    };
                    summary.minted += 1;
                    let minted = candidate_id.with_suffix(suffix);
                    // The identifier is published with another message
                    if known.is_some() {
                        let advisory = Advisory::MessageChanged {
                            candidate: candidate_id.clone(),
                            minted: minted.clone(),
                            message: message.clone(),
                        };
                        tracing::warn!("{advisory}");
                        advisories.push(advisory);
                    }
                    minted
                }
            }
        };

        if &resolved != candidate_id {
            tracing::debug!(from = %candidate_id, to = %resolved, "renumbered");
        }

        if let Err(e) = requirements.insert(RequirementRecord::new(resolved, message.clone())) {
            summary.collisions += 1;
            let advisory = Advisory::Collision {
                id: e.rejected.id,
                candidate: candidate_id.clone(),
                message: e.rejected.message,
            };
            tracing::warn!("{advisory}");
            advisories.push(advisory);
        }
    }

    tracing::info!(
        exact = summary.exact,
        re_anchored = summary.re_anchored,
        minted = summary.minted,
        collisions = summary.collisions,
        "reconciled identifiers"
    );

    Reconciliation {
        requirements,
        advisories,
        summary,
        watermark: minter.watermark(),
        expected: candidate.len(),
        unassigned,
        seed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ErrorId {
        s.parse().unwrap()
    }

    fn set(records: &[(&str, &str)]) -> RequirementSet {
        let mut set = RequirementSet::new();
        for (id, message) in records {
            set.insert(RequirementRecord::new(id.parse().unwrap(), (*message).to_string()))
                .unwrap();
        }
        set
    }

    fn run(candidate: &RequirementSet, baseline: &RequirementSet) -> Reconciliation {
        reconcile(candidate, baseline, baseline.watermark().minter())
    }

    fn pairs(set: &RequirementSet) -> Vec<(String, &str)> {
        set.iter().map(|(id, message)| (id.to_string(), message)).collect()
    }

    #[test]
    fn reconciling_against_itself_is_identity() {
        let candidate = set(&[
            ("VALIDATION_ERROR_0", "a"),
            ("VALIDATION_ERROR_1", "b"),
            ("VALIDATION_ERROR_2", "c"),
        ]);

        let outcome = run(&candidate, &candidate);

        assert_eq!(outcome.requirements(), &candidate);
        assert!(outcome.advisories().is_empty());
        assert_eq!(outcome.summary().exact, 3);
        outcome.validate().unwrap();
    }

    #[test]
    fn new_statement_is_minted_above_watermark() {
        let baseline = set(&[("VALIDATION_ERROR_0", "must be valid")]);
        let candidate = set(&[
            ("VALIDATION_ERROR_0", "must be valid"),
            ("VALIDATION_ERROR_1", "must not be null"),
        ]);

        let outcome = run(&candidate, &baseline);

        assert_eq!(outcome.requirements(), &candidate);
        assert_eq!(outcome.watermark().value(), 1);
        assert!(outcome.advisories().is_empty());
        assert_eq!(
            outcome.summary(),
            Summary {
                exact: 1,
                minted: 1,
                ..Summary::default()
            }
        );
    }

    #[test]
    fn moved_statement_is_re_anchored_to_original_id() {
        let baseline = set(&[("VALIDATION_ERROR_5", "X")]);
        let candidate = set(&[("VALIDATION_ERROR_0", "X")]);

        let outcome = run(&candidate, &baseline);

        assert_eq!(pairs(outcome.requirements()), vec![("VALIDATION_ERROR_5".to_string(), "X")]);
        assert_eq!(outcome.summary().re_anchored, 1);
        assert!(outcome.advisories().is_empty());
    }

    #[test]
    fn changed_message_under_known_id_is_minted_and_flagged() {
        let baseline = set(&[("VALIDATION_ERROR_0", "X")]);
        let candidate = set(&[("VALIDATION_ERROR_0", "Y")]);

        let outcome = run(&candidate, &baseline);

        assert_eq!(pairs(outcome.requirements()), vec![("VALIDATION_ERROR_1".to_string(), "Y")]);
        assert_eq!(
            outcome.advisories(),
            &[Advisory::MessageChanged {
                candidate: id("VALIDATION_ERROR_0"),
                minted: id("VALIDATION_ERROR_1"),
                message: "Y".to_string(),
            }]
        );
        assert!(!outcome.requirements().contains(&id("VALIDATION_ERROR_0")));
    }

    #[test]
    fn known_id_with_message_elsewhere_is_re_anchored() {
        let baseline = set(&[("VALIDATION_ERROR_0", "first"), ("VALIDATION_ERROR_1", "second")]);
        // "first" was removed from the document, so everything shifted down.
        let candidate = set(&[("VALIDATION_ERROR_0", "second")]);

        let outcome = run(&candidate, &baseline);

        assert_eq!(
            pairs(outcome.requirements()),
            vec![("VALIDATION_ERROR_1".to_string(), "second")]
        );
        assert!(outcome.advisories().is_empty());
    }

    #[test]
    fn unchanged_statements_keep_ids_when_shifted() {
        let baseline = set(&[
            ("VALIDATION_ERROR_0", "a"),
            ("VALIDATION_ERROR_1", "b"),
            ("VALIDATION_ERROR_2", "c"),
        ]);
        // A new statement was inserted at the top of the document.
        let candidate = set(&[
            ("VALIDATION_ERROR_0", "new"),
            ("VALIDATION_ERROR_1", "a"),
            ("VALIDATION_ERROR_2", "b"),
            ("VALIDATION_ERROR_3", "c"),
        ]);

        let outcome = run(&candidate, &baseline);

        assert_eq!(
            pairs(outcome.requirements()),
            vec![
                ("VALIDATION_ERROR_3".to_string(), "new"),
                ("VALIDATION_ERROR_0".to_string(), "a"),
                ("VALIDATION_ERROR_1".to_string(), "b"),
                ("VALIDATION_ERROR_2".to_string(), "c"),
            ]
        );
        assert_eq!(
            outcome.advisories(),
            &[Advisory::MessageChanged {
                candidate: id("VALIDATION_ERROR_0"),
                minted: id("VALIDATION_ERROR_3"),
                message: "new".to_string(),
            }]
        );
        outcome.validate().unwrap();
    }

    #[test]
    fn minted_ids_are_strictly_increasing_and_unique() {
        let baseline = set(&[("VALIDATION_ERROR_10", "old")]);
        let candidate = set(&[
            ("VALIDATION_ERROR_0", "n0"),
            ("VALIDATION_ERROR_1", "n1"),
            ("VALIDATION_ERROR_2", "n2"),
        ]);

        let outcome = run(&candidate, &baseline);

        let suffixes: Vec<_> = outcome.requirements().ids().map(ErrorId::suffix).collect();
        assert_eq!(suffixes, vec![11, 12, 13]);
        assert_eq!(outcome.watermark().value(), 13);
    }

    #[test]
    fn minting_continues_from_a_supplied_minter() {
        let baseline = set(&[("VALIDATION_ERROR_0", "old")]);
        let candidate = set(&[("VALIDATION_ERROR_0", "new")]);

        let outcome = reconcile(&candidate, &baseline, Watermark::new(100).minter());

        assert_eq!(
            pairs(outcome.requirements()),
            vec![("VALIDATION_ERROR_101".to_string(), "new")]
        );
    }

    #[test]
    fn collision_keeps_first_entry_and_fails_validation() {
        // The baseline itself carries a duplicated message, so two candidates
        // can resolve onto the same identifier.
        let baseline = set(&[("VALIDATION_ERROR_0", "dup"), ("VALIDATION_ERROR_1", "dup")]);
        let candidate = set(&[("VALIDATION_ERROR_1", "dup"), ("VALIDATION_ERROR_7", "dup")]);

        let outcome = run(&candidate, &baseline);

        assert_eq!(
            pairs(outcome.requirements()),
            vec![("VALIDATION_ERROR_1".to_string(), "dup")]
        );
        assert!(outcome.advisories().contains(&Advisory::Collision {
            id: id("VALIDATION_ERROR_1"),
            candidate: id("VALIDATION_ERROR_7"),
            message: "dup".to_string(),
        }));
        assert_eq!(outcome.summary().collisions, 1);
        assert_eq!(
            outcome.validate(),
            Err(ReconcileError::CardinalityMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn duplicate_baseline_messages_use_last_writer_and_are_reported_once() {
        let baseline = set(&[
            ("VALIDATION_ERROR_3", "dup"),
            ("VALIDATION_ERROR_8", "dup"),
            ("VALIDATION_ERROR_9", "other"),
        ]);
        let candidate = set(&[("VALIDATION_ERROR_0", "dup"), ("VALIDATION_ERROR_1", "other")]);

        let outcome = run(&candidate, &baseline);

        assert_eq!(
            pairs(outcome.requirements()),
            vec![
                ("VALIDATION_ERROR_8".to_string(), "dup"),
                ("VALIDATION_ERROR_9".to_string(), "other"),
            ]
        );
        assert_eq!(
            outcome.advisories(),
            &[Advisory::AmbiguousAnchor {
                chosen: id("VALIDATION_ERROR_8"),
                shadowed: vec![id("VALIDATION_ERROR_3")],
                message: "dup".to_string(),
            }]
        );
    }

    #[test]
    fn resolved_ids_keep_candidate_prefix_tokens() {
        let baseline = set(&[("VALIDATION_ERROR_1_2_4", "kept")]);
        let candidate = set(&[("VALIDATION_ERROR_5_1_0", "kept")]);

        let outcome = run(&candidate, &baseline);

        assert_eq!(
            pairs(outcome.requirements()),
            vec![("VALIDATION_ERROR_5_1_4".to_string(), "kept")]
        );
    }

    #[test]
    fn exhausted_identifier_space_rejects_the_run() {
        let baseline = set(&[("VALIDATION_ERROR_18446744073709551615", "A")]);
        let candidate = set(&[("VALIDATION_ERROR_0", "B")]);

        let outcome = run(&candidate, &baseline);

        assert!(
            !outcome
                .requirements()
                .contains(&id("VALIDATION_ERROR_18446744073709551615"))
        );
        assert_eq!(outcome.summary().minted, 0);
        assert_eq!(
            outcome.validate(),
            Err(ReconcileError::IdentifiersExhausted {
                watermark: Watermark::new(u64::MAX),
                unassigned: 1,
            })
        );
    }

    #[test]
    fn known_statements_reconcile_at_maximum_watermark() {
        let baseline = set(&[("VALIDATION_ERROR_18446744073709551615", "A")]);
        let candidate = set(&[("VALIDATION_ERROR_0", "A")]);

        let outcome = run(&candidate, &baseline);

        assert_eq!(outcome.requirements(), &baseline);
        outcome.validate().unwrap();
    }

    #[test]
    fn empty_baseline_mints_from_one() {
        let candidate = set(&[("VALIDATION_ERROR_0", "a"), ("VALIDATION_ERROR_1", "b")]);

        let outcome = run(&candidate, &RequirementSet::new());

        let suffixes: Vec<_> = outcome.requirements().ids().map(ErrorId::suffix).collect();
        assert_eq!(suffixes, vec![1, 2]);
    }

    #[test]
    fn advisories_render_for_humans() {
        let advisory = Advisory::MessageChanged {
            candidate: id("VALIDATION_ERROR_0"),
            minted: id("VALIDATION_ERROR_4"),
            message: "Y".to_string(),
        };
        assert!(advisory.to_string().starts_with(
            "MANUALLY VERIFY: VALIDATION_ERROR_0 renumbered to VALIDATION_ERROR_4."
        ));

        let advisory = Advisory::AmbiguousAnchor {
            chosen: id("VALIDATION_ERROR_2"),
            shadowed: vec![id("VALIDATION_ERROR_0"), id("VALIDATION_ERROR_1")],
            message: "m".to_string(),
        };
        assert_eq!(
            advisory.to_string(),
            "AMBIGUOUS: re-anchored to VALIDATION_ERROR_2, but the message is also held by \
             VALIDATION_ERROR_0, VALIDATION_ERROR_1: m"
        );
    }

    #[test]
    fn advisories_serialize_with_kind_tag() {
        let advisory = Advisory::Collision {
            id: id("VALIDATION_ERROR_1"),
            candidate: id("VALIDATION_ERROR_2"),
            message: "m".to_string(),
        };
        let json = serde_json::to_value(&advisory).unwrap();
        assert_eq!(json["kind"], "collision");
        assert_eq!(json["id"], "VALIDATION_ERROR_1");
    }
}
