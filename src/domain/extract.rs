//! The extraction pass.
//!
//! The [`extract`] function walks a document tree once, in document order, and
//! numbers every "Valid Usage" list item it finds. The numbering is naive: it
//! depends only on traversal order, and it is the job of
//! [`reconcile`](crate::domain::reconcile()) to stabilise it across revisions.
//!
//! The tree itself comes from a collaborator through the [`DocumentNode`]
//! trait, so the pass knows nothing about how the document was parsed.

use thiserror::Error;
use tracing::instrument;

use crate::domain::{Config, ErrorId, IdPrefix, RequirementRecord, RequirementSet};

/// The label that opens a block of normative statements.
pub const MARKER_LABEL: &str = "Valid Usage";

/// A read-only view of one node in a document tree.
///
/// Element nodes have a tag; text nodes do not.
pub trait DocumentNode: Sized {
    /// The local tag name of an element, or `None` for non-element nodes.
    fn tag(&self) -> Option<&str>;

    /// The value of the named attribute, if present.
    fn attribute(&self, name: &str) -> Option<&str>;

    /// The direct children of this node, in document order.
    fn children(&self) -> impl Iterator<Item = Self>;

    /// The concatenated text of every descendant text node, in document
    /// order.
    fn text(&self) -> String;

    /// Returns `true` if this is an element with the given tag.
    fn is(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    /// Returns `true` if the `class` attribute is exactly `class`.
    fn has_class(&self, class: &str) -> bool {
        self.attribute("class") == Some(class)
    }

    /// The first child that is an element.
    fn first_element_child(&self) -> Option<Self> {
        self.children().find(|child| child.tag().is_some())
    }
}

/// Structural faults found while walking the document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// A section title has no child element carrying an `id`.
    #[error("section heading '{heading}' has no anchor")]
    MissingAnchor {
        /// The text of the offending heading.
        heading: String,
    },
}

/// What a visited node means to the extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    SectionTitle,
    Anchor,
    Marker,
    ListItem,
    Other,
}

impl NodeKind {
    fn classify<N: DocumentNode>(node: &N, in_sidebar: bool) -> Self {
        match node.tag() {
            Some("h2") if node.has_class("title") => Self::SectionTitle,
            Some("a") if node.attribute("id").is_some() => Self::Anchor,
            Some("strong") if in_sidebar => Self::Marker,
            Some("li") if in_sidebar => Self::ListItem,
            _ => Self::Other,
        }
    }
}

/// A snapshot of the traversal state.
///
/// Every visited node produces a new snapshot from the previous one. Heading
/// and anchor are sticky: they stay in effect until a later node replaces
/// them. `in_block` reflects the most recent marker, not nesting depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ScanState {
    heading: String,
    anchor: String,
    in_block: bool,
}

impl ScanState {
    fn with_heading(self, heading: String, anchor: String) -> Self {
        Self {
            heading,
            anchor,
            ..self
        }
    }

    fn with_anchor(self, anchor: String) -> Self {
        Self { anchor, ..self }
    }

    fn with_marker(self, in_block: bool) -> Self {
        Self { in_block, ..self }
    }
}

struct Frame<N> {
    node: N,
    in_sidebar: bool,
}

/// Renders messages and numbers records.
struct Emitter<'a> {
    config: &'a Config,
    prefix: &'a IdPrefix,
    next: u64,
}

impl Emitter<'_> {
    fn emit<N: DocumentNode>(&mut self, item: &N, state: &ScanState) -> RequirementRecord {
        let text = item.text().replace('\n', "");
        let message = format!(
            "{} '{}' which states '{}' ({}#{})",
            self.config.message_prefix(),
            state.heading,
            text,
            self.config.spec_url(),
            state.anchor
        );

        let id = ErrorId::new(self.prefix.clone(), self.next);
        self.next += 1;

        RequirementRecord::new(id, ascii_only(&message))
    }
}

/// Walks `root` in document order and returns one record per "Valid Usage"
/// list item, numbered from zero.
///
/// # Errors
///
/// Returns [`ExtractError::MissingAnchor`] if a section title has no anchor.
/// No partial result is returned.
#[instrument(level = "debug", skip_all)]
pub fn extract<N: DocumentNode>(root: N, config: &Config) -> Result<RequirementSet, ExtractError> {
    let mut requirements = RequirementSet::new();
    let mut emitter = Emitter {
        config,
        prefix: config.id_prefix(),
        next: 0,
    };
    let mut state = ScanState::default();
    let mut stack = vec![Frame {
        node: root,
        in_sidebar: false,
    }];

    while let Some(Frame { node, in_sidebar }) = stack.pop() {
        state = match NodeKind::classify(&node, in_sidebar) {
            NodeKind::SectionTitle => {
                let heading = format_heading(&ascii_only(&node.text()));
                let anchor = node
                    .first_element_child()
                    .and_then(|child| child.attribute("id").map(str::to_string))
                    .ok_or_else(|| ExtractError::MissingAnchor {
                        heading: heading.clone(),
                    })?;
                tracing::trace!(%heading, %anchor, "entering section");
                state.with_heading(heading, anchor)
            }
            NodeKind::Anchor => {
                let anchor = node.attribute("id").unwrap_or_default().to_string();
                state.with_anchor(anchor)
            }
            NodeKind::Marker => {
                let in_block = node.text().contains(MARKER_LABEL);
                state.with_marker(in_block)
            }
            NodeKind::ListItem if state.in_block => {
                let record = emitter.emit(&node, &state);
                tracing::trace!(id = %record.id, "extracted");
                let inserted = requirements.insert(record);
                debug_assert!(inserted.is_ok(), "extracted identifiers are sequential");
                state
            }
            NodeKind::ListItem | NodeKind::Other => state,
        };

        let in_sidebar = in_sidebar || (node.is("div") && node.has_class("sidebar"));
        let children: Vec<N> = node.children().collect();
        stack.extend(
            children
                .into_iter()
                .rev()
                .map(|node| Frame { node, in_sidebar }),
        );
    }

    tracing::info!(count = requirements.len(), "extracted valid usage statements");
    Ok(requirements)
}

/// Inserts a space after the last period of a section heading.
///
/// Headings render as `"12.Title"` in the source document. Only the last period
/// is considered, so `"1.2.3 Title"` becomes `"1.2. 3 Title"`; identifiers
/// already published embed this exact text.
fn format_heading(heading: &str) -> String {
    match heading.rsplit_once('.') {
        Some((number, title)) => format!("{number}. {title}"),
        None => heading.to_string(),
    }
}

/// Drops every non-ASCII character.
fn ascii_only(s: &str) -> String {
    s.chars().filter(char::is_ascii).collect()
}
