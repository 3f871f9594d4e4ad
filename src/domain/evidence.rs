//! Evidence items, sections and display numbering.
//!
//! A node carries either a flat evidence list or named sections, each with
//! its own list. Sections win when both are authored.
//!
//! Numbering counts only plain items, in document order:
//!   ┌──────────────────────────┬──────────┐
//!   │ Item                      │ Number?  │
//!   ├──────────────────────────┼──────────┤
//!   │ kind = context            │ no       │
//!   │ label present / labeled   │ no       │
//!   │ otherwise                 │ 1, 2, …  │
//!   └──────────────────────────┴──────────┘
//! The sequence restarts for every list that is displayed and is never
//! stored on the content.

use serde::Deserialize;

use crate::domain::content::{Node, DEFAULT_EVIDENCE_LABEL};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Numbered,
    Labeled,
    Context,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Evidence {
    pub quote: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: Option<EvidenceKind>,
}

impl Evidence {
    pub fn is_numbered(&self) -> bool {
        !matches!(self.kind, Some(EvidenceKind::Context) | Some(EvidenceKind::Labeled))
            && self.label.is_none()
    }

    pub fn is_context(&self) -> bool {
        self.kind == Some(EvidenceKind::Context)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EvidenceSection {
    /// CTA text shown inside the expanded node.
    pub label: String,
    /// Heading of the evidence modal.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

/// One opening affordance for evidence on a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvidenceCta {
    pub label: String,
    /// `None` for a node's flat list.
    pub section: Option<usize>,
}

/// Display numbers for a list: `Some(n)` for plain items, `None` otherwise.
pub fn number_items(items: &[Evidence]) -> Vec<Option<usize>> {
    let mut next = 0;
    items
        .iter()
        .map(|item| {
            if item.is_numbered() {
                next += 1;
                Some(next)
            } else {
                None
            }
        })
        .collect()
}

/// The CTAs a node exposes. Empty when there is nothing to show.
pub fn ctas(node: &Node) -> Vec<EvidenceCta> {
    if let Some(sections) = &node.evidence_sections {
        return sections
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.evidence.is_empty())
            .map(|(i, s)| EvidenceCta {
                label: s.label.clone(),
                section: Some(i),
            })
            .collect();
    }
    if node.evidence.is_empty() {
        return Vec::new();
    }
    vec![EvidenceCta {
        label: node
            .evidence_label
            .clone()
            .unwrap_or_else(|| DEFAULT_EVIDENCE_LABEL.to_string()),
        section: None,
    }]
}

/// The list an evidence modal shows, with its heading.
/// A section index on a node without sections (or out of range) yields `None`.
pub fn resolve<'a>(node: &'a Node, section: Option<usize>) -> Option<(Option<&'a str>, &'a [Evidence])> {
    match (&node.evidence_sections, section) {
        (Some(sections), Some(i)) => sections
            .get(i)
            .map(|s| (s.title.as_deref(), s.evidence.as_slice())),
        (Some(sections), None) => sections
            .first()
            .map(|s| (s.title.as_deref(), s.evidence.as_slice())),
        (None, _) if !node.evidence.is_empty() => Some((None, node.evidence.as_slice())),
        (None, _) => None,
    }
}

pub fn has_evidence(node: &Node) -> bool {
    !ctas(node).is_empty()
}
