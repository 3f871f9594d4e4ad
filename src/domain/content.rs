//! Content Model: the static, read-only description of the essay.
//!
//! ## Sources (priority order):
//!   1. A content TOML named by `general.content` in config.toml
//!   2. The built-in essay embedded at compile time (`content/essay.toml`)
//!
//! ## Shape
//!   ```text
//!   [landing]            title page copy, authors, background
//!   [[pathways]]         exactly 3 `nodes` + optional `reform`
//!   [destination]        the single terminal node
//!   ```
//!
//! Node roles are positional: a pathway's nodes are always
//! Starting, Bottleneck, Impact in that order. Roles are assigned once at
//! load and never change afterwards.

use std::path::Path;

use serde::Deserialize;

use crate::domain::evidence::{Evidence, EvidenceSection};
use crate::error::ContentError;

const EMBEDDED_ESSAY: &str = include_str!("../../content/essay.toml");
const EMBEDDED_ORIGIN: &str = "<embedded essay>";

pub const DEFAULT_EVIDENCE_LABEL: &str = "See the evidence →";

/// Rendering category of a node. Determines colors and labels.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Starting,
    Bottleneck,
    Impact,
    Reform,
    Destination,
}

impl NodeKind {
    /// Role of the n-th node inside a pathway.
    pub fn for_position(index: usize) -> NodeKind {
        match index {
            0 => NodeKind::Starting,
            1 => NodeKind::Bottleneck,
            _ => NodeKind::Impact,
        }
    }

    pub fn legend(self) -> &'static str {
        match self {
            NodeKind::Starting => "Starting Condition",
            NodeKind::Bottleneck => "Bottleneck",
            NodeKind::Impact => "Impact by Default",
            NodeKind::Reform => "Impact with Reform",
            NodeKind::Destination => "Outcome",
        }
    }
}

/// Stable address of a node inside the content tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NodeRef {
    Step { pathway: usize, node: usize },
    Reform { pathway: usize },
    Destination,
}

impl NodeRef {
    pub fn pathway(self) -> Option<usize> {
        match self {
            NodeRef::Step { pathway, .. } | NodeRef::Reform { pathway } => Some(pathway),
            NodeRef::Destination => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub explanation: Vec<String>,
    /// CTA text for the flat evidence list.
    #[serde(default)]
    pub evidence_label: Option<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    /// When present, replaces `evidence` entirely.
    #[serde(default)]
    pub evidence_sections: Option<Vec<EvidenceSection>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Pathway {
    pub id: String,
    /// Bottleneck name, e.g. "Regulatory Barriers".
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: [Node; 3],
    #[serde(default)]
    pub reform: Option<Node>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub affiliation: String,
    #[serde(default)]
    pub handle: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Factor {
    pub title: String,
    pub body: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Stat {
    pub group: String,
    pub value: String,
    pub caption: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Background {
    #[serde(default)]
    pub toggle: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub factors: Vec<Factor>,
    #[serde(default)]
    pub stats: Vec<Stat>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Landing {
    #[serde(default)]
    pub kicker: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub claim: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub cta: String,
    #[serde(default)]
    pub background: Option<Background>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub landing: Landing,
    pub pathways: Vec<Pathway>,
    pub destination: Node,
}

// ── Loading ──

impl Content {
    /// The essay compiled into the binary.
    pub fn embedded() -> Result<Content, ContentError> {
        Content::from_toml_str(EMBEDDED_ESSAY, Path::new(EMBEDDED_ORIGIN))
    }

    /// Read and parse a content file.
    pub fn load(path: &Path) -> Result<Content, ContentError> {
        let text = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Content::from_toml_str(&text, path)
    }

    /// Parse content text. `origin` is only used for error messages.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Content, ContentError> {
        let mut content: Content = toml::from_str(text).map_err(|source| ContentError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        if content.pathways.is_empty() {
            return Err(ContentError::Empty);
        }
        content.assign_roles();
        Ok(content)
    }

    /// Load `path` if given, falling back to the embedded essay when the
    /// external file is unusable.
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Content, ContentError> {
        if let Some(path) = path {
            match Content::load(path) {
                Ok(content) => {
                    log::info!(
                        "loaded {} pathways from {}",
                        content.pathways.len(),
                        path.display()
                    );
                    return Ok(content);
                }
                Err(e) => log::warn!("{e}; using the built-in essay"),
            }
        }
        Content::embedded()
    }

    fn assign_roles(&mut self) {
        for pathway in &mut self.pathways {
            for (i, node) in pathway.nodes.iter_mut().enumerate() {
                node.kind = NodeKind::for_position(i);
            }
            if let Some(reform) = pathway.reform.as_mut() {
                reform.kind = NodeKind::Reform;
            }
        }
        self.destination.kind = NodeKind::Destination;
    }
}

// ── Queries ──

impl Content {
    pub fn pathway_count(&self) -> usize {
        self.pathways.len()
    }

    pub fn node(&self, node: NodeRef) -> Option<&Node> {
        match node {
            NodeRef::Step { pathway, node } => self.pathways.get(pathway)?.nodes.get(node),
            NodeRef::Reform { pathway } => self.pathways.get(pathway)?.reform.as_ref(),
            NodeRef::Destination => Some(&self.destination),
        }
    }

    pub fn has_reform(&self, pathway: usize) -> bool {
        self.pathways
            .get(pathway)
            .map_or(false, |p| p.reform.is_some())
    }

    /// "Bottleneck #n: Name" header used above rows and on mobile.
    pub fn pathway_label(&self, pathway: usize) -> String {
        match self.pathways.get(pathway) {
            Some(p) if !p.name.is_empty() => format!("Bottleneck #{}: {}", pathway + 1, p.name),
            _ => format!("Bottleneck #{}", pathway + 1),
        }
    }

    /// Find a node by its authored id.
    pub fn find(&self, id: &str) -> Option<NodeRef> {
        for (p, pathway) in self.pathways.iter().enumerate() {
            if let Some(n) = pathway.nodes.iter().position(|n| n.id == id) {
                return Some(NodeRef::Step { pathway: p, node: n });
            }
            if pathway.reform.as_ref().map_or(false, |r| r.id == id) {
                return Some(NodeRef::Reform { pathway: p });
            }
        }
        (self.destination.id == id).then_some(NodeRef::Destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_essay_parses_with_positional_roles() {
        let content = Content::embedded().expect("embedded essay must parse");
        assert_eq!(content.pathway_count(), 3);
        for pathway in &content.pathways {
            assert_eq!(pathway.nodes[0].kind, NodeKind::Starting);
            assert_eq!(pathway.nodes[1].kind, NodeKind::Bottleneck);
            assert_eq!(pathway.nodes[2].kind, NodeKind::Impact);
            assert_eq!(pathway.reform.as_ref().map(|r| r.kind), Some(NodeKind::Reform));
        }
        assert_eq!(content.destination.kind, NodeKind::Destination);
    }

    #[test]
    fn pathway_with_wrong_node_count_is_a_parse_error() {
        let text = r#"
[[pathways]]
id = "p"
name = "Only Two"
[[pathways.nodes]]
id = "a"
title = "A"
[[pathways.nodes]]
id = "b"
title = "B"

[destination]
id = "end"
title = "End"
"#;
        let err = Content::from_toml_str(text, Path::new("two.toml")).unwrap_err();
        assert!(matches!(err, ContentError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn empty_pathway_list_is_rejected() {
        let text = r#"
pathways = []
[destination]
id = "end"
title = "End"
"#;
        let err = Content::from_toml_str(text, Path::new("empty.toml")).unwrap_err();
        assert!(matches!(err, ContentError::Empty));
    }

    #[test]
    fn find_resolves_authored_ids() {
        let content = Content::embedded().unwrap();
        let first = &content.pathways[1].nodes[2].id;
        assert_eq!(
            content.find(first),
            Some(NodeRef::Step { pathway: 1, node: 2 })
        );
        assert_eq!(content.find(&content.destination.id), Some(NodeRef::Destination));
        assert_eq!(content.find("no-such-node"), None);
    }

    #[test]
    fn missing_external_file_falls_back_to_embedded() {
        let content =
            Content::load_or_embedded(Some(Path::new("/nonexistent/essay.toml"))).unwrap();
        assert_eq!(content.pathway_count(), 3);
    }
}
