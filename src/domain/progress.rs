//! Reveal/Progress Engine.
//!
//! One integer, `count` ∈ [1, TOTAL_ELEMENTS], is the entire journey state.
//! Everything else is derived from it with pure queries.
//!
//! ## Slot layout
//!
//! Each pathway owns `ELEMENTS_PER_PATHWAY` consecutive steps:
//!   ```text
//!   count:   1    2    3    4      5    6    7    8      …   4P+1
//!   slot:    S0   B0   I0   R0     S1   B1   I1   R1     …   Destination
//!   ```
//! S/B/I = Starting/Bottleneck/Impact node, R = reform slot.
//!
//! ## Per-pathway derivation
//! ┌─────────────────────────┬──────────────┬───────────────────┐
//! │ progress = count − 4p    │ node_count   │ show_reform_branch │
//! ├─────────────────────────┼──────────────┼───────────────────┤
//! │ ≤ 0                      │ 0            │ false              │
//! │ 1, 2                     │ progress     │ false              │
//! │ 3                        │ 3            │ true (slot open)   │
//! │ ≥ 4                      │ 3            │ true (slot used)   │
//! └─────────────────────────┴──────────────┴───────────────────┘
//!
//! All mutators clamp; none of them fail.

use crate::domain::content::NodeRef;

pub const NODES_PER_PATHWAY: usize = 3;
pub const ELEMENTS_PER_PATHWAY: usize = NODES_PER_PATHWAY + 1;

/// Index of the reform slot inside a pathway's run.
const REFORM_SLOT: usize = NODES_PER_PATHWAY;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PathwayState {
    pub node_count: usize,
    pub show_reform_branch: bool,
}

/// The element a given step reveals.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Element {
    Node { pathway: usize, node: usize },
    Reform { pathway: usize },
    Destination,
}

impl Element {
    pub fn node_ref(self) -> NodeRef {
        match self {
            Element::Node { pathway, node } => NodeRef::Step { pathway, node },
            Element::Reform { pathway } => NodeRef::Reform { pathway },
            Element::Destination => NodeRef::Destination,
        }
    }

    pub fn pathway(self) -> Option<usize> {
        match self {
            Element::Node { pathway, .. } | Element::Reform { pathway } => Some(pathway),
            Element::Destination => None,
        }
    }
}

pub fn total_elements(pathways: usize) -> usize {
    pathways * ELEMENTS_PER_PATHWAY + 1
}

/// Element revealed by step `count` (1-based) in a journey of `pathways`.
/// Counts past the end map to the destination.
pub fn element_at(count: usize, pathways: usize) -> Element {
    let index = count.saturating_sub(1);
    let pathway = index / ELEMENTS_PER_PATHWAY;
    if pathway >= pathways {
        return Element::Destination;
    }
    match index % ELEMENTS_PER_PATHWAY {
        REFORM_SLOT => Element::Reform { pathway },
        node => Element::Node { pathway, node },
    }
}

/// Step (1-based count) at which `element` is revealed.
pub fn count_of(element: Element, pathways: usize) -> usize {
    match element {
        Element::Node { pathway, node } => pathway * ELEMENTS_PER_PATHWAY + node + 1,
        Element::Reform { pathway } => pathway * ELEMENTS_PER_PATHWAY + REFORM_SLOT + 1,
        Element::Destination => total_elements(pathways),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    count: usize,
    pathways: usize,
}

impl Progress {
    pub fn new(pathways: usize) -> Self {
        Progress { count: 1, pathways }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn pathways(&self) -> usize {
        self.pathways
    }

    pub fn total(&self) -> usize {
        total_elements(self.pathways)
    }

    pub fn pathway_state(&self, pathway: usize) -> PathwayState {
        let start = pathway * ELEMENTS_PER_PATHWAY;
        if pathway >= self.pathways || self.count <= start {
            return PathwayState::default();
        }
        let progress = self.count - start;
        PathwayState {
            node_count: progress.min(NODES_PER_PATHWAY),
            show_reform_branch: progress >= NODES_PER_PATHWAY,
        }
    }

    /// Row currently being revealed; equals `pathways()` once complete.
    pub fn active_pathway_index(&self) -> usize {
        ((self.count - 1) / ELEMENTS_PER_PATHWAY).min(self.pathways)
    }

    pub fn is_complete(&self) -> bool {
        self.count >= self.total()
    }

    /// True once the reform step of `pathway` has been taken.
    pub fn reform_slot_consumed(&self, pathway: usize) -> bool {
        pathway < self.pathways && self.count > pathway * ELEMENTS_PER_PATHWAY + REFORM_SLOT
    }

    /// True when the next Continue would take the reform step of the
    /// active pathway.
    pub fn at_reform_slot(&self) -> bool {
        let active = self.active_pathway_index();
        !self.is_complete()
            && self.pathway_state(active).show_reform_branch
            && !self.reform_slot_consumed(active)
    }

    /// The element revealed by the most recent step.
    pub fn latest(&self) -> Element {
        element_at(self.count, self.pathways)
    }

    pub fn is_visible(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Step { pathway, node } => self.pathway_state(pathway).node_count > node,
            NodeRef::Reform { pathway } => self.pathway_state(pathway).show_reform_branch,
            NodeRef::Destination => self.is_complete(),
        }
    }

    /// Fraction of the journey shown, for progress bars.
    pub fn fraction(&self) -> f32 {
        self.count as f32 / self.total() as f32
    }

    // ── Mutators (clamped) ──

    /// Step forward by one. Returns false at the end.
    pub fn advance(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }
        self.count += 1;
        true
    }

    /// Step back by one. Returns false at the start.
    pub fn retreat(&mut self) -> bool {
        if self.count <= 1 {
            return false;
        }
        self.count -= 1;
        true
    }

    pub fn reset(&mut self) {
        self.count = 1;
    }

    /// Set the count directly, clamped into range. Returns the stored value.
    pub fn set(&mut self, count: usize) -> usize {
        self.count = count.clamp(1, self.total());
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn totals_for_three_pathways() {
        let p = Progress::new(3);
        assert_eq!(p.total(), 13);
        assert_eq!(p.count(), 1);
        assert_eq!(p.active_pathway_index(), 0);
        assert!(!p.is_complete());
    }

    #[test]
    fn pathway_state_follows_the_table() {
        let mut p = Progress::new(3);
        let expect = [
            (1, 1, false),
            (2, 2, false),
            (3, 3, true),
            (4, 3, true),
            (5, 3, true),
        ];
        for (count, nodes, branch) in expect {
            p.set(count);
            assert_eq!(
                p.pathway_state(0),
                PathwayState { node_count: nodes, show_reform_branch: branch },
                "count = {count}"
            );
        }
        p.set(4);
        assert_eq!(p.pathway_state(1), PathwayState::default());
        p.set(5);
        assert_eq!(p.pathway_state(1).node_count, 1);
    }

    #[test]
    fn slot_layout_maps_both_ways() {
        let pathways = 3;
        for count in 1..=total_elements(pathways) {
            let element = element_at(count, pathways);
            assert_eq!(count_of(element, pathways), count);
        }
        assert_eq!(element_at(4, 3), Element::Reform { pathway: 0 });
        assert_eq!(element_at(9, 3), Element::Node { pathway: 2, node: 0 });
        assert_eq!(element_at(13, 3), Element::Destination);
    }

    #[test]
    fn mutators_clamp_at_both_ends() {
        let mut p = Progress::new(2);
        assert!(!p.retreat());
        assert_eq!(p.count(), 1);
        assert_eq!(p.set(0), 1);
        assert_eq!(p.set(99), 9);
        assert!(p.is_complete());
        assert!(!p.advance());
        assert_eq!(p.count(), 9);
        assert_eq!(p.active_pathway_index(), 2);
    }

    #[test]
    fn reform_slot_is_open_only_at_the_impact_step() {
        let mut p = Progress::new(3);
        p.set(3);
        assert!(p.at_reform_slot());
        p.set(4);
        assert!(!p.at_reform_slot());
        assert!(p.reform_slot_consumed(0));
        p.set(2);
        assert!(!p.at_reform_slot());
    }

    #[test]
    fn visibility_tracks_count() {
        let mut p = Progress::new(3);
        p.set(6);
        assert!(p.is_visible(NodeRef::Step { pathway: 1, node: 1 }));
        assert!(!p.is_visible(NodeRef::Step { pathway: 1, node: 2 }));
        assert!(p.is_visible(NodeRef::Reform { pathway: 0 }));
        assert!(!p.is_visible(NodeRef::Reform { pathway: 1 }));
        assert!(!p.is_visible(NodeRef::Destination));
    }

    #[test]
    fn empty_journey_is_complete_immediately() {
        let p = Progress::new(0);
        assert_eq!(p.total(), 1);
        assert!(p.is_complete());
        assert_eq!(p.active_pathway_index(), 0);
    }
}
