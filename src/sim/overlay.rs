//! Disclosure/Overlay Coordinator.
//!
//! Two layers, both optional:
//!   ┌──────────┬──────────────────────────────────────────────┐
//!   │ Inline   │ one expanded node (toggle, not a stack)       │
//!   │ Modal    │ one of Evidence / Reform / Overview           │
//!   └──────────┴──────────────────────────────────────────────┘
//! An evidence modal opened from an expanded node leaves the node expanded
//! underneath; the visible state is always the topmost layer.
//!
//! Modals go through a single setter (`open_modal`), which drops the
//! previous modal before the next one acquires anything. Every open layer
//! owns its listener and scroll guards, so closing by any path releases
//! them.

use std::time::{Duration, Instant};

use crate::domain::content::NodeRef;
use crate::sim::listeners::{
    Layer, ListenerGuard, ListenerKind, ListenerRegistry, ScrollGuard, ScrollLock,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Modal {
    Evidence { node: NodeRef, section: Option<usize> },
    /// `show_evidence` is the reform panel's own evidence disclosure.
    Reform { pathway: usize, show_evidence: bool },
    /// Journey overview; `full` is the whole-map variant.
    Overview { full: bool },
}

/// What the reader currently sees on top.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OverlayState {
    Closed,
    NodeExpanded(NodeRef),
    EvidenceOpen { node: NodeRef, section: Option<usize> },
    ReformOpen { pathway: usize },
    OverviewOpen { full: bool },
}

/// A layer that was just closed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Closed {
    Node(NodeRef),
    Modal(Modal),
}

/// Where a pointer press landed, as measured by the presentation layer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClickZone {
    ModalPanel,
    InlinePanel,
    Elsewhere,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ClickOutcome {
    pub closed: Option<Closed>,
    /// The press must not reach the element underneath.
    pub consumed: bool,
}

#[derive(Debug)]
struct Expanded {
    node: NodeRef,
    _escape: ListenerGuard,
    _outside: ListenerGuard,
}

#[derive(Debug)]
struct ActiveModal {
    modal: Modal,
    _escape: ListenerGuard,
    _outside: ListenerGuard,
    _scroll: ScrollGuard,
}

#[derive(Debug)]
pub struct Overlays {
    registry: ListenerRegistry,
    scroll: ScrollLock,
    /// Outside clicks within this window after opening are swallowed.
    click_guard: Duration,
    expanded: Option<Expanded>,
    modal: Option<ActiveModal>,
}

impl Overlays {
    pub fn new(click_guard: Duration) -> Self {
        Overlays {
            registry: ListenerRegistry::new(),
            scroll: ScrollLock::new(),
            click_guard,
            expanded: None,
            modal: None,
        }
    }

    // ── Queries ──

    pub fn state(&self) -> OverlayState {
        if let Some(active) = &self.modal {
            return match active.modal {
                Modal::Evidence { node, section } => OverlayState::EvidenceOpen { node, section },
                Modal::Reform { pathway, .. } => OverlayState::ReformOpen { pathway },
                Modal::Overview { full } => OverlayState::OverviewOpen { full },
            };
        }
        match &self.expanded {
            Some(e) => OverlayState::NodeExpanded(e.node),
            None => OverlayState::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.expanded.is_none() && self.modal.is_none()
    }

    pub fn expanded(&self) -> Option<NodeRef> {
        self.expanded.as_ref().map(|e| e.node)
    }

    pub fn modal(&self) -> Option<Modal> {
        self.modal.as_ref().map(|m| m.modal)
    }

    pub fn reform_pathway(&self) -> Option<usize> {
        match self.modal() {
            Some(Modal::Reform { pathway, .. }) => Some(pathway),
            _ => None,
        }
    }

    pub fn overview_open(&self) -> bool {
        matches!(self.modal(), Some(Modal::Overview { .. }))
    }

    pub fn scroll_locked(&self) -> bool {
        self.scroll.is_locked()
    }

    /// Live global listeners. Zero whenever everything is closed.
    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    // ── Inline layer ──

    /// Toggle `node`'s inline disclosure. Closes any modal either way.
    /// Returns true when the node ends up expanded.
    pub fn toggle_node(&mut self, node: NodeRef, now: Instant) -> bool {
        self.modal = None;
        if self.expanded() == Some(node) {
            self.expanded = None;
            return false;
        }
        self.expanded = None;
        self.expanded = Some(Expanded {
            node,
            _escape: self.registry.register(ListenerKind::Escape, Layer::Inline, now),
            _outside: self.registry.register(
                ListenerKind::OutsideClick,
                Layer::Inline,
                now + self.click_guard,
            ),
        });
        true
    }

    pub fn collapse(&mut self) -> Option<NodeRef> {
        self.expanded.take().map(|e| e.node)
    }

    // ── Modal layer ──

    /// The single modal setter. Returns the modal it replaced, if any.
    pub fn open_modal(&mut self, modal: Modal, now: Instant) -> Option<Modal> {
        let previous = self.modal.take().map(|m| m.modal);
        if matches!(modal, Modal::Reform { .. } | Modal::Overview { .. }) {
            self.expanded = None;
        }
        self.modal = Some(ActiveModal {
            modal,
            _escape: self.registry.register(ListenerKind::Escape, Layer::Modal, now),
            _outside: self.registry.register(
                ListenerKind::OutsideClick,
                Layer::Modal,
                now + self.click_guard,
            ),
            _scroll: self.scroll.acquire(),
        });
        previous
    }

    pub fn close_modal(&mut self) -> Option<Modal> {
        self.modal.take().map(|m| m.modal)
    }

    /// Close both layers. Returns true if anything was open.
    pub fn close_all(&mut self) -> bool {
        let was_open = !self.is_closed();
        self.modal = None;
        self.expanded = None;
        was_open
    }

    /// Flip the reform panel's evidence disclosure. No-op for other modals.
    pub fn toggle_reform_evidence(&mut self) -> bool {
        match self.modal.as_mut().map(|m| &mut m.modal) {
            Some(Modal::Reform { show_evidence, .. }) => {
                *show_evidence = !*show_evidence;
                true
            }
            _ => false,
        }
    }

    /// Close whatever `keep` rejects: used after the progress count moves
    /// so nothing open refers to a node that is no longer visible.
    pub fn retain_visible(&mut self, keep: impl Fn(NodeRef) -> bool) -> Vec<Closed> {
        let mut closed = Vec::new();
        if let Some(node) = self.expanded() {
            if !keep(node) {
                self.expanded = None;
                closed.push(Closed::Node(node));
            }
        }
        let stale = match self.modal() {
            Some(Modal::Evidence { node, .. }) => !keep(node),
            Some(Modal::Reform { pathway, .. }) => !keep(NodeRef::Reform { pathway }),
            _ => false,
        };
        if stale {
            if let Some(m) = self.close_modal() {
                closed.push(Closed::Modal(m));
            }
        }
        closed
    }

    // ── Global listener dispatch ──

    /// Escape closes the topmost layer.
    pub fn dispatch_escape(&mut self, now: Instant) -> Option<Closed> {
        match self.registry.topmost(ListenerKind::Escape, now)? {
            Layer::Modal => self.close_modal().map(Closed::Modal),
            Layer::Inline => self.collapse().map(Closed::Node),
        }
    }

    /// A pointer press. Presses inside the topmost panel pass through to
    /// its controls; presses outside a modal close it and are consumed;
    /// presses outside an inline panel close it and still pass through.
    pub fn dispatch_click(&mut self, zone: ClickZone, now: Instant) -> ClickOutcome {
        match self.registry.topmost(ListenerKind::OutsideClick, now) {
            Some(Layer::Modal) if zone != ClickZone::ModalPanel => ClickOutcome {
                closed: self.close_modal().map(Closed::Modal),
                consumed: true,
            },
            Some(Layer::Inline) if self.modal.is_none() && zone == ClickZone::Elsewhere => {
                ClickOutcome {
                    closed: self.collapse().map(Closed::Node),
                    consumed: false,
                }
            }
            // Modal still inside its guard window: swallow the opening click.
            _ if self.modal.is_some() && zone != ClickZone::ModalPanel => ClickOutcome {
                closed: None,
                consumed: true,
            },
            _ => ClickOutcome::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GUARD: Duration = Duration::from_millis(10);

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn node(pathway: usize, node: usize) -> NodeRef {
        NodeRef::Step { pathway, node }
    }

    #[test]
    fn toggling_the_same_node_closes_it() {
        let t0 = Instant::now();
        let mut o = Overlays::new(GUARD);
        assert!(o.toggle_node(node(0, 1), t0));
        assert_eq!(o.state(), OverlayState::NodeExpanded(node(0, 1)));
        assert!(!o.toggle_node(node(0, 1), t0));
        assert_eq!(o.state(), OverlayState::Closed);
        assert_eq!(o.listener_count(), 0);
    }

    #[test]
    fn expanding_another_node_replaces_the_first() {
        let t0 = Instant::now();
        let mut o = Overlays::new(GUARD);
        o.toggle_node(node(0, 0), t0);
        o.toggle_node(node(0, 2), t0);
        assert_eq!(o.expanded(), Some(node(0, 2)));
        assert_eq!(o.listener_count(), 2);
    }

    #[test]
    fn evidence_keeps_the_node_expanded_underneath() {
        let t0 = Instant::now();
        let mut o = Overlays::new(GUARD);
        o.toggle_node(node(1, 1), t0);
        o.open_modal(Modal::Evidence { node: node(1, 1), section: Some(0) }, t0);
        assert_eq!(
            o.state(),
            OverlayState::EvidenceOpen { node: node(1, 1), section: Some(0) }
        );
        assert!(o.scroll_locked());
        o.close_modal();
        assert_eq!(o.state(), OverlayState::NodeExpanded(node(1, 1)));
        assert!(!o.scroll_locked());
    }

    #[test]
    fn modals_are_mutually_exclusive() {
        let t0 = Instant::now();
        let mut o = Overlays::new(GUARD);
        o.open_modal(Modal::Reform { pathway: 0, show_evidence: false }, t0);
        let replaced = o.open_modal(Modal::Evidence { node: node(0, 0), section: None }, t0);
        assert_eq!(replaced, Some(Modal::Reform { pathway: 0, show_evidence: false }));
        assert_eq!(o.reform_pathway(), None);
        assert_eq!(o.listener_count(), 2);
        assert_eq!(o.scroll.holds(), 1);
    }

    #[test]
    fn escape_closes_the_topmost_layer_first() {
        let t0 = Instant::now();
        let mut o = Overlays::new(GUARD);
        o.toggle_node(node(0, 0), t0);
        o.open_modal(Modal::Evidence { node: node(0, 0), section: None }, t0);
        assert!(matches!(o.dispatch_escape(t0), Some(Closed::Modal(_))));
        assert_eq!(o.dispatch_escape(t0), Some(Closed::Node(node(0, 0))));
        assert_eq!(o.dispatch_escape(t0), None);
        assert_eq!(o.listener_count(), 0);
    }

    #[test]
    fn opening_click_is_swallowed_inside_the_guard_window() {
        let t0 = Instant::now();
        let mut o = Overlays::new(GUARD);
        o.open_modal(Modal::Reform { pathway: 1, show_evidence: false }, t0);
        let early = o.dispatch_click(ClickZone::Elsewhere, t0 + ms(2));
        assert_eq!(early, ClickOutcome { closed: None, consumed: true });
        assert_eq!(o.reform_pathway(), Some(1));

        let late = o.dispatch_click(ClickZone::Elsewhere, t0 + ms(20));
        assert!(late.consumed);
        assert!(matches!(late.closed, Some(Closed::Modal(Modal::Reform { .. }))));
        assert!(o.is_closed());
    }

    #[test]
    fn click_inside_the_modal_passes_through() {
        let t0 = Instant::now();
        let mut o = Overlays::new(GUARD);
        o.open_modal(Modal::Overview { full: false }, t0);
        let out = o.dispatch_click(ClickZone::ModalPanel, t0 + ms(50));
        assert_eq!(out, ClickOutcome::default());
        assert!(o.overview_open());
    }

    #[test]
    fn outside_click_on_inline_panel_collapses_and_passes_through() {
        let t0 = Instant::now();
        let mut o = Overlays::new(GUARD);
        o.toggle_node(node(2, 0), t0);
        let out = o.dispatch_click(ClickZone::Elsewhere, t0 + ms(50));
        assert_eq!(out.closed, Some(Closed::Node(node(2, 0))));
        assert!(!out.consumed);
        let inside = {
            o.toggle_node(node(2, 0), t0 + ms(60));
            o.dispatch_click(ClickZone::InlinePanel, t0 + ms(100))
        };
        assert_eq!(inside, ClickOutcome::default());
        assert_eq!(o.expanded(), Some(node(2, 0)));
    }

    #[test]
    fn reform_evidence_toggle_is_local_to_the_panel() {
        let t0 = Instant::now();
        let mut o = Overlays::new(GUARD);
        assert!(!o.toggle_reform_evidence());
        o.open_modal(Modal::Reform { pathway: 0, show_evidence: false }, t0);
        assert!(o.toggle_reform_evidence());
        assert_eq!(o.modal(), Some(Modal::Reform { pathway: 0, show_evidence: true }));
        assert_eq!(o.state(), OverlayState::ReformOpen { pathway: 0 });
    }

    #[test]
    fn retain_visible_drops_stale_layers() {
        let t0 = Instant::now();
        let mut o = Overlays::new(GUARD);
        o.toggle_node(node(1, 2), t0);
        o.open_modal(Modal::Evidence { node: node(1, 2), section: None }, t0);
        let closed = o.retain_visible(|n| n != node(1, 2));
        assert_eq!(closed.len(), 2);
        assert!(o.is_closed());
        assert_eq!(o.listener_count(), 0);
        assert!(!o.scroll_locked());
    }

    #[test]
    fn dropping_the_coordinator_releases_everything() {
        let t0 = Instant::now();
        let registry;
        let scroll;
        {
            let mut o = Overlays::new(GUARD);
            o.toggle_node(node(0, 0), t0);
            o.open_modal(Modal::Overview { full: true }, t0);
            registry = o.registry.clone();
            scroll = o.scroll.clone();
            assert!(scroll.is_locked());
        }
        assert!(registry.is_empty());
        assert!(!scroll.is_locked());
    }
}
