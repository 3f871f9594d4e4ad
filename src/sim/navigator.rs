//! Navigation Controller for the desktop flowchart.
//!
//! Sole owner of `Progress` and `Overlays`. Every operation applies its
//! whole effect before returning (count, overlays, animation flag, event
//! log), so the presentation layer never sees a half-applied step.
//!
//! ## Continue
//! ┌───────────────────────────────────────┬────────────────────────────────┐
//! │ Situation                              │ Effect                          │
//! ├───────────────────────────────────────┼────────────────────────────────┤
//! │ reform panel open, active pathway      │ close panel, count + 1          │
//! │ reform panel open, other pathway       │ close panel, then rules below   │
//! │ complete                               │ nothing                         │
//! │ active pathway at its reform slot      │ count + 1, open reform panel    │
//! │ otherwise                              │ count + 1                       │
//! └───────────────────────────────────────┴────────────────────────────────┘
//! A newly revealed node (never the reform slot) sets the animation flag.
//!
//! After any count change, open layers that point at nodes which are no
//! longer visible are closed.

use std::time::Instant;

use crate::config::TimingConfig;
use crate::domain::content::{Content, NodeRef};
use crate::domain::progress::{Element, Progress};
use crate::sim::event::NavEvent;
use crate::sim::overlay::{ClickOutcome, ClickZone, Closed, Modal, Overlays};
use crate::sim::timer::{AnimatingNode, AnimationFlag};

#[derive(Debug)]
pub struct Navigator {
    progress: Progress,
    overlays: Overlays,
    animating: AnimationFlag,
    /// Per pathway: whether reform content exists.
    reforms: Vec<bool>,
    events: Vec<NavEvent>,
}

impl Navigator {
    pub fn new(content: &Content, timing: &TimingConfig) -> Self {
        let reforms = (0..content.pathway_count())
            .map(|p| content.has_reform(p))
            .collect();
        Navigator::with_reforms(reforms, timing)
    }

    /// Build from the reform availability of each pathway alone.
    pub fn with_reforms(reforms: Vec<bool>, timing: &TimingConfig) -> Self {
        Navigator {
            progress: Progress::new(reforms.len()),
            overlays: Overlays::new(timing.click_guard()),
            animating: AnimationFlag::new(timing.animation_clear()),
            reforms,
            events: Vec::new(),
        }
    }

    // ── Read access for the presentation layer ──

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    pub fn animating(&self) -> Option<AnimatingNode> {
        self.animating.get()
    }

    pub fn take_events(&mut self) -> Vec<NavEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Operations ──

    /// Continue. Returns false when nothing changed.
    pub fn advance(&mut self, now: Instant) -> bool {
        let active = self.progress.active_pathway_index();
        if let Some(pathway) = self.overlays.reform_pathway() {
            self.close_modal();
            if pathway == active {
                self.reveal_next(now);
                return true;
            }
            if self.progress.is_complete() {
                return true;
            }
        }
        if self.progress.is_complete() {
            return false;
        }
        if self.progress.at_reform_slot() {
            self.reveal_next(now);
            if self.reforms.get(active).copied().unwrap_or(false) {
                self.open_modal(Modal::Reform { pathway: active, show_evidence: false }, now);
                self.emit(NavEvent::ReformOpened { pathway: active });
            }
            return true;
        }
        self.reveal_next(now)
    }

    /// Back. Closes everything open and steps back one; at the first step
    /// it only closes. Returns false when nothing changed.
    pub fn back(&mut self, _now: Instant) -> bool {
        let closed = self.close_all();
        if !self.progress.retreat() {
            return closed;
        }
        let count = self.progress.count();
        self.emit(NavEvent::Retreated { count });
        self.prune();
        true
    }

    pub fn start_over(&mut self) {
        self.close_all();
        self.animating.clear();
        self.progress.reset();
        self.emit(NavEvent::Reset);
    }

    /// Teleport to `count` (clamped). No intermediate reform prompts.
    pub fn jump_to(&mut self, count: usize) -> usize {
        self.close_all();
        self.animating.clear();
        let from = self.progress.count();
        let to = self.progress.set(count);
        self.emit(NavEvent::Jumped { from, to });
        if self.progress.is_complete() && from != to {
            self.emit(NavEvent::JourneyComplete);
        }
        to
    }

    /// Toggle a visible node's inline disclosure.
    pub fn toggle_node(&mut self, node: NodeRef, now: Instant) -> bool {
        if !self.is_present(node) {
            return false;
        }
        if let Some(modal) = self.overlays.modal() {
            self.emit(NavEvent::OverlayClosed(Closed::Modal(modal)));
        }
        let expanded = self.overlays.toggle_node(node, now);
        self.emit(NavEvent::NodeToggled { node, expanded });
        true
    }

    pub fn open_evidence(&mut self, node: NodeRef, section: Option<usize>, now: Instant) -> bool {
        if !self.is_present(node) {
            return false;
        }
        self.open_modal(Modal::Evidence { node, section }, now);
        true
    }

    /// The reform trigger beside an Impact node. Opens the panel without
    /// taking a step; the slot is consumed by the next Continue.
    pub fn open_reform(&mut self, pathway: usize, now: Instant) -> bool {
        if !self.is_present(NodeRef::Reform { pathway }) {
            return false;
        }
        if self.overlays.reform_pathway() == Some(pathway) {
            return false;
        }
        self.open_modal(Modal::Reform { pathway, show_evidence: false }, now);
        true
    }

    pub fn toggle_reform_evidence(&mut self) -> bool {
        self.overlays.toggle_reform_evidence()
    }

    /// Show or hide the full map.
    pub fn toggle_overview(&mut self, now: Instant) -> bool {
        if self.overlays.overview_open() {
            self.close_modal();
            false
        } else {
            self.open_modal(Modal::Overview { full: true }, now);
            true
        }
    }

    pub fn close_modal(&mut self) -> Option<Modal> {
        let closed = self.overlays.close_modal();
        if let Some(modal) = closed {
            self.emit(NavEvent::OverlayClosed(Closed::Modal(modal)));
        }
        closed
    }

    /// Escape.
    pub fn close_topmost(&mut self, now: Instant) -> bool {
        match self.overlays.dispatch_escape(now) {
            Some(closed) => {
                self.emit(NavEvent::OverlayClosed(closed));
                true
            }
            None => false,
        }
    }

    pub fn click(&mut self, zone: ClickZone, now: Instant) -> ClickOutcome {
        let outcome = self.overlays.dispatch_click(zone, now);
        if let Some(closed) = outcome.closed {
            self.emit(NavEvent::OverlayClosed(closed));
        }
        outcome
    }

    /// Expire timers. Returns true when something visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.animating.tick(now)
    }

    // ── Internals ──

    fn reveal_next(&mut self, now: Instant) -> bool {
        if !self.progress.advance() {
            return false;
        }
        let count = self.progress.count();
        let element = self.progress.latest();
        if let Element::Node { pathway, node } = element {
            self.animating.set(AnimatingNode { pathway, node }, now);
        }
        self.emit(NavEvent::Revealed { element, count });
        if self.progress.is_complete() {
            self.emit(NavEvent::JourneyComplete);
        }
        true
    }

    fn open_modal(&mut self, modal: Modal, now: Instant) {
        if let Some(previous) = self.overlays.open_modal(modal, now) {
            self.emit(NavEvent::OverlayClosed(Closed::Modal(previous)));
        }
        self.emit(NavEvent::ModalOpened(modal));
    }

    /// Close every overlay layer without moving.
    pub fn close_all(&mut self) -> bool {
        if let Some(modal) = self.overlays.modal() {
            self.emit(NavEvent::OverlayClosed(Closed::Modal(modal)));
        }
        if let Some(node) = self.overlays.expanded() {
            self.emit(NavEvent::OverlayClosed(Closed::Node(node)));
        }
        self.overlays.close_all()
    }

    /// Drop layers and the animation flag that refer to hidden nodes.
    fn prune(&mut self) {
        let progress = &self.progress;
        let closed = self.overlays.retain_visible(|n| progress.is_visible(n));
        for c in closed {
            self.emit(NavEvent::OverlayClosed(c));
        }
        if let Some(a) = self.animating.get() {
            if !self.progress.is_visible(a.node_ref()) {
                self.animating.clear();
            }
        }
    }

    fn is_present(&self, node: NodeRef) -> bool {
        let authored = match node {
            NodeRef::Reform { pathway } => self.reforms.get(pathway).copied().unwrap_or(false),
            NodeRef::Step { pathway, .. } => pathway < self.reforms.len(),
            NodeRef::Destination => true,
        };
        authored && self.progress.is_visible(node)
    }

    fn emit(&mut self, event: NavEvent) {
        event.log();
        self.events.push(event);
    }
}
