//! Mobile linear navigation: the same reveal engine, one item at a time.
//!
//! The flat item list is the slot layout itself: flat index `i` shows the
//! element revealed at count `i + 1`:
//!   ```text
//!   0  1  2  3      4  5  6  7      …   4P
//!   S0 B0 I0 R0     S1 B1 I1 R1     …   Destination
//!   ```
//! Continue on an Impact node (or on the destination) first shows the
//! overview interstitial; the next Continue closes it and moves on. Once the
//! journey has been completed, Impact nodes no longer stop for the
//! interstitial (the full map stays one tap away).
//!
//! Reform slots without authored content are stepped over in both
//! directions.

use std::time::Instant;

use crate::config::TimingConfig;
use crate::domain::content::Content;
use crate::domain::progress::{element_at, Element, Progress, ELEMENTS_PER_PATHWAY, NODES_PER_PATHWAY};
use crate::sim::event::NavEvent;
use crate::sim::overlay::{ClickOutcome, ClickZone, Closed, Modal, Overlays};

/// Subheading of the overview screen.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OverviewHeader {
    /// Full map opened on request: every entry is a jump target.
    TapAnyNode,
    AllExplored,
    Explored { explored: usize, of: usize },
}

#[derive(Debug)]
pub struct LinearNavigator {
    progress: Progress,
    overlays: Overlays,
    reforms: Vec<bool>,
    has_completed_once: bool,
    events: Vec<NavEvent>,
}

impl LinearNavigator {
    pub fn new(content: &Content, timing: &TimingConfig) -> Self {
        let reforms = (0..content.pathway_count())
            .map(|p| content.has_reform(p))
            .collect();
        LinearNavigator::with_reforms(reforms, timing)
    }

    pub fn with_reforms(reforms: Vec<bool>, timing: &TimingConfig) -> Self {
        LinearNavigator {
            progress: Progress::new(reforms.len()),
            overlays: Overlays::new(timing.click_guard()),
            reforms,
            has_completed_once: false,
            events: Vec::new(),
        }
    }

    // ── Queries ──

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    /// Flat index of the current item.
    pub fn index(&self) -> usize {
        self.progress.count() - 1
    }

    /// Number of items in the flat list.
    pub fn item_count(&self) -> usize {
        self.progress.total()
    }

    pub fn current(&self) -> Element {
        self.progress.latest()
    }

    pub fn is_complete(&self) -> bool {
        self.progress.is_complete()
    }

    pub fn has_completed_once(&self) -> bool {
        self.has_completed_once
    }

    /// Inline detail of the current item is open.
    pub fn is_expanded(&self) -> bool {
        self.overlays.expanded() == Some(self.current().node_ref())
    }

    /// Either overview variant is showing.
    pub fn overview(&self) -> Option<bool> {
        match self.overlays.modal() {
            Some(Modal::Overview { full }) => Some(full),
            _ => None,
        }
    }

    /// Continue would open the interstitial instead of moving.
    pub fn stops_for_overview(&self) -> bool {
        match self.current() {
            Element::Destination => true,
            Element::Node { node, .. } => node == NODES_PER_PATHWAY - 1 && !self.has_completed_once,
            Element::Reform { .. } => false,
        }
    }

    /// Continue does nothing: the final interstitial is up.
    pub fn continue_disabled(&self) -> bool {
        self.is_complete() && self.overview() == Some(false)
    }

    /// Back does nothing.
    pub fn back_disabled(&self) -> bool {
        self.index() == 0 && self.overlays.is_closed()
    }

    /// Items the overview lists, in flat order.
    pub fn overview_items(&self) -> Vec<Element> {
        let show_all = match self.overview() {
            Some(true) => self.has_completed_once,
            _ => self.is_complete(),
        };
        let last = if show_all { self.item_count() } else { self.index() + 1 };
        (1..=last)
            .map(|count| element_at(count, self.progress.pathways()))
            .filter(|e| self.is_authored(*e))
            .collect()
    }

    pub fn overview_header(&self) -> OverviewHeader {
        if self.overview() == Some(true) {
            return OverviewHeader::TapAnyNode;
        }
        if self.is_complete() {
            return OverviewHeader::AllExplored;
        }
        OverviewHeader::Explored {
            explored: self.progress.active_pathway_index() + 1,
            of: self.progress.pathways(),
        }
    }

    pub fn take_events(&mut self) -> Vec<NavEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Operations ──

    pub fn advance(&mut self, now: Instant) -> bool {
        match self.overview() {
            Some(false) if self.is_complete() => return false,
            Some(_) => {
                self.close_modal();
                if !self.is_complete() {
                    self.step_forward();
                }
                return true;
            }
            None => {}
        }
        if self.overlays.modal().is_some() {
            self.close_modal();
        }
        if self.stops_for_overview() {
            self.open_modal(Modal::Overview { full: false }, now);
            let after_pathway = self.current().pathway();
            self.emit(NavEvent::InterstitialShown { after_pathway });
            return true;
        }
        self.step_forward()
    }

    /// Back. The overview closes on its own; any other open layer closes
    /// together with the step back.
    pub fn back(&mut self, _now: Instant) -> bool {
        if self.overview().is_some() {
            self.close_modal();
            return true;
        }
        let closed = self.close_all();
        if !self.progress.retreat() {
            return closed;
        }
        if let Element::Reform { pathway } = self.current() {
            if !self.reforms.get(pathway).copied().unwrap_or(false) {
                self.progress.retreat();
            }
        }
        let count = self.progress.count();
        self.emit(NavEvent::Retreated { count });
        true
    }

    pub fn start_over(&mut self) {
        self.close_all();
        self.progress.reset();
        self.emit(NavEvent::Reset);
    }

    /// Go straight to flat `index`, closing everything open.
    pub fn jump_to(&mut self, index: usize) -> usize {
        self.close_all();
        let from = self.progress.count();
        self.progress.set(index + 1);
        if let Element::Reform { pathway } = self.current() {
            if !self.reforms.get(pathway).copied().unwrap_or(false) {
                self.progress.advance();
            }
        }
        let to = self.progress.count();
        self.emit(NavEvent::Jumped { from, to });
        self.note_completion();
        self.index()
    }

    /// A reform flag in the overview.
    pub fn jump_to_reform(&mut self, pathway: usize) -> usize {
        self.jump_to(pathway * ELEMENTS_PER_PATHWAY + NODES_PER_PATHWAY)
    }

    /// "View Flowchart".
    pub fn show_full_map(&mut self, now: Instant) {
        self.open_modal(Modal::Overview { full: true }, now);
    }

    pub fn toggle_expanded(&mut self, now: Instant) -> bool {
        let node = self.current().node_ref();
        let expanded = self.overlays.toggle_node(node, now);
        self.emit(NavEvent::NodeToggled { node, expanded });
        expanded
    }

    pub fn open_evidence(&mut self, section: Option<usize>, now: Instant) {
        let node = self.current().node_ref();
        self.open_modal(Modal::Evidence { node, section }, now);
    }

    /// Reform details from a reform item.
    pub fn open_reform_details(&mut self, now: Instant) -> bool {
        match self.current() {
            Element::Reform { pathway } => {
                self.open_modal(Modal::Reform { pathway, show_evidence: false }, now);
                true
            }
            _ => false,
        }
    }

    pub fn toggle_reform_evidence(&mut self) -> bool {
        self.overlays.toggle_reform_evidence()
    }

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

    // ── Internals ──

    fn step_forward(&mut self) -> bool {
        self.close_all();
        if !self.progress.advance() {
            return false;
        }
        if let Element::Reform { pathway } = self.current() {
            if !self.reforms.get(pathway).copied().unwrap_or(false) {
                self.progress.advance();
            }
        }
        let count = self.progress.count();
        self.emit(NavEvent::Revealed { element: self.current(), count });
        self.note_completion();
        true
    }

    fn note_completion(&mut self) {
        if self.is_complete() && !self.has_completed_once {
            self.has_completed_once = true;
            self.emit(NavEvent::JourneyComplete);
        }
    }

    fn is_authored(&self, element: Element) -> bool {
        match element {
            Element::Reform { pathway } => self.reforms.get(pathway).copied().unwrap_or(false),
            _ => true,
        }
    }

    fn open_modal(&mut self, modal: Modal, now: Instant) {
        if let Some(previous) = self.overlays.open_modal(modal, now) {
            self.emit(NavEvent::OverlayClosed(Closed::Modal(previous)));
        }
        self.emit(NavEvent::ModalOpened(modal));
    }

    pub fn close_modal(&mut self) -> bool {
        match self.overlays.close_modal() {
            Some(modal) => {
                self.emit(NavEvent::OverlayClosed(Closed::Modal(modal)));
                true
            }
            None => false,
        }
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

    fn emit(&mut self, event: NavEvent) {
        event.log();
        self.events.push(event);
    }
}
