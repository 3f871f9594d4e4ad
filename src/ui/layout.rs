/// Measured layout of the last composed frame, plus document scrolling.
///
/// The renderer records every interactive element and every node box it
/// draws, in screen cells. Input handling hit-tests against it and the
/// connector engine measures it. A snapshot always describes the frame
/// currently on screen, never the state that will produce the next one.
///
/// ## Viewport
///
/// Document rows and screen rows are separate:
///   - `Viewport.y`     first document row shown in the body area
///   - Renderer maps:   `screen_y = body_top + doc_y - viewport.y`
///   - After navigation the viewport follows the newest content with a
///     dead-zone, like a camera following a player.

use std::collections::HashMap;

use crate::domain::content::NodeRef;
use crate::domain::geometry::{Point, Rect};
use crate::sim::connector::Measure;
use crate::sim::overlay::ClickZone;

/// Buttons of the navigation bar.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NavButton {
    Back,
    Continue,
    StartOver,
    Overview,
    Intro,
}

/// Something clickable.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Hit {
    Node(NodeRef),
    ReformTrigger(usize),
    EvidenceCta { node: NodeRef, section: Option<usize> },
    ReformEvidenceToggle,
    CloseModal,
    /// Overview entry; carries the progress count it jumps to.
    OverviewEntry(usize),
    ReformFlag(usize),
    Nav(NavButton),
    Start,
    BackgroundToggle,
}

#[derive(Clone, Debug, Default)]
pub struct LayoutSnapshot {
    nodes: HashMap<NodeRef, Rect>,
    triggers: HashMap<usize, Rect>,
    targets: Vec<(Rect, Hit)>,
    modal_panel: Option<Rect>,
    inline_zone: Vec<Rect>,
}

impl LayoutSnapshot {
    pub fn new() -> Self {
        LayoutSnapshot::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.triggers.clear();
        self.targets.clear();
        self.modal_panel = None;
        self.inline_zone.clear();
    }

    pub fn record_node(&mut self, node: NodeRef, rect: Rect) {
        self.nodes.insert(node, rect);
    }

    pub fn record_trigger(&mut self, pathway: usize, rect: Rect) {
        self.triggers.insert(pathway, rect);
    }

    pub fn add_target(&mut self, rect: Rect, hit: Hit) {
        if !rect.is_empty() {
            self.targets.push((rect, hit));
        }
    }

    /// A modal now covers the screen: nothing drawn before it is reachable.
    pub fn begin_modal(&mut self, panel: Rect) {
        self.targets.clear();
        self.modal_panel = Some(panel);
    }

    /// Cells that belong to the open inline disclosure.
    pub fn add_inline_zone(&mut self, rect: Rect) {
        self.inline_zone.push(rect);
    }

    pub fn modal_panel(&self) -> Option<Rect> {
        self.modal_panel
    }

    /// Topmost target under `p`.
    pub fn hit_test(&self, p: Point) -> Option<Hit> {
        self.targets
            .iter()
            .rev()
            .find(|(r, _)| r.contains(p))
            .map(|(_, hit)| *hit)
    }

    pub fn zone(&self, p: Point) -> ClickZone {
        if self.modal_panel.map_or(false, |r| r.contains(p)) {
            ClickZone::ModalPanel
        } else if self.inline_zone.iter().any(|r| r.contains(p)) {
            ClickZone::InlinePanel
        } else {
            ClickZone::Elsewhere
        }
    }

    /// Buttons currently drawn, in draw order.
    pub fn targets(&self) -> impl Iterator<Item = Hit> + '_ {
        self.targets.iter().map(|(_, h)| *h)
    }

    /// Where a hit was drawn, if it is on screen.
    pub fn rect_of(&self, hit: Hit) -> Option<Rect> {
        self.targets.iter().find(|(_, h)| *h == hit).map(|(r, _)| *r)
    }
}

impl Measure for LayoutSnapshot {
    fn node_rect(&self, node: NodeRef) -> Option<Rect> {
        self.nodes.get(&node).copied()
    }

    fn reform_trigger(&self, pathway: usize) -> Option<Rect> {
        self.triggers.get(&pathway).copied()
    }
}

/// Vertical scroll over a document taller than the body area.
#[derive(Clone, Debug, Default)]
pub struct Viewport {
    /// Document row at the top of the body area.
    pub y: i32,
    /// Body rows available.
    pub view_h: i32,
    follow_pending: bool,
}

impl Viewport {
    pub fn new() -> Self {
        Viewport::default()
    }

    /// Bring the follow target into view on the next frame.
    pub fn request_follow(&mut self) {
        self.follow_pending = true;
    }

    pub fn reset(&mut self) {
        self.y = 0;
        self.follow_pending = false;
    }

    pub fn scroll_by(&mut self, delta: i32, doc_h: i32) {
        self.y += delta;
        self.clamp(doc_h);
        self.follow_pending = false;
    }

    pub fn clamp(&mut self, doc_h: i32) {
        let max_y = (doc_h - self.view_h).max(0);
        self.y = self.y.clamp(0, max_y);
    }

    /// Scroll so document rows `top..bottom` sit inside the view, keeping a
    /// margin of a fifth of the view on each side when possible.
    pub fn follow(&mut self, top: i32, bottom: i32, doc_h: i32) {
        if self.view_h <= 0 {
            return;
        }
        if doc_h <= self.view_h {
            self.y = 0;
            return;
        }
        let margin = self.view_h / 5;
        if bottom > self.y + self.view_h - margin {
            self.y = bottom - self.view_h + margin;
        }
        if top < self.y + margin {
            self.y = top - margin;
        }
        self.clamp(doc_h);
    }

    /// Apply a pending follow. Returns true when the offset changed.
    pub fn settle(&mut self, target: Option<(i32, i32)>, doc_h: i32) -> bool {
        let before = self.y;
        if self.follow_pending {
            self.follow_pending = false;
            if let Some((top, bottom)) = target {
                self.follow(top, bottom, doc_h);
            }
        }
        self.clamp(doc_h);
        self.y != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_targets_win_hit_tests() {
        let mut l = LayoutSnapshot::new();
        l.add_target(Rect::new(0, 0, 10, 3), Hit::Node(NodeRef::Destination));
        l.add_target(Rect::new(2, 1, 3, 1), Hit::CloseModal);
        assert_eq!(l.hit_test(Point::new(3, 1)), Some(Hit::CloseModal));
        assert_eq!(l.hit_test(Point::new(8, 2)), Some(Hit::Node(NodeRef::Destination)));
        assert_eq!(l.hit_test(Point::new(20, 2)), None);
    }

    #[test]
    fn modal_hides_the_background_targets() {
        let mut l = LayoutSnapshot::new();
        l.add_target(Rect::new(0, 0, 10, 3), Hit::Nav(NavButton::Continue));
        l.begin_modal(Rect::new(5, 5, 20, 10));
        l.add_target(Rect::new(6, 6, 3, 1), Hit::CloseModal);
        assert_eq!(l.hit_test(Point::new(1, 1)), None);
        assert_eq!(l.zone(Point::new(6, 6)), ClickZone::ModalPanel);
        assert_eq!(l.zone(Point::new(1, 1)), ClickZone::Elsewhere);
    }

    #[test]
    fn inline_zone_covers_panel_and_node() {
        let mut l = LayoutSnapshot::new();
        l.add_inline_zone(Rect::new(4, 10, 60, 8));
        l.add_inline_zone(Rect::new(4, 2, 20, 6));
        assert_eq!(l.zone(Point::new(5, 3)), ClickZone::InlinePanel);
        assert_eq!(l.zone(Point::new(5, 12)), ClickZone::InlinePanel);
        assert_eq!(l.zone(Point::new(5, 9)), ClickZone::Elsewhere);
    }

    #[test]
    fn viewport_follows_with_a_margin() {
        let mut v = Viewport { y: 0, view_h: 20, follow_pending: false };
        v.follow(30, 36, 100);
        assert_eq!(v.y, 20, "bottom lands a margin above the edge");
        v.follow(10, 12, 100);
        assert_eq!(v.y, 6);
    }

    #[test]
    fn short_documents_do_not_scroll() {
        let mut v = Viewport { y: 7, view_h: 20, follow_pending: true };
        assert!(v.settle(Some((0, 5)), 15));
        assert_eq!(v.y, 0);
    }

    #[test]
    fn follow_applies_once_per_request() {
        let mut v = Viewport { y: 0, view_h: 10, follow_pending: false };
        assert!(!v.settle(Some((40, 45)), 100));
        v.request_follow();
        assert!(v.settle(Some((40, 45)), 100));
        assert_eq!(v.y, 37);
        v.scroll_by(-5, 100);
        assert!(!v.settle(Some((40, 45)), 100));
        assert_eq!(v.y, 32);
    }
}
