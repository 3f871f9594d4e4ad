//! Connector Geometry Engine (desktop only).
//!
//! Strictly downstream of navigation state:
//!   state → render (records rects) → measure → paths → draw
//! The engine reads a `Measure` after the frame has been composed and
//! never touches `Progress` or overlays.
//!
//! ## Recompute triggers
//!   - first frame, terminal resize, any navigation event (`mark_dirty`)
//!   - every frame while a node is expanded, a reveal animation is playing,
//!     or within the grace window after a node collapsed
//! Outside those conditions the frame loop is off and nothing is measured.

use std::time::{Duration, Instant};

use crate::domain::content::NodeRef;
use crate::domain::geometry::{elbow, ConnectorPath, Rect};
use crate::domain::progress::Progress;
use crate::sim::timer::OneShot;

/// Measured positions of rendered elements. `None` means not on screen.
pub trait Measure {
    fn node_rect(&self, node: NodeRef) -> Option<Rect>;
    fn reform_trigger(&self, pathway: usize) -> Option<Rect>;
}

/// Element a pathway's connector points at.
pub fn connector_target(pathway: usize, pathways: usize) -> NodeRef {
    if pathway + 1 < pathways {
        NodeRef::Step { pathway: pathway + 1, node: 0 }
    } else {
        NodeRef::Destination
    }
}

/// All connectors for the current state. Pathways whose target has not
/// been laid out are skipped.
pub fn compute_paths(progress: &Progress, measure: &impl Measure, overshoot: i32) -> Vec<ConnectorPath> {
    (0..progress.pathways())
        .filter(|&p| progress.pathway_state(p).show_reform_branch)
        .filter_map(|p| {
            let source = measure.reform_trigger(p)?;
            let target = measure.node_rect(connector_target(p, progress.pathways()))?;
            elbow(p, source, target, overshoot)
        })
        .collect()
}

#[derive(Debug)]
pub struct ConnectorEngine {
    overshoot: i32,
    grace: Duration,
    paths: Vec<ConnectorPath>,
    dirty: bool,
    grace_timer: OneShot,
    was_expanded: bool,
    loop_active: bool,
    recomputes: u64,
}

impl ConnectorEngine {
    pub fn new(overshoot: i32, grace: Duration) -> Self {
        ConnectorEngine {
            overshoot,
            grace,
            paths: Vec::new(),
            dirty: true,
            grace_timer: OneShot::new(),
            was_expanded: false,
            loop_active: false,
            recomputes: 0,
        }
    }

    pub fn paths(&self) -> &[ConnectorPath] {
        &self.paths
    }

    pub fn loop_active(&self) -> bool {
        self.loop_active
    }

    /// Number of measurements taken so far.
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }

    /// Resize or a navigation event: measure once on the next frame.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Drop all pending work (StartOver).
    pub fn cancel(&mut self) {
        self.grace_timer.cancel();
        self.was_expanded = false;
        self.set_loop(false);
        self.dirty = true;
    }

    /// Update the frame-loop conditions from the latest state.
    pub fn sync(&mut self, expanded: bool, animating: bool, now: Instant) {
        if self.was_expanded && !expanded {
            self.grace_timer.schedule(now, self.grace);
        }
        self.was_expanded = expanded;
        let in_grace = self.grace_timer.is_running(now);
        if !in_grace {
            self.grace_timer.poll(now);
        }
        self.set_loop(expanded || animating || in_grace);
    }

    /// The frame needs measuring.
    pub fn wants_measure(&self) -> bool {
        self.dirty || self.loop_active
    }

    /// Measure after render. Returns true when the path list changed.
    pub fn on_frame(&mut self, progress: &Progress, measure: &impl Measure) -> bool {
        if !self.wants_measure() {
            return false;
        }
        self.dirty = false;
        self.recomputes += 1;
        let paths = compute_paths(progress, measure, self.overshoot);
        if paths == self.paths {
            return false;
        }
        log::trace!("connectors: {} paths", paths.len());
        self.paths = paths;
        true
    }

    fn set_loop(&mut self, active: bool) {
        if active != self.loop_active {
            log::debug!("connector frame loop {}", if active { "started" } else { "stopped" });
            self.loop_active = active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeLayout {
        nodes: HashMap<NodeRef, Rect>,
        triggers: HashMap<usize, Rect>,
    }

    impl Measure for FakeLayout {
        fn node_rect(&self, node: NodeRef) -> Option<Rect> {
            self.nodes.get(&node).copied()
        }
        fn reform_trigger(&self, pathway: usize) -> Option<Rect> {
            self.triggers.get(&pathway).copied()
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn layout_through_pathway_one() -> FakeLayout {
        let mut l = FakeLayout::default();
        l.triggers.insert(0, Rect::new(70, 4, 3, 1));
        l.nodes.insert(NodeRef::Step { pathway: 1, node: 0 }, Rect::new(4, 12, 20, 5));
        l
    }

    #[test]
    fn connector_waits_for_its_target() {
        let mut progress = Progress::new(3);
        progress.set(4);
        let mut layout = layout_through_pathway_one();
        layout.nodes.clear();
        assert!(compute_paths(&progress, &layout, 2).is_empty());

        layout.nodes.insert(NodeRef::Step { pathway: 1, node: 0 }, Rect::new(4, 12, 20, 0));
        assert!(compute_paths(&progress, &layout, 2).is_empty(), "zero-height target");
    }

    #[test]
    fn one_path_per_unlocked_reform() {
        let mut progress = Progress::new(3);
        progress.set(5);
        let layout = layout_through_pathway_one();
        let paths = compute_paths(&progress, &layout, 2);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].pathway, 0);
        assert_eq!(paths[0].end().x, 3);
    }

    #[test]
    fn last_pathway_points_at_the_destination() {
        assert_eq!(connector_target(2, 3), NodeRef::Destination);
        assert_eq!(connector_target(0, 3), NodeRef::Step { pathway: 1, node: 0 });
    }

    #[test]
    fn frame_loop_runs_only_while_layout_moves() {
        let t0 = Instant::now();
        let mut engine = ConnectorEngine::new(2, ms(350));
        engine.sync(false, false, t0);
        assert!(!engine.loop_active());

        engine.sync(true, false, t0);
        assert!(engine.loop_active());

        engine.sync(false, false, t0 + ms(100));
        assert!(engine.loop_active(), "grace window after collapse");
        engine.sync(false, false, t0 + ms(449));
        assert!(engine.loop_active());
        engine.sync(false, false, t0 + ms(450));
        assert!(!engine.loop_active());
    }

    #[test]
    fn animation_keeps_the_loop_alive() {
        let t0 = Instant::now();
        let mut engine = ConnectorEngine::new(2, ms(350));
        engine.sync(false, true, t0);
        assert!(engine.loop_active());
        engine.sync(false, false, t0 + ms(400));
        assert!(!engine.loop_active());
    }

    #[test]
    fn idle_frames_are_not_measured() {
        let t0 = Instant::now();
        let mut progress = Progress::new(3);
        progress.set(5);
        let layout = layout_through_pathway_one();
        let mut engine = ConnectorEngine::new(2, ms(350));
        engine.sync(false, false, t0);
        assert!(engine.on_frame(&progress, &layout));
        assert_eq!(engine.recomputes(), 1);
        assert!(!engine.on_frame(&progress, &layout));
        assert_eq!(engine.recomputes(), 1);

        engine.mark_dirty();
        assert!(!engine.on_frame(&progress, &layout), "same layout, same paths");
        assert_eq!(engine.recomputes(), 2);
    }

    #[test]
    fn cancel_stops_the_grace_window() {
        let t0 = Instant::now();
        let mut engine = ConnectorEngine::new(2, ms(350));
        engine.sync(true, false, t0);
        engine.sync(false, false, t0 + ms(10));
        engine.cancel();
        assert!(!engine.loop_active());
        engine.sync(false, false, t0 + ms(20));
        assert!(!engine.loop_active());
    }
}
