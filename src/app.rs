//! Top-level application state and input routing.
//!
//! ## Phases
//!   Landing ──Enter──▶ Journey ──i──▶ Landing (progress kept)
//!
//! Every input (key, mouse, swipe, gamepad) is first turned into an
//! `Action`; actions are applied one at a time, and the navigator's event
//! log is drained after each so scroll, focus and connector bookkeeping
//! see every step.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::AppConfig;
use crate::domain::content::{Content, NodeRef};
use crate::domain::evidence;
use crate::domain::geometry::{ConnectorPath, Point};
use crate::domain::progress::{count_of, Element};
use crate::sim::connector::ConnectorEngine;
use crate::sim::event::NavEvent;
use crate::sim::linear::LinearNavigator;
use crate::sim::navigator::Navigator;
use crate::sim::overlay::{ClickOutcome, ClickZone, Overlays};
use crate::ui::gamepad::PadAction;
use crate::ui::input::InputEvent;
use crate::ui::layout::{Hit, LayoutSnapshot, NavButton, Viewport};
use crate::ui::swipe::{SwipeDir, SwipeTracker};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Landing,
    Journey,
}

/// The navigator backing the current layout.
#[derive(Debug)]
pub enum Mode {
    Desktop(Navigator),
    Mobile(LinearNavigator),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Continue,
    Back,
    Close,
    StartOver,
    Overview,
    Intro,
    ToggleBackground,
    FocusNext,
    FocusPrev,
    ToggleFocused,
    /// Open the n-th evidence CTA of the expanded node.
    OpenCta(usize),
    ToggleReformEvidence,
    Scroll(i32),
    Quit,
    Click(Hit),
}

/// Keyboard bindings.
pub fn key_action(phase: Phase, key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::Quit),
            _ => None,
        };
    }
    let shared = match key.code {
        KeyCode::Up => Some(Action::Scroll(-1)),
        KeyCode::Down => Some(Action::Scroll(1)),
        KeyCode::PageUp => Some(Action::Scroll(-10)),
        KeyCode::PageDown => Some(Action::Scroll(10)),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
        _ => None,
    };
    if shared.is_some() {
        return shared;
    }
    match phase {
        Phase::Landing => match key.code {
            KeyCode::Enter | KeyCode::Right | KeyCode::Char(' ') => Some(Action::Continue),
            KeyCode::Char('b') | KeyCode::Char('B') => Some(Action::ToggleBackground),
            _ => None,
        },
        Phase::Journey => match key.code {
            KeyCode::Right => Some(Action::Continue),
            KeyCode::Left => Some(Action::Back),
            KeyCode::Esc => Some(Action::Close),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::StartOver),
            KeyCode::Char('m') | KeyCode::Char('M') => Some(Action::Overview),
            KeyCode::Char('i') | KeyCode::Char('I') => Some(Action::Intro),
            KeyCode::Char('e') | KeyCode::Char('E') => Some(Action::ToggleReformEvidence),
            KeyCode::Tab => Some(Action::FocusNext),
            KeyCode::BackTab => Some(Action::FocusPrev),
            KeyCode::Enter | KeyCode::Char(' ') => Some(Action::ToggleFocused),
            KeyCode::Char(c @ '1'..='9') => Some(Action::OpenCta(c as usize - '1' as usize)),
            _ => None,
        },
    }
}

pub fn pad_action(phase: Phase, action: PadAction) -> Action {
    match (phase, action) {
        (Phase::Landing, PadAction::FocusPrev) => Action::Scroll(-1),
        (Phase::Landing, PadAction::FocusNext) => Action::Scroll(1),
        (_, PadAction::Continue) => Action::Continue,
        (_, PadAction::Back) => Action::Back,
        (_, PadAction::Close) => Action::Close,
        (_, PadAction::StartOver) => Action::StartOver,
        (_, PadAction::Overview) => Action::Overview,
        (_, PadAction::FocusPrev) => Action::FocusPrev,
        (_, PadAction::FocusNext) => Action::FocusNext,
    }
}

pub struct App {
    pub content: Content,
    pub config: AppConfig,
    pub phase: Phase,
    pub mode: Mode,
    pub show_background: bool,
    /// Keyboard focus among visible nodes (desktop).
    pub focus: Option<NodeRef>,
    /// Scroll to the open inline panel rather than the newest row.
    pub follow_panel: bool,
    pub scroll: Viewport,
    pub modal_scroll: Viewport,
    /// Document heights of the last composed frame.
    pub doc_h: i32,
    pub modal_doc_h: i32,
    pub connector: ConnectorEngine,
    pub quit: bool,
    swipe: SwipeTracker,
    press: Option<Point>,
}

impl App {
    pub fn new(content: Content, config: AppConfig, width: u16) -> Self {
        let mobile = config.layout.is_mobile(width, config.mobile_max_width);
        let mode = build_mode(&content, &config, mobile);
        let connector = ConnectorEngine::new(
            config.connector.overshoot,
            config.timing.collapse_grace(),
        );
        let swipe = SwipeTracker::new(&config.swipe);
        log::info!(
            "starting in {} layout with {} pathways",
            if mobile { "mobile" } else { "desktop" },
            content.pathway_count()
        );
        App {
            content,
            config,
            phase: Phase::Landing,
            mode,
            show_background: false,
            focus: None,
            follow_panel: false,
            scroll: Viewport::new(),
            modal_scroll: Viewport::new(),
            doc_h: 0,
            modal_doc_h: 0,
            connector,
            quit: false,
            swipe,
            press: None,
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self.mode, Mode::Mobile(_))
    }

    pub fn overlays(&self) -> &Overlays {
        match &self.mode {
            Mode::Desktop(n) => n.overlays(),
            Mode::Mobile(m) => m.overlays(),
        }
    }

    pub fn count(&self) -> usize {
        match &self.mode {
            Mode::Desktop(n) => n.progress().count(),
            Mode::Mobile(m) => m.progress().count(),
        }
    }

    /// Connectors to draw this frame.
    pub fn connector_paths(&self) -> &[ConnectorPath] {
        match (&self.mode, self.phase) {
            (Mode::Desktop(_), Phase::Journey) => self.connector.paths(),
            _ => &[],
        }
    }

    // ── Input ──

    pub fn handle_input(&mut self, ev: &InputEvent, layout: &LayoutSnapshot, now: Instant) {
        let swiping = self.is_mobile() && self.phase == Phase::Journey;
        match *ev {
            InputEvent::Key(key) => {
                if let Some(action) = key_action(self.phase, &key) {
                    self.apply(action, now);
                }
            }
            InputEvent::MouseDown { x, y } if swiping => {
                self.swipe.begin(x, y);
                self.press = Some(Point::new(x, y));
            }
            InputEvent::MouseDown { x, y } => self.click_at(Point::new(x, y), layout, now),
            InputEvent::MouseDrag { x, y } => self.swipe.moved(x, y),
            InputEvent::MouseUp { x, y } if swiping => {
                let press = self.press.take();
                match self.swipe.end(x, y) {
                    Some(SwipeDir::Left) => self.apply(Action::Continue, now),
                    Some(SwipeDir::Right) => self.apply(Action::Back, now),
                    None => {
                        if let Some(p) = press {
                            self.click_at(p, layout, now);
                        }
                    }
                }
            }
            InputEvent::MouseUp { .. } => {}
            InputEvent::ScrollUp => self.apply(Action::Scroll(-3), now),
            InputEvent::ScrollDown => self.apply(Action::Scroll(3), now),
            InputEvent::Resize { width, height } => self.on_resize(width, height),
        }
    }

    pub fn handle_pad(&mut self, action: PadAction, now: Instant) {
        self.apply(pad_action(self.phase, action), now);
    }

    /// A pointer press at `p` on the frame described by `layout`.
    pub fn click_at(&mut self, p: Point, layout: &LayoutSnapshot, now: Instant) {
        if self.phase == Phase::Journey {
            let zone = layout.zone(p);
            let outcome = self.dispatch_click(zone, now);
            if outcome.consumed {
                return;
            }
        }
        if let Some(hit) = layout.hit_test(p) {
            self.apply(Action::Click(hit), now);
        }
    }

    fn dispatch_click(&mut self, zone: ClickZone, now: Instant) -> ClickOutcome {
        let outcome = match &mut self.mode {
            Mode::Desktop(n) => n.click(zone, now),
            Mode::Mobile(m) => m.click(zone, now),
        };
        self.absorb_events();
        outcome
    }

    pub fn apply(&mut self, action: Action, now: Instant) {
        match action {
            Action::Quit => self.quit = true,
            Action::Scroll(delta) => self.scroll_by(delta),
            _ if self.phase == Phase::Landing => self.apply_landing(action),
            _ => {
                self.apply_journey(action, now);
                self.absorb_events();
            }
        }
    }

    fn apply_landing(&mut self, action: Action) {
        match action {
            Action::Continue | Action::Click(Hit::Start) => self.begin_journey(),
            Action::ToggleBackground | Action::Click(Hit::BackgroundToggle) => {
                self.show_background = !self.show_background;
            }
            _ => {}
        }
    }

    fn apply_journey(&mut self, action: Action, now: Instant) {
        match action {
            Action::Continue | Action::Click(Hit::Nav(NavButton::Continue)) => {
                self.with_nav(|n| n.advance(now), |m| m.advance(now));
            }
            Action::Back | Action::Click(Hit::Nav(NavButton::Back)) => {
                self.with_nav(|n| n.back(now), |m| m.back(now));
            }
            Action::Close => {
                self.with_nav(|n| n.close_topmost(now), |m| m.close_topmost(now));
            }
            Action::StartOver | Action::Click(Hit::Nav(NavButton::StartOver)) => {
                self.with_nav(|n| n.start_over(), |m| m.start_over());
            }
            Action::Overview | Action::Click(Hit::Nav(NavButton::Overview)) => {
                self.with_nav(
                    |n| n.toggle_overview(now),
                    |m| {
                        if m.overview().is_some() {
                            m.close_topmost(now)
                        } else {
                            m.show_full_map(now);
                            true
                        }
                    },
                );
            }
            Action::Intro | Action::Click(Hit::Nav(NavButton::Intro)) => {
                self.with_nav(|n| n.close_all(), |m| m.close_all());
                self.phase = Phase::Landing;
                self.scroll.reset();
            }
            Action::FocusNext => self.move_focus(1),
            Action::FocusPrev => self.move_focus(-1),
            Action::ToggleFocused => self.toggle_focused(now),
            Action::OpenCta(n) => self.open_cta(n, now),
            Action::ToggleReformEvidence | Action::Click(Hit::ReformEvidenceToggle) => {
                self.with_nav(|n| n.toggle_reform_evidence(), |m| m.toggle_reform_evidence());
            }
            Action::Click(Hit::Node(node)) => {
                self.focus = Some(node);
                self.with_nav(|n| n.toggle_node(node, now), |m| m.toggle_expanded(now));
            }
            Action::Click(Hit::ReformTrigger(p)) => {
                self.with_nav(|n| n.open_reform(p, now), |m| m.open_reform_details(now));
            }
            Action::Click(Hit::EvidenceCta { node, section }) => {
                self.with_nav(
                    |n| n.open_evidence(node, section, now),
                    |m| {
                        m.open_evidence(section, now);
                        true
                    },
                );
            }
            Action::Click(Hit::CloseModal) => {
                self.with_nav(|n| n.close_modal().is_some(), |m| m.close_modal());
            }
            Action::Click(Hit::OverviewEntry(count)) => {
                self.with_nav(
                    |n| n.jump_to(count) > 0,
                    |m| {
                        m.jump_to(count.saturating_sub(1));
                        true
                    },
                );
            }
            Action::Click(Hit::ReformFlag(p)) => {
                self.with_nav(
                    |n| {
                        let pathways = n.progress().pathways();
                        n.jump_to(count_of(Element::Reform { pathway: p }, pathways)) > 0
                    },
                    |m| {
                        m.jump_to_reform(p);
                        true
                    },
                );
            }
            Action::Click(Hit::Start) | Action::Click(Hit::BackgroundToggle) => {}
            Action::ToggleBackground | Action::Quit | Action::Scroll(_) => {}
        }
    }

    fn with_nav<R>(
        &mut self,
        desktop: impl FnOnce(&mut Navigator) -> R,
        mobile: impl FnOnce(&mut LinearNavigator) -> R,
    ) -> R {
        match &mut self.mode {
            Mode::Desktop(n) => desktop(n),
            Mode::Mobile(m) => mobile(m),
        }
    }

    fn begin_journey(&mut self) {
        self.phase = Phase::Journey;
        self.scroll.reset();
        self.scroll.request_follow();
        self.connector.mark_dirty();
    }

    fn scroll_by(&mut self, delta: i32) {
        let in_modal = self.phase == Phase::Journey && self.overlays().modal().is_some();
        if in_modal {
            self.modal_scroll.scroll_by(delta, self.modal_doc_h);
        } else if self.phase == Phase::Landing || !self.overlays().scroll_locked() {
            self.scroll.scroll_by(delta, self.doc_h);
            // Connector endpoints are in screen cells.
            self.connector.mark_dirty();
        }
    }

    // ── Focus cursor (desktop) ──

    /// Nodes Tab cycles over, in reading order.
    pub fn focusables(&self) -> Vec<NodeRef> {
        let Mode::Desktop(nav) = &self.mode else {
            return Vec::new();
        };
        let progress = nav.progress();
        let mut out: Vec<NodeRef> = (0..progress.pathways())
            .flat_map(|p| {
                let n = progress.pathway_state(p).node_count;
                (0..n).map(move |node| NodeRef::Step { pathway: p, node })
            })
            .collect();
        if progress.is_complete() {
            out.push(NodeRef::Destination);
        }
        out
    }

    fn move_focus(&mut self, step: isize) {
        let nodes = self.focusables();
        if nodes.is_empty() {
            return;
        }
        let len = nodes.len() as isize;
        let next = match self.focus.and_then(|f| nodes.iter().position(|n| *n == f)) {
            Some(i) => (i as isize + step).rem_euclid(len),
            None if step > 0 => 0,
            None => len - 1,
        };
        self.focus = Some(nodes[next as usize]);
    }

    fn toggle_focused(&mut self, now: Instant) {
        match &mut self.mode {
            Mode::Mobile(m) => {
                m.toggle_expanded(now);
            }
            Mode::Desktop(n) => {
                let target = self.focus.or_else(|| match n.progress().latest() {
                    Element::Reform { .. } => None,
                    e => Some(e.node_ref()),
                });
                if let Some(node) = target {
                    self.focus = Some(node);
                    n.toggle_node(node, now);
                }
            }
        }
    }

    fn open_cta(&mut self, index: usize, now: Instant) {
        let node = match &self.mode {
            Mode::Desktop(n) => n.overlays().expanded(),
            Mode::Mobile(m) => m.is_expanded().then(|| m.current().node_ref()),
        };
        let Some(node) = node else { return };
        let Some(section) = self
            .content
            .node(node)
            .and_then(|n| evidence::ctas(n).into_iter().nth(index))
            .map(|cta| cta.section)
        else {
            return;
        };
        self.with_nav(
            |n| n.open_evidence(node, section, now),
            |m| {
                m.open_evidence(section, now);
                true
            },
        );
    }

    // ── Frame bookkeeping ──

    /// Drain navigation events into scroll, focus and connector state.
    fn absorb_events(&mut self) {
        let events = match &mut self.mode {
            Mode::Desktop(n) => n.take_events(),
            Mode::Mobile(m) => m.take_events(),
        };
        let mobile = self.is_mobile();
        for event in events {
            if event.affects_layout() {
                self.connector.mark_dirty();
            }
            match event {
                NavEvent::Reset => {
                    self.connector.cancel();
                    self.focus = None;
                    self.follow_panel = false;
                    self.scroll.reset();
                }
                NavEvent::Revealed { .. } | NavEvent::Retreated { .. } | NavEvent::Jumped { .. } => {
                    self.follow_panel = false;
                    if mobile {
                        self.scroll.reset();
                    } else {
                        self.scroll.request_follow();
                    }
                }
                NavEvent::NodeToggled { expanded, .. } => {
                    self.follow_panel = expanded;
                    if expanded {
                        self.scroll.request_follow();
                    }
                }
                NavEvent::ModalOpened(_) => self.modal_scroll.reset(),
                NavEvent::JourneyComplete => log::info!("journey complete"),
                _ => {}
            }
        }
        if let Some(f) = self.focus {
            if !self.focusables().contains(&f) {
                self.focus = None;
            }
        }
    }

    /// Expire timers and update the connector loop. Returns true when the
    /// frame should be recomposed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match &mut self.mode {
            Mode::Desktop(nav) => {
                let changed = nav.tick(now);
                let expanded = nav.overlays().expanded().is_some();
                let animating = nav.animating().is_some();
                self.connector.sync(expanded, animating, now);
                if changed {
                    self.connector.mark_dirty();
                }
                changed
            }
            Mode::Mobile(_) => false,
        }
    }

    /// Measure connectors after the frame has been composed.
    pub fn measure_connectors(&mut self, layout: &LayoutSnapshot) -> bool {
        match (&self.mode, self.phase) {
            (Mode::Desktop(nav), Phase::Journey) => self.connector.on_frame(nav.progress(), layout),
            _ => false,
        }
    }

    pub fn on_resize(&mut self, width: u16, _height: u16) {
        self.connector.mark_dirty();
        self.scroll.request_follow();
        let want_mobile = self
            .config
            .layout
            .is_mobile(width, self.config.mobile_max_width);
        if want_mobile == self.is_mobile() {
            return;
        }
        let count = self.count();
        let mut mode = build_mode(&self.content, &self.config, want_mobile);
        match &mut mode {
            Mode::Desktop(n) => {
                n.jump_to(count);
                n.take_events();
            }
            Mode::Mobile(m) => {
                m.jump_to(count.saturating_sub(1));
                m.take_events();
            }
        }
        log::info!(
            "switched to {} layout at step {count}",
            if want_mobile { "mobile" } else { "desktop" }
        );
        self.mode = mode;
        self.focus = None;
        self.connector.cancel();
    }
}

fn build_mode(content: &Content, config: &AppConfig, mobile: bool) -> Mode {
    if mobile {
        Mode::Mobile(LinearNavigator::new(content, &config.timing))
    } else {
        Mode::Desktop(Navigator::new(content, &config.timing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutMode;
    use crate::domain::geometry::Rect;
    use crate::sim::overlay::OverlayState;

    fn app(layout: LayoutMode) -> App {
        let content = Content::embedded().unwrap();
        let config = AppConfig { layout, ..AppConfig::default() };
        App::new(content, config, 120)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn keys_map_per_phase() {
        assert_eq!(key_action(Phase::Landing, &key(KeyCode::Enter)), Some(Action::Continue));
        assert_eq!(key_action(Phase::Journey, &key(KeyCode::Enter)), Some(Action::ToggleFocused));
        assert_eq!(key_action(Phase::Journey, &key(KeyCode::Left)), Some(Action::Back));
        assert_eq!(key_action(Phase::Landing, &key(KeyCode::Left)), None);
        assert_eq!(key_action(Phase::Journey, &key(KeyCode::Char('3'))), Some(Action::OpenCta(2)));
        assert_eq!(
            key_action(Phase::Journey, &KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn landing_then_journey_keeps_progress() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Desktop);
        a.apply(Action::Continue, t0);
        assert_eq!(a.phase, Phase::Journey);
        a.apply(Action::Continue, t0);
        assert_eq!(a.count(), 2);
        a.apply(Action::Intro, t0);
        assert_eq!(a.phase, Phase::Landing);
        a.apply(Action::ToggleBackground, t0);
        assert!(a.show_background);
        a.apply(Action::Continue, t0);
        assert_eq!(a.count(), 2);
    }

    #[test]
    fn focus_cycles_over_visible_nodes() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Desktop);
        a.apply(Action::Continue, t0);
        a.apply(Action::Continue, t0);
        a.apply(Action::FocusNext, t0);
        assert_eq!(a.focus, Some(NodeRef::Step { pathway: 0, node: 0 }));
        a.apply(Action::FocusNext, t0);
        a.apply(Action::FocusNext, t0);
        assert_eq!(a.focus, Some(NodeRef::Step { pathway: 0, node: 0 }));
        a.apply(Action::FocusPrev, t0);
        assert_eq!(a.focus, Some(NodeRef::Step { pathway: 0, node: 1 }));
        a.apply(Action::ToggleFocused, t0);
        assert_eq!(
            a.overlays().state(),
            OverlayState::NodeExpanded(NodeRef::Step { pathway: 0, node: 1 })
        );
        a.apply(Action::Back, t0);
        assert_eq!(a.focus, None, "focus on a hidden node is dropped");
    }

    #[test]
    fn digit_opens_the_expanded_nodes_evidence() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Desktop);
        a.apply(Action::Continue, t0);
        a.apply(Action::ToggleFocused, t0);
        let node = NodeRef::Step { pathway: 0, node: 0 };
        let has = a.content.node(node).map_or(false, evidence::has_evidence);
        a.apply(Action::OpenCta(0), t0);
        if has {
            assert!(matches!(a.overlays().state(), OverlayState::EvidenceOpen { .. }));
        } else {
            assert_eq!(a.overlays().state(), OverlayState::NodeExpanded(node));
        }
    }

    #[test]
    fn clicks_route_through_the_overlay_coordinator() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Desktop);
        a.apply(Action::Continue, t0);
        a.apply(Action::Overview, t0);
        let mut layout = LayoutSnapshot::new();
        layout.add_target(Rect::new(0, 0, 5, 1), Hit::Nav(NavButton::Continue));
        layout.begin_modal(Rect::new(10, 2, 40, 20));
        layout.add_target(Rect::new(12, 5, 20, 1), Hit::OverviewEntry(9));

        // Inside the guard window the press is swallowed.
        a.click_at(Point::new(0, 0), &layout, t0);
        assert!(a.overlays().overview_open());

        let later = t0 + std::time::Duration::from_millis(50);
        a.click_at(Point::new(12, 5), &layout, later);
        assert_eq!(a.count(), 9);
        assert!(a.overlays().is_closed());
    }

    #[test]
    fn mobile_swipe_moves_and_tap_clicks() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Mobile);
        a.apply(Action::Continue, t0);
        let layout = LayoutSnapshot::new();
        a.handle_input(&InputEvent::MouseDown { x: 80, y: 10 }, &layout, t0);
        a.handle_input(&InputEvent::MouseDrag { x: 50, y: 11 }, &layout, t0);
        a.handle_input(&InputEvent::MouseUp { x: 20, y: 11 }, &layout, t0);
        assert_eq!(a.count(), 2);

        a.handle_input(&InputEvent::MouseDown { x: 80, y: 10 }, &layout, t0);
        a.handle_input(&InputEvent::MouseUp { x: 80, y: 10 }, &layout, t0);
        assert_eq!(a.count(), 2);
    }

    #[test]
    fn resizing_across_the_breakpoint_keeps_the_step() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Auto);
        assert!(!a.is_mobile());
        a.apply(Action::Continue, t0);
        a.apply(Action::Continue, t0);
        a.apply(Action::Continue, t0);
        a.on_resize(60, 40);
        assert!(a.is_mobile());
        assert_eq!(a.count(), 3);
        a.on_resize(140, 40);
        assert!(!a.is_mobile());
        assert_eq!(a.count(), 3);
    }
}
