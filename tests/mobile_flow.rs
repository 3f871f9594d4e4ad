//! Mobile linear flow: interstitials, skipped reforms and swipes.

use std::time::Instant;

use pathways::config::{SwipeConfig, TimingConfig};
use pathways::domain::progress::Element;
use pathways::sim::event::NavEvent;
use pathways::sim::linear::{LinearNavigator, OverviewHeader};
use pathways::ui::swipe::{SwipeDir, SwipeTracker};
use pretty_assertions::assert_eq;

fn linear(reforms: Vec<bool>) -> LinearNavigator {
    LinearNavigator::with_reforms(reforms, &TimingConfig::default())
}

#[test]
fn impact_stops_for_the_interstitial() {
    let t0 = Instant::now();
    let mut n = linear(vec![true; 3]);
    n.advance(t0);
    n.advance(t0);
    assert_eq!(n.index(), 2);
    assert!(n.stops_for_overview());

    assert!(n.advance(t0));
    assert_eq!(n.index(), 2, "the interstitial does not move");
    assert_eq!(n.overview(), Some(false));
    assert_eq!(n.overview_header(), OverviewHeader::Explored { explored: 1, of: 3 });
    assert!(n
        .take_events()
        .contains(&NavEvent::InterstitialShown { after_pathway: Some(0) }));

    assert!(n.advance(t0));
    assert_eq!(n.index(), 3);
    assert_eq!(n.current(), Element::Reform { pathway: 0 });
    assert_eq!(n.overview(), None);
}

#[test]
fn back_on_the_interstitial_only_closes_it() {
    let t0 = Instant::now();
    let mut n = linear(vec![true; 3]);
    n.jump_to(2);
    n.advance(t0);
    assert_eq!(n.overview(), Some(false));

    assert!(n.back(t0));
    assert_eq!(n.index(), 2);
    assert_eq!(n.overview(), None);

    assert!(n.back(t0));
    assert_eq!(n.index(), 1);
}

#[test]
fn missing_reforms_are_stepped_over_both_ways() {
    let t0 = Instant::now();
    let mut n = linear(vec![false, true, true]);
    n.jump_to(2);
    n.advance(t0);
    n.advance(t0);
    assert_eq!(n.index(), 4);
    assert_eq!(n.current(), Element::Node { pathway: 1, node: 0 });

    n.back(t0);
    assert_eq!(n.index(), 2);

    assert_eq!(n.jump_to(3), 4, "jumping onto a missing reform lands after it");
    assert!(!n.overview_items().contains(&Element::Reform { pathway: 0 }));
}

#[test]
fn completion_disables_continue_and_drops_impact_stops() {
    let t0 = Instant::now();
    let mut n = linear(vec![true; 3]);
    n.jump_to(12);
    assert!(n.is_complete());
    assert!(n.has_completed_once());

    assert!(n.advance(t0));
    assert_eq!(n.overview(), Some(false));
    assert_eq!(n.overview_header(), OverviewHeader::AllExplored);
    assert!(n.continue_disabled());
    assert!(!n.advance(t0));
    assert_eq!(n.overview_items().len(), 13);

    n.jump_to(2);
    assert!(!n.stops_for_overview());
    n.advance(t0);
    assert_eq!(n.index(), 3);
}

#[test]
fn reform_flags_jump_to_the_reform_item() {
    let mut n = linear(vec![true; 3]);
    assert_eq!(n.jump_to_reform(1), 7);
    assert_eq!(n.current(), Element::Reform { pathway: 1 });
    assert!(n.overlays().is_closed());
}

#[test]
fn full_map_lists_explored_items_before_completion() {
    let t0 = Instant::now();
    let mut n = linear(vec![true; 3]);
    n.jump_to(5);
    n.show_full_map(t0);
    assert_eq!(n.overview(), Some(true));
    assert_eq!(n.overview_header(), OverviewHeader::TapAnyNode);
    assert_eq!(n.overview_items().len(), 6);
    assert!(!n.continue_disabled());
}

#[test]
fn reform_details_open_only_on_reform_items() {
    let t0 = Instant::now();
    let mut n = linear(vec![true; 3]);
    assert!(!n.open_reform_details(t0));
    n.jump_to(3);
    assert!(n.open_reform_details(t0));
    assert!(n.toggle_reform_evidence());
    assert!(n.overlays().scroll_locked());

    n.advance(t0);
    assert_eq!(n.index(), 4);
    assert!(n.overlays().is_closed());
    assert_eq!(n.overlays().listener_count(), 0);
}

#[test]
fn back_is_disabled_only_at_the_first_item_with_nothing_open() {
    let t0 = Instant::now();
    let mut n = linear(vec![true; 3]);
    assert!(n.back_disabled());
    n.toggle_expanded(t0);
    assert!(n.is_expanded());
    assert!(!n.back_disabled());
    assert!(n.back(t0));
    assert!(n.back_disabled());
}

#[test]
fn swipes_need_distance_and_a_horizontal_drag() {
    let cfg = SwipeConfig::default();
    let mut s = SwipeTracker::new(&cfg);

    s.begin(100, 10);
    s.moved(70, 11);
    assert_eq!(s.end(20, 12), Some(SwipeDir::Left));

    s.begin(10, 10);
    assert_eq!(s.end(80, 10), Some(SwipeDir::Right));

    s.begin(50, 10);
    assert_eq!(s.end(70, 10), None, "too short");

    s.begin(50, 0);
    s.moved(55, 40);
    assert_eq!(s.end(120, 80), None, "vertical drag");

    s.begin(30, 5);
    assert_eq!(s.end(30, 5), None, "tap");
}
