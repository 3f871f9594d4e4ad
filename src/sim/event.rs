/// Events emitted by navigation operations.
/// The frame loop drains them for logging and to poke the connector engine.

use crate::domain::content::NodeRef;
use crate::domain::progress::Element;
use crate::sim::overlay::{Closed, Modal};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavEvent {
    /// Continue revealed a new element (node, reform slot or destination).
    Revealed { element: Element, count: usize },
    ReformOpened { pathway: usize },
    Retreated { count: usize },
    Reset,
    Jumped { from: usize, to: usize },
    JourneyComplete,
    NodeToggled { node: NodeRef, expanded: bool },
    ModalOpened(Modal),
    OverlayClosed(Closed),
    /// Mobile only: the overview interstitial appeared on its own.
    InterstitialShown { after_pathway: Option<usize> },
}

impl NavEvent {
    /// True when the event changes what the desktop layout looks like.
    pub fn affects_layout(&self) -> bool {
        !matches!(self, NavEvent::ModalOpened(_) | NavEvent::InterstitialShown { .. })
    }

    pub fn log(&self) {
        log::debug!("nav: {self:?}");
    }
}
