//! Global input listeners and background scroll suppression.
//!
//! Both are scoped resources: acquiring returns a guard, dropping the guard
//! releases it. Overlays hold their guards for exactly as long as they are
//! open, so every close path (explicit close, replacement by another
//! overlay, StartOver, teardown of the whole coordinator) releases them.
//!
//! Single-threaded by construction (`Rc`), matching the UI event loop.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;

/// Which disclosure layer owns a listener.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Layer {
    /// Inline node expansion.
    Inline,
    /// Evidence / reform / overview modal.
    Modal,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ListenerKind {
    Escape,
    OutsideClick,
}

#[derive(Debug)]
struct Entry {
    id: u64,
    kind: ListenerKind,
    layer: Layer,
    /// Events before this instant are swallowed.
    armed_at: Instant,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    entries: Vec<Entry>,
}

#[derive(Clone, Debug, Default)]
pub struct ListenerRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        ListenerRegistry::default()
    }

    pub fn register(&self, kind: ListenerKind, layer: Layer, armed_at: Instant) -> ListenerGuard {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.push(Entry { id, kind, layer, armed_at });
        ListenerGuard {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recently registered, armed listener of `kind`.
    pub fn topmost(&self, kind: ListenerKind, now: Instant) -> Option<Layer> {
        self.inner
            .borrow()
            .entries
            .iter()
            .rev()
            .find(|e| e.kind == kind && now >= e.armed_at)
            .map(|e| e.layer)
    }

}

/// Deregisters its listener on drop.
#[derive(Debug)]
pub struct ListenerGuard {
    id: u64,
    registry: Weak<RefCell<RegistryInner>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            inner.borrow_mut().entries.retain(|e| e.id != self.id);
        }
    }
}

/// Reference-counted lock on background scrolling.
#[derive(Clone, Debug, Default)]
pub struct ScrollLock {
    holds: Rc<Cell<usize>>,
}

impl ScrollLock {
    pub fn new() -> Self {
        ScrollLock::default()
    }

    pub fn acquire(&self) -> ScrollGuard {
        self.holds.set(self.holds.get() + 1);
        ScrollGuard {
            holds: Rc::clone(&self.holds),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.holds.get() > 0
    }

    pub fn holds(&self) -> usize {
        self.holds.get()
    }
}

#[derive(Debug)]
pub struct ScrollGuard {
    holds: Rc<Cell<usize>>,
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        self.holds.set(self.holds.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn dropping_a_guard_deregisters() {
        let registry = ListenerRegistry::new();
        let now = Instant::now();
        let a = registry.register(ListenerKind::Escape, Layer::Inline, now);
        let b = registry.register(ListenerKind::Escape, Layer::Modal, now);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.topmost(ListenerKind::Escape, now), Some(Layer::Modal));
        drop(b);
        assert_eq!(registry.topmost(ListenerKind::Escape, now), Some(Layer::Inline));
        drop(a);
        assert!(registry.is_empty());
    }

    #[test]
    fn unarmed_listeners_are_skipped() {
        let registry = ListenerRegistry::new();
        let now = Instant::now();
        let _g = registry.register(
            ListenerKind::OutsideClick,
            Layer::Modal,
            now + Duration::from_millis(10),
        );
        assert_eq!(registry.topmost(ListenerKind::OutsideClick, now), None);
        assert_eq!(
            registry.topmost(ListenerKind::OutsideClick, now + Duration::from_millis(10)),
            Some(Layer::Modal)
        );
    }

    #[test]
    fn guard_outliving_registry_is_harmless() {
        let registry = ListenerRegistry::new();
        let guard = registry.register(ListenerKind::Escape, Layer::Modal, Instant::now());
        drop(registry);
        drop(guard);
    }

    #[test]
    fn scroll_lock_is_released_on_every_drop() {
        let lock = ScrollLock::new();
        let a = lock.acquire();
        let b = lock.acquire();
        assert!(lock.is_locked());
        drop(a);
        assert!(lock.is_locked());
        drop(b);
        assert!(!lock.is_locked());
    }
}
