//! Scroll owner abstraction and listener registration.
//!
//! A [`ScrollSurface`] is whatever scrolls: the whole viewport in fullsize
//! mode or a bounded container otherwise. Hosts forward raw scroll and resize
//! signals to subscribed [`SurfaceListener`]s; the registration lives as long
//! as the returned [`Subscription`].

use core::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::settings::Axis;

/// Raw physical scroll offsets as reported by the scroll owner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollPosition {
    pub left: f32,
    pub top: f32,
}

impl ScrollPosition {
    pub fn new(left: f32, top: f32) -> Self {
        Self { left, top }
    }

    pub fn along(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.left,
            Axis::Vertical => self.top,
        }
    }
}

/// Width/height pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn along(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }
}

/// Receives raw signals from a scroll owner.
pub trait SurfaceListener: Send + Sync {
    fn on_scroll(&self);
    fn on_resize(&self);
}

/// The element (or viewport) that scrolls.
pub trait ScrollSurface: Send + Sync {
    /// Current raw scroll offsets.
    fn scroll_position(&self) -> ScrollPosition;

    /// Move to raw offsets. Hosts report the move back as a scroll signal.
    fn scroll_to(&self, left: f32, top: f32);

    /// Visible size.
    fn client_size(&self) -> Size;

    /// Total scrollable content size.
    fn content_size(&self) -> Size;

    /// False once the render surface is gone; manager operations become no-ops.
    fn is_attached(&self) -> bool {
        true
    }

    /// Register for scroll and resize signals.
    fn subscribe(&self, listener: Weak<dyn SurfaceListener>) -> Subscription;
}

/// Scoped listener registration. Dropping it unregisters the listener.
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Registration with nothing to undo.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Unregister now.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_release();
    }
}

type ListenerEntries = Vec<(u64, Weak<dyn SurfaceListener>)>;

/// Listener bookkeeping for [`ScrollSurface`] implementations.
#[derive(Clone, Default)]
pub struct ListenerSet {
    inner: Arc<Mutex<ListenerState>>,
}

#[derive(Default)]
struct ListenerState {
    next_id: u64,
    entries: ListenerEntries,
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener; the returned subscription removes it.
    pub fn add(&self, listener: Weak<dyn SurfaceListener>) -> Subscription {
        let Ok(mut state) = self.inner.lock() else {
            return Subscription::noop();
        };
        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1);
        state.entries.push((id, listener));
        drop(state);

        let weak_state = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(state) = weak_state.upgrade() {
                if let Ok(mut state) = state.lock() {
                    state.entries.retain(|(entry_id, _)| *entry_id != id);
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|state| state.entries.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live(&self) -> Vec<Arc<dyn SurfaceListener>> {
        let Ok(mut state) = self.inner.lock() else {
            return Vec::new();
        };
        state.entries.retain(|(_, listener)| listener.strong_count() > 0);
        state
            .entries
            .iter()
            .filter_map(|(_, listener)| listener.upgrade())
            .collect()
    }

    /// Deliver a scroll signal. Listeners run without the set locked.
    pub fn notify_scroll(&self) {
        for listener in self.live() {
            listener.on_scroll();
        }
    }

    /// Deliver a resize signal.
    pub fn notify_resize(&self) {
        for listener in self.live() {
            listener.on_resize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        scrolls: AtomicUsize,
        resizes: AtomicUsize,
    }

    impl SurfaceListener for Counting {
        fn on_scroll(&self) {
            self.scrolls.fetch_add(1, Ordering::SeqCst);
        }

        fn on_resize(&self) {
            self.resizes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let set = ListenerSet::new();
        let listener = Arc::new(Counting::default());
        let weak: Weak<dyn SurfaceListener> = Arc::downgrade(&listener) as Weak<dyn SurfaceListener>;
        let sub = set.add(weak);

        set.notify_scroll();
        set.notify_resize();
        assert_eq!(listener.scrolls.load(Ordering::SeqCst), 1);
        assert_eq!(listener.resizes.load(Ordering::SeqCst), 1);

        drop(sub);
        set.notify_scroll();
        assert_eq!(listener.scrolls.load(Ordering::SeqCst), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn dead_listeners_are_pruned() {
        let set = ListenerSet::new();
        let listener = Arc::new(Counting::default());
        let weak: Weak<dyn SurfaceListener> = Arc::downgrade(&listener) as Weak<dyn SurfaceListener>;
        let _sub = set.add(weak);
        drop(listener);
        set.notify_scroll();
        assert!(set.is_empty());
    }
}
