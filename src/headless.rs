//! In-memory scroll owner and views.
//!
//! [`MemoryStage`] lays mounted [`MemoryView`]s end to end along one axis and
//! scrolls like a clamped container. Views render instantly (or after a
//! configured delay) to a fixed extent per section. Useful for driving a
//! [`ContinuousManager`](crate::ContinuousManager) without a host renderer,
//! and as the fixture behind the crate's own tests.

use core::time::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::error::RenderError;
use crate::section::SectionRef;
use crate::settings::Axis;
use crate::surface::{ListenerSet, ScrollPosition, ScrollSurface, Size, Subscription, SurfaceListener};
use crate::view::{RenderFuture, RenderRequest, View, ViewBounds, ViewFactory, ViewNotifier, ViewRef};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct StageState {
    client: Size,
    scroll: ScrollPosition,
    attached: bool,
}

/// Scroll container whose content is the views registered with it.
#[derive(Debug)]
pub struct MemoryStage {
    axis: Axis,
    right_to_left: bool,
    state: Mutex<StageState>,
    views: Mutex<Vec<Weak<MemoryView>>>,
    listeners: ListenerSet,
}

impl MemoryStage {
    pub fn new(axis: Axis, client: Size) -> Arc<Self> {
        Self::build(axis, false, client)
    }

    /// Horizontal stage for right-to-left documents. The start of the
    /// content is at the right edge and `left` runs from zero into negative
    /// values as the reader moves forward.
    pub fn right_to_left(client: Size) -> Arc<Self> {
        Self::build(Axis::Horizontal, true, client)
    }

    fn build(axis: Axis, right_to_left: bool, client: Size) -> Arc<Self> {
        Arc::new(Self {
            axis,
            right_to_left,
            state: Mutex::new(StageState {
                client,
                scroll: ScrollPosition::default(),
                attached: true,
            }),
            views: Mutex::new(Vec::new()),
            listeners: ListenerSet::new(),
        })
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn is_right_to_left(&self) -> bool {
        self.right_to_left
    }

    /// Change the client size and signal a resize.
    pub fn resize(&self, width: f32, height: f32) {
        lock(&self.state).client = Size::new(width, height);
        self.listeners.notify_resize();
    }

    /// Stop reporting as attached; managers over a detached stage go inert.
    pub fn detach(&self) {
        lock(&self.state).attached = false;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn register(&self, view: &Arc<MemoryView>) {
        let mut views = lock(&self.views);
        views.retain(|view| view.strong_count() > 0);
        views.push(Arc::downgrade(view));
    }

    /// Sum of the extents of views not yet destroyed.
    fn content_extent(&self) -> f32 {
        let views: Vec<Arc<MemoryView>> = lock(&self.views)
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        views
            .iter()
            .filter(|view| !view.is_destroyed())
            .map(|view| view.bounds().extent(self.axis))
            .sum()
    }

    fn max_scroll(&self, client: Size) -> ScrollPosition {
        let content = self.content_size();
        ScrollPosition::new(
            (content.width - client.width).max(0.0),
            (content.height - client.height).max(0.0),
        )
    }
}

impl ScrollSurface for MemoryStage {
    fn scroll_position(&self) -> ScrollPosition {
        lock(&self.state).scroll
    }

    fn scroll_to(&self, left: f32, top: f32) {
        let client = lock(&self.state).client;
        let max = self.max_scroll(client);
        let left = if self.right_to_left {
            left.clamp(-max.left, 0.0)
        } else {
            left.clamp(0.0, max.left)
        };
        let target = ScrollPosition::new(left, top.clamp(0.0, max.top));
        let moved = {
            let mut state = lock(&self.state);
            let moved = state.scroll != target;
            state.scroll = target;
            moved
        };
        if moved {
            self.listeners.notify_scroll();
        }
    }

    fn client_size(&self) -> Size {
        lock(&self.state).client
    }

    fn content_size(&self) -> Size {
        let client = lock(&self.state).client;
        let extent = self.content_extent();
        match self.axis {
            Axis::Horizontal => Size::new(extent, client.height),
            Axis::Vertical => Size::new(client.width, extent),
        }
    }

    fn is_attached(&self) -> bool {
        lock(&self.state).attached
    }

    fn subscribe(&self, listener: Weak<dyn SurfaceListener>) -> Subscription {
        self.listeners.add(listener)
    }
}

#[derive(Debug, Default)]
struct Profile {
    default_extent: f32,
    extents: HashMap<usize, f32>,
    failing: HashSet<usize>,
    writing_modes: HashMap<usize, String>,
    render_delay: Duration,
}

/// Creates [`MemoryView`]s on a [`MemoryStage`].
#[derive(Debug)]
pub struct MemoryViewFactory {
    stage: Arc<MemoryStage>,
    profile: Mutex<Profile>,
    created: Mutex<Vec<Arc<MemoryView>>>,
}

impl MemoryViewFactory {
    /// Every section renders to `default_extent` along the stage axis.
    pub fn new(stage: Arc<MemoryStage>, default_extent: f32) -> Arc<Self> {
        Arc::new(Self {
            stage,
            profile: Mutex::new(Profile {
                default_extent,
                ..Profile::default()
            }),
            created: Mutex::new(Vec::new()),
        })
    }

    /// Override the rendered extent of one section.
    pub fn set_extent(&self, section_index: usize, extent: f32) {
        lock(&self.profile).extents.insert(section_index, extent);
    }

    /// Make every render of `section_index` fail.
    pub fn fail_section(&self, section_index: usize) {
        lock(&self.profile).failing.insert(section_index);
    }

    /// Have `section_index` report a CSS writing mode when it renders.
    pub fn set_writing_mode(&self, section_index: usize, css_value: &str) {
        lock(&self.profile)
            .writing_modes
            .insert(section_index, css_value.to_owned());
    }

    /// Delay every render by `delay`.
    pub fn set_render_delay(&self, delay: Duration) {
        lock(&self.profile).render_delay = delay;
    }

    /// Every view ever created for `section_index`, oldest first.
    pub fn views_for(&self, section_index: usize) -> Vec<Arc<MemoryView>> {
        lock(&self.created)
            .iter()
            .filter(|view| view.section.index() == section_index)
            .cloned()
            .collect()
    }

    pub fn created_count(&self) -> usize {
        lock(&self.created).len()
    }

    /// Views created and not yet destroyed.
    pub fn live_count(&self) -> usize {
        lock(&self.created)
            .iter()
            .filter(|view| !view.is_destroyed())
            .count()
    }
}

impl ViewFactory for MemoryViewFactory {
    fn create_view(&self, section: SectionRef, notifier: ViewNotifier) -> ViewRef {
        let section_index = section.index();
        let (extent, fails, writing_mode, delay) = {
            let profile = lock(&self.profile);
            (
                profile
                    .extents
                    .get(&section_index)
                    .copied()
                    .unwrap_or(profile.default_extent),
                profile.failing.contains(&section_index),
                profile.writing_modes.get(&section_index).cloned(),
                profile.render_delay,
            )
        };
        let view = Arc::new_cyclic(|me| MemoryView {
            me: me.clone(),
            section,
            notifier,
            stage: Arc::downgrade(&self.stage),
            extent,
            fails,
            writing_mode,
            delay,
            state: Mutex::new(MemoryViewState::default()),
        });
        self.stage.register(&view);
        lock(&self.created).push(Arc::clone(&view));
        view
    }
}

#[derive(Debug, Default)]
struct MemoryViewState {
    bounds: ViewBounds,
    shown: bool,
    destroyed: bool,
    displays: usize,
    last_request: Option<RenderRequest>,
}

/// A section rendered to a fixed extent.
#[derive(Debug)]
pub struct MemoryView {
    me: Weak<MemoryView>,
    section: SectionRef,
    notifier: ViewNotifier,
    stage: Weak<MemoryStage>,
    extent: f32,
    fails: bool,
    writing_mode: Option<String>,
    delay: Duration,
    state: Mutex<MemoryViewState>,
}

impl MemoryView {
    pub fn is_shown(&self) -> bool {
        lock(&self.state).shown
    }

    pub fn is_destroyed(&self) -> bool {
        lock(&self.state).destroyed
    }

    /// How many times a render was attempted.
    pub fn display_count(&self) -> usize {
        lock(&self.state).displays
    }

    pub fn last_request(&self) -> Option<RenderRequest> {
        lock(&self.state).last_request
    }

    fn render(&self, request: RenderRequest) -> Result<(), RenderError> {
        let section_index = self.section.index();
        let cross = self
            .stage
            .upgrade()
            .map(|stage| stage.client_size())
            .unwrap_or_default();
        let bounds = {
            let mut state = lock(&self.state);
            if state.destroyed {
                return Err(RenderError::new(section_index, "view destroyed"));
            }
            state.displays += 1;
            state.last_request = Some(request);
            if self.fails {
                return Err(RenderError::new(section_index, "content failed to load"));
            }
            let (width, height) = match request.axis {
                Axis::Horizontal => (self.extent, cross.height),
                Axis::Vertical => (cross.width, self.extent),
            };
            let previous = state.bounds;
            state.bounds = ViewBounds {
                width,
                height,
                width_delta: width - previous.width,
                height_delta: height - previous.height,
            };
            state.bounds
        };

        if let Some(mode) = self.writing_mode.as_deref() {
            self.notifier.writing_mode(mode);
        }
        if bounds.width_delta != 0.0 || bounds.height_delta != 0.0 {
            self.notifier.resized(bounds);
        }
        Ok(())
    }
}

impl View for MemoryView {
    fn section(&self) -> &SectionRef {
        &self.section
    }

    fn display(&self, request: &RenderRequest) -> RenderFuture {
        let view = self.me.upgrade();
        let request = *request;
        let section_index = self.section.index();
        Box::pin(async move {
            let Some(view) = view else {
                return Err(RenderError::new(section_index, "view dropped"));
            };
            if !view.delay.is_zero() {
                tokio::time::sleep(view.delay).await;
            }
            view.render(request)
        })
    }

    fn show(&self) {
        lock(&self.state).shown = true;
    }

    fn hide(&self) {
        lock(&self.state).shown = false;
    }

    fn bounds(&self) -> ViewBounds {
        lock(&self.state).bounds
    }

    fn destroy(&self) {
        let mut state = lock(&self.state);
        state.destroyed = true;
        state.shown = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::section::Spine;

    fn request(axis: Axis) -> RenderRequest {
        RenderRequest {
            layout: Layout::default(),
            axis,
        }
    }

    #[tokio::test]
    async fn content_grows_with_rendered_views() {
        let stage = MemoryStage::new(Axis::Vertical, Size::new(600.0, 100.0));
        let factory = MemoryViewFactory::new(Arc::clone(&stage), 1000.0);
        factory.set_extent(1, 400.0);
        let spine = Spine::numbered(3);

        let first = factory.create_view(spine.section(0).expect("s0"), ViewNotifier::detached(0));
        let second = factory.create_view(spine.section(1).expect("s1"), ViewNotifier::detached(1));
        assert_eq!(stage.content_size().height, 0.0);

        first.display(&request(Axis::Vertical)).await.expect("render");
        second.display(&request(Axis::Vertical)).await.expect("render");
        assert_eq!(stage.content_size(), Size::new(600.0, 1400.0));
        assert_eq!(second.bounds().height_delta, 400.0);

        first.destroy();
        assert_eq!(stage.content_size().height, 400.0);
        assert_eq!(factory.live_count(), 1);
    }

    #[tokio::test]
    async fn scroll_is_clamped_to_content() {
        let stage = MemoryStage::new(Axis::Vertical, Size::new(600.0, 100.0));
        let factory = MemoryViewFactory::new(Arc::clone(&stage), 500.0);
        let spine = Spine::numbered(1);
        let view = factory.create_view(spine.section(0).expect("s0"), ViewNotifier::detached(0));
        view.display(&request(Axis::Vertical)).await.expect("render");

        stage.scroll_to(50.0, 1000.0);
        assert_eq!(stage.scroll_position(), ScrollPosition::new(0.0, 400.0));
        stage.scroll_to(0.0, -20.0);
        assert_eq!(stage.scroll_position(), ScrollPosition::new(0.0, 0.0));
    }

    #[tokio::test]
    async fn right_to_left_stage_scrolls_into_negative_offsets() {
        let stage = MemoryStage::right_to_left(Size::new(600.0, 800.0));
        let factory = MemoryViewFactory::new(Arc::clone(&stage), 1000.0);
        let spine = Spine::numbered(1);
        let view = factory.create_view(spine.section(0).expect("s0"), ViewNotifier::detached(0));
        view.display(&request(Axis::Horizontal)).await.expect("render");
        assert_eq!(stage.content_size(), Size::new(1000.0, 800.0));

        stage.scroll_to(-250.0, 0.0);
        assert_eq!(stage.scroll_position().left, -250.0);
        stage.scroll_to(-900.0, 0.0);
        assert_eq!(stage.scroll_position().left, -400.0);
        stage.scroll_to(30.0, 0.0);
        assert_eq!(stage.scroll_position().left, 0.0);
    }

    #[tokio::test]
    async fn failing_section_counts_attempts() {
        let stage = MemoryStage::new(Axis::Vertical, Size::new(600.0, 100.0));
        let factory = MemoryViewFactory::new(Arc::clone(&stage), 500.0);
        factory.fail_section(0);
        let spine = Spine::numbered(1);
        let view = factory.create_view(spine.section(0).expect("s0"), ViewNotifier::detached(0));

        let err = view
            .display(&request(Axis::Vertical))
            .await
            .expect_err("configured to fail");
        assert_eq!(err.section_index, 0);
        assert_eq!(factory.views_for(0)[0].display_count(), 1);
        assert_eq!(view.bounds(), ViewBounds::default());
    }
}
