//! Continuous windowed view manager.
//!
//! Keeps a bounded, contiguous window of rendered sections around the
//! visible range while the reader scrolls or pages through a spine:
//!
//! - `check` grows the window at either end until the visible range plus the
//!   lookahead margin is covered, then recomputes which views are shown.
//! - `trim` evicts views outside the shown range, keeping one buffer view on
//!   each side, and scrolls to compensate for content removed above.
//! - `next`/`prev` turn page requests into scroll deltas.
//!
//! All of the above run through one [`TaskQueue`], so at most one window
//! mutation is in flight. Raw scroll and resize signals only ever enqueue
//! work.

use core::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::join_all;
use smallvec::SmallVec;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::error::ManagerError;
use crate::layout::{Layout, LayoutKind};
use crate::queue::TaskQueue;
use crate::scroll::{ScrollPolicy, ScrollState, ScrollTracker};
use crate::section::SectionRef;
use crate::settings::{
    Axis, Flow, Settings, SnapOptions, WritingMode, SCROLLED_DEBOUNCE, SCROLL_DELTA_RESET,
    TRIM_DELAY,
};
use crate::surface::{ScrollPosition, ScrollSurface, Subscription, SurfaceListener};
use crate::timer::Debounce;
use crate::view::{
    RenderFuture, RenderRequest, ViewBounds, ViewFactory, ViewNotifier, ViewRef, ViewSignalSink,
};
use crate::window::ViewWindow;

const EVENT_CAPACITY: usize = 64;

/// Notifications emitted by the manager.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ManagerEvent {
    /// A mounted view changed size.
    Resize { section_index: usize },
    /// A burst of scroll signals settled into one scroll pass.
    Scroll { top: f32, left: f32 },
    /// Scrolling came to rest.
    Scrolled { top: f32, left: f32 },
}

/// Snap-to-page collaborator for paginated flows.
pub trait Snapper: Send + Sync {
    /// A snap correction is about to move the stage.
    fn needs_snap(&self) -> bool;
    fn supports_touch(&self) -> bool;
    fn destroy(&self);
}

/// Builds a [`Snapper`] whenever a paginated flow with snapping starts.
pub trait SnapFactory: Send + Sync {
    fn create(&self, options: SnapOptions) -> Arc<dyn Snapper>;
}

/// Single-section display capability used for the first section of a
/// `display` call.
pub trait DisplayPrimitive: Send + Sync {
    /// Render `view`.
    fn display(&self, view: &ViewRef, request: &RenderRequest) -> RenderFuture {
        view.display(request)
    }

    /// Offset of `target` inside `view`, relative to the view's start.
    fn locate(&self, _view: &ViewRef, _target: &str) -> Option<ScrollPosition> {
        None
    }
}

/// Renders the view directly and resolves no targets.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectDisplay;

impl DisplayPrimitive for DirectDisplay {}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Where a newly created view enters the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    Front,
    Back,
}

/// Scroll geometry along the active axis.
#[derive(Clone, Copy, Debug)]
struct Measure {
    axis: Axis,
    offset: f32,
    visible_length: f32,
    content_length: f32,
}

enum Visibility {
    Show,
    Render,
    Hide,
}

struct ManagerState {
    axis: Axis,
    writing_mode: WritingMode,
    flow: Flow,
    layout: Layout,
    policy: ScrollPolicy,
    snapper: Option<Arc<dyn Snapper>>,
}

struct Inner {
    me: Weak<Inner>,
    settings: Settings,
    surface: Arc<dyn ScrollSurface>,
    factory: Arc<dyn ViewFactory>,
    base: Arc<dyn DisplayPrimitive>,
    snap_factory: Option<Arc<dyn SnapFactory>>,
    queue: TaskQueue,
    window: Mutex<ViewWindow>,
    state: Mutex<ManagerState>,
    tracker: Mutex<ScrollTracker>,
    scrolled_timer: Debounce,
    after_scrolled_timer: Debounce,
    delta_reset_timer: Debounce,
    trim_timer: Debounce,
    trim_pending: AtomicBool,
    events: broadcast::Sender<ManagerEvent>,
    subscription: Mutex<Option<Subscription>>,
    destroyed: AtomicBool,
}

/// Assembles a [`ContinuousManager`].
pub struct ManagerBuilder {
    settings: Settings,
    surface: Arc<dyn ScrollSurface>,
    factory: Arc<dyn ViewFactory>,
    base: Arc<dyn DisplayPrimitive>,
    snap_factory: Option<Arc<dyn SnapFactory>>,
    layout: Option<Layout>,
}

impl ManagerBuilder {
    /// Replace the first-section display primitive.
    pub fn display_primitive(mut self, base: Arc<dyn DisplayPrimitive>) -> Self {
        self.base = base;
        self
    }

    /// Provide snapping for paginated flows.
    pub fn snap_factory(mut self, factory: Arc<dyn SnapFactory>) -> Self {
        self.snap_factory = Some(factory);
        self
    }

    /// Start from a publication layout instead of a reflowable default.
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Build the manager and subscribe it to the scroll owner.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<ContinuousManager, ManagerError> {
        let handle = Handle::try_current().map_err(|_| ManagerError::NoRuntime)?;
        let settings = self.settings;
        let axis = settings.axis;

        let client = self.surface.client_size();
        let mut layout = self
            .layout
            .unwrap_or_else(|| Layout::new(LayoutKind::Reflowable, settings.flow, false));
        layout.flow = settings.flow;
        layout.spread_suppressed = axis == Axis::Vertical;
        layout.calculate(client.width, client.height, settings.gap);

        let writing_mode = WritingMode::Horizontal;
        let policy = ScrollPolicy::new(&settings, axis, writing_mode);
        let position = policy.viewport_position(self.surface.scroll_position());
        let tracker = ScrollTracker::new(position);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Arc::new_cyclic(|me| Inner {
            me: me.clone(),
            queue: TaskQueue::with_handle(&handle),
            window: Mutex::new(ViewWindow::new()),
            state: Mutex::new(ManagerState {
                axis,
                writing_mode,
                flow: settings.flow,
                layout,
                policy,
                snapper: None,
            }),
            tracker: Mutex::new(tracker),
            scrolled_timer: Debounce::new(handle.clone(), SCROLLED_DEBOUNCE),
            after_scrolled_timer: Debounce::new(handle.clone(), settings.after_scrolled_delay()),
            delta_reset_timer: Debounce::new(handle.clone(), SCROLL_DELTA_RESET),
            trim_timer: Debounce::new(handle, TRIM_DELAY),
            trim_pending: AtomicBool::new(false),
            events,
            subscription: Mutex::new(None),
            destroyed: AtomicBool::new(false),
            settings,
            surface: self.surface,
            factory: self.factory,
            base: self.base,
            snap_factory: self.snap_factory,
        });
        inner.attach();
        Ok(ContinuousManager { inner })
    }
}

/// Windowed continuous view manager.
///
/// Dropping the manager tears it down.
pub struct ContinuousManager {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for ContinuousManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContinuousManager")
            .field("settings", &self.inner.settings)
            .field("sections", &self.section_indices())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

impl ContinuousManager {
    /// Start building a manager over `surface`, creating views with `factory`.
    pub fn builder(
        settings: Settings,
        surface: Arc<dyn ScrollSurface>,
        factory: Arc<dyn ViewFactory>,
    ) -> ManagerBuilder {
        ManagerBuilder {
            settings,
            surface,
            factory,
            base: Arc::new(DirectDisplay),
            snap_factory: None,
            layout: None,
        }
    }

    /// Build with the default display primitive and no snapping.
    pub fn new(
        settings: Settings,
        surface: Arc<dyn ScrollSurface>,
        factory: Arc<dyn ViewFactory>,
    ) -> Result<Self, ManagerError> {
        Self::builder(settings, surface, factory).build()
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Show `section`, optionally scrolled to `target`, then fill the window
    /// around it.
    pub async fn display(
        &self,
        section: SectionRef,
        target: Option<&str>,
    ) -> Result<(), ManagerError> {
        if self.inner.is_inert() {
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        let target = target.map(str::to_owned);
        let shown = self
            .inner
            .queue
            .enqueue(move || inner.display_now(section, target))
            .await
            .and_then(core::convert::identity);
        self.inner.absorb(shown)?;
        let settings = &self.inner.settings;
        let jump_margin = settings.offset + settings.offset_delta;
        Arc::clone(&self.inner).fill(Some(jump_margin)).await
    }

    /// Grow the window until a check reports no growth.
    pub async fn fill(&self) -> Result<(), ManagerError> {
        Arc::clone(&self.inner).fill(None).await
    }

    /// Grow the window around the visible range.
    ///
    /// A non-zero hint replaces the lookahead margin on its axis. Returns
    /// whether any view was added.
    pub async fn check(
        &self,
        offset_left: Option<f32>,
        offset_top: Option<f32>,
    ) -> Result<bool, ManagerError> {
        if self.inner.is_inert() {
            return Ok(false);
        }
        let inner = Arc::clone(&self.inner);
        let grew = self
            .inner
            .queue
            .enqueue(move || async move {
                let margin = inner.margin(offset_left, offset_top);
                inner.check_now(margin).await
            })
            .await;
        self.inner.absorb(grew)
    }

    /// Recompute which views are shown. `margin` defaults to the lookahead
    /// margin.
    pub async fn update(&self, margin: Option<f32>) -> Result<(), ManagerError> {
        if self.inner.is_inert() {
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        let updated = self
            .inner
            .queue
            .enqueue(move || inner.update_now(margin))
            .await;
        self.inner.absorb(updated)
    }

    /// Evict views outside the shown range.
    pub async fn trim(&self) -> Result<(), ManagerError> {
        if self.inner.is_inert() {
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        let trimmed = self
            .inner
            .queue
            .enqueue(move || async move { inner.trim_now() })
            .await;
        self.inner.absorb(trimmed)
    }

    /// Destroy every mounted view.
    pub async fn clear(&self) -> Result<(), ManagerError> {
        if self.inner.is_inert() {
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        let cleared = self
            .inner
            .queue
            .enqueue(move || async move { inner.clear_now() })
            .await;
        self.inner.absorb(cleared)
    }

    /// Resolves once every task queued before this call has settled.
    pub async fn idle(&self) -> Result<(), ManagerError> {
        if self.is_destroyed() {
            return Ok(());
        }
        let idle = self.inner.queue.idle().await;
        self.inner.absorb(idle)
    }

    /// Step forward one page (or one viewport when scrolled).
    pub fn next(&self) {
        Arc::clone(&self.inner).paginate(1.0);
    }

    /// Step back one page (or one viewport when scrolled).
    pub fn prev(&self) {
        Arc::clone(&self.inner).paginate(-1.0);
    }

    /// Jump to an offset, snapping to whole pages when paginated.
    pub fn move_to(&self, offset: ScrollPosition) {
        self.inner.move_to(offset);
    }

    pub fn scroll_by(&self, x: f32, y: f32, silent: bool) {
        self.inner.scroll_by(x, y, silent);
    }

    pub fn scroll_to(&self, left: f32, top: f32, silent: bool) {
        self.inner.scroll_to(left, top, silent);
    }

    /// Switch the scroll axis. Unchanged axes are ignored unless `force`.
    pub fn update_axis(&self, axis: Axis, force: bool) {
        self.inner.update_axis(axis, force);
    }

    pub fn update_writing_mode(&self, mode: WritingMode) {
        self.inner.update_writing_mode(mode);
    }

    /// Switch between paginated and scrolled reading.
    pub fn update_flow(&self, flow: Flow) {
        self.inner.update_flow(flow);
    }

    /// Replace the publication layout and recompute it for the current size.
    pub fn set_layout(&self, layout: Layout) {
        self.inner.set_layout(layout);
    }

    /// Receive manager events.
    pub fn events(&self) -> broadcast::Receiver<ManagerEvent> {
        self.inner.events.subscribe()
    }

    pub fn views(&self) -> Vec<ViewRef> {
        lock(&self.inner.window).views()
    }

    pub fn first(&self) -> Option<ViewRef> {
        lock(&self.inner.window).first().map(|entry| entry.view().clone())
    }

    pub fn last(&self) -> Option<ViewRef> {
        lock(&self.inner.window).last().map(|entry| entry.view().clone())
    }

    pub fn slice(&self, range: Range<usize>) -> Vec<ViewRef> {
        lock(&self.inner.window).slice(range)
    }

    /// Views currently shown.
    pub fn visible(&self) -> Vec<ViewRef> {
        lock(&self.inner.window)
            .iter()
            .filter(|entry| entry.shown)
            .map(|entry| entry.view().clone())
            .collect()
    }

    /// Spine indices of the mounted sections, in window order.
    pub fn section_indices(&self) -> Vec<usize> {
        lock(&self.inner.window).section_indices()
    }

    /// Spine indices of the shown sections.
    pub fn shown_indices(&self) -> Vec<usize> {
        lock(&self.inner.window)
            .iter()
            .filter(|entry| entry.shown)
            .map(|entry| entry.section_index())
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.window).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner.window).is_empty()
    }

    pub fn scroll_state(&self) -> ScrollState {
        lock(&self.inner.tracker).state()
    }

    /// Current logical offset along the active axis.
    pub fn logical_offset(&self) -> f32 {
        self.inner.measure().offset
    }

    pub fn layout(&self) -> Layout {
        lock(&self.inner.state).layout
    }

    pub fn axis(&self) -> Axis {
        self.inner.axis()
    }

    pub fn writing_mode(&self) -> WritingMode {
        lock(&self.inner.state).writing_mode
    }

    pub fn flow(&self) -> Flow {
        lock(&self.inner.state).flow
    }

    pub fn is_paginated(&self) -> bool {
        self.flow() == Flow::Paginated
    }

    pub fn is_rendered(&self) -> bool {
        !self.inner.is_inert()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Tear down: cancel timers, unsubscribe, destroy views, stop the queue.
    /// Safe to call more than once.
    pub fn destroy(&self) {
        self.inner.destroy();
    }
}

impl Drop for ContinuousManager {
    fn drop(&mut self) {
        self.inner.destroy();
    }
}

impl Inner {
    fn attach(&self) {
        let listener: Weak<dyn SurfaceListener> = self.me.clone();
        let subscription = self.surface.subscribe(listener);
        *lock(&self.subscription) = Some(subscription);
        if lock(&self.state).flow == Flow::Paginated {
            self.start_snapper();
        }
    }

    /// Tasks cut short by teardown resolve as no-ops.
    fn absorb<T: Default>(&self, result: Result<T, ManagerError>) -> Result<T, ManagerError> {
        match result {
            Err(ManagerError::QueueClosed) if self.destroyed.load(Ordering::SeqCst) => {
                Ok(T::default())
            }
            other => other,
        }
    }

    fn is_inert(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst) || !self.surface.is_attached()
    }

    fn axis(&self) -> Axis {
        lock(&self.state).axis
    }

    fn emit(&self, event: ManagerEvent) {
        let _ = self.events.send(event);
    }

    fn request(&self) -> RenderRequest {
        let state = lock(&self.state);
        RenderRequest {
            layout: state.layout,
            axis: state.axis,
        }
    }

    fn measure(&self) -> Measure {
        let (axis, policy) = {
            let state = lock(&self.state);
            (state.axis, state.policy)
        };
        let raw = policy
            .viewport_position(self.surface.scroll_position())
            .along(axis);
        let client = self.surface.client_size();
        let visible_length = match axis {
            Axis::Horizontal => client.width.floor(),
            Axis::Vertical => client.height,
        };
        let content_length = self.surface.content_size().along(axis);
        Measure {
            axis,
            offset: policy.normalize(raw, visible_length, content_length),
            visible_length,
            content_length,
        }
    }

    /// Lookahead margin, unless a non-zero hint overrides it on the active axis.
    fn margin(&self, offset_left: Option<f32>, offset_top: Option<f32>) -> f32 {
        let hint = match self.axis() {
            Axis::Horizontal => offset_left,
            Axis::Vertical => offset_top,
        };
        hint.filter(|margin| *margin != 0.0)
            .unwrap_or(self.settings.offset)
    }

    fn create_view(&self, section: SectionRef) -> ViewRef {
        let sink: Weak<dyn ViewSignalSink> = self.me.clone();
        let notifier = ViewNotifier::new(section.index(), sink);
        self.factory.create_view(section, notifier)
    }

    fn mount(&self, section: SectionRef, edge: Edge) -> Option<ViewRef> {
        let section_index = section.index();
        let view = self.create_view(section);
        let mounted = {
            let mut window = lock(&self.window);
            match edge {
                Edge::Back => window.append(view.clone()),
                Edge::Front => window.prepend(view.clone()),
            }
        };
        match mounted {
            Ok(()) => {
                log::debug!("mounted section {} at {:?}", section_index, edge);
                Some(view)
            }
            Err(_) => {
                view.destroy();
                None
            }
        }
    }

    /// Sections at the front and back of the window.
    fn window_ends(&self) -> Option<(SectionRef, SectionRef)> {
        let window = lock(&self.window);
        let first = window.first()?.view().section().clone();
        let last = window.last()?.view().section().clone();
        Some((first, last))
    }

    /// Sections not yet mounted before and after the window, counting at
    /// most `cap`.
    fn unmounted_sections(&self, cap: usize) -> usize {
        let Some((first, last)) = self.window_ends() else {
            return 0;
        };
        let mut count = 0usize;
        let mut cursor = last.next();
        while let Some(section) = cursor {
            if count >= cap {
                return cap;
            }
            count += 1;
            cursor = section.next();
        }
        cursor = first.prev();
        while let Some(section) = cursor {
            if count >= cap {
                return cap;
            }
            count += 1;
            cursor = section.prev();
        }
        count
    }

    /// One growth step: append after the last view and/or prepend before the
    /// first when the margin-extended visible range runs past the content.
    fn grow_once(&self, measure: &Measure, margin: f32) -> SmallVec<[ViewRef; 2]> {
        let start = measure.offset - margin;
        let end = measure.offset + measure.visible_length + margin;
        let wants_next = end >= measure.content_length;
        let wants_prev = start < 0.0;

        let mut added = SmallVec::new();
        if !wants_next && !wants_prev {
            return added;
        }
        let Some((first, last)) = self.window_ends() else {
            return added;
        };

        if wants_next {
            if let Some(next) = last.next() {
                added.extend(self.mount(next, Edge::Back));
            }
        }
        if wants_prev {
            if let Some(prev) = first.prev() {
                added.extend(self.mount(prev, Edge::Front));
            }
        }
        added
    }

    /// Render freshly mounted views; a failed view is hidden, its siblings
    /// are unaffected.
    async fn render_views(&self, views: SmallVec<[ViewRef; 2]>) {
        let request = self.request();
        let pending = views.into_iter().map(|view| {
            let render = view.display(&request);
            async move { (view, render.await) }
        });
        let results = join_all(pending).await;
        if self.is_inert() {
            return;
        }
        for (view, result) in results {
            let section_index = view.section().index();
            match result {
                Ok(()) => {
                    if let Some(entry) = lock(&self.window).find_mut(section_index) {
                        entry.displayed = true;
                    }
                }
                Err(err) => {
                    log::warn!("{}; hiding view", err);
                    view.hide();
                    if let Some(entry) = lock(&self.window).find_mut(section_index) {
                        entry.shown = false;
                    }
                }
            }
        }
    }

    async fn check_now(self: Arc<Self>, margin: f32) -> bool {
        if self.is_inert() {
            return false;
        }
        let cap = self.settings.max_fill_passes.max(1);
        let budget = self.unmounted_sections(cap);
        let mut grew = false;
        let mut mounted = 0usize;
        loop {
            if mounted >= budget {
                if budget == cap {
                    log::warn!(
                        "check stopped after mounting {} view(s) without settling",
                        mounted
                    );
                }
                break;
            }
            let measure = self.measure();
            let added = self.grow_once(&measure, margin);
            if added.is_empty() {
                break;
            }
            grew = true;
            mounted += added.len();
            log::debug!(
                "check grew window by {} view(s) at offset {} (content {})",
                added.len(),
                measure.offset,
                measure.content_length
            );
            self.render_views(added).await;
            if self.is_inert() {
                return grew;
            }
        }

        if grew {
            Arc::clone(&self).update_now(Some(margin)).await;
        } else {
            let inner = Arc::clone(&self);
            drop(self.queue.enqueue(move || inner.update_now(None)));
        }
        grew
    }

    async fn fill(self: Arc<Self>, first_margin: Option<f32>) -> Result<(), ManagerError> {
        let mut margin = first_margin;
        loop {
            if self.is_inert() {
                return Ok(());
            }
            let inner = Arc::clone(&self);
            let pass_margin = margin.take();
            let grew = self
                .queue
                .enqueue(move || async move {
                    let margin = pass_margin.unwrap_or(inner.settings.offset);
                    inner.check_now(margin).await
                })
                .await;
            let grew = self.absorb(grew)?;
            if !grew {
                return Ok(());
            }
        }
    }

    fn plan_visibility(&self, measure: &Measure, margin: f32) -> Vec<(ViewRef, Visibility)> {
        let low = measure.offset - margin;
        let high = measure.offset + measure.visible_length + margin;
        let mut window = lock(&self.window);
        let spans = window.spans(measure.axis);
        window
            .iter_mut()
            .zip(spans)
            .map(|(entry, (start, end))| {
                let visible = end > low && start < high;
                let action = if !visible {
                    entry.shown = false;
                    Visibility::Hide
                } else if entry.displayed {
                    entry.shown = true;
                    Visibility::Show
                } else {
                    Visibility::Render
                };
                (entry.view().clone(), action)
            })
            .collect()
    }

    async fn update_now(self: Arc<Self>, margin: Option<f32>) {
        if self.is_inert() {
            return;
        }
        let margin = margin.unwrap_or(self.settings.offset);
        let measure = self.measure();
        let plan = self.plan_visibility(&measure, margin);

        let request = self.request();
        let mut renders = Vec::new();
        let mut hidden = 0usize;
        for (view, action) in plan {
            match action {
                Visibility::Show => view.show(),
                Visibility::Hide => {
                    view.hide();
                    hidden += 1;
                }
                Visibility::Render => {
                    let render = view.display(&request);
                    renders.push(async move { (view, render.await) });
                }
            }
        }

        if hidden > 0 {
            self.schedule_trim();
        }
        if renders.is_empty() {
            return;
        }

        for (view, result) in join_all(renders).await {
            if self.is_inert() {
                return;
            }
            let section_index = view.section().index();
            let shown = match result {
                Ok(()) => {
                    view.show();
                    true
                }
                Err(err) => {
                    log::warn!("{}; hiding view", err);
                    view.hide();
                    false
                }
            };
            if let Some(entry) = lock(&self.window).find_mut(section_index) {
                entry.displayed = shown;
                entry.shown = shown;
            }
        }
    }

    /// Arm the eviction scan. Re-arming restarts the quiet period; at most one
    /// scan sits in the queue.
    fn schedule_trim(&self) {
        let me = self.me.clone();
        self.trim_timer.schedule(move || {
            let Some(inner) = me.upgrade() else {
                return;
            };
            if inner.is_inert() || inner.trim_pending.swap(true, Ordering::SeqCst) {
                return;
            }
            let task = Arc::clone(&inner);
            drop(inner.queue.enqueue(move || async move {
                task.trim_pending.store(false, Ordering::SeqCst);
                task.trim_now();
            }));
        });
    }

    fn trim_now(&self) {
        if self.is_inert() {
            return;
        }
        let (above, below) = {
            let window = lock(&self.window);
            let Some(shown) = window.shown_range() else {
                log::debug!("trim skipped: no shown views");
                return;
            };
            let first = *shown.start();
            let last = *shown.end();
            let above: Vec<usize> = window
                .iter()
                .take(first.saturating_sub(1))
                .map(|entry| entry.section_index())
                .collect();
            let below: Vec<usize> = window
                .iter()
                .skip(last + 2)
                .map(|entry| entry.section_index())
                .collect();
            (above, below)
        };

        for section_index in &above {
            self.erase(*section_index, true);
        }
        for section_index in &below {
            self.erase(*section_index, false);
        }
        if !above.is_empty() || !below.is_empty() {
            log::debug!(
                "trimmed {} view(s) above and {} below the shown range",
                above.len(),
                below.len()
            );
        }
    }

    /// Unmount one view. Views above the shown range shift the content, so
    /// the scroll offset moves back by the removed extent.
    fn erase(&self, section_index: usize, above: bool) {
        let previous = self.surface.scroll_position();
        let bounds = {
            let mut window = lock(&self.window);
            let Some(bounds) = window
                .find(section_index)
                .map(|entry| entry.view().bounds())
            else {
                return;
            };
            window.remove(section_index);
            bounds
        };
        if !above {
            return;
        }

        match self.axis() {
            Axis::Vertical => {
                self.scroll_to(previous.left, previous.top - bounds.height, true);
            }
            Axis::Horizontal if self.settings.is_rtl() => {
                if self.settings.fullsize {
                    self.scroll_to(previous.left + bounds.width, previous.top, true);
                }
            }
            Axis::Horizontal => {
                self.scroll_to(previous.left - bounds.width, previous.top, true);
            }
        }
    }

    fn clear_now(&self) {
        let count = lock(&self.window).clear();
        if count > 0 {
            log::debug!("cleared {} view(s)", count);
        }
        self.scroll_to(0.0, 0.0, true);
    }

    async fn display_now(
        self: Arc<Self>,
        section: SectionRef,
        target: Option<String>,
    ) -> Result<(), ManagerError> {
        if self.is_inert() {
            return Ok(());
        }
        let section_index = section.index();

        let existing = {
            let window = lock(&self.window);
            let axis = self.axis();
            let spans = window.spans(axis);
            window
                .index_of(section_index)
                .and_then(|position| Some((window.get(position)?, spans.get(position)?.0)))
                .filter(|(entry, _)| entry.displayed)
                .map(|(entry, start)| (entry.view().clone(), start, axis))
        };
        if let Some((view, start, axis)) = existing {
            let within = target
                .as_deref()
                .and_then(|target| self.base.locate(&view, target))
                .unwrap_or_default();
            let offset = match axis {
                Axis::Horizontal => ScrollPosition::new(start + within.left, within.top),
                Axis::Vertical => ScrollPosition::new(within.left, start + within.top),
            };
            self.scroll_to(0.0, 0.0, true);
            self.move_to(offset);
            return Ok(());
        }

        self.clear_now();
        let view = self.create_view(section);
        lock(&self.window).append(view.clone())?;

        let request = self.request();
        let result = self.base.display(&view, &request).await;
        if self.is_inert() {
            return Ok(());
        }
        match result {
            Ok(()) => {
                if let Some(entry) = lock(&self.window).find_mut(section_index) {
                    entry.displayed = true;
                    entry.shown = true;
                }
                view.show();
                if let Some(offset) = target
                    .as_deref()
                    .and_then(|target| self.base.locate(&view, target))
                {
                    self.move_to(offset);
                }
            }
            Err(err) => {
                log::warn!("{}; first section hidden", err);
                view.hide();
            }
        }
        Ok(())
    }

    fn paginate(self: Arc<Self>, direction: f32) {
        if self.is_inert() || lock(&self.window).is_empty() {
            return;
        }
        let (layout, axis, flow) = {
            let state = lock(&self.state);
            (state.layout, state.axis, state.flow)
        };
        if flow == Flow::Paginated && axis == Axis::Horizontal {
            self.scroll_by(direction * layout.step(), 0.0, true);
        } else {
            let page = if layout.height > 0.0 {
                layout.height
            } else {
                self.surface.client_size().height
            };
            self.scroll_by(0.0, direction * page, true);
        }
        let inner = Arc::clone(&self);
        drop(self.queue.enqueue(move || async move {
            let margin = inner.settings.offset;
            inner.check_now(margin).await
        }));
    }

    fn move_to(&self, offset: ScrollPosition) {
        let (flow, delta) = {
            let state = lock(&self.state);
            (state.flow, state.layout.delta)
        };
        let (dist_x, dist_y) = if flow == Flow::Paginated {
            let snapped = if delta > 0.0 {
                (offset.left / delta).floor() * delta
            } else {
                offset.left
            };
            (snapped, 0.0)
        } else {
            (0.0, offset.top)
        };
        if dist_x > 0.0 || dist_y > 0.0 {
            self.scroll_by(dist_x, dist_y, true);
        }
    }

    fn scroll_by(&self, x: f32, y: f32, silent: bool) {
        let dir = if self.settings.is_rtl() { -1.0 } else { 1.0 };
        let current = self.surface.scroll_position();
        self.scroll_to(current.left + x * dir, current.top + y, silent);
    }

    fn scroll_to(&self, left: f32, top: f32, silent: bool) {
        if self.is_inert() {
            return;
        }
        let current = self.surface.scroll_position();
        if current == ScrollPosition::new(left, top) {
            return;
        }
        if silent {
            lock(&self.tracker).ignore_next();
        }
        self.surface.scroll_to(left, top);
        if silent && self.surface.scroll_position() == current {
            // The owner did not move, so no signal will consume the flag.
            let mut tracker = lock(&self.tracker);
            if tracker.is_ignoring() {
                tracker.record(current);
            }
        }
    }

    fn update_axis(&self, axis: Axis, force: bool) {
        let mut state = lock(&self.state);
        if !force && state.axis == axis {
            return;
        }
        state.axis = axis;
        state
            .layout
            .suppress_spread(axis == Axis::Vertical, self.settings.gap);
        state.policy = ScrollPolicy::new(&self.settings, axis, state.writing_mode);
        log::debug!("axis set to {:?}", axis);
    }

    fn update_writing_mode(&self, mode: WritingMode) {
        let mut state = lock(&self.state);
        if state.writing_mode == mode {
            return;
        }
        state.writing_mode = mode;
        state.policy = ScrollPolicy::new(&self.settings, state.axis, mode);
        log::debug!("writing mode set to {:?}", mode);
    }

    fn update_flow(&self, flow: Flow) {
        let client = self.surface.client_size();
        let previous = {
            let mut state = lock(&self.state);
            state.flow = flow;
            state.layout.flow = flow;
            state
                .layout
                .calculate(client.width, client.height, self.settings.gap);
            state.snapper.take()
        };
        if let Some(snapper) = previous {
            snapper.destroy();
        }
        if flow == Flow::Paginated && !self.is_inert() {
            self.start_snapper();
        }
    }

    fn start_snapper(&self) {
        let (Some(options), Some(factory)) = (self.settings.snap.options(), &self.snap_factory)
        else {
            return;
        };
        let snapper = factory.create(options);
        lock(&self.state).snapper = Some(snapper);
    }

    fn snap_pending(&self) -> bool {
        let snapper = lock(&self.state).snapper.clone();
        snapper.is_some_and(|snapper| snapper.supports_touch() && snapper.needs_snap())
    }

    fn set_layout(&self, mut layout: Layout) {
        let client = self.surface.client_size();
        let mut state = lock(&self.state);
        layout.flow = state.flow;
        layout.spread_suppressed = state.axis == Axis::Vertical;
        layout.calculate(client.width, client.height, self.settings.gap);
        state.layout = layout;
    }

    fn scrolled(self: Arc<Self>) {
        if self.is_inert() {
            return;
        }
        let inner = Arc::clone(&self);
        drop(self.queue.enqueue(move || async move {
            let margin = inner.settings.offset;
            inner.check_now(margin).await
        }));

        let state = lock(&self.tracker).state();
        self.emit(ManagerEvent::Scroll {
            top: state.top,
            left: state.left,
        });

        let me = self.me.clone();
        self.after_scrolled_timer.schedule(move || {
            let Some(inner) = me.upgrade() else {
                return;
            };
            if inner.is_inert() {
                return;
            }
            if inner.snap_pending() {
                log::trace!("scroll settle suppressed by pending snap");
                return;
            }
            let state = lock(&inner.tracker).state();
            inner.emit(ManagerEvent::Scrolled {
                top: state.top,
                left: state.left,
            });
        });
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.scrolled_timer.cancel();
        self.after_scrolled_timer.cancel();
        self.delta_reset_timer.cancel();
        self.trim_timer.cancel();

        let subscription = lock(&self.subscription).take();
        if let Some(subscription) = subscription {
            subscription.release();
        }
        let snapper = lock(&self.state).snapper.take();
        if let Some(snapper) = snapper {
            snapper.destroy();
        }
        let released = lock(&self.window).clear();
        self.queue.close();
        log::debug!("continuous manager destroyed; released {} view(s)", released);
    }
}

impl SurfaceListener for Inner {
    fn on_scroll(&self) {
        if self.is_inert() {
            return;
        }
        let policy = lock(&self.state).policy;
        let position = policy.viewport_position(self.surface.scroll_position());
        let notify = lock(&self.tracker).record(position);
        log::trace!(
            "scroll signal top={} left={} notify={}",
            position.top,
            position.left,
            notify
        );

        if notify {
            let me = self.me.clone();
            self.scrolled_timer.schedule(move || {
                if let Some(inner) = me.upgrade() {
                    inner.scrolled();
                }
            });
        }

        let me = self.me.clone();
        self.delta_reset_timer.schedule(move || {
            if let Some(inner) = me.upgrade() {
                lock(&inner.tracker).reset_deltas();
            }
        });
        self.after_scrolled_timer.cancel();
    }

    fn on_resize(&self) {
        if self.is_inert() {
            return;
        }
        let client = self.surface.client_size();
        {
            let mut state = lock(&self.state);
            state
                .layout
                .calculate(client.width, client.height, self.settings.gap);
        }
        log::debug!("stage resized to {}x{}", client.width, client.height);
        let Some(inner) = self.me.upgrade() else {
            return;
        };
        drop(self.queue.enqueue(move || async move {
            let margin = inner.settings.offset;
            inner.check_now(margin).await
        }));
    }
}

impl ViewSignalSink for Inner {
    fn view_resized(&self, section_index: usize, bounds: ViewBounds) {
        if self.is_inert() {
            return;
        }
        let prepended = {
            let mut window = lock(&self.window);
            let Some(entry) = window.find_mut(section_index) else {
                return;
            };
            entry.expanded = true;
            entry.prepended
        };
        self.emit(ManagerEvent::Resize { section_index });
        if prepended {
            match self.axis() {
                Axis::Vertical => self.scroll_by(0.0, bounds.height_delta, true),
                Axis::Horizontal => self.scroll_by(bounds.width_delta, 0.0, true),
            }
        }
    }

    fn view_axis(&self, axis: Axis) {
        self.update_axis(axis, false);
    }

    fn view_writing_mode(&self, mode: WritingMode) {
        self.update_writing_mode(mode);
    }
}
