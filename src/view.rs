//! Rendered views and the signals they report back to the manager.

use core::fmt;
use core::future::Future;
use core::pin::Pin;
use std::sync::{Arc, Weak};

use crate::error::RenderError;
use crate::layout::Layout;
use crate::section::SectionRef;
use crate::settings::{Axis, WritingMode};

/// Future resolved once a view's content is in the render tree.
pub type RenderFuture = Pin<Box<dyn Future<Output = Result<(), RenderError>> + Send + 'static>>;

/// Shared handle to a view.
pub type ViewRef = Arc<dyn View>;

/// Measured size of a view plus the change since the previous measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewBounds {
    pub width: f32,
    pub height: f32,
    pub width_delta: f32,
    pub height_delta: f32,
}

impl ViewBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            width_delta: 0.0,
            height_delta: 0.0,
        }
    }

    /// Extent along the scroll axis.
    pub fn extent(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// Size change along the scroll axis.
    pub fn delta(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.width_delta,
            Axis::Vertical => self.height_delta,
        }
    }
}

/// What a view needs to know to render its section.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderRequest {
    pub layout: Layout,
    pub axis: Axis,
}

/// Materialized representation of one section.
///
/// The view window owns views while they are mounted; [`View::destroy`] is
/// called exactly once when a view leaves the window.
pub trait View: Send + Sync {
    fn section(&self) -> &SectionRef;

    /// Render the section. Resolves once content is in the render tree,
    /// rejects on render failure.
    fn display(&self, request: &RenderRequest) -> RenderFuture;

    fn show(&self);

    fn hide(&self);

    /// Current measured size.
    fn bounds(&self) -> ViewBounds;

    /// Release render resources.
    fn destroy(&self);
}

impl fmt::Debug for dyn View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("section", &self.section().index())
            .field("bounds", &self.bounds())
            .finish_non_exhaustive()
    }
}

/// Creates views for sections entering the window.
pub trait ViewFactory: Send + Sync {
    fn create_view(&self, section: SectionRef, notifier: ViewNotifier) -> ViewRef;
}

pub(crate) trait ViewSignalSink: Send + Sync {
    fn view_resized(&self, section_index: usize, bounds: ViewBounds);
    fn view_axis(&self, axis: Axis);
    fn view_writing_mode(&self, mode: WritingMode);
}

/// One-way channel from a view to the manager that mounted it.
///
/// Signals sent after the manager is gone are dropped.
#[derive(Clone)]
pub struct ViewNotifier {
    section_index: usize,
    sink: Option<Weak<dyn ViewSignalSink>>,
}

impl fmt::Debug for ViewNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewNotifier")
            .field("section_index", &self.section_index)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl ViewNotifier {
    pub(crate) fn new(section_index: usize, sink: Weak<dyn ViewSignalSink>) -> Self {
        Self {
            section_index,
            sink: Some(sink),
        }
    }

    /// Notifier that goes nowhere, for views built outside a manager.
    pub fn detached(section_index: usize) -> Self {
        Self {
            section_index,
            sink: None,
        }
    }

    pub fn section_index(&self) -> usize {
        self.section_index
    }

    pub fn is_attached(&self) -> bool {
        self.sink
            .as_ref()
            .is_some_and(|sink| sink.strong_count() > 0)
    }

    fn with_sink(&self, f: impl FnOnce(&dyn ViewSignalSink)) {
        if let Some(sink) = self.sink.as_ref().and_then(Weak::upgrade) {
            f(sink.as_ref());
        }
    }

    /// The view measured a new size.
    pub fn resized(&self, bounds: ViewBounds) {
        self.with_sink(|sink| sink.view_resized(self.section_index, bounds));
    }

    /// Rendered content requests a scroll axis.
    pub fn axis(&self, axis: Axis) {
        self.with_sink(|sink| sink.view_axis(axis));
    }

    /// Rendered content reports its CSS `writing-mode`.
    pub fn writing_mode(&self, css_value: &str) {
        let mode = WritingMode::from_css(css_value);
        self.with_sink(|sink| sink.view_writing_mode(mode));
    }
}
