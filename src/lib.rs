//! Continuous section windowing for `epub-stream` readers.
//!
//! A [`ContinuousManager`] keeps a bounded, contiguous run of rendered
//! sections around the visible range of a scroll owner. Sections are added at
//! either end as the reader approaches an edge and evicted once they fall out
//! of view, with the scroll offset compensated so nothing on screen jumps.
//!
//! The host plugs in three seams:
//!
//! - [`ScrollSurface`]: the element (or viewport) that scrolls.
//! - [`ViewFactory`] producing [`View`]s: one rendered section each.
//! - [`Section`]: spine navigation via `prev`/`next`.
//!
//! [`headless`] provides in-memory implementations of all three.
//!
//! ```no_run
//! # async fn demo() -> Result<(), epub_stream_continuous::ManagerError> {
//! use epub_stream_continuous::headless::{MemoryStage, MemoryViewFactory};
//! use epub_stream_continuous::{Axis, ContinuousManager, Settings, Size, Spine};
//!
//! let stage = MemoryStage::new(Axis::Vertical, Size::new(600.0, 800.0));
//! let factory = MemoryViewFactory::new(stage.clone(), 1200.0);
//! let manager = ContinuousManager::new(Settings::default(), stage, factory)?;
//!
//! let spine = Spine::numbered(20);
//! if let Some(first) = spine.first() {
//!     manager.display(first, None).await?;
//! }
//! manager.next();
//! manager.idle().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod error;
pub mod headless;
mod layout;
mod manager;
mod queue;
mod scroll;
mod section;
mod settings;
mod surface;
mod timer;
mod view;
mod window;

pub use error::{ManagerError, RenderError};
pub use layout::{Layout, LayoutKind, MIN_SPREAD_WIDTH};
pub use manager::{
    ContinuousManager, DirectDisplay, DisplayPrimitive, ManagerBuilder, ManagerEvent, SnapFactory,
    Snapper,
};
pub use queue::TaskQueue;
pub use scroll::{ScrollPolicy, ScrollState, ScrollTracker};
pub use section::{Section, SectionRef, Spine, SpineItem, SpineSection};
pub use settings::{
    Axis, Direction, Flow, RtlScrollType, Settings, Snap, SnapOptions, WritingMode,
    SCROLLED_DEBOUNCE, SCROLL_DELTA_RESET, TRIM_DELAY,
};
pub use surface::{ListenerSet, ScrollPosition, ScrollSurface, Size, Subscription, SurfaceListener};
pub use timer::Debounce;
pub use view::{RenderFuture, RenderRequest, View, ViewBounds, ViewFactory, ViewNotifier, ViewRef};
pub use window::{MountedView, ViewWindow};
