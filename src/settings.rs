//! Manager configuration.
//!
//! [`Settings`] is fixed once the manager is built. It can be assembled with
//! the `with_*` builders or deserialized from the JSON option bag readers
//! already carry:
//!
//! ```rust
//! use epub_stream_continuous::{Axis, Settings};
//!
//! # fn example() -> Result<(), epub_stream_continuous::ManagerError> {
//! let settings = Settings::from_json(r#"{ "axis": "horizontal", "gap": 0 }"#)?;
//! assert_eq!(settings.axis, Axis::Horizontal);
//! assert_eq!(settings.gap, Some(0.0));
//! # Ok(())
//! # }
//! ```

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ManagerError;

/// Quiet period after which accumulated scroll deltas reset.
pub const SCROLL_DELTA_RESET: Duration = Duration::from_millis(150);
/// Debounce window coalescing scroll bursts into one `scrolled` pass.
pub const SCROLLED_DEBOUNCE: Duration = Duration::from_millis(30);
/// Quiet period before a hidden view triggers an eviction scan.
pub const TRIM_DELAY: Duration = Duration::from_millis(250);

/// Scroll axis of the continuous stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    #[default]
    Vertical,
}

impl Axis {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Horizontal)
    }
}

/// Reading flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Paginated,
    #[default]
    #[serde(alias = "scrolled-doc", alias = "scrolled-continuous")]
    Scrolled,
}

/// Inline progression of the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

/// How the host reports horizontal scroll offsets in right-to-left documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RtlScrollType {
    /// Offsets are reported as in left-to-right documents.
    #[default]
    None,
    /// Offsets start at the right edge and count up.
    Default,
    /// Offsets start at zero and go negative.
    Negative,
}

/// Logical text flow discovered from rendered content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingMode {
    #[default]
    Horizontal,
    Vertical,
}

impl WritingMode {
    /// Map a CSS `writing-mode` value; any `vertical-*` mode is vertical.
    pub fn from_css(value: &str) -> Self {
        if value.trim_start().starts_with("vertical") {
            Self::Vertical
        } else {
            Self::Horizontal
        }
    }
}

/// Snap tuning passed through to the snap collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapOptions {
    /// Snap animation length in milliseconds.
    pub duration: u64,
    /// Minimum fling velocity that triggers a page turn.
    pub min_velocity: f32,
    /// Minimum drag distance that triggers a page turn.
    pub min_distance: f32,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self {
            duration: 80,
            min_velocity: 0.2,
            min_distance: 10.0,
        }
    }
}

/// Snap-to-page behaviour for paginated flows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSnap", into = "RawSnap")]
pub enum Snap {
    #[default]
    Off,
    On(SnapOptions),
}

impl Snap {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::On(_))
    }

    pub fn options(&self) -> Option<SnapOptions> {
        match self {
            Self::Off => None,
            Self::On(opts) => Some(*opts),
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSnap {
    Flag(bool),
    Options(SnapOptions),
}

impl From<RawSnap> for Snap {
    fn from(raw: RawSnap) -> Self {
        match raw {
            RawSnap::Flag(false) => Self::Off,
            RawSnap::Flag(true) => Self::On(SnapOptions::default()),
            RawSnap::Options(opts) => Self::On(opts),
        }
    }
}

impl From<Snap> for RawSnap {
    fn from(snap: Snap) -> Self {
        match snap {
            Snap::Off => Self::Flag(false),
            Snap::On(opts) => Self::Options(opts),
        }
    }
}

/// Continuous manager settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Scroll axis of the stage.
    pub axis: Axis,
    /// Paginated or scrolled reading.
    pub flow: Flow,
    /// Lookahead margin beyond the visible range.
    pub offset: f32,
    /// Extra margin applied when jumping to an offset.
    pub offset_delta: f32,
    /// Column gap. `Some(0.0)` is an explicit zero gap, `None` lets the layout pick.
    pub gap: Option<f32>,
    /// Snap-to-page behaviour.
    pub snap: Snap,
    /// Whether the whole viewport scrolls rather than a bounded container.
    pub fullsize: bool,
    /// Inline progression of the document.
    pub direction: Direction,
    /// How the host reports right-to-left horizontal offsets.
    pub rtl_scroll_type: RtlScrollType,
    /// Delay before the public `Scrolled` notification, in milliseconds.
    pub after_scrolled_timeout: u64,
    /// Upper bound on views mounted by one `check`. The sections left
    /// before and after the window bound it first.
    pub max_fill_passes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            axis: Axis::Vertical,
            flow: Flow::Scrolled,
            offset: 500.0,
            offset_delta: 250.0,
            gap: None,
            snap: Snap::Off,
            fullsize: false,
            direction: Direction::Ltr,
            rtl_scroll_type: RtlScrollType::None,
            after_scrolled_timeout: 10,
            max_fill_passes: 256,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON option object; missing keys keep defaults.
    pub fn from_json(json: &str) -> Result<Self, ManagerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Horizontal paginated defaults.
    pub fn paginated() -> Self {
        Self {
            axis: Axis::Horizontal,
            flow: Flow::Paginated,
            ..Self::default()
        }
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_flow(mut self, flow: Flow) -> Self {
        self.flow = flow;
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_offset_delta(mut self, offset_delta: f32) -> Self {
        self.offset_delta = offset_delta;
        self
    }

    pub fn with_gap(mut self, gap: f32) -> Self {
        self.gap = Some(gap);
        self
    }

    pub fn with_snap(mut self, snap: Snap) -> Self {
        self.snap = snap;
        self
    }

    pub fn with_fullsize(mut self, fullsize: bool) -> Self {
        self.fullsize = fullsize;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_rtl_scroll_type(mut self, rtl_scroll_type: RtlScrollType) -> Self {
        self.rtl_scroll_type = rtl_scroll_type;
        self
    }

    pub fn with_after_scrolled_timeout(mut self, millis: u64) -> Self {
        self.after_scrolled_timeout = millis;
        self
    }

    pub fn with_max_fill_passes(mut self, passes: usize) -> Self {
        self.max_fill_passes = passes.max(1);
        self
    }

    pub fn is_paginated(&self) -> bool {
        matches!(self.flow, Flow::Paginated)
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self.direction, Direction::Rtl)
    }

    pub fn after_scrolled_delay(&self) -> Duration {
        Duration::from_millis(self.after_scrolled_timeout)
    }
}
