//! Scroll tracking and offset normalization.
//!
//! Raw offsets come from the scroll owner in physical coordinates. The
//! manager reasons about logical offsets: distance travelled from the start
//! of the document along the scroll axis. How a raw offset maps to a logical
//! one depends on the scroll owner, the writing mode, and how the host
//! reports right-to-left scrolling.

use crate::settings::{Axis, Direction, RtlScrollType, Settings, WritingMode};
use crate::surface::ScrollPosition;

/// Rule set turning raw offsets into logical ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollPolicy {
    pub fullsize: bool,
    pub direction: Direction,
    pub rtl_scroll_type: RtlScrollType,
    pub axis: Axis,
    pub writing_mode: WritingMode,
}

impl ScrollPolicy {
    pub fn new(settings: &Settings, axis: Axis, writing_mode: WritingMode) -> Self {
        Self {
            fullsize: settings.fullsize,
            direction: settings.direction,
            rtl_scroll_type: settings.rtl_scroll_type,
            axis,
            writing_mode,
        }
    }

    fn rtl(&self) -> bool {
        matches!(self.direction, Direction::Rtl)
    }

    /// Sign applied to the raw horizontal offset when the viewport scrolls.
    pub fn viewport_sign(&self) -> f32 {
        if self.fullsize && self.rtl() && self.rtl_scroll_type == RtlScrollType::Default {
            -1.0
        } else {
            1.0
        }
    }

    /// Raw owner position with the viewport sign applied. Vertical offsets
    /// grow downward whatever the inline direction, so only `left` flips.
    pub fn viewport_position(&self, raw: ScrollPosition) -> ScrollPosition {
        ScrollPosition::new(raw.left * self.viewport_sign(), raw.top)
    }

    /// Logical offset along the scroll axis.
    ///
    /// | owner     | policy   | result                          |
    /// |-----------|----------|---------------------------------|
    /// | container | default  | `content - visible - raw`       |
    /// | container | negative | `-raw`                          |
    /// | viewport  | negative | `-raw`                          |
    /// | any       | other    | `raw`                           |
    ///
    /// Rows apply only to right-to-left documents on the horizontal axis;
    /// container rows also require horizontal writing.
    pub fn normalize(&self, raw: f32, visible_length: f32, content_length: f32) -> f32 {
        if !self.rtl() || !self.axis.is_horizontal() {
            return raw;
        }
        match (self.fullsize, self.rtl_scroll_type) {
            (false, _) if self.writing_mode != WritingMode::Horizontal => raw,
            (false, RtlScrollType::Default) => content_length - visible_length - raw,
            (false, RtlScrollType::Negative) => -raw,
            (true, RtlScrollType::Negative) => -raw,
            _ => raw,
        }
    }
}

/// Snapshot of the tracker.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollState {
    pub top: f32,
    pub left: f32,
    pub previous_top: f32,
    pub previous_left: f32,
    /// Absolute vertical travel in the current burst.
    pub delta_vert: f32,
    /// Absolute horizontal travel in the current burst.
    pub delta_horz: f32,
}

/// Accumulates scroll signals between quiet periods.
#[derive(Clone, Debug, Default)]
pub struct ScrollTracker {
    state: ScrollState,
    ignore: bool,
}

impl ScrollTracker {
    pub fn new(position: ScrollPosition) -> Self {
        let mut tracker = Self::default();
        tracker.sync(position);
        tracker
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// Adopt `position` without counting it as travel.
    pub fn sync(&mut self, position: ScrollPosition) {
        self.state.top = position.top;
        self.state.left = position.left;
        self.state.previous_top = position.top;
        self.state.previous_left = position.left;
    }

    /// Swallow the next signal; used for programmatic scrolls.
    pub fn ignore_next(&mut self) {
        self.ignore = true;
    }

    pub fn is_ignoring(&self) -> bool {
        self.ignore
    }

    /// Record a signal. Returns false when the signal was swallowed and
    /// should not produce a `scrolled` notification.
    pub fn record(&mut self, position: ScrollPosition) -> bool {
        let notify = !self.ignore;
        self.ignore = false;

        self.state.top = position.top;
        self.state.left = position.left;
        self.state.delta_vert += (position.top - self.state.previous_top).abs();
        self.state.delta_horz += (position.left - self.state.previous_left).abs();
        self.state.previous_top = position.top;
        self.state.previous_left = position.left;
        notify
    }

    /// End of a burst.
    pub fn reset_deltas(&mut self) {
        self.state.delta_vert = 0.0;
        self.state.delta_horz = 0.0;
    }
}
