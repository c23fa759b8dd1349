//! Page geometry for the continuous stage.
//!
//! The navigator steps by [`Layout::step`]; views are rendered against the
//! column geometry computed here.

use serde::{Deserialize, Serialize};

use crate::settings::Flow;

/// Narrowest stage width that still shows two pages side by side.
pub const MIN_SPREAD_WIDTH: f32 = 800.0;

/// Rendition layout of the publication.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    #[default]
    Reflowable,
    PrePaginated,
}

/// Computed page geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub kind: LayoutKind,
    pub flow: Flow,
    /// Whether two-page spreads are requested by the publication.
    pub spread: bool,
    /// Spreads suppressed by a vertical axis.
    pub spread_suppressed: bool,
    pub min_spread_width: f32,
    pub width: f32,
    pub height: f32,
    pub gap: f32,
    pub column_width: f32,
    pub page_width: f32,
    pub spread_width: f32,
    /// Pages shown per step: 1 or 2.
    pub divisor: u8,
    /// Length of one paginated step along the horizontal axis.
    pub delta: f32,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(LayoutKind::Reflowable, Flow::Scrolled, false)
    }
}

impl Layout {
    pub fn new(kind: LayoutKind, flow: Flow, spread: bool) -> Self {
        Self {
            kind,
            flow,
            spread,
            spread_suppressed: false,
            min_spread_width: MIN_SPREAD_WIDTH,
            width: 0.0,
            height: 0.0,
            gap: 0.0,
            column_width: 0.0,
            page_width: 0.0,
            spread_width: 0.0,
            divisor: 1,
            delta: 0.0,
        }
    }

    /// Whether spreads are currently in effect.
    pub fn spreads_active(&self) -> bool {
        self.spread && !self.spread_suppressed
    }

    /// Turn spread suppression on or off and recompute against the last size.
    pub fn suppress_spread(&mut self, suppressed: bool, gap: Option<f32>) {
        if self.spread_suppressed == suppressed {
            return;
        }
        self.spread_suppressed = suppressed;
        self.calculate(self.width, self.height, gap);
    }

    /// Recompute the geometry for a stage of `width` x `height`.
    ///
    /// An explicit `gap`, including zero, is used as given. Without one,
    /// paginated reflowable content gets a gap of roughly a twelfth of the
    /// width, rounded down to an even number.
    pub fn calculate(&mut self, width: f32, height: f32, gap: Option<f32>) {
        let width = width.max(0.0).floor();
        let height = height.max(0.0);

        let divisor: u8 = if self.spreads_active() && width >= self.min_spread_width {
            2
        } else {
            1
        };

        let mut resolved_gap = match gap {
            Some(gap) if gap >= 0.0 => gap,
            _ => {
                if self.kind == LayoutKind::Reflowable && self.flow == Flow::Paginated {
                    let section = (width / 12.0).floor();
                    if section % 2.0 == 0.0 {
                        section
                    } else {
                        section - 1.0
                    }
                } else {
                    0.0
                }
            }
        };
        if self.kind == LayoutKind::PrePaginated {
            resolved_gap = 0.0;
        }

        let (column_width, page_width) = if divisor > 1 {
            let column = (width / divisor as f32) - resolved_gap;
            (column, column + resolved_gap)
        } else {
            (width, width)
        };

        self.width = width;
        self.height = height;
        self.gap = resolved_gap;
        self.divisor = divisor;
        self.column_width = column_width;
        self.page_width = page_width;
        self.spread_width = column_width * divisor as f32 + resolved_gap;
        self.delta = width;
    }

    /// Distance covered by one navigator step on the horizontal axis.
    pub fn step(&self) -> f32 {
        if self.kind == LayoutKind::PrePaginated && self.spreads_active() {
            self.delta * 2.0
        } else {
            self.delta
        }
    }
}
