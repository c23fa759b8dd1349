use std::sync::Arc;

use epub_stream_continuous::headless::{MemoryStage, MemoryViewFactory};
use epub_stream_continuous::{
    Axis, ContinuousManager, ScrollSurface, Settings, Size, Spine, ViewFactory,
};

pub const SECTION_EXTENT: f32 = 1000.0;
pub const STAGE_WIDTH: f32 = 600.0;
pub const STAGE_HEIGHT: f32 = 800.0;
pub const SPINE_LEN: usize = 20;

pub struct Harness {
    pub stage: Arc<MemoryStage>,
    pub factory: Arc<MemoryViewFactory>,
    pub spine: Arc<Spine>,
    pub manager: ContinuousManager,
}

impl Harness {
    pub fn build(settings: Settings, extent: f32) -> Self {
        let stage = MemoryStage::new(settings.axis, Size::new(STAGE_WIDTH, STAGE_HEIGHT));
        Self::on_stage(stage, settings, extent)
    }

    /// Horizontal right-to-left stage whose offsets run negative.
    pub fn right_to_left(settings: Settings, extent: f32) -> Self {
        let stage = MemoryStage::right_to_left(Size::new(STAGE_WIDTH, STAGE_HEIGHT));
        Self::on_stage(stage, settings.with_axis(Axis::Horizontal), extent)
    }

    fn on_stage(stage: Arc<MemoryStage>, settings: Settings, extent: f32) -> Self {
        let factory = MemoryViewFactory::new(Arc::clone(&stage), extent);
        let manager = ContinuousManager::new(
            settings,
            Arc::clone(&stage) as Arc<dyn ScrollSurface>,
            Arc::clone(&factory) as Arc<dyn ViewFactory>,
        )
        .expect("build manager");
        Self {
            stage,
            factory,
            spine: Spine::numbered(SPINE_LEN),
            manager,
        }
    }

    pub fn vertical() -> Self {
        Self::build(Settings::default(), SECTION_EXTENT)
    }

    pub async fn open_at(&self, section_index: usize) {
        let section = self.spine.section(section_index).expect("section in spine");
        self.manager.display(section, None).await.expect("display");
    }

    /// Move `distance` further into the document like a reader would and let
    /// the manager catch up.
    pub async fn advance_by(&self, distance: f32) {
        let position = self.stage.scroll_position();
        match self.stage.axis() {
            Axis::Vertical => self.stage.scroll_to(position.left, position.top + distance),
            Axis::Horizontal if self.stage.is_right_to_left() => {
                self.stage.scroll_to(position.left - distance, position.top)
            }
            Axis::Horizontal => self.stage.scroll_to(position.left + distance, position.top),
        }
        self.manager.fill().await.expect("fill");
        self.manager.idle().await.expect("idle");
    }

    pub fn offset(&self) -> f32 {
        self.manager.logical_offset()
    }
}

pub fn assert_contiguous(indices: &[usize]) {
    for pair in indices.windows(2) {
        assert_eq!(pair[0] + 1, pair[1], "window has a gap: {:?}", indices);
    }
}

/// Sections whose span intersects `[offset - margin, offset + visible + margin)`,
/// for a window of equally sized sections.
pub fn expected_shown(
    indices: &[usize],
    extent: f32,
    offset: f32,
    visible: f32,
    margin: f32,
) -> Vec<usize> {
    let low = offset - margin;
    let high = offset + visible + margin;
    indices
        .iter()
        .enumerate()
        .filter(|(position, _)| {
            let start = *position as f32 * extent;
            let end = start + extent;
            end > low && start < high
        })
        .map(|(_, idx)| *idx)
        .collect()
}
