mod common;

use common::fixtures::{Harness, SECTION_EXTENT, STAGE_HEIGHT, STAGE_WIDTH};
use epub_stream_continuous::{Axis, Direction, RtlScrollType, ScrollSurface, Settings};

const PAGED_EXTENT: f32 = 3.0 * STAGE_WIDTH;

fn rtl_viewport(settings: Settings, scroll_type: RtlScrollType) -> Settings {
    settings
        .with_direction(Direction::Rtl)
        .with_fullsize(true)
        .with_rtl_scroll_type(scroll_type)
}

async fn scroll_out_to_section_five(harness: &Harness) {
    harness.open_at(0).await;
    for _ in 0..10 {
        harness.advance_by(400.0).await;
    }
    assert_eq!(harness.manager.section_indices(), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(harness.manager.shown_indices(), vec![3, 4, 5]);
    assert_eq!(harness.offset(), 4000.0);
}

#[tokio::test(start_paused = true)]
async fn horizontal_trim_moves_left_back_by_evicted_width() {
    let harness = Harness::build(
        Settings::default().with_axis(Axis::Horizontal),
        SECTION_EXTENT,
    );
    scroll_out_to_section_five(&harness).await;

    harness.manager.trim().await.expect("trim");
    assert_eq!(harness.manager.section_indices(), vec![2, 3, 4, 5]);
    assert_eq!(harness.manager.shown_indices(), vec![3, 4, 5]);
    assert_eq!(harness.stage.scroll_position().left, 2000.0);
    assert_eq!(harness.offset(), 2000.0);
}

#[tokio::test(start_paused = true)]
async fn rtl_viewport_trim_keeps_reading_position() {
    for scroll_type in [RtlScrollType::Default, RtlScrollType::Negative] {
        let harness = Harness::right_to_left(
            rtl_viewport(Settings::default(), scroll_type),
            SECTION_EXTENT,
        );
        scroll_out_to_section_five(&harness).await;
        assert_eq!(harness.stage.scroll_position().left, -4000.0);

        harness.manager.trim().await.expect("trim");
        assert_eq!(
            harness.manager.section_indices(),
            vec![2, 3, 4, 5],
            "{:?}",
            scroll_type
        );
        assert_eq!(harness.stage.scroll_position().left, -2000.0);
        assert_eq!(harness.offset(), 2000.0);
    }
}

#[tokio::test(start_paused = true)]
async fn rtl_viewport_pages_move_leftward() {
    let harness = Harness::right_to_left(
        rtl_viewport(Settings::paginated(), RtlScrollType::Default),
        PAGED_EXTENT,
    );
    harness.open_at(0).await;
    assert_eq!(harness.manager.section_indices(), vec![0]);

    harness.manager.next();
    harness.manager.idle().await.expect("idle");
    assert_eq!(harness.stage.scroll_position().left, -STAGE_WIDTH);
    assert_eq!(harness.offset(), STAGE_WIDTH);

    harness.manager.next();
    harness.manager.idle().await.expect("idle");
    assert_eq!(harness.manager.section_indices(), vec![0, 1]);

    let start = harness.stage.scroll_position();
    harness.manager.next();
    harness.manager.idle().await.expect("idle");
    assert_eq!(harness.stage.scroll_position().left, start.left - STAGE_WIDTH);
    harness.manager.prev();
    harness.manager.idle().await.expect("idle");
    assert_eq!(harness.stage.scroll_position(), start);
}

#[tokio::test(start_paused = true)]
async fn vertical_rtl_viewport_reads_top_unflipped() {
    let ltr = Harness::vertical();
    let rtl = Harness::build(
        rtl_viewport(Settings::default(), RtlScrollType::Default),
        SECTION_EXTENT,
    );
    ltr.open_at(0).await;
    rtl.open_at(0).await;
    for _ in 0..6 {
        ltr.advance_by(400.0).await;
        rtl.advance_by(400.0).await;
    }

    let top = rtl.stage.scroll_position().top;
    assert_eq!(top, 2400.0);
    assert_eq!(rtl.offset(), top);
    assert_eq!(rtl.manager.section_indices(), ltr.manager.section_indices());
    assert_eq!(rtl.manager.shown_indices(), ltr.manager.shown_indices());
    assert!(rtl.manager.shown_indices().contains(&2));

    rtl.manager.next();
    rtl.manager.idle().await.expect("idle");
    assert_eq!(rtl.stage.scroll_position().top, top + STAGE_HEIGHT);
}
