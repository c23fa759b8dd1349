mod common;

use std::time::Duration;

use common::fixtures::Harness;
use epub_stream_continuous::ScrollSurface;

#[tokio::test(start_paused = true)]
async fn destroy_is_idempotent_and_makes_manager_inert() {
    let harness = Harness::vertical();
    harness.open_at(2).await;
    assert!(harness.factory.live_count() > 0);
    assert_eq!(harness.stage.listener_count(), 1);

    harness.manager.destroy();
    harness.manager.destroy();

    assert!(harness.manager.is_destroyed());
    assert!(!harness.manager.is_rendered());
    assert!(harness.manager.is_empty());
    assert_eq!(harness.factory.live_count(), 0);
    assert_eq!(harness.stage.listener_count(), 0);

    assert!(!harness.manager.check(None, None).await.expect("check"));
    harness.manager.next();
    harness.manager.prev();
    harness.manager.fill().await.expect("fill");
    harness.manager.trim().await.expect("trim");
    harness.manager.idle().await.expect("idle");
    let section = harness.spine.section(0).expect("section");
    harness.manager.display(section, None).await.expect("display");
    assert!(harness.manager.is_empty());
}

#[tokio::test(start_paused = true)]
async fn destroy_during_render_settles_quietly() {
    let harness = Harness::vertical();
    harness.factory.set_render_delay(Duration::from_millis(100));
    let section = harness.spine.section(0).expect("section");

    let (displayed, ()) = tokio::join!(harness.manager.display(section, None), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        harness.manager.destroy();
    });
    displayed.expect("display after teardown");
    assert_eq!(harness.factory.live_count(), 0);
    assert!(harness.manager.is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_manager_releases_everything() {
    let Harness {
        stage,
        factory,
        spine,
        manager,
    } = Harness::vertical();
    manager
        .display(spine.section(4).expect("section"), None)
        .await
        .expect("display");

    drop(manager);
    assert_eq!(stage.listener_count(), 0);
    assert_eq!(factory.live_count(), 0);

    stage.scroll_to(0.0, 0.0);
    tokio::time::sleep(Duration::from_millis(500)).await;
}

#[tokio::test(start_paused = true)]
async fn detached_stage_makes_operations_no_ops() {
    let harness = Harness::vertical();
    harness.open_at(0).await;
    harness.stage.detach();

    assert!(!harness.manager.is_rendered());
    assert!(!harness.manager.check(None, None).await.expect("check"));
    harness.manager.next();
    assert_eq!(harness.stage.scroll_position().top, 0.0);
}
