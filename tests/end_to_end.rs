//! End-to-end runs of the full process against a mock catalog and image host.

mod common;

use common::{JPEG_BODY, TestEnv, mount_catalog, mount_image};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};
use tokio::sync::broadcast::error::TryRecvError;
use ygo_hd_dl::app::RunPlan;
use ygo_hd_dl::{Error, Event};

#[tokio::test]
async fn full_run_downloads_missing_images_and_clears_trackers() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[10, 20, 0, 904186], &[30]).await;
    mount_image(&server, "/images/cards/10.jpg", 200).await;
    mount_image(&server, "/images/cards/20.jpg", 404).await;
    mount_image(&server, "/images/cards/904186.jpg", 200).await;
    mount_image(&server, "/images/cards_cropped/30.jpg", 200).await;
    let env = TestEnv::new(&server);

    let mut events = None;
    let mut plan = None;
    let summary = ygo_hd_dl::app::run(env.config.clone(), |p, rx| {
        plan = Some(*p);
        events = Some(rx);
    })
    .await
    .unwrap();

    let plan = plan.expect("plan is announced before dispatch");
    assert_eq!(plan.card_candidates, 3);
    assert_eq!(plan.field_candidates, 1);
    assert_eq!(plan.pending, 4);

    assert_eq!(summary.card_candidates, 3, "zero ids are dropped by the catalog");
    assert_eq!(summary.field_candidates, 1);
    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.report.succeeded, 3);
    assert_eq!(summary.report.http_failures, 1);
    assert_eq!(summary.report.other_failures, 0);
    assert!(summary.report.is_complete());

    assert_eq!(std::fs::read(env.pic("10.jpg")).unwrap(), JPEG_BODY);
    assert!(env.pic("31533705.jpg").exists());
    assert!(env.field_pic("30.jpg").exists());
    assert!(!env.pic("20.jpg").exists());

    // a completed run (even with 404s) clears the resume state
    assert!(summary.trackers_cleared);
    assert!(!env.card_tracker().exists());
    assert!(!env.field_tracker().exists());

    let mut events = events.expect("downloader was started");
    let mut finished = 0;
    loop {
        match events.try_recv() {
            Ok(Event::ItemFinished { .. }) => finished += 1,
            Ok(_) => {}
            Err(TryRecvError::Closed) => break,
            Err(e) => panic!("unexpected receive error: {e}"),
        }
    }
    assert_eq!(finished, 4, "channel closes once the run returns");
}

#[tokio::test]
async fn existing_trackers_skip_completed_items() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[10, 20], &[30]).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/images/cards/10\.jpg$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BODY))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/images/cards_cropped/30\.jpg$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BODY))
        .expect(0)
        .mount(&server)
        .await;
    mount_image(&server, "/images/cards/20.jpg", 200).await;
    let env = TestEnv::new(&server);
    std::fs::write(env.card_tracker(), "10\n").unwrap();
    std::fs::write(env.field_tracker(), "30\n").unwrap();

    let summary = ygo_hd_dl::app::run(env.config.clone(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.report.succeeded, 1);
    assert!(env.pic("20.jpg").exists());
}

#[tokio::test]
async fn tracker_for_one_variant_does_not_skip_the_other() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[30], &[30]).await;
    mount_image(&server, "/images/cards/30.jpg", 200).await;
    mount_image(&server, "/images/cards_cropped/30.jpg", 200).await;
    let env = TestEnv::new(&server);
    std::fs::write(env.card_tracker(), "30\n").unwrap();

    let summary = ygo_hd_dl::app::run(env.config.clone(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.attempted, 1);
    assert!(env.field_pic("30.jpg").exists());
    assert!(!env.pic("30.jpg").exists());
}

#[tokio::test]
async fn catalog_failure_aborts_and_keeps_trackers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/images/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BODY))
        .expect(0)
        .mount(&server)
        .await;
    let env = TestEnv::new(&server);
    std::fs::write(env.card_tracker(), "10\n").unwrap();

    let mut started = false;
    let err = ygo_hd_dl::app::run(env.config.clone(), |_, _| started = true)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Catalog(_)), "unexpected error: {err}");
    assert!(!started, "no download may start after a catalog failure");
    assert_eq!(std::fs::read_to_string(env.card_tracker()).unwrap(), "10\n");
    assert!(env.field_tracker().exists());
}

#[tokio::test]
async fn nothing_pending_still_clears_trackers() {
    let server = MockServer::start().await;
    mount_catalog(&server, &[10], &[]).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/images/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BODY))
        .expect(0)
        .mount(&server)
        .await;
    let env = TestEnv::new(&server);
    std::fs::write(env.card_tracker(), "10\n").unwrap();

    let mut plan = None;
    let summary = ygo_hd_dl::app::run(env.config.clone(), |p, _| plan = Some(*p))
        .await
        .unwrap();

    assert_eq!(summary.attempted, 0);
    assert_eq!(
        plan,
        Some(RunPlan {
            card_candidates: 1,
            field_candidates: 0,
            pending: 0,
        })
    );
    assert!(summary.trackers_cleared);
    assert!(!env.card_tracker().exists());
    assert!(!env.field_tracker().exists());
}

#[tokio::test]
async fn invalid_config_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let mut env = TestEnv::new(&server);
    env.config.download.concurrency = 0;

    let err = ygo_hd_dl::app::run(env.config.clone(), |_, _| {})
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config { .. }));
    assert!(!env.card_tracker().exists());
}
