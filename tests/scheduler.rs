mod common;

use common::{FEED_URL, FakeGenerator, news_item, test_app, test_source};
use mockmate::{
    config::Config,
    queries::news::{find_or_create_source, touch_source},
    tasks::scheduler::{TickOutcome, run_tick},
    utils::now_utc,
};
use time::Duration;

#[tokio::test]
async fn fresh_sources_skip_the_tick() {
    let app = test_app(FakeGenerator::failing(), Config::default()).await;
    app.fetcher
        .set(FEED_URL, vec![news_item("https://news.test/a", "Nix flakes go stable")]);

    let conn = app.conn().await;
    let source = find_or_create_source(&conn, &test_source()).await.unwrap();
    touch_source(&conn, source.id, now_utc() - Duration::hours(1))
        .await
        .unwrap();

    let outcome = run_tick(&app.state).await;
    assert!(matches!(outcome, TickOutcome::Fresh { .. }));
    assert_eq!(app.fetcher.calls(), 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM news_items").await, 0);
}

#[tokio::test]
async fn stale_sources_run_ingestion() {
    let app = test_app(FakeGenerator::failing(), Config::default()).await;
    app.fetcher
        .set(FEED_URL, vec![news_item("https://news.test/a", "Nix flakes go stable")]);

    let conn = app.conn().await;
    let source = find_or_create_source(&conn, &test_source()).await.unwrap();
    touch_source(&conn, source.id, now_utc() - Duration::hours(5))
        .await
        .unwrap();

    let outcome = run_tick(&app.state).await;
    let TickOutcome::Ran(report) = outcome else {
        panic!("expected a run, got {outcome:?}");
    };
    assert_eq!(report.items(), 1);
    assert_eq!(app.fetcher.calls(), 1);
}

#[tokio::test]
async fn first_tick_runs_when_nothing_was_ever_fetched() {
    let app = test_app(FakeGenerator::failing(), Config::default()).await;

    let outcome = run_tick(&app.state).await;
    assert!(matches!(outcome, TickOutcome::Ran(_)));
    assert_eq!(app.fetcher.calls(), 1);
}

#[tokio::test]
async fn tick_is_skipped_while_a_run_holds_the_lock() {
    let app = test_app(FakeGenerator::failing(), Config::default()).await;

    let _guard = app.state.ingest_lock.lock().await;
    assert_eq!(run_tick(&app.state).await, TickOutcome::AlreadyRunning);
    assert_eq!(app.fetcher.calls(), 0);
}
