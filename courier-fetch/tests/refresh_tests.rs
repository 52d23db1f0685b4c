//! Integration tests for credential refresh and replay.

mod common;

use std::time::Duration;

use common::{CountingRefresher, FRESH_TOKEN, HarnessBuilder, MockTransport, http_error, settle};
use courier_core::RequestSpec;
use courier_fetch::{
    ExchangeError, HeadlessNavigator, Navigator, RefreshState, SESSION_EXPIRED_MESSAGE,
    UNAUTHORIZED_MESSAGE,
};
use futures::future::join_all;

#[tokio::test]
async fn test_concurrent_unauthorized_share_one_refresh() {
    // latency keeps all five in flight, so each one sees its own 401
    let transport = MockTransport::slow_until_refreshed(401, Duration::from_millis(10));
    let h = HarnessBuilder::new(transport)
        .refresher(CountingRefresher::with_delay(Duration::from_millis(20)))
        .build();

    let exchanges = (0..5).map(|i| h.client.exchange(RequestSpec::get(format!("/items/{i}"))));
    let results = join_all(exchanges).await;

    for (i, result) in results.into_iter().enumerate() {
        let body = result.unwrap();
        assert_eq!(body.str_field("url"), Some(format!("/items/{i}").as_str()));
    }
    assert_eq!(h.refresher.calls(), 1);

    settle(&h.client).await;
    assert_eq!(h.client.coordinator().state(), RefreshState::Idle);
    assert_eq!(h.client.coordinator().pending(), 0);

    // every request went out once without the token and once replayed with it
    let requests = h.transport.requests();
    assert_eq!(requests.len(), 10);
    assert_eq!(requests.iter().filter(|r| !r.source.is_retry()).count(), 5);
    let replays: Vec<_> = requests.iter().filter(|r| r.source.is_retry()).collect();
    assert_eq!(replays.len(), 5);
    assert!(
        replays
            .iter()
            .all(|r| r.header("authorization") == Some(format!("Bearer {FRESH_TOKEN}").as_str()))
    );
    assert_eq!(
        h.client.credentials().access_token().await.as_deref(),
        Some(FRESH_TOKEN)
    );
}

#[tokio::test]
async fn test_request_during_refresh_is_held_and_replayed() {
    let h = HarnessBuilder::new(MockTransport::until_refreshed(401))
        .refresher(CountingRefresher::with_delay(Duration::from_millis(50)))
        .build();

    let client = h.client.clone();
    let leader = tokio::spawn(async move { client.exchange(RequestSpec::get("/a")).await });

    while !h.client.coordinator().is_refreshing() {
        tokio::task::yield_now().await;
    }
    let held = h.client.exchange(RequestSpec::get("/b")).await.unwrap();
    assert_eq!(held.str_field("url"), Some("/b"));
    assert!(leader.await.unwrap().is_ok());

    // "/b" never reached the transport before the refresh settled
    let sent_b: Vec<_> = h
        .transport
        .requests()
        .into_iter()
        .filter(|r| r.url == "/b")
        .collect();
    assert_eq!(sent_b.len(), 1);
    assert_eq!(sent_b[0].source.retry_count, 1);
    assert_eq!(h.refresher.calls(), 1);
}

#[tokio::test]
async fn test_replay_failure_signs_out_without_looping() {
    let h = HarnessBuilder::new(MockTransport::new(|_| Err(http_error(401)))).build();
    h.client.credentials().store_tokens("stale", "stale-refresh").await.unwrap();

    let err = h.client.exchange(RequestSpec::get("/orders")).await.unwrap_err();

    match err {
        ExchangeError::Unauthorized { message, request } => {
            assert_eq!(message, SESSION_EXPIRED_MESSAGE);
            assert_eq!(request.unwrap().url, "/orders");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.refresher.calls(), 1);
    assert_eq!(h.transport.calls(), 2);

    settle(&h.client).await;
    assert!(h.tokens.is_empty().await);
    assert_eq!(h.navigator.location(), "/login");
    assert_eq!(h.navigator.alerts().len(), 1);
}

#[tokio::test]
async fn test_refresh_failure_rejects_every_waiter() {
    let h = HarnessBuilder::new(MockTransport::new(|_| Err(http_error(401))))
        .refresher(CountingRefresher::failing())
        .build();
    h.client.credentials().store_tokens("stale", "stale-refresh").await.unwrap();
    h.client.credentials().mark_signed_in().await.unwrap();

    let results = join_all((0..3).map(|_| h.client.exchange(RequestSpec::get("/orders")))).await;

    for result in results {
        match result {
            Err(ExchangeError::Unauthorized { message, .. }) => {
                assert_eq!(message, UNAUTHORIZED_MESSAGE);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(h.refresher.calls(), 1);
    assert_eq!(h.client.coordinator().state(), RefreshState::Idle);
    assert!(!h.client.credentials().is_signed_in().await);
    assert!(h.tokens.is_empty().await);
    assert_eq!(h.navigator.location(), "/login");
    assert_eq!(h.navigator.alerts(), vec!["denied (N/A)".to_string()]);
}

#[tokio::test]
async fn test_sign_out_on_login_page_does_not_redirect() {
    let h = HarnessBuilder::new(MockTransport::new(|_| Err(http_error(401))))
        .refresher(CountingRefresher::failing())
        .navigator(HeadlessNavigator::at("/login?next=/orders"))
        .build();

    assert!(h.client.exchange(RequestSpec::get("/orders")).await.is_err());

    assert_eq!(h.navigator.location(), "/login?next=/orders");
    assert_eq!(h.navigator.alerts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_rate_limit() {
    let h = HarnessBuilder::new(MockTransport::new(|_| Err(http_error(401))))
        .refresh_limit(2, Duration::from_secs(60))
        .build();

    for _ in 0..2 {
        let err = h.client.exchange(RequestSpec::get("/orders")).await.unwrap_err();
        assert!(err.is_unauthorized());
        settle(&h.client).await;
    }
    assert_eq!(h.refresher.calls(), 2);

    let err = h.client.exchange(RequestSpec::get("/orders")).await.unwrap_err();
    assert!(matches!(err, ExchangeError::RefreshRateLimited { attempts: 2, .. }));
    assert_eq!(h.refresher.calls(), 2);
    assert_eq!(h.client.coordinator().pending(), 0);

    tokio::time::advance(Duration::from_secs(60)).await;

    let err = h.client.exchange(RequestSpec::get("/orders")).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(h.refresher.calls(), 3);
}

#[tokio::test]
async fn test_bad_request_refreshes_only_for_guests() {
    let guest = HarnessBuilder::new(MockTransport::until_refreshed(400)).build();
    assert!(guest.client.exchange(RequestSpec::get("/catalog")).await.is_ok());
    assert_eq!(guest.refresher.calls(), 1);

    let member = HarnessBuilder::new(MockTransport::until_refreshed(400)).build();
    member.client.credentials().mark_signed_in().await.unwrap();
    let err = member.client.exchange(RequestSpec::get("/catalog")).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(member.refresher.calls(), 0);
    assert_eq!(member.navigator.location(), "/orders");
}

#[tokio::test]
async fn test_other_failures_propagate() {
    let h = HarnessBuilder::new(MockTransport::new(|_| Err(http_error(500)))).build();

    let err = h.client.exchange(RequestSpec::get("/orders")).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(h.refresher.calls(), 0);
    assert_eq!(h.transport.calls(), 1);
    assert!(h.navigator.alerts().is_empty());
}
