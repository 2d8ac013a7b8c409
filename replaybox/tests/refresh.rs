//! Refresh-on-hit: answer from the cache, then update it from the network.

mod common;

use std::time::Duration;

use common::observe;
use replaybox::offload::OffloadConfig;
use replaybox::{DispatchState, ReadyState, Replay, RequestIdentity, Transport, TransportFactory};
use replaybox_core::mock::MockTransportFactory;

async fn prime(replay: &Replay<MockTransportFactory>, identity: RequestIdentity) {
    let mut request = replay.create();
    request.open(identity);
    request.send(None).await.unwrap();
}

#[tokio::test]
async fn miss_makes_exactly_one_network_call() {
    let network = MockTransportFactory::new();
    network.respond("GET", "/users", 200, "[1,2,3]");
    let replay = Replay::new(network.clone());

    let mut request = replay.create();
    request.open(RequestIdentity::new("GET", "/users"));
    let seen = observe(&mut request);
    request.send(None).await.unwrap();
    replay.wait_for_refreshes().await;

    assert_eq!(network.call_count(), 1);
    assert_eq!(
        seen.all()
            .iter()
            .map(|change| change.ready_state)
            .collect::<Vec<_>>(),
        vec![
            ReadyState::HeadersReceived,
            ReadyState::Loading,
            ReadyState::Done
        ]
    );
    assert_eq!(seen.terminal().len(), 1);
}

#[tokio::test]
async fn hit_is_answered_from_cache_then_refreshed() {
    let network = MockTransportFactory::new();
    network.respond("GET", "/users", 200, "[1,2,3]");
    let replay = Replay::new(network.clone());
    prime(&replay, RequestIdentity::new("GET", "/users")).await;

    network.respond("GET", "/users", 200, "[1,2,3,4]");

    let mut request = replay.create();
    request.open(RequestIdentity::new("GET", "/users"));
    let seen = observe(&mut request);
    request.send(None).await.unwrap();

    // Answered before the refresh had a chance to run.
    let observed = seen.all();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].response_text.as_deref(), Some("[1,2,3]"));

    assert!(
        replay
            .wait_for_refreshes_timeout(Duration::from_secs(5))
            .await
    );

    assert_eq!(network.call_count(), 2);
    assert_eq!(seen.count(), 1);
    assert_eq!(request.dispatch_state(), DispatchState::Done);
    assert_eq!(request.response_text().as_deref(), Some("[1,2,3,4]"));
    assert_eq!(
        replay.cache().store().get("ajaxreplayGET/users").unwrap(),
        Some("[1,2,3,4]".to_string())
    );
}

#[tokio::test]
async fn synchronous_requests_refresh_inline() {
    let network = MockTransportFactory::new();
    network.respond("GET", "/config", 200, "v1");
    let replay = Replay::new(network.clone());
    let identity = RequestIdentity::new("GET", "/config").with_async(false);
    prime(&replay, identity.clone()).await;

    network.respond("GET", "/config", 200, "v2");

    let mut request = replay.create();
    request.open(identity);
    let seen = observe(&mut request);
    request.send(None).await.unwrap();

    assert_eq!(network.call_count(), 2);
    assert_eq!(replay.offload().active_task_count(), 0);
    assert_eq!(seen.count(), 1);
    assert_eq!(seen.all()[0].response_text.as_deref(), Some("v1"));
    assert_eq!(
        replay.cache().store().get("ajaxreplayGET/config").unwrap(),
        Some("v2".to_string())
    );
}

#[tokio::test]
async fn failed_refresh_keeps_the_cached_entry() {
    let network = MockTransportFactory::new();
    network.respond("GET", "/users", 200, "[1,2,3]");
    let replay = Replay::new(network.clone());
    prime(&replay, RequestIdentity::new("GET", "/users")).await;

    network.fail("GET", "/users", "connection reset");

    let mut request = replay.create();
    request.open(RequestIdentity::new("GET", "/users"));
    let seen = observe(&mut request);
    request.send(None).await.unwrap();
    replay.wait_for_refreshes().await;

    assert_eq!(seen.count(), 1);
    assert!(seen.all()[0].is_success());
    assert_eq!(request.status(), 0);
    assert_eq!(
        replay.cache().store().get("ajaxreplayGET/users").unwrap(),
        Some("[1,2,3]".to_string())
    );
}

#[tokio::test]
async fn failed_synchronous_refresh_is_not_reported() {
    let network = MockTransportFactory::new();
    network.respond("GET", "/config", 200, "v1");
    let replay = Replay::new(network.clone());
    let identity = RequestIdentity::new("GET", "/config").with_async(false);
    prime(&replay, identity.clone()).await;

    network.fail("GET", "/config", "connection reset");

    let mut request = replay.create();
    request.open(identity);
    let seen = observe(&mut request);
    let result = request.send(None).await;

    assert!(result.is_ok());
    assert_eq!(network.call_count(), 2);
    assert_eq!(seen.count(), 1);
    assert!(seen.all()[0].is_success());
    assert_eq!(request.status(), 0);
    assert_eq!(request.dispatch_state(), DispatchState::Done);
    assert_eq!(
        replay.cache().store().get("ajaxreplayGET/config").unwrap(),
        Some("v1".to_string())
    );
}

#[tokio::test]
async fn non_success_refresh_does_not_overwrite() {
    let network = MockTransportFactory::new();
    network.respond("GET", "/users", 200, "[1,2,3]");
    let replay = Replay::new(network.clone());
    prime(&replay, RequestIdentity::new("GET", "/users")).await;

    network.respond("GET", "/users", 503, "unavailable");

    let mut request = replay.create();
    request.open(RequestIdentity::new("GET", "/users"));
    request.send(None).await.unwrap();
    replay.wait_for_refreshes().await;

    assert_eq!(request.status(), 503);
    assert_eq!(
        replay.cache().store().get("ajaxreplayGET/users").unwrap(),
        Some("[1,2,3]".to_string())
    );
}

#[tokio::test]
async fn refresh_off_skips_the_network() {
    let network = MockTransportFactory::new();
    network.respond("GET", "/users", 200, "[1,2,3]");
    let replay = Replay::new(network.clone());
    prime(&replay, RequestIdentity::new("GET", "/users")).await;

    replay.set_refresh_on_hit(false);

    let mut request = replay.create();
    request.open(RequestIdentity::new("GET", "/users"));
    request.send(None).await.unwrap();
    replay.wait_for_refreshes().await;

    assert_eq!(network.call_count(), 1);
    assert_eq!(request.dispatch_state(), DispatchState::CacheServed);
}

#[tokio::test]
async fn deduplicated_refresh_settles_the_proxy() {
    let network = MockTransportFactory::new();
    network.respond("GET", "/users", 200, "[1,2,3]");
    let replay = Replay::builder(network.clone())
        .offload(OffloadConfig::builder().deduplicate(true).build())
        .build();
    prime(&replay, RequestIdentity::new("GET", "/users")).await;

    // Nothing yields between the two sends, so the first refresh is still
    // queued when the second one is offered.
    let mut first = replay.create();
    first.open(RequestIdentity::new("GET", "/users"));
    first.send(None).await.unwrap();

    let mut second = replay.create();
    second.open(RequestIdentity::new("GET", "/users"));
    let seen = observe(&mut second);
    second.send(None).await.unwrap();

    assert_eq!(second.dispatch_state(), DispatchState::Done);
    assert_eq!(seen.count(), 1);

    replay.wait_for_refreshes().await;
    assert_eq!(network.call_count(), 2);
}
