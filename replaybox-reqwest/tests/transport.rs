//! Integration tests for ReqwestTransport using wiremock.

use std::sync::{Arc, Mutex};

use replaybox::{Replay, ReadyState, ReadyStateChange, RequestError, Transport, TransportFactory};
use replaybox_core::{Credentials, RequestIdentity};
use replaybox_reqwest::ReqwestTransportFactory;
use wiremock::matchers::{basic_auth, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record<T: Transport>(transport: &mut T) -> Arc<Mutex<Vec<ReadyStateChange>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    transport.on_ready_state_change(Box::new(move |change| {
        sink.lock().unwrap().push(change.clone());
    }));
    seen
}

#[tokio::test]
async fn reports_stages_status_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1,2,3]"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut transport = ReqwestTransportFactory::default().create();
    transport.open(RequestIdentity::new("GET", format!("{}/users", mock_server.uri())));
    let seen = record(&mut transport);
    transport.send(None).await.unwrap();

    let stages: Vec<_> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|change| change.ready_state)
        .collect();
    assert_eq!(
        stages,
        vec![
            ReadyState::HeadersReceived,
            ReadyState::Loading,
            ReadyState::Done
        ]
    );
    assert_eq!(transport.status(), 200);
    assert_eq!(transport.response_text().as_deref(), Some("[1,2,3]"));
}

#[tokio::test]
async fn headers_credentials_and_body_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("X-Trace", "abc"))
        .and(basic_auth("alice", "hunter2"))
        .and(body_string("a=1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let identity = RequestIdentity::new("POST", format!("{}/items", mock_server.uri()))
        .with_credentials(Credentials::new("alice", Some("hunter2")));

    let mut transport = ReqwestTransportFactory::default().create();
    transport.open(identity);
    transport.set_request_header("X-Trace", "abc");
    transport.send(Some("a=1".to_string())).await.unwrap();

    assert_eq!(transport.status(), 201);
}

#[tokio::test]
async fn connection_failure_ends_with_status_zero() {
    // Reserve a free port and release it, so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = format!("http://{addr}/gone");

    let mut transport = ReqwestTransportFactory::default().create();
    transport.open(RequestIdentity::new("GET", url));
    let seen = record(&mut transport);
    let result = transport.send(None).await;

    assert!(matches!(result, Err(RequestError::Network(_))));
    assert_eq!(transport.ready_state(), ReadyState::Done);
    assert_eq!(transport.status(), 0);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_method_is_rejected() {
    let mut transport = ReqwestTransportFactory::default().create();
    transport.open(RequestIdentity::new("GE T", "http://localhost/"));

    let result = transport.send(None).await;
    assert!(matches!(result, Err(RequestError::InvalidRequest(_))));
}

#[tokio::test]
async fn replay_serves_repeats_without_hitting_the_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1) // Should only be called once due to caching
        .mount(&mock_server)
        .await;

    let replay = Replay::builder(ReqwestTransportFactory::default())
        .refresh_on_hit(false)
        .build();
    let url = format!("{}/data", mock_server.uri());

    for _ in 0..3 {
        let mut request = replay.create();
        request.open(RequestIdentity::new("GET", url.as_str()));
        request.send(None).await.unwrap();
        assert_eq!(request.status(), 200);
        assert_eq!(request.response_text().as_deref(), Some("hello"));
    }
}

#[tokio::test]
async fn replay_refreshes_in_the_background() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let replay = Replay::new(ReqwestTransportFactory::default());
    let url = format!("{}/data", mock_server.uri());

    for _ in 0..2 {
        let mut request = replay.create();
        request.open(RequestIdentity::new("GET", url.as_str()));
        let seen = record(&mut request);
        request.send(None).await.unwrap();
        replay.wait_for_refreshes().await;

        let terminal = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|change| change.ready_state.is_done())
            .count();
        assert_eq!(terminal, 1);
    }
}
