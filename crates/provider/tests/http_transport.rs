#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! End-to-end tests of the provider over a real HTTP connection.

use std::{net::TcpListener, sync::Arc, time::Duration};

use httpmock::{Method::GET, MockServer};
use paykey_keys::{
    KeyError,
    testutil::{K1, K2, K3, scenario_document},
};
use paykey_provider::{
    HttpTransport, KeyProvider, KeyTransport, ProviderConfig, ProviderError, WindowSource,
};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn provider_for(url: String) -> KeyProvider {
    let config = ProviderConfig::builder()
        .url(url)
        .request_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    KeyProvider::new(config).unwrap()
}

#[tokio::test]
async fn serves_keys_and_honors_max_age() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/paymentmethodtoken/keys.json");
        then.status(200)
            .header("content-type", "application/json")
            .header("Cache-Control", "public, max-age=1800")
            .body(scenario_document());
    });

    let provider = provider_for(server.url("/paymentmethodtoken/keys.json"));

    assert_eq!(
        provider.get_public_keys("ECv2").await.unwrap(),
        Some(vec![K1.to_owned(), K2.to_owned()])
    );
    assert_eq!(provider.get_public_keys("ECv1").await.unwrap(), Some(vec![K3.to_owned()]));
    assert_eq!(provider.get_public_keys("ECv99").await.unwrap(), None);

    let window = provider.freshness_window();
    assert_eq!(window.source(), WindowSource::ServerHint);
    assert_eq!(window.duration(), Duration::from_secs(1800));
    mock.assert_hits(1);
}

#[tokio::test]
async fn server_error_is_transport_failure() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/keys.json");
        then.status(503).body("try later");
    });

    let provider = provider_for(server.url("/keys.json"));
    let err = provider.get_public_keys("ECv2").await.unwrap_err();

    match err {
        ProviderError::Refresh(KeyError::TransportFailure { message, .. }) => {
            assert!(message.contains("503"), "unexpected message: {message}");
        },
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_reported() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/keys.json");
        then.status(200).body(r#"{"keys":[{"protocolVersion":"ECv2"}]}"#);
    });

    let provider = provider_for(server.url("/keys.json"));
    let err = provider.prefetch_keys().await.unwrap_err();

    assert!(matches!(err, ProviderError::Refresh(KeyError::KeyDocumentMalformed { .. })));
    assert!(provider.snapshot().is_none());
}

#[tokio::test]
async fn slow_server_times_out() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/keys.json");
        then.status(200).delay(Duration::from_secs(3)).body(scenario_document());
    });

    let config = ProviderConfig::builder()
        .url(server.url("/keys.json"))
        .request_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let provider = KeyProvider::new(config).unwrap();

    let err = provider.prefetch_keys().await.unwrap_err();
    assert!(matches!(err, ProviderError::Refresh(KeyError::Timeout)), "got {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn connection_refused_is_transport_failure() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let provider = provider_for(format!("http://127.0.0.1:{port}/keys.json"));
    let err = provider.prefetch_keys().await.unwrap_err();

    assert!(matches!(err, ProviderError::Refresh(KeyError::TransportFailure { .. })), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_issue_one_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/keys.json");
        then.status(200).delay(Duration::from_millis(300)).body(scenario_document());
    });

    let provider = provider_for(server.url("/keys.json"));
    let callers: Vec<_> = (0..32)
        .map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.get_public_keys("ECv2").await })
        })
        .collect();

    for caller in callers {
        let keys = caller.await.unwrap().unwrap().unwrap();
        assert_eq!(keys, [K1, K2]);
    }

    mock.assert_hits(1);
    assert_eq!(provider.metrics().fetches_started, 1);
}

#[tokio::test]
async fn http_transport_exposes_status_headers_and_body() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/keys.json");
        then.status(200).header("X-Key-Set", "rotation-7").body("{}");
    });

    let transport = Arc::new(HttpTransport::new(&ProviderConfig::default()).unwrap());
    let response = transport.get(&server.url("/keys.json")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.header("X-KEY-SET"), Some("rotation-7"));
    assert_eq!(response.header("x-key-set"), Some("rotation-7"));
    assert_eq!(&response.body()[..], b"{}");
}

#[tokio::test]
async fn provider_runs_over_a_caller_supplied_client() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/keys.json").header("x-client", "custom");
        then.status(200).body(scenario_document());
    });

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("x-client", reqwest::header::HeaderValue::from_static("custom"));
    let client = reqwest::Client::builder().default_headers(headers).build().unwrap();
    let transport = Arc::new(HttpTransport::from_client(client));

    let response = transport.get(&server.url("/keys.json")).await.unwrap();
    assert_eq!(&response.body()[..], &scenario_document()[..]);

    let config = ProviderConfig::builder().url(server.url("/keys.json")).build().unwrap();
    let provider =
        KeyProvider::with_transport(config, transport, Arc::new(paykey_keys::SystemClock)).unwrap();
    assert_eq!(provider.get_public_keys("ECv1").await.unwrap(), Some(vec![K3.to_owned()]));

    mock.assert_hits(2);
}
