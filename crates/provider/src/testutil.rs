//! Shared test utilities for crates that depend on `paykey-provider`.
//!
//! Enable the `testutil` feature to use these from integration tests.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use paykey_keys::{Clock, KeyError, KeyResult};
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use crate::{
    config::ProviderConfig,
    provider::KeyProvider,
    transport::{KeyTransport, TransportResponse},
};

/// Transport that answers every request with the same canned response.
#[derive(Debug)]
pub struct StaticTransport {
    response: Mutex<KeyResult<TransportResponse>>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl StaticTransport {
    /// Answers with `response`.
    #[must_use]
    pub fn new(response: TransportResponse) -> Self {
        Self::with_result(Ok(response))
    }

    /// Answers with status 200 and `body`.
    #[must_use]
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(TransportResponse::new(200, body))
    }

    /// Fails every request with `error`.
    #[must_use]
    pub fn failing(error: KeyError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(response: KeyResult<TransportResponse>) -> Self {
        Self { response: Mutex::new(response), calls: AtomicUsize::new(0), urls: Mutex::new(Vec::new()) }
    }

    /// Replaces the canned response for later requests.
    pub fn set_response(&self, response: KeyResult<TransportResponse>) {
        *self.response.lock() = response;
    }

    /// Number of requests served.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requested_urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl KeyTransport for StaticTransport {
    async fn get(&self, url: &str) -> KeyResult<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_owned());
        self.response.lock().clone()
    }
}

/// Transport that holds each request until the test releases it.
///
/// Every request signals [`GatedTransport::wait_for_request`] and then
/// waits for one [`GatedTransport::release`]. Releases issued before a
/// request arrives are banked.
#[derive(Debug)]
pub struct GatedTransport {
    response: Mutex<KeyResult<TransportResponse>>,
    calls: AtomicUsize,
    requested: Notify,
    gate: Semaphore,
}

impl GatedTransport {
    /// Answers with status 200 and `body` once released.
    #[must_use]
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::with_result(Ok(TransportResponse::new(200, body)))
    }

    /// Fails with `error` once released.
    #[must_use]
    pub fn failing(error: KeyError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(response: KeyResult<TransportResponse>) -> Self {
        Self {
            response: Mutex::new(response),
            calls: AtomicUsize::new(0),
            requested: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    /// Replaces the response for later requests.
    pub fn set_response(&self, response: KeyResult<TransportResponse>) {
        *self.response.lock() = response;
    }

    /// Waits until a request has reached the transport.
    pub async fn wait_for_request(&self) {
        self.requested.notified().await;
    }

    /// Lets one held (or the next) request complete.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    /// Number of requests received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyTransport for GatedTransport {
    async fn get(&self, _url: &str) -> KeyResult<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| KeyError::internal_with_source("gate closed", e))?;
        permit.forget();
        self.response.lock().clone()
    }
}

/// Builds a provider over `transport` with default configuration.
#[must_use]
pub fn provider_with(transport: Arc<dyn KeyTransport>, clock: Arc<dyn Clock>) -> KeyProvider {
    KeyProvider::with_transport(ProviderConfig::default(), transport, clock)
        .expect("default configuration is valid")
}
