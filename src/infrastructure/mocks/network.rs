//! Test doubles for the network-bound collaborators.

use crate::application::ports::{PaywallFetcher, ProductCatalog};
use crate::domain::error::FetchError;
use crate::domain::product::StoreProduct;
use crate::domain::response::{PaywallRequest, PaywallResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::Semaphore;

/// Fetcher returning a scripted result.
///
/// A gated fetcher holds every fetch in flight until [`MockFetcher::release`]
/// is called, which lets tests pile callers onto a pending signature.
#[derive(Debug)]
pub struct MockFetcher {
    result: Mutex<Result<PaywallResponse, FetchError>>,
    requests: Mutex<Vec<PaywallRequest>>,
    calls: AtomicUsize,
    // Fetches wait on the gate until it is closed.
    gate: Semaphore,
}

impl MockFetcher {
    pub fn responding(response: PaywallResponse) -> Self {
        Self::with_result(Ok(response))
    }

    pub fn failing(error: FetchError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<PaywallResponse, FetchError>) -> Self {
        let gate = Semaphore::new(0);
        gate.close();
        Self {
            result: Mutex::new(result),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate,
        }
    }

    /// Hold fetches until `release` is called.
    pub fn gated(mut self) -> Self {
        self.gate = Semaphore::new(0);
        self
    }

    /// Let held and future fetches complete.
    pub fn release(&self) {
        self.gate.close();
    }

    /// Replace the result returned by later fetches.
    pub fn set_result(&self, result: Result<PaywallResponse, FetchError>) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = result;
    }

    /// Number of fetches started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received, in call order.
    pub fn requests(&self) -> Vec<PaywallRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PaywallFetcher for MockFetcher {
    async fn fetch(&self, request: &PaywallRequest) -> Result<PaywallResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        // Never yields a permit; returns once the gate is closed.
        let _ = self.gate.acquire().await;

        self.result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Store catalog serving a fixed set of products.
#[derive(Debug)]
pub struct MockCatalog {
    products: Result<HashMap<String, StoreProduct>, FetchError>,
    calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new(products: Vec<StoreProduct>) -> Self {
        Self {
            products: Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: FetchError) -> Self {
        Self {
            products: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductCatalog for MockCatalog {
    async fn products(&self, ids: &[String]) -> Result<HashMap<String, StoreProduct>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let products = self.products.clone()?;
        Ok(products
            .into_iter()
            .filter(|(id, _)| ids.contains(id))
            .collect())
    }
}
