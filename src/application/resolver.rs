//! Paywall resolver facade.
//!
//! [`PaywallResolver`] is the single entry point host applications call. It
//! resolves a presentation request against the trigger rules, deduplicates the
//! resulting fetch by request signature, and post-processes the fetched
//! response against the store catalog before fanning it out.

use crate::application::fanout::{classify_failure, CompletionHandler, ResolutionResult};
use crate::application::metrics::Metrics;
use crate::application::ports::{
    AssignmentConfirmer, Entitlements, EventTracker, LocaleProvider, PaywallFetcher,
    ProductCatalog, RuleEvaluator,
};
use crate::application::registry::{CacheEntry, CacheLookup, ClaimGuard, ResponseRegistry};
use crate::application::trigger::TriggerResolver;
use crate::domain::error::ResolutionError;
use crate::domain::presentation::PresentationRequest;
use crate::domain::projection::project;
use crate::domain::response::{PaywallRequest, PaywallResponse};
use crate::domain::signature::RequestSignature;
use crate::domain::tracking::{LoadState, TrackedEvent};
use crate::infrastructure::locale::{EnvLocale, FixedLocale};
use crate::infrastructure::storage::ShardedStorage;
use crate::infrastructure::tracker::TracingEventTracker;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

type SharedStorage = Arc<ShardedStorage<RequestSignature, CacheEntry>>;
type SharedRegistry = ResponseRegistry<SharedStorage>;

/// Error returned when building a resolver with invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// No paywall fetcher was supplied
    #[error("a paywall fetcher is required")]
    MissingFetcher,
    /// No rule evaluator was supplied
    #[error("a rule evaluator is required")]
    MissingRuleEvaluator,
    /// The locale override was set to an empty string
    #[error("locale override must not be empty")]
    EmptyLocale,
}

/// Static resolver configuration.
///
/// Deserializable so hosts can load it alongside their own settings:
///
/// ```
/// use paywall_resolver::ResolverConfig;
///
/// let config: ResolverConfig = serde_json::from_str(r#"{"locale": "de_DE"}"#).unwrap();
/// assert_eq!(config.locale.as_deref(), Some("de_DE"));
/// assert!(!config.bypass_cache);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Ignore cached results and always fetch (debugger mode)
    pub bypass_cache: bool,
    /// Locale used for every request instead of the device locale
    pub locale: Option<String>,
}

/// Builder for configuring a [`PaywallResolver`].
#[derive(Debug, Default)]
pub struct PaywallResolverBuilder {
    fetcher: Option<Arc<dyn PaywallFetcher>>,
    evaluator: Option<Arc<dyn RuleEvaluator>>,
    tracker: Option<Arc<dyn EventTracker>>,
    confirmer: Option<Arc<dyn AssignmentConfirmer>>,
    catalog: Option<Arc<dyn ProductCatalog>>,
    entitlements: Option<Arc<dyn Entitlements>>,
    locale_provider: Option<Arc<dyn LocaleProvider>>,
    config: ResolverConfig,
    config_ready: bool,
}

impl PaywallResolverBuilder {
    /// Set the network fetcher. Required.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PaywallFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Set the trigger rule evaluator. Required.
    pub fn with_rule_evaluator(mut self, evaluator: Arc<dyn RuleEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Set the tracking sink.
    ///
    /// Defaults to [`TracingEventTracker`].
    pub fn with_tracker(mut self, tracker: Arc<dyn EventTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Set the receiver of confirmable experiment assignments.
    pub fn with_confirmer(mut self, confirmer: Arc<dyn AssignmentConfirmer>) -> Self {
        self.confirmer = Some(confirmer);
        self
    }

    /// Set the store catalog used to project product variables.
    ///
    /// Without a catalog, responses are delivered with empty product variables.
    pub fn with_catalog(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Set the source of the user's purchased products.
    pub fn with_entitlements(mut self, entitlements: Arc<dyn Entitlements>) -> Self {
        self.entitlements = Some(entitlements);
        self
    }

    /// Set the device locale provider.
    ///
    /// Defaults to [`EnvLocale`]. Ignored when the config carries a locale.
    pub fn with_locale_provider(mut self, provider: Arc<dyn LocaleProvider>) -> Self {
        self.locale_provider = Some(provider);
        self
    }

    /// Apply a static configuration.
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Set whether trigger configuration has already been fetched.
    ///
    /// Defaults to `false`; see [`PaywallResolver::set_config_ready`].
    pub fn with_config_ready(mut self, ready: bool) -> Self {
        self.config_ready = ready;
        self
    }

    /// Build the resolver.
    ///
    /// # Errors
    /// Returns `BuildError` if a required collaborator is missing or the
    /// locale override is empty.
    pub fn build(self) -> Result<PaywallResolver, BuildError> {
        let fetcher = self.fetcher.ok_or(BuildError::MissingFetcher)?;
        let evaluator = self.evaluator.ok_or(BuildError::MissingRuleEvaluator)?;

        let locale: Arc<dyn LocaleProvider> = match self.config.locale {
            Some(locale) if locale.trim().is_empty() => return Err(BuildError::EmptyLocale),
            Some(locale) => Arc::new(FixedLocale::new(locale)),
            None => self
                .locale_provider
                .unwrap_or_else(|| Arc::new(EnvLocale::new())),
        };
        let tracker = self
            .tracker
            .unwrap_or_else(|| Arc::new(TracingEventTracker::new()));

        let registry = ResponseRegistry::new(Arc::new(ShardedStorage::new()), Metrics::new());

        Ok(PaywallResolver {
            inner: Arc::new(Inner {
                triggers: TriggerResolver::new(evaluator, Arc::clone(&tracker), self.confirmer),
                registry,
                fetcher,
                catalog: self.catalog,
                entitlements: self.entitlements,
                locale,
                tracker,
                config_ready: AtomicBool::new(self.config_ready),
                bypass_cache: AtomicBool::new(self.config.bypass_cache),
                free_trial_override: Mutex::new(None),
            }),
        })
    }
}

/// Resolves presentation requests to paywall responses.
///
/// Cloning is cheap; clones share the cache and collaborators. At most one
/// fetch is in flight per request signature no matter how many callers ask
/// concurrently.
#[derive(Debug, Clone)]
pub struct PaywallResolver {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    triggers: TriggerResolver,
    registry: SharedRegistry,
    fetcher: Arc<dyn PaywallFetcher>,
    catalog: Option<Arc<dyn ProductCatalog>>,
    entitlements: Option<Arc<dyn Entitlements>>,
    locale: Arc<dyn LocaleProvider>,
    tracker: Arc<dyn EventTracker>,
    config_ready: AtomicBool,
    bypass_cache: AtomicBool,
    free_trial_override: Mutex<Option<bool>>,
}

impl PaywallResolver {
    /// Create a builder for configuring the resolver.
    pub fn builder() -> PaywallResolverBuilder {
        PaywallResolverBuilder::default()
    }

    /// Resolve a presentation request and fetch its paywall response.
    ///
    /// Callers that share a request signature share a single fetch. The fetch
    /// runs on a spawned task, so dropping this future does not affect other
    /// callers waiting on the same signature. Requires a Tokio runtime.
    ///
    /// # Errors
    /// * Trigger errors (`HoldoutAssigned`, `NoRuleMatch`, `TriggerDisabled`),
    ///   which are never cached
    /// * `ResponseNotFound` or `FetchFailed` from the fetch, cached per signature
    /// * `Invalidated` if `invalidate_all` discarded the request before it
    ///   completed, or the fetch task ended without a result (it panicked or
    ///   its runtime shut down)
    pub async fn resolve_and_fetch(
        &self,
        request: PresentationRequest,
    ) -> Result<PaywallResponse, ResolutionError> {
        let inner = &self.inner;
        let identifiers = inner
            .triggers
            .resolve(&request, inner.config_ready.load(Ordering::Acquire))?;

        let locale = inner.locale.locale();
        let event = request.event().cloned();
        let signature = RequestSignature::new(
            identifiers.as_ref().and_then(|ids| ids.paywall_id.as_deref()),
            event.as_ref(),
            &locale,
        );

        let (tx, rx) = oneshot::channel();
        let handler: CompletionHandler = Box::new(move |result| {
            // The caller may have stopped waiting.
            let _ = tx.send(result);
        });

        let lookup = inner.registry.lookup(
            &signature,
            identifiers.as_ref(),
            inner.bypass_cache.load(Ordering::Acquire),
            handler,
        );

        if let CacheLookup::Claimed(ticket) = lookup {
            let claim = inner.registry.guard(ticket);
            let paywall_request = PaywallRequest {
                identifiers,
                event,
                locale,
            };
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                inner.fetch_and_complete(claim, paywall_request).await;
            });
        }

        rx.await.unwrap_or(Err(ResolutionError::Invalidated))
    }

    /// Discard every cached result and pending request.
    ///
    /// Callers waiting on a discarded request receive `Invalidated`. Results of
    /// fetches already in flight are dropped when they arrive.
    pub fn invalidate_all(&self) {
        self.inner.registry.reset();
    }

    /// Mark whether trigger configuration has been fetched.
    ///
    /// Until it has, trigger rules are not evaluated and only direct
    /// identifiers are honored.
    pub fn set_config_ready(&self, ready: bool) {
        self.inner.config_ready.store(ready, Ordering::Release);
    }

    /// Toggle debugger mode, which ignores cached results.
    pub fn set_bypass_cache(&self, bypass: bool) {
        self.inner.bypass_cache.store(bypass, Ordering::Release);
    }

    /// Force free-trial availability for the next processed response.
    ///
    /// The override is consumed by the first response whose primary product
    /// resolves, then cleared.
    pub fn set_free_trial_override(&self, value: Option<bool>) {
        *self
            .inner
            .free_trial_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Current free-trial override.
    pub fn free_trial_override(&self) -> Option<bool> {
        *self
            .inner
            .free_trial_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the resolver's metrics.
    pub fn metrics(&self) -> &Metrics {
        self.inner.registry.metrics()
    }

    /// Number of signatures with a fetch in flight.
    pub fn pending_count(&self) -> usize {
        self.inner.registry.pending_count()
    }

    /// Number of signatures with a cached result.
    pub fn cached_count(&self) -> usize {
        self.inner.registry.cached_count()
    }
}

impl Inner {
    async fn fetch_and_complete(
        &self,
        claim: ClaimGuard<SharedStorage>,
        request: PaywallRequest,
    ) {
        self.tracker.track(TrackedEvent::PaywallResponseLoad {
            state: LoadState::Start,
            event: request.event.clone(),
        });

        let result: ResolutionResult = match self.fetcher.fetch(&request).await {
            Ok(mut response) => {
                self.process_products(&mut response).await;
                self.tracker.track(TrackedEvent::PaywallResponseLoad {
                    state: LoadState::Complete,
                    event: request.event.clone(),
                });
                debug!(
                    signature = %claim.signature(),
                    paywall = %response.identifier,
                    "paywall response loaded"
                );
                Ok(response)
            }
            Err(error) => {
                self.registry.metrics().record_fetch_failure();
                Err(classify_failure(
                    error,
                    request.event.as_ref(),
                    self.tracker.as_ref(),
                ))
            }
        };

        if let Some(fan_out) = claim.complete(result) {
            fan_out.deliver();
        }
    }

    async fn process_products(&self, response: &mut PaywallResponse) {
        let store_products = match &self.catalog {
            Some(catalog) => match catalog.products(&response.product_ids()).await {
                Ok(products) => products,
                Err(error) => {
                    warn!(
                        paywall = %response.identifier,
                        error = %error,
                        "failed to load store products"
                    );
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };
        let purchased = self
            .entitlements
            .as_ref()
            .map(|e| e.purchased_product_ids())
            .unwrap_or_else(HashSet::new);

        let mut free_trial_override = self
            .free_trial_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let outcome = project(
            &response.products,
            &store_products,
            &purchased,
            *free_trial_override,
        );
        if outcome.reset_free_trial_override {
            *free_trial_override = None;
        }
        drop(free_trial_override);

        outcome.apply_to(response);
    }
}
