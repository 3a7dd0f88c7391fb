//! Response cache and request deduplicator.
//!
//! The registry owns, per request signature, the terminal cached result and the
//! list of callers waiting on an in-flight fetch. Every lookup takes exactly one
//! of three branches:
//!
//! 1. A terminal result exists: answer from the cache.
//! 2. A fetch is in flight: enqueue behind it.
//! 3. Otherwise: claim the signature; the caller performs the fetch.
//!
//! The branch is chosen while the signature's entry is locked, so two callers
//! can never both claim the same signature.
//!
//! A claimed ticket is normally wrapped in a [`ClaimGuard`]. If the guard is
//! dropped before completing (the fetch task panicked or its runtime shut
//! down), the signature's waiters are released and the next lookup claims it
//! again.

use crate::application::fanout::{CompletionHandler, FanOut, ResolutionResult, Waiter};
use crate::application::metrics::Metrics;
use crate::application::ports::Storage;
use crate::domain::signature::RequestSignature;
use crate::domain::trigger::ResponseIdentifiers;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// State tracked for each request signature.
#[derive(Debug, Default)]
pub struct CacheEntry {
    /// Terminal result, kept until the registry is reset
    result: Option<ResolutionResult>,
    /// Callers waiting on an in-flight fetch, in enqueue order
    waiters: Option<Vec<Waiter>>,
}

impl CacheEntry {
    /// Whether a terminal result is cached.
    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }

    /// Whether a fetch is in flight.
    pub fn is_pending(&self) -> bool {
        self.waiters.is_some()
    }
}

/// Proof that the caller claimed a signature and must perform its fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    signature: RequestSignature,
    generation: u64,
}

impl FetchTicket {
    pub fn signature(&self) -> &RequestSignature {
        &self.signature
    }
}

/// Which branch a lookup took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Answered from the cache; the handler has already been invoked.
    Cached,
    /// Joined an in-flight fetch at the given position in the waiter list.
    Enqueued { position: usize },
    /// Claimed the signature; the caller must fetch and then `complete`.
    Claimed(FetchTicket),
}

enum Branch {
    Hit(ResolutionResult, CompletionHandler),
    Enqueued(usize),
    Claimed,
}

/// Registry managing cached results and pending waiters.
///
/// Uses the Storage port for per-signature atomic access. A reader/writer gate
/// around the storage makes `reset` atomic with respect to lookups and
/// completions: they hold the read side, reset holds the write side.
///
/// This type is generic over the storage implementation. In production, use
/// `Arc<ShardedStorage>`.
#[derive(Debug, Clone)]
pub struct ResponseRegistry<S>
where
    S: Storage<RequestSignature, CacheEntry> + Clone,
{
    storage: S,
    generation: Arc<RwLock<u64>>,
    metrics: Metrics,
}

impl<S> ResponseRegistry<S>
where
    S: Storage<RequestSignature, CacheEntry> + Clone,
{
    /// Create a new registry over the given storage.
    pub fn new(storage: S, metrics: Metrics) -> Self {
        Self {
            storage,
            generation: Arc::new(RwLock::new(0)),
            metrics,
        }
    }

    /// Look up a signature, registering `handler` for its result.
    ///
    /// The handler is invoked exactly once: immediately for a cached result,
    /// or when the in-flight fetch completes. Handlers of requests discarded by
    /// `reset` or `abandon` are dropped without being invoked.
    ///
    /// # Arguments
    /// * `signature` - The request signature
    /// * `identifiers` - The caller's resolved identifiers, used to attribute
    ///   cached successes to the caller's experiment
    /// * `bypass_cache` - Ignore terminal results (debugger mode)
    /// * `handler` - Receives the result
    pub fn lookup(
        &self,
        signature: &RequestSignature,
        identifiers: Option<&ResponseIdentifiers>,
        bypass_cache: bool,
        handler: CompletionHandler,
    ) -> CacheLookup {
        let gate = self.generation.read().unwrap_or_else(PoisonError::into_inner);
        let generation = *gate;

        let branch = self
            .storage
            .with_entry_mut(signature.clone(), CacheEntry::default, |entry| {
                if !bypass_cache {
                    if let Some(cached) = &entry.result {
                        let result = match cached {
                            Ok(response) => Ok(response.attributed_to(identifiers)),
                            Err(err) => Err(err.clone()),
                        };
                        return Branch::Hit(result, handler);
                    }
                }

                let waiter = Waiter::new(identifiers.cloned(), handler);
                match &mut entry.waiters {
                    Some(waiters) => {
                        waiters.push(waiter);
                        Branch::Enqueued(waiters.len() - 1)
                    }
                    None => {
                        entry.waiters = Some(vec![waiter]);
                        Branch::Claimed
                    }
                }
            });
        drop(gate);

        match branch {
            Branch::Hit(result, handler) => {
                debug!(signature = %signature, "paywall response cache hit");
                self.metrics.record_cache_hit();
                handler(result);
                CacheLookup::Cached
            }
            Branch::Enqueued(position) => {
                debug!(signature = %signature, position, "joined in-flight paywall request");
                self.metrics.record_enqueued();
                CacheLookup::Enqueued { position }
            }
            Branch::Claimed => {
                debug!(signature = %signature, "claimed paywall request");
                self.metrics.record_fetch_claimed();
                CacheLookup::Claimed(FetchTicket {
                    signature: signature.clone(),
                    generation,
                })
            }
        }
    }

    /// Record the outcome of a claimed fetch.
    ///
    /// Stores the result as terminal and removes the waiter list. Returns the
    /// waiters to notify, or `None` if the ticket was superseded by a reset or
    /// nobody was waiting. Failures are cached like successes.
    pub fn complete(&self, ticket: FetchTicket, result: ResolutionResult) -> Option<FanOut> {
        let gate = self.generation.read().unwrap_or_else(PoisonError::into_inner);
        if *gate != ticket.generation {
            debug!(signature = %ticket.signature, "dropping result superseded by reset");
            self.metrics.record_stale_result();
            return None;
        }

        let waiters = self
            .storage
            .with_entry_mut(ticket.signature, CacheEntry::default, |entry| {
                entry.result = Some(result.clone());
                entry.waiters.take()
            });
        drop(gate);

        waiters
            .filter(|w| !w.is_empty())
            .map(|waiters| FanOut::new(waiters, result))
    }

    /// Wrap a claimed ticket so the claim is released if it is never completed.
    pub fn guard(&self, ticket: FetchTicket) -> ClaimGuard<S> {
        ClaimGuard {
            registry: self.clone(),
            ticket,
            completed: false,
        }
    }

    /// Release a claim without recording a result.
    ///
    /// Removes the signature's waiter list so the next lookup claims it again.
    /// The removed handlers are dropped without being invoked. Any terminal
    /// result already cached for the signature is kept. Does nothing if the
    /// ticket was superseded by a reset.
    pub fn abandon(&self, ticket: FetchTicket) {
        let gate = self.generation.read().unwrap_or_else(PoisonError::into_inner);
        if *gate != ticket.generation {
            return;
        }

        let waiters = self
            .storage
            .with_entry_mut(ticket.signature.clone(), CacheEntry::default, |entry| {
                entry.waiters.take()
            });
        drop(gate);

        let released = waiters.as_ref().map_or(0, Vec::len);
        warn!(signature = %ticket.signature, released, "fetch abandoned before completion");
        self.metrics.record_fetch_abandoned();
        // Handlers own the callers' senders; dropping them wakes the callers.
        drop(waiters);
    }

    /// Discard every cached result and pending waiter list.
    ///
    /// In-flight fetches are not cancelled; their results are dropped when
    /// they complete.
    pub fn reset(&self) {
        let mut gate = self.generation.write().unwrap_or_else(PoisonError::into_inner);
        let discarded = self.storage.len();
        self.storage.clear();
        *gate = gate.wrapping_add(1);
        drop(gate);

        debug!(discarded, "paywall response cache reset");
        self.metrics.record_reset();
    }

    /// Number of signatures with a fetch in flight.
    pub fn pending_count(&self) -> usize {
        let mut count = 0;
        self.storage.for_each(|_, entry| {
            if entry.is_pending() {
                count += 1;
            }
        });
        count
    }

    /// Number of signatures with a terminal cached result.
    pub fn cached_count(&self) -> usize {
        let mut count = 0;
        self.storage.for_each(|_, entry| {
            if entry.is_terminal() {
                count += 1;
            }
        });
        count
    }

    /// Get the number of tracked signatures.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Get the shared metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// A claimed fetch that must be completed.
///
/// Dropping the guard without calling [`ClaimGuard::complete`] abandons the
/// claim, so a fetch task that panics or is cancelled never leaves its
/// signature pending.
#[derive(Debug)]
pub struct ClaimGuard<S>
where
    S: Storage<RequestSignature, CacheEntry> + Clone,
{
    registry: ResponseRegistry<S>,
    ticket: FetchTicket,
    completed: bool,
}

impl<S> ClaimGuard<S>
where
    S: Storage<RequestSignature, CacheEntry> + Clone,
{
    /// Signature this claim covers.
    pub fn signature(&self) -> &RequestSignature {
        self.ticket.signature()
    }

    /// Record the fetch outcome; see [`ResponseRegistry::complete`].
    pub fn complete(mut self, result: ResolutionResult) -> Option<FanOut> {
        self.completed = true;
        self.registry.complete(self.ticket.clone(), result)
    }
}

impl<S> Drop for ClaimGuard<S>
where
    S: Storage<RequestSignature, CacheEntry> + Clone,
{
    fn drop(&mut self) {
        if !self.completed {
            self.registry.abandon(self.ticket.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ResolutionError;
    use crate::domain::response::PaywallResponse;
    use crate::infrastructure::storage::ShardedStorage;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<(usize, ResolutionResult)>>>;

    fn registry() -> ResponseRegistry<Arc<ShardedStorage<RequestSignature, CacheEntry>>> {
        ResponseRegistry::new(Arc::new(ShardedStorage::new()), Metrics::new())
    }

    fn recorder(id: usize, log: &Log) -> CompletionHandler {
        let log = Arc::clone(log);
        Box::new(move |result| log.lock().unwrap().push((id, result)))
    }

    fn noop() -> CompletionHandler {
        Box::new(|_| {})
    }

    fn sig(id: &str) -> RequestSignature {
        RequestSignature::new(Some(id), None, "en_US")
    }

    #[test]
    fn test_first_lookup_claims() {
        let registry = registry();

        let lookup = registry.lookup(&sig("pw"), None, false, noop());

        assert!(matches!(lookup, CacheLookup::Claimed(_)));
        assert_eq!(registry.pending_count(), 1);
        assert_eq!(registry.cached_count(), 0);
    }

    #[test]
    fn test_second_lookup_enqueues() {
        let registry = registry();

        registry.lookup(&sig("pw"), None, false, noop());
        let lookup = registry.lookup(&sig("pw"), None, false, noop());

        assert_eq!(lookup, CacheLookup::Enqueued { position: 1 });
        assert_eq!(registry.metrics().fetches_claimed(), 1);
        assert_eq!(registry.metrics().requests_enqueued(), 1);
    }

    #[test]
    fn test_different_signatures_claim_independently() {
        let registry = registry();

        let a = registry.lookup(&sig("a"), None, false, noop());
        let b = registry.lookup(&sig("b"), None, false, noop());

        assert!(matches!(a, CacheLookup::Claimed(_)));
        assert!(matches!(b, CacheLookup::Claimed(_)));
        assert_eq!(registry.pending_count(), 2);
    }

    #[test]
    fn test_complete_fans_out_in_order_and_caches() {
        let registry = registry();
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        let CacheLookup::Claimed(ticket) =
            registry.lookup(&sig("pw"), None, false, recorder(0, &log))
        else {
            panic!("expected claim");
        };
        registry.lookup(&sig("pw"), None, false, recorder(1, &log));
        registry.lookup(&sig("pw"), None, false, recorder(2, &log));

        let fan_out = registry
            .complete(ticket, Ok(PaywallResponse::new("pw")))
            .expect("waiters present");
        assert_eq!(fan_out.len(), 3);
        assert!(log.lock().unwrap().is_empty());
        fan_out.deliver();

        let order: Vec<_> = log.lock().unwrap().iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(registry.cached_count(), 1);

        let lookup = registry.lookup(&sig("pw"), None, false, recorder(3, &log));
        assert_eq!(lookup, CacheLookup::Cached);
        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_cached_success_is_attributed_to_caller() {
        let registry = registry();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let first = ResponseIdentifiers::assigned("pw", "e1", "v1");
        let second = ResponseIdentifiers::assigned("pw", "e2", "v2");

        let CacheLookup::Claimed(ticket) =
            registry.lookup(&sig("pw"), Some(&first), false, recorder(0, &log))
        else {
            panic!("expected claim");
        };
        let mut fetched = PaywallResponse::new("pw");
        fetched.name = "Annual offer".into();
        registry
            .complete(ticket, Ok(fetched.attributed_to(Some(&first))))
            .unwrap()
            .deliver();

        registry.lookup(&sig("pw"), Some(&second), false, recorder(1, &log));

        let log = log.lock().unwrap();
        let original = log[0].1.as_ref().unwrap();
        let cached = log[1].1.as_ref().unwrap();
        assert_eq!(original.experiment_id.as_deref(), Some("e1"));
        assert_eq!(cached.experiment_id.as_deref(), Some("e2"));
        assert_eq!(cached.variant_id.as_deref(), Some("v2"));
        assert_eq!(cached.name, original.name);
        assert_eq!(cached.identifier, original.identifier);
    }

    #[test]
    fn test_failures_are_cached() {
        let registry = registry();
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        let CacheLookup::Claimed(ticket) = registry.lookup(&sig("pw"), None, false, noop()) else {
            panic!("expected claim");
        };
        registry
            .complete(ticket, Err(ResolutionError::ResponseNotFound))
            .unwrap()
            .deliver();

        let lookup = registry.lookup(&sig("pw"), None, false, recorder(0, &log));

        assert_eq!(lookup, CacheLookup::Cached);
        assert_eq!(
            log.lock().unwrap()[0].1,
            Err(ResolutionError::ResponseNotFound)
        );
    }

    #[test]
    fn test_bypass_cache_claims_despite_terminal_result() {
        let registry = registry();

        let CacheLookup::Claimed(ticket) = registry.lookup(&sig("pw"), None, false, noop()) else {
            panic!("expected claim");
        };
        registry
            .complete(ticket, Ok(PaywallResponse::new("pw")))
            .unwrap()
            .deliver();

        let bypassed = registry.lookup(&sig("pw"), None, true, noop());
        assert!(matches!(bypassed, CacheLookup::Claimed(_)));

        let joined = registry.lookup(&sig("pw"), None, true, noop());
        assert_eq!(joined, CacheLookup::Enqueued { position: 1 });
    }

    #[test]
    fn test_reset_clears_everything() {
        let registry = registry();

        let CacheLookup::Claimed(ticket) = registry.lookup(&sig("done"), None, false, noop()) else {
            panic!("expected claim");
        };
        registry
            .complete(ticket, Ok(PaywallResponse::new("done")))
            .unwrap()
            .deliver();
        registry.lookup(&sig("pending"), None, false, noop());

        registry.reset();

        assert!(registry.is_empty());
        assert_eq!(registry.metrics().resets(), 1);
        assert!(matches!(
            registry.lookup(&sig("done"), None, false, noop()),
            CacheLookup::Claimed(_)
        ));
    }

    #[test]
    fn test_late_result_after_reset_is_dropped() {
        let registry = registry();
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        let CacheLookup::Claimed(stale) = registry.lookup(&sig("pw"), None, false, noop()) else {
            panic!("expected claim");
        };
        registry.reset();

        // A new caller claims the same signature after the reset.
        let CacheLookup::Claimed(fresh) =
            registry.lookup(&sig("pw"), None, false, recorder(0, &log))
        else {
            panic!("expected claim");
        };

        assert!(registry
            .complete(stale, Ok(PaywallResponse::new("old")))
            .is_none());
        assert_eq!(registry.metrics().stale_results_dropped(), 1);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(registry.cached_count(), 0);

        registry
            .complete(fresh, Ok(PaywallResponse::new("new")))
            .unwrap()
            .deliver();
        assert_eq!(
            log.lock().unwrap()[0].1.as_ref().unwrap().identifier,
            "new"
        );
    }

    #[test]
    fn test_dropped_guard_releases_waiters() {
        let registry = registry();
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        let CacheLookup::Claimed(ticket) =
            registry.lookup(&sig("pw"), None, false, recorder(0, &log))
        else {
            panic!("expected claim");
        };
        registry.lookup(&sig("pw"), None, false, recorder(1, &log));
        let guard = registry.guard(ticket);
        assert_eq!(registry.pending_count(), 1);

        drop(guard);

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(registry.cached_count(), 0);
        assert_eq!(registry.metrics().fetches_abandoned(), 1);
        assert!(matches!(
            registry.lookup(&sig("pw"), None, false, noop()),
            CacheLookup::Claimed(_)
        ));
    }

    #[test]
    fn test_dropped_guard_keeps_cached_result_under_bypass() {
        let registry = registry();

        let CacheLookup::Claimed(ticket) = registry.lookup(&sig("pw"), None, false, noop()) else {
            panic!("expected claim");
        };
        registry
            .complete(ticket, Ok(PaywallResponse::new("pw")))
            .unwrap()
            .deliver();

        let CacheLookup::Claimed(bypass) = registry.lookup(&sig("pw"), None, true, noop()) else {
            panic!("expected claim");
        };
        drop(registry.guard(bypass));

        assert_eq!(registry.pending_count(), 0);
        assert_eq!(registry.cached_count(), 1);
    }

    #[test]
    fn test_completed_guard_does_not_abandon() {
        let registry = registry();
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        let CacheLookup::Claimed(ticket) =
            registry.lookup(&sig("pw"), None, false, recorder(0, &log))
        else {
            panic!("expected claim");
        };
        let guard = registry.guard(ticket);
        assert_eq!(guard.signature(), &sig("pw"));

        guard
            .complete(Ok(PaywallResponse::new("pw")))
            .unwrap()
            .deliver();

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(registry.metrics().fetches_abandoned(), 0);
        assert_eq!(registry.cached_count(), 1);
    }

    #[test]
    fn test_guard_dropped_after_reset_is_ignored() {
        let registry = registry();

        let CacheLookup::Claimed(stale) = registry.lookup(&sig("pw"), None, false, noop()) else {
            panic!("expected claim");
        };
        let guard = registry.guard(stale);
        registry.reset();
        registry.lookup(&sig("pw"), None, false, noop());

        drop(guard);

        assert_eq!(registry.pending_count(), 1);
        assert_eq!(registry.metrics().fetches_abandoned(), 0);
    }

    #[test]
    fn test_concurrent_lookups_claim_once() {
        use std::thread;

        let registry = Arc::new(registry());
        let mut handles = vec![];

        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                registry.lookup(&sig("shared"), None, false, Box::new(|_| {}))
            }));
        }

        let lookups: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let claims = lookups
            .iter()
            .filter(|l| matches!(l, CacheLookup::Claimed(_)))
            .count();
        let enqueues = lookups
            .iter()
            .filter(|l| matches!(l, CacheLookup::Enqueued { .. }))
            .count();

        assert_eq!(claims, 1);
        assert_eq!(enqueues, 15);
    }
}
