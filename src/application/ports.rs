//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters and host applications implement them.

use crate::domain::error::FetchError;
use crate::domain::presentation::EventData;
use crate::domain::product::StoreProduct;
use crate::domain::response::{PaywallRequest, PaywallResponse};
use crate::domain::tracking::{TrackedEvent, TrackingResult};
use crate::domain::trigger::{ConfirmableAssignment, RuleEvaluation};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// Port for evaluating trigger rules.
///
/// The evaluator owns the trigger configuration. It is only consulted once
/// configuration has been fetched.
pub trait RuleEvaluator: Send + Sync + Debug {
    /// Evaluate the configured triggers against an event.
    fn evaluate(&self, event: &EventData) -> RuleEvaluation;
}

/// Port for confirming experiment assignments with the server.
///
/// Fire-and-forget: implementations must not block the caller.
pub trait AssignmentConfirmer: Send + Sync + Debug {
    fn confirm(&self, assignment: ConfirmableAssignment);
}

/// Port for the tracking sink.
pub trait EventTracker: Send + Sync + Debug {
    fn track(&self, event: TrackedEvent) -> TrackingResult;
}

/// Port for fetching paywall responses over the network.
///
/// Timeouts are the implementation's responsibility.
#[async_trait]
pub trait PaywallFetcher: Send + Sync + Debug {
    async fn fetch(&self, request: &PaywallRequest) -> Result<PaywallResponse, FetchError>;
}

/// Port for looking up purchasable store products.
#[async_trait]
pub trait ProductCatalog: Send + Sync + Debug {
    /// Fetch store metadata for the given external ids.
    ///
    /// Ids the store does not know are simply absent from the result.
    async fn products(&self, ids: &[String]) -> Result<HashMap<String, StoreProduct>, FetchError>;
}

/// Port for the user's entitlements.
pub trait Entitlements: Send + Sync + Debug {
    /// Ids of every product the user has purchased.
    fn purchased_product_ids(&self) -> HashSet<String>;
}

/// Port for the current device locale.
pub trait LocaleProvider: Send + Sync + Debug {
    fn locale(&self) -> String;
}

/// Port for concurrent key-value storage.
///
/// This abstraction allows the application layer to store and retrieve values
/// without depending on specific concurrent data structure implementations.
/// Infrastructure provides concrete implementations (ShardedStorage).
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// The accessor runs while the entry is locked, so its read-modify-write is
    /// atomic with respect to every other access to the same key.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Iterate over all entries, providing access to both key and value.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);
}
