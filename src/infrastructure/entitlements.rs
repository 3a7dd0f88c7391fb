//! In-memory entitlements store.

use crate::application::ports::Entitlements;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// Entitlements held in memory and updated by the host after purchases.
#[derive(Debug, Default)]
pub struct InMemoryEntitlements {
    purchased: RwLock<HashSet<String>>,
}

impl InMemoryEntitlements {
    /// Create a store seeded with purchased product ids.
    pub fn new<I, S>(purchased: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            purchased: RwLock::new(purchased.into_iter().map(Into::into).collect()),
        }
    }

    /// Record a purchase.
    pub fn insert(&self, product_id: impl Into<String>) {
        self.purchased
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product_id.into());
    }

    /// Forget every purchase, e.g. after an identity reset.
    pub fn clear(&self) {
        self.purchased
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Entitlements for InMemoryEntitlements {
    fn purchased_product_ids(&self) -> HashSet<String> {
        self.purchased
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
