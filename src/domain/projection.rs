//! Product and variable projection.
//!
//! Post-processes a fetched response's product slots against store metadata
//! to derive template variables and free-trial eligibility.

use crate::domain::product::StoreProduct;
use crate::domain::response::{PaywallResponse, Product, ProductType, ProductVariable, Variable};
use std::collections::{HashMap, HashSet};

/// Derived product data for a paywall response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductProcessingOutcome {
    /// Legacy variables, in product slot order
    pub variables: Vec<Variable>,
    /// Typed product variables, in product slot order
    pub product_variables: Vec<ProductVariable>,
    /// Free-trial eligibility of the primary product, if one was resolved
    pub is_free_trial_available: Option<bool>,
    /// The caller must clear its free-trial override after this use
    pub reset_free_trial_override: bool,
}

impl ProductProcessingOutcome {
    /// Write the derived data into a response.
    pub fn apply_to(self, response: &mut PaywallResponse) {
        response.variables = self.variables;
        response.product_variables = self.product_variables;
        response.is_free_trial_available = self.is_free_trial_available;
    }
}

/// Project product slots onto store metadata.
///
/// Slots whose store product is missing are skipped. For the primary slot,
/// trial availability follows the store product, is forced off when the user
/// already purchased that product, and is replaced by `free_trial_override`
/// when one is supplied.
///
/// # Arguments
/// * `products` - Logical product slots from the response
/// * `store_products` - Store metadata keyed by external product id
/// * `purchased` - Product ids the user has already purchased
/// * `free_trial_override` - One-shot override of trial availability
pub fn project(
    products: &[Product],
    store_products: &HashMap<String, StoreProduct>,
    purchased: &HashSet<String>,
    free_trial_override: Option<bool>,
) -> ProductProcessingOutcome {
    let mut outcome = ProductProcessingOutcome::default();

    for product in products {
        let Some(store_product) = store_products.get(&product.id) else {
            continue;
        };

        outcome.variables.push(Variable {
            key: product.product_type.as_str().to_string(),
            value: store_product.event_data(),
        });
        outcome.product_variables.push(ProductVariable {
            key: product.product_type,
            value: store_product.template_variables(),
        });

        if product.product_type == ProductType::Primary {
            let mut available = store_product.has_free_trial();
            if available && purchased.contains(&product.id) {
                available = false;
            }
            if let Some(forced) = free_trial_override {
                available = forced;
                outcome.reset_free_trial_override = true;
            }
            outcome.is_free_trial_available = Some(available);
        }
    }

    outcome
}
