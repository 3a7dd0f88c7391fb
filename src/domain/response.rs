//! Paywall response model.
//!
//! A `PaywallResponse` is the remote configuration describing a paywall. It is
//! fetched once per request signature and shared by every caller; only the
//! experiment attribution fields are rewritten per caller.

use crate::domain::presentation::EventData;
use crate::domain::trigger::ResponseIdentifiers;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Slot a product occupies on a paywall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Primary,
    Secondary,
    Tertiary,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Primary => "primary",
            ProductType::Secondary => "secondary",
            ProductType::Tertiary => "tertiary",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical product slot referencing a store product by its external id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(rename = "product")]
    pub product_type: ProductType,
}

impl Product {
    pub fn new(id: impl Into<String>, product_type: ProductType) -> Self {
        Self {
            id: id.into(),
            product_type,
        }
    }
}

/// Legacy key/value variable exposed to paywall templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: Value,
}

/// Typed product variable exposed to paywall templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariable {
    pub key: ProductType,
    pub value: Value,
}

/// Fetched paywall configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaywallResponse {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub experiment_id: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub product_variables: Vec<ProductVariable>,
    #[serde(default)]
    pub is_free_trial_available: Option<bool>,
}

impl PaywallResponse {
    /// Create a response with no products and no attribution.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: String::new(),
            url: String::new(),
            products: Vec::new(),
            experiment_id: None,
            variant_id: None,
            variables: Vec::new(),
            product_variables: Vec::new(),
            is_free_trial_available: None,
        }
    }

    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    /// Copy of this response attributed to the given caller's experiment.
    ///
    /// Both attribution fields are overwritten, including with `None` when the
    /// caller has no experiment.
    pub fn attributed_to(&self, identifiers: Option<&ResponseIdentifiers>) -> Self {
        let mut response = self.clone();
        response.experiment_id = identifiers.and_then(|ids| ids.experiment_id.clone());
        response.variant_id = identifiers.and_then(|ids| ids.variant_id.clone());
        response
    }

    /// External ids of all products referenced by the response.
    pub fn product_ids(&self) -> Vec<String> {
        self.products.iter().map(|p| p.id.clone()).collect()
    }
}

/// Request handed to the fetch collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct PaywallRequest {
    pub identifiers: Option<ResponseIdentifiers>,
    pub event: Option<EventData>,
    pub locale: String,
}
