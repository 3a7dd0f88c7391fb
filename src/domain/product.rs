//! Purchasable store product metadata.
//!
//! Store products are the concrete counterparts of the logical product slots
//! on a paywall, looked up by external id.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Unit of a subscription or trial period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
    Year,
}

impl PeriodUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodUnit::Day => "day",
            PeriodUnit::Week => "week",
            PeriodUnit::Month => "month",
            PeriodUnit::Year => "year",
        }
    }

    /// Adjective form used by templates ("monthly").
    pub fn periodly(&self) -> &'static str {
        match self {
            PeriodUnit::Day => "daily",
            PeriodUnit::Week => "weekly",
            PeriodUnit::Month => "monthly",
            PeriodUnit::Year => "yearly",
        }
    }

    fn days(&self) -> u32 {
        match self {
            PeriodUnit::Day => 1,
            PeriodUnit::Week => 7,
            PeriodUnit::Month => 30,
            PeriodUnit::Year => 365,
        }
    }
}

/// A span of time expressed as `count` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub unit: PeriodUnit,
    pub count: u32,
}

impl Period {
    pub fn new(unit: PeriodUnit, count: u32) -> Self {
        Self { unit, count }
    }

    /// Approximate length in days.
    pub fn days(&self) -> u32 {
        self.unit.days().saturating_mul(self.count)
    }
}

/// Introductory free trial attached to a store product.
///
/// Serialized with the `transacting_product_trial_*` keys; absent values are
/// omitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductTrial {
    pub period: Option<Period>,
    pub daily_price: Option<String>,
    pub weekly_price: Option<String>,
    pub monthly_price: Option<String>,
    pub yearly_price: Option<String>,
}

impl Serialize for ProductTrial {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(price) = &self.daily_price {
            map.serialize_entry("transacting_product_trial_daily_price_str", price)?;
        }
        if let Some(price) = &self.weekly_price {
            map.serialize_entry("transacting_product_trial_weekly_price_str", price)?;
        }
        if let Some(price) = &self.monthly_price {
            map.serialize_entry("transacting_product_trial_monthly_price_str", price)?;
        }
        if let Some(price) = &self.yearly_price {
            map.serialize_entry("transacting_product_trial_yearly_price_str", price)?;
        }
        if let Some(period) = &self.period {
            map.serialize_entry("transacting_product_trial_period_unit", &period.unit)?;
            map.serialize_entry("transacting_product_trial_period_count", &period.count)?;
            map.serialize_entry("transacting_product_trial_period_days", &period.days())?;
        }
        map.end()
    }
}

/// Store metadata for a purchasable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreProduct {
    pub id: String,
    pub localized_price: String,
    pub price: f64,
    pub currency_code: String,
    #[serde(default)]
    pub period: Option<Period>,
    #[serde(default)]
    pub trial: Option<ProductTrial>,
}

impl StoreProduct {
    pub fn new(id: impl Into<String>, localized_price: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            localized_price: localized_price.into(),
            price,
            currency_code: "USD".to_string(),
            period: None,
            trial: None,
        }
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_trial(mut self, trial: ProductTrial) -> Self {
        self.trial = Some(trial);
        self
    }

    pub fn has_free_trial(&self) -> bool {
        self.trial.is_some()
    }

    /// Legacy variable payload.
    pub fn event_data(&self) -> Value {
        let mut data = Map::new();
        data.insert("product_id".into(), json!(self.id));
        data.insert("price".into(), json!(self.price));
        data.insert("localized_price".into(), json!(self.localized_price));
        data.insert("currency_code".into(), json!(self.currency_code));
        if let Some(period) = &self.period {
            data.insert("period".into(), json!(period.unit.as_str()));
            data.insert("period_count".into(), json!(period.count));
        }
        if let Some(Value::Object(trial)) =
            self.trial.as_ref().and_then(|t| serde_json::to_value(t).ok())
        {
            data.extend(trial);
        }
        Value::Object(data)
    }

    /// Template variables for the product.
    pub fn template_variables(&self) -> Value {
        let mut vars = Map::new();
        vars.insert("identifier".into(), json!(self.id));
        vars.insert("price".into(), json!(self.localized_price));
        vars.insert("rawPrice".into(), json!(self.price));
        vars.insert("currencyCode".into(), json!(self.currency_code));
        vars.insert("hasFreeTrial".into(), json!(self.has_free_trial()));
        if let Some(period) = &self.period {
            vars.insert("period".into(), json!(period.unit.as_str()));
            vars.insert("periodly".into(), json!(period.unit.periodly()));
            vars.insert("periodDays".into(), json!(period.days()));
        }
        if let Some(trial_period) = self.trial.as_ref().and_then(|t| t.period) {
            vars.insert("trialPeriodDays".into(), json!(trial_period.days()));
        }
        Value::Object(vars)
    }
}
