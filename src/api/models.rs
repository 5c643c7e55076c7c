use serde::{Deserialize, Serialize};

/// Search endpoint response. Fields we don't read are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchResult {
    #[serde(default)]
    pub products: Vec<ProductRecord>,
    pub total_products: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    #[serde(alias = "productID")]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    /// pack size, e.g. "225ml"
    #[serde(default)]
    pub display_name: String,
    pub brand: Option<String>,
    pub single_price: Option<SinglePrice>,
    #[serde(default)]
    pub promotions: Vec<Promotion>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SinglePrice {
    /// cents
    pub price: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    /// cents
    pub reward_value: Option<i64>,
}

impl ProductRecord {
    pub fn regular_price_cents(&self) -> Option<i64> {
        self.single_price.as_ref().and_then(|p| p.price)
    }

    /// Reward of the first active promotion.
    pub fn promo_price_cents(&self) -> Option<i64> {
        self.promotions.first().and_then(|p| p.reward_value)
    }

    pub fn regular_price(&self) -> Option<f64> {
        self.regular_price_cents().map(cents_to_units)
    }

    pub fn promo_price(&self) -> Option<f64> {
        self.promo_price_cents().map(cents_to_units)
    }

    pub fn on_promotion(&self) -> bool {
        !self.promotions.is_empty()
    }

    pub fn brand_or_unknown(&self) -> &str {
        self.brand.as_deref().unwrap_or("Unknown")
    }
}

pub fn cents_to_units(cents: i64) -> f64 {
    cents as f64 / 100.0
}
