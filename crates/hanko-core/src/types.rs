//! # Domain Types
//!
//! Value types flowing into and out of a pricing run.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Pricing Types                                   │
//! │                                                                         │
//! │  INPUT                                 OUTPUT                           │
//! │  ─────                                 ──────                           │
//! │  ┌─────────────────┐                   ┌──────────────────────────┐    │
//! │  │      Cart       │                   │    PricingBreakdown      │    │
//! │  │  currency       │   pricing run     │  subtotal/discount/tax   │    │
//! │  │  items[]  ──────┼──────────────────►│  shipping/total          │    │
//! │  │  addresses      │                   │  items[]  (per item)     │    │
//! │  │  promotion      │                   │  discounts[] (per rule)  │    │
//! │  └─────────────────┘                   │  tax/shipping lines      │    │
//! │                                        └────────────┬─────────────┘    │
//! │                                                     │ From<&_>         │
//! │                                        ┌────────────▼─────────────┐    │
//! │                                        │      CartEstimate        │    │
//! │                                        │  five totals only        │    │
//! │                                        └──────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is rebuilt on every pricing run; nothing is persisted by
//! this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (standard consumption tax), 800 bps = 8% (reduced rate)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Address
// =============================================================================

/// A postal address attached to a cart or passed as an override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub recipient: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    pub postal_code: String,
    /// State or prefecture.
    pub state: String,
    pub city: String,
    pub line1: String,
    pub line2: Option<String>,
}

impl Address {
    /// Convenience constructor for the fields that matter to pricing.
    pub fn new(
        country: impl Into<String>,
        postal_code: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Address {
            country: country.into(),
            postal_code: postal_code.into(),
            state: state.into(),
            ..Address::default()
        }
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the cart, frozen for the duration of one pricing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub sku: String,
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    /// Price per unit in minor units.
    pub unit_price: Money,
    /// Item-level currency; empty means "same as the cart".
    #[serde(default)]
    pub currency: String,
    /// Shipping weight of one unit in grams.
    #[serde(default)]
    pub weight_grams: i64,
    #[serde(default = "default_requires_shipping")]
    pub requires_shipping: bool,
    #[serde(default)]
    pub tax_code: Option<String>,
}

fn default_requires_shipping() -> bool {
    true
}

impl CartItem {
    /// Creates a shippable item with no weight, currency or tax code.
    pub fn new(
        product_id: impl Into<String>,
        sku: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        CartItem {
            product_id: product_id.into(),
            sku: sku.into(),
            name: String::new(),
            quantity,
            unit_price,
            currency: String::new(),
            weight_grams: 0,
            requires_shipping: true,
            tax_code: None,
        }
    }

    /// Line subtotal (unit price × quantity).
    ///
    /// ## Errors
    /// `CoreError::Overflow` if the product does not fit in i64.
    pub fn line_subtotal(&self) -> CoreResult<Money> {
        self.unit_price
            .checked_mul_quantity(self.quantity)
            .ok_or_else(|| CoreError::Overflow {
                operation: format!("line subtotal for {}", self.sku),
            })
    }

    /// Total physical weight of the line in grams.
    pub fn line_weight_grams(&self) -> CoreResult<i64> {
        self.weight_grams
            .checked_mul(self.quantity)
            .ok_or_else(|| CoreError::Overflow {
                operation: format!("line weight for {}", self.sku),
            })
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A promotion code the customer already attached to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromotion {
    pub code: String,
}

/// A cart snapshot handed to the pricing engine.
///
/// ## Invariants
/// - Every item's currency, when set, equals the cart currency
/// - The engine only ever borrows the cart; it is never mutated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct Cart {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub currency: String,
    pub items: Vec<CartItem>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub promotion: Option<AppliedPromotion>,
}

impl Cart {
    /// Creates an empty cart in the given currency.
    pub fn new(currency: impl Into<String>) -> Self {
        Cart {
            currency: currency.into(),
            ..Cart::default()
        }
    }

    /// Checks if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true when at least one item has to be shipped.
    pub fn requires_shipping(&self) -> bool {
        self.items.iter().any(|i| i.requires_shipping)
    }
}

// =============================================================================
// Breakdown Types
// =============================================================================

/// Where a discount line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// A per-item discount rule.
    Item,
    /// A promotion code.
    Promotion,
}

/// One typed discount line on the breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountBreakdown {
    pub kind: DiscountKind,
    /// Rule name or promotion code.
    pub source: String,
    pub description: String,
    pub amount: Money,
}

/// A labelled amount reported by a tax or shipping provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLine {
    pub label: String,
    pub amount: Money,
}

impl ProviderLine {
    pub fn new(label: impl Into<String>, amount: Money) -> Self {
        ProviderLine {
            label: label.into(),
            amount,
        }
    }
}

/// Per-item share of the cart totals.
///
/// `total == subtotal - discount + tax + shipping` and `total >= 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemPricingBreakdown {
    pub product_id: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

/// The full, reconciled result of a pricing run.
///
/// ## Conservation
/// ```text
/// Σ items[i].total    == total
/// Σ items[i].discount == discount
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub currency: String,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub items: Vec<ItemPricingBreakdown>,
    pub discounts: Vec<DiscountBreakdown>,
    pub tax_lines: Vec<ProviderLine>,
    pub shipping_lines: Vec<ProviderLine>,
    pub metadata: BTreeMap<String, String>,
}

impl PricingBreakdown {
    /// An all-zero breakdown in the given currency (used for empty carts).
    pub fn empty(currency: impl Into<String>) -> Self {
        PricingBreakdown {
            currency: currency.into(),
            ..PricingBreakdown::default()
        }
    }
}

/// Compact projection of a breakdown for callers that only store totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartEstimate {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl From<&PricingBreakdown> for CartEstimate {
    fn from(b: &PricingBreakdown) -> Self {
        CartEstimate {
            subtotal: b.subtotal,
            discount: b.discount,
            tax: b.tax,
            shipping: b.shipping,
            total: b.total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_subtotal() {
        let item = CartItem::new("p1", "JITSUIN-18", 2, Money::from_minor(4000));
        assert_eq!(item.line_subtotal().unwrap(), Money::from_minor(8000));
    }

    #[test]
    fn test_line_subtotal_overflow() {
        let item = CartItem::new("p1", "HUGE", 3, Money::from_minor(i64::MAX / 2));
        assert!(matches!(
            item.line_subtotal(),
            Err(CoreError::Overflow { .. })
        ));
    }

    #[test]
    fn test_cart_requires_shipping() {
        let mut cart = Cart::new("JPY");
        assert!(!cart.requires_shipping());

        let mut gift_card = CartItem::new("gc", "GIFT-CARD", 1, Money::from_minor(3000));
        gift_card.requires_shipping = false;
        cart.items.push(gift_card);
        assert!(!cart.requires_shipping());

        cart.items
            .push(CartItem::new("p1", "MITOMEIN-12", 1, Money::from_minor(1500)));
        assert!(cart.requires_shipping());
    }

    #[test]
    fn test_estimate_from_breakdown() {
        let breakdown = PricingBreakdown {
            currency: "JPY".into(),
            subtotal: Money::from_minor(10000),
            discount: Money::from_minor(1100),
            tax: Money::from_minor(800),
            shipping: Money::from_minor(950),
            total: Money::from_minor(10650),
            ..PricingBreakdown::default()
        };
        let estimate = CartEstimate::from(&breakdown);
        assert_eq!(estimate.total, Money::from_minor(10650));
        assert_eq!(estimate.discount, Money::from_minor(1100));
    }

    #[test]
    fn test_cart_deserializes_with_defaults() {
        let json = r#"{
            "currency": "jpy",
            "items": [
                {"productId": "p1", "sku": "JITSUIN-18", "quantity": 2, "unitPrice": 4000}
            ]
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert!(cart.items[0].requires_shipping);
        assert_eq!(cart.items[0].weight_grams, 0);
        assert!(cart.promotion.is_none());
    }

    #[test]
    fn test_discount_kind_serialization() {
        let json = serde_json::to_string(&DiscountKind::Promotion).unwrap();
        assert_eq!(json, "\"promotion\"");
    }
}
