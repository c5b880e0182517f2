//! # Collaborator Ports
//!
//! The engine's view of the services it depends on. Each port is a
//! synchronous trait; implementations live with the services that own the
//! data (promotion rules, tax authority integration, carrier rates, stock).
//!
//! ## Call Order Within One Pricing Run
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InventoryAvailability::validate      (optional, fail-closed)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  PromotionValidator::validate         (only when a code resolved)      │
//! │           │  discount total known                                       │
//! │           ▼                                                             │
//! │  ShippingEstimator::estimate_shipping (cache first)                    │
//! │           │  shipping amount known                                      │
//! │           ▼                                                             │
//! │  TaxCalculator::calculate_tax                                          │
//! │                                                                         │
//! │  Strictly sequential: each step feeds the next one's request.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use hanko_core::{Address, Money, ProviderLine};
use serde::{Deserialize, Serialize};

/// Error type returned by every collaborator.
///
/// The engine wraps it into the matching `PricingError` variant without
/// inspecting it.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Promotion
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRequest {
    /// Normalized (trimmed, uppercase) code.
    pub code: String,
    pub user_id: Option<String>,
    pub cart_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionValidation {
    pub code: String,
    pub eligible: bool,
    pub discount_amount: Money,
    /// Why the code was rejected, or a human label when it applies.
    #[serde(default)]
    pub reason: String,
}

impl PromotionValidation {
    pub fn eligible(code: impl Into<String>, discount_amount: Money) -> Self {
        PromotionValidation {
            code: code.into(),
            eligible: true,
            discount_amount,
            reason: String::new(),
        }
    }

    pub fn rejected(code: impl Into<String>, reason: impl Into<String>) -> Self {
        PromotionValidation {
            code: code.into(),
            eligible: false,
            discount_amount: Money::zero(),
            reason: reason.into(),
        }
    }
}

pub trait PromotionValidator: Send + Sync {
    fn validate(&self, request: &PromotionRequest) -> Result<PromotionValidation, CollaboratorError>;
}

// =============================================================================
// Tax / Shipping
// =============================================================================

/// Amount plus optional itemisation returned by a tax or shipping provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQuote {
    pub amount: Money,
    #[serde(default)]
    pub breakdown: Vec<ProviderLine>,
}

impl ProviderQuote {
    pub fn new(amount: Money) -> Self {
        ProviderQuote {
            amount,
            breakdown: Vec::new(),
        }
    }

    pub fn with_line(mut self, label: impl Into<String>, amount: Money) -> Self {
        self.breakdown.push(ProviderLine::new(label, amount));
        self
    }
}

/// One line as seen by the tax calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxableLine {
    pub product_id: String,
    pub sku: String,
    pub quantity: i64,
    pub tax_code: Option<String>,
    /// Line subtotal before any discount.
    pub subtotal: Money,
    /// Item discounts plus the allocated share of the promotion.
    pub discount: Money,
    /// `subtotal - discount`.
    pub net_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRequest {
    pub currency: String,
    pub items: Vec<TaxableLine>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub shipping_amount: Money,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
    pub promo_code: Option<String>,
}

pub trait TaxCalculator: Send + Sync {
    fn calculate_tax(&self, request: &TaxRequest) -> Result<ProviderQuote, CollaboratorError>;
}

/// One shippable line as seen by the shipping estimator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippableLine {
    pub product_id: String,
    pub sku: String,
    pub quantity: i64,
    /// Per-unit weight in grams.
    pub weight_grams: i64,
    pub subtotal: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRequest {
    pub currency: String,
    pub items: Vec<ShippableLine>,
    pub shipping_address: Address,
    pub subtotal: Money,
    pub discount_total: Money,
    pub promo_code: Option<String>,
}

impl ShippingRequest {
    /// Total weight of all shippable lines in grams, `None` on overflow.
    pub fn total_weight_grams(&self) -> Option<i64> {
        self.items.iter().try_fold(0i64, |acc, line| {
            line.weight_grams
                .checked_mul(line.quantity)
                .and_then(|w| acc.checked_add(w))
        })
    }
}

pub trait ShippingEstimator: Send + Sync {
    fn estimate_shipping(&self, request: &ShippingRequest) -> Result<ProviderQuote, CollaboratorError>;
}

// =============================================================================
// Inventory
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLine {
    pub product_id: String,
    pub sku: String,
    pub quantity: i64,
}

pub trait InventoryAvailability: Send + Sync {
    /// Returns an error if any line cannot be fulfilled.
    fn validate(&self, lines: &[InventoryLine]) -> Result<(), CollaboratorError>;
}
