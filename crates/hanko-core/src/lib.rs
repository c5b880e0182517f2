//! # hanko-core: Pure Pricing Logic for the Hanko storefront
//!
//! This crate holds everything about cart pricing that can be expressed as
//! pure functions: money arithmetic, the cart and breakdown value types,
//! validation, exact weighted allocation and item discount rules.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Hanko Backend (pricing slice)                       │
//! │                                                                         │
//! │  Cart service ─┐                                                        │
//! │  Checkout ─────┼──► hanko-pricing::CartPricingEngine                   │
//! │  Admin preview ┘          │            │                                │
//! │                           │            └──► promotion / tax /           │
//! │                           │                 shipping / inventory ports  │
//! │  ┌────────────────────────▼────────────────────────────────────────┐   │
//! │  │               ★ hanko-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌──────────┐ ┌──────┐ │   │
//! │  │   │  money  │ │  types  │ │ validation │ │allocation│ │discnt│ │   │
//! │  │   └─────────┘ └─────────┘ └────────────┘ └──────────┘ └──────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCKS • NO NETWORK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with checked integer arithmetic (no floating point!)
//! - [`types`] - Cart, items, addresses and the pricing breakdown
//! - [`validation`] - Input checks and currency resolution
//! - [`allocation`] - Largest-remainder split of an amount across weights
//! - [`discount`] - Item discount rules and their aggregator
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use hanko_core::allocation::allocate_money;
//! use hanko_core::Money;
//!
//! // Spread ¥950 shipping over two parcels weighing 300g and 100g.
//! let parts = allocate_money(Money::from_minor(950), &[300, 100]);
//! assert_eq!(parts, vec![Money::from_minor(713), Money::from_minor(237)]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod discount;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{allocate, allocate_money};
pub use discount::{DiscountAggregator, ItemDiscount, ItemDiscountRule, RuleDiscount};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
