//! # Error Types
//!
//! Domain-specific error types for hanko-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  hanko-core errors (this file)                                         │
//! │  ├── CoreError        - Money / rule / currency failures               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  hanko-pricing errors (separate crate)                                 │
//! │  └── PricingError     - What the cart/checkout services see            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → PricingError → HTTP layer         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, rule name, field)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core pricing logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Money arithmetic would overflow i64.
    ///
    /// ## When This Occurs
    /// - `unit_price × quantity` too large
    /// - Summing line subtotals, discounts, tax and shipping
    #[error("Arithmetic overflow while computing {operation}")]
    Overflow { operation: String },

    /// A discount rule produced a negative amount.
    ///
    /// Negative rule output is always rejected, never clamped to zero.
    #[error("Discount rule '{rule}' returned negative amount {amount} for {sku}")]
    NegativeRuleDiscount {
        rule: String,
        sku: String,
        amount: i64,
    },

    /// A discount rule could not evaluate an item.
    #[error("Discount rule '{rule}' failed: {reason}")]
    RuleFailed { rule: String, reason: String },

    /// An item's currency disagrees with the resolved cart currency.
    #[error("Item {sku} is priced in {found}, cart currency is {expected}")]
    CurrencyMismatch {
        sku: String,
        expected: String,
        found: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when the cart snapshot does not meet requirements.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative, got {value}")]
    MustNotBeNegative { field: String, value: i64 },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., currency code that is not three letters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
