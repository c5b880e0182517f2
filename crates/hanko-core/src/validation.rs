//! # Validation Module
//!
//! Input validation for cart snapshots entering a pricing run.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront                                                   │
//! │  └── Quantity steppers, price display                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Cart service                                                 │
//! │  └── Merge-on-write, stock reservation                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Pricing engine (THIS MODULE)                                 │
//! │  ├── quantity > 0, unit price >= 0, weight >= 0                        │
//! │  └── one resolvable currency across cart and items                     │
//! │                                                                         │
//! │  The engine never trusts that earlier layers ran.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use hanko_core::validation::{normalize_currency, validate_quantity};
//!
//! assert_eq!(normalize_currency(" jpy "), "JPY");
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Cart, CartItem};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// There is no upper bound here; oversized lines are caught by the
/// overflow-checked subtotal instead.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free engraving samples, bundled cases)
///
/// ## Example
/// ```rust
/// use hanko_core::money::Money;
/// use hanko_core::validation::validate_unit_price;
///
/// assert!(validate_unit_price(Money::from_minor(4000)).is_ok());
/// assert!(validate_unit_price(Money::zero()).is_ok());
/// assert!(validate_unit_price(Money::from_minor(-1)).is_err());
/// ```
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit price".to_string(),
            value: price.minor(),
        });
    }

    Ok(())
}

/// Validates a per-unit shipping weight in grams.
pub fn validate_weight_grams(grams: i64) -> ValidationResult<()> {
    if grams < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "weight".to_string(),
            value: grams,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates one cart line.
///
/// Error fields carry the SKU so the storefront can point at the bad line.
pub fn validate_item(item: &CartItem) -> ValidationResult<()> {
    let with_sku = |err: ValidationError| match err {
        ValidationError::MustBePositive { field } => ValidationError::MustBePositive {
            field: format!("{field} of {}", item.sku),
        },
        ValidationError::MustNotBeNegative { field, value } => {
            ValidationError::MustNotBeNegative {
                field: format!("{field} of {}", item.sku),
                value,
            }
        }
        other => other,
    };

    validate_quantity(item.quantity).map_err(with_sku)?;
    validate_unit_price(item.unit_price).map_err(with_sku)?;
    validate_weight_grams(item.weight_grams).map_err(with_sku)?;

    Ok(())
}

// =============================================================================
// Code Normalization
// =============================================================================

/// Trims and uppercases a currency code. Empty input stays empty.
pub fn normalize_currency(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Validates an already-normalized ISO 4217 style currency code.
///
/// ## Rules
/// - Must not be empty
/// - Must be exactly three ASCII letters
pub fn validate_currency_code(code: &str) -> ValidationResult<()> {
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "currency".to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: format!("'{code}' is not a three-letter currency code"),
        });
    }

    Ok(())
}

/// Normalizes a promotion code: trimmed, uppercased, `None` when blank.
///
/// ## Example
/// ```rust
/// use hanko_core::validation::normalize_promotion_code;
///
/// assert_eq!(normalize_promotion_code(" spring10 "), Some("SPRING10".to_string()));
/// assert_eq!(normalize_promotion_code("   "), None);
/// ```
pub fn normalize_promotion_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_uppercase())
    }
}

// =============================================================================
// Currency Resolution
// =============================================================================

/// Resolves the single currency a cart is priced in.
///
/// ## Rules
/// ```text
/// cart.currency set?  ──yes──► use it
///        │no
///        ▼
/// first item with a currency ──► use it
///        │none
///        ▼
/// Required { field: "currency" }
///
/// then: every item with a currency must match → else CurrencyMismatch
/// ```
pub fn resolve_currency(cart: &Cart) -> CoreResult<String> {
    let mut resolved = normalize_currency(&cart.currency);

    if resolved.is_empty() {
        resolved = cart
            .items
            .iter()
            .map(|i| normalize_currency(&i.currency))
            .find(|c| !c.is_empty())
            .ok_or_else(|| ValidationError::Required {
                field: "currency".to_string(),
            })?;
    }

    validate_currency_code(&resolved)?;

    for item in &cart.items {
        let item_currency = normalize_currency(&item.currency);
        if !item_currency.is_empty() && item_currency != resolved {
            return Err(CoreError::CurrencyMismatch {
                sku: item.sku.clone(),
                expected: resolved,
                found: item_currency,
            });
        }
    }

    Ok(resolved)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sku: &str, currency: &str) -> CartItem {
        let mut item = CartItem::new("p", sku, 1, Money::from_minor(1000));
        item.currency = currency.to_string();
        item
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_item_names_the_sku() {
        let mut bad = CartItem::new("p", "GINKOIN-15", 0, Money::from_minor(1000));
        let err = validate_item(&bad).unwrap_err();
        assert_eq!(err.to_string(), "quantity of GINKOIN-15 must be positive");

        bad.quantity = 1;
        bad.weight_grams = -10;
        let err = validate_item(&bad).unwrap_err();
        assert_eq!(
            err.to_string(),
            "weight of GINKOIN-15 must not be negative, got -10"
        );
    }

    #[test]
    fn test_validate_currency_code() {
        assert!(validate_currency_code("JPY").is_ok());
        assert!(validate_currency_code("").is_err());
        assert!(validate_currency_code("YEN!").is_err());
        assert!(validate_currency_code("JP").is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(1000).is_ok());
        assert!(validate_tax_rate_bps(10000).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_resolve_currency_prefers_cart() {
        let mut cart = Cart::new(" jpy");
        cart.items.push(item("A", ""));
        cart.items.push(item("B", "JPY"));
        assert_eq!(resolve_currency(&cart).unwrap(), "JPY");
    }

    #[test]
    fn test_resolve_currency_falls_back_to_items() {
        let mut cart = Cart::new("");
        cart.items.push(item("A", ""));
        cart.items.push(item("B", "usd"));
        assert_eq!(resolve_currency(&cart).unwrap(), "USD");
    }

    #[test]
    fn test_resolve_currency_missing() {
        let mut cart = Cart::new("  ");
        cart.items.push(item("A", ""));
        assert!(matches!(
            resolve_currency(&cart),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_resolve_currency_mismatch() {
        let mut cart = Cart::new("");
        cart.items.push(item("A", "JPY"));
        cart.items.push(item("B", "USD"));
        match resolve_currency(&cart) {
            Err(CoreError::CurrencyMismatch {
                sku,
                expected,
                found,
            }) => {
                assert_eq!(sku, "B");
                assert_eq!(expected, "JPY");
                assert_eq!(found, "USD");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_item_disagreeing_with_cart_currency() {
        let mut cart = Cart::new("JPY");
        cart.items.push(item("A", "eur"));
        assert!(matches!(
            resolve_currency(&cart),
            Err(CoreError::CurrencyMismatch { .. })
        ));
    }
}
