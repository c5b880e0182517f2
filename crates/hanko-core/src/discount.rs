//! # Item Discount Rules
//!
//! Pluggable per-item discount rules and the aggregator that combines them.
//!
//! ## Aggregation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Item: JITSUIN-18 × 2, line subtotal ¥8,000                             │
//! │                                                                         │
//! │  rules (registration order)        per rule name (sorted)              │
//! │  ──────────────────────────        ──────────────────────              │
//! │  "set-bundle"  → ¥5,000     ──►    "member"      ¥4,000                │
//! │  "member"      → ¥4,000            "set-bundle"  ¥5,000                │
//! │                                    combined      ¥9,000 > ¥8,000 ❗     │
//! │                                          │                              │
//! │                                          ▼ allocate(8000, [4000, 5000]) │
//! │                                    "member"      ¥3,556                │
//! │                                    "set-bundle"  ¥4,444                │
//! │                                    combined      ¥8,000 ✅              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules are stateless: the same item and subtotal always produce the same
//! result. A negative amount from a rule is an error, never clamped away.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::allocation::allocate_money;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::CartItem;
use crate::validation::ValidationResult;

// =============================================================================
// Rule Trait
// =============================================================================

/// What a rule returns for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleDiscount {
    pub amount: Money,
    pub description: String,
    pub metadata: BTreeMap<String, String>,
}

impl RuleDiscount {
    pub fn new(amount: Money, description: impl Into<String>) -> Self {
        RuleDiscount {
            amount,
            description: description.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// The rule does not apply to this item.
    pub fn none() -> Self {
        RuleDiscount::default()
    }
}

/// A named, stateless per-item discount capability.
pub trait ItemDiscountRule: Send + Sync {
    /// Stable rule name; contributions are grouped and ordered by it.
    fn name(&self) -> &str;

    /// Computes this rule's discount for one line.
    fn apply(&self, item: &CartItem, line_subtotal: Money) -> CoreResult<RuleDiscount>;
}

// =============================================================================
// Aggregation
// =============================================================================

/// One rule's (possibly rescaled) share of an item's discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleContribution {
    pub rule: String,
    pub description: String,
    pub amount: Money,
    pub metadata: BTreeMap<String, String>,
}

/// Combined discount for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDiscount {
    /// Never exceeds the line subtotal.
    pub total: Money,
    /// Sorted by rule name.
    pub contributions: Vec<RuleContribution>,
    /// True when the rules asked for more than the line subtotal.
    pub clamped: bool,
}

/// Runs every registered rule against an item and clamps the combined
/// discount to the line subtotal.
#[derive(Clone, Default)]
pub struct DiscountAggregator {
    rules: Vec<Arc<dyn ItemDiscountRule>>,
}

impl fmt::Debug for DiscountAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscountAggregator")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl DiscountAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with_rule<R>(mut self, rule: R) -> Self
    where
        R: ItemDiscountRule + 'static,
    {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Registers an already shared rule.
    pub fn register(&mut self, rule: Arc<dyn ItemDiscountRule>) {
        self.rules.push(rule);
    }

    /// Names of the registered rules, in registration order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Computes the combined discount for one line.
    ///
    /// ## Steps
    /// 1. Apply every rule; reject negative amounts.
    /// 2. Sum contributions per rule name.
    /// 3. If the sum exceeds `line_subtotal`, rescale the per-rule amounts
    ///    with `allocate` (ordered by rule name) so they sum to exactly
    ///    `line_subtotal`.
    pub fn aggregate(&self, item: &CartItem, line_subtotal: Money) -> CoreResult<ItemDiscount> {
        let mut by_rule: BTreeMap<String, RuleContribution> = BTreeMap::new();

        for rule in &self.rules {
            let outcome = rule.apply(item, line_subtotal)?;
            if outcome.amount.is_negative() {
                return Err(CoreError::NegativeRuleDiscount {
                    rule: rule.name().to_string(),
                    sku: item.sku.clone(),
                    amount: outcome.amount.minor(),
                });
            }

            let entry = by_rule
                .entry(rule.name().to_string())
                .or_insert_with(|| RuleContribution {
                    rule: rule.name().to_string(),
                    description: String::new(),
                    amount: Money::zero(),
                    metadata: BTreeMap::new(),
                });
            entry.amount = entry
                .amount
                .checked_add(outcome.amount)
                .ok_or_else(|| CoreError::Overflow {
                    operation: format!("discount rule {} for {}", rule.name(), item.sku),
                })?;
            if entry.description.is_empty() {
                entry.description = outcome.description;
            }
            entry.metadata.extend(outcome.metadata);
        }

        let mut contributions: Vec<RuleContribution> = by_rule.into_values().collect();
        let combined = Money::checked_sum(contributions.iter().map(|c| c.amount)).ok_or_else(
            || CoreError::Overflow {
                operation: format!("combined item discount for {}", item.sku),
            },
        )?;

        let cap = line_subtotal.clamp_non_negative();
        if combined <= cap {
            return Ok(ItemDiscount {
                total: combined,
                contributions,
                clamped: false,
            });
        }

        let weights: Vec<i64> = contributions.iter().map(|c| c.amount.minor()).collect();
        for (contribution, scaled) in contributions.iter_mut().zip(allocate_money(cap, &weights)) {
            contribution.amount = scaled;
        }

        Ok(ItemDiscount {
            total: cap,
            contributions,
            clamped: true,
        })
    }
}

// =============================================================================
// Built-in Rules
// =============================================================================

/// Percentage off the line subtotal, optionally limited to a SKU prefix.
///
/// ## Example
/// ```rust
/// use hanko_core::discount::{ItemDiscountRule, PercentageOffRule};
/// use hanko_core::{CartItem, Money};
///
/// let rule = PercentageOffRule::new("jitsuin-sale", 500)
///     .unwrap()
///     .for_sku_prefix("JITSUIN-");
/// let item = CartItem::new("p1", "JITSUIN-18", 2, Money::from_minor(4000));
/// let out = rule.apply(&item, Money::from_minor(8000)).unwrap();
/// assert_eq!(out.amount.minor(), 400);
/// ```
#[derive(Debug, Clone)]
pub struct PercentageOffRule {
    name: String,
    bps: u32,
    sku_prefix: Option<String>,
}

impl PercentageOffRule {
    /// Creates the rule; `bps` must be at most 10000 (100%).
    pub fn new(name: impl Into<String>, bps: u32) -> ValidationResult<Self> {
        if bps > 10000 {
            return Err(ValidationError::OutOfRange {
                field: "discount rate".to_string(),
                min: 0,
                max: 10000,
            });
        }

        Ok(PercentageOffRule {
            name: name.into(),
            bps,
            sku_prefix: None,
        })
    }

    /// Restricts the rule to SKUs starting with `prefix`.
    pub fn for_sku_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sku_prefix = Some(prefix.into());
        self
    }
}

impl ItemDiscountRule for PercentageOffRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, item: &CartItem, line_subtotal: Money) -> CoreResult<RuleDiscount> {
        if let Some(prefix) = &self.sku_prefix {
            if !item.sku.starts_with(prefix.as_str()) {
                return Ok(RuleDiscount::none());
            }
        }

        let amount = line_subtotal
            .percentage_of(self.bps)
            .ok_or_else(|| CoreError::Overflow {
                operation: format!("{} discount on {}", self.name, item.sku),
            })?;
        let mut out = RuleDiscount::new(
            amount,
            format!("{}.{:02}% off", self.bps / 100, self.bps % 100),
        );
        out.metadata
            .insert("rateBps".to_string(), self.bps.to_string());
        Ok(out)
    }
}

/// Fixed amount off every unit once a minimum quantity is reached.
#[derive(Debug, Clone)]
pub struct FixedAmountPerUnitRule {
    name: String,
    amount_per_unit: Money,
    min_quantity: i64,
}

impl FixedAmountPerUnitRule {
    /// Creates the rule; the per-unit amount must not be negative.
    pub fn new(
        name: impl Into<String>,
        amount_per_unit: Money,
        min_quantity: i64,
    ) -> ValidationResult<Self> {
        if amount_per_unit.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "amount per unit".to_string(),
                value: amount_per_unit.minor(),
            });
        }

        Ok(FixedAmountPerUnitRule {
            name: name.into(),
            amount_per_unit,
            min_quantity: min_quantity.max(1),
        })
    }
}

impl ItemDiscountRule for FixedAmountPerUnitRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, item: &CartItem, _line_subtotal: Money) -> CoreResult<RuleDiscount> {
        if item.quantity < self.min_quantity {
            return Ok(RuleDiscount::none());
        }

        let amount = self
            .amount_per_unit
            .checked_mul_quantity(item.quantity)
            .ok_or_else(|| CoreError::Overflow {
                operation: format!("per-unit discount {} for {}", self.name, item.sku),
            })?;

        Ok(RuleDiscount::new(
            amount,
            format!("{} off per unit", self.amount_per_unit),
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
