//! # Cart Pricing Engine
//!
//! Turns a cart snapshot into a reconciled `PricingBreakdown`.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PriceCartCommand                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. validate items            qty > 0, price >= 0, weight >= 0         │
//! │  2. resolve currency          cart wins, items must agree              │
//! │  3. inventory check           optional port, fail-closed               │
//! │  4. resolve promotion code    override > cart, uppercase, blank = none │
//! │  5. item discount rules       per line: subtotal, discount, weights    │
//! │  6. promotion                 validator; clamp to what is left         │
//! │  7. allocate promotion        by net amount → refresh tax weights      │
//! │  8. shipping                  cache → estimator                        │
//! │  9. tax                       calculator                               │
//! │ 10. allocate tax & shipping   tax weights / shipping weights           │
//! │ 11. assemble                  breakdown + estimate                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Weights
//! - **tax weight**: net amount of the line. Refreshed after the promotion is
//!   allocated, so tax follows what the customer actually pays per line.
//! - **shipping weight**: `weight_grams × quantity`, or the net amount after
//!   item discounts for shippable lines without a weight, `0` for lines that
//!   do not ship. Computed once in step 5 and never refreshed: shipping cost
//!   tracks the parcel, not the price.
//!
//! ## Concurrency
//! `calculate` is synchronous and holds no state between calls apart from
//! the shipping quote cache, so one engine can be shared across threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use hanko_core::allocation::allocate_money;
use hanko_core::validation::{
    normalize_currency, normalize_promotion_code, resolve_currency, validate_currency_code,
    validate_item,
};
use hanko_core::{
    Address, Cart, CartEstimate, CartItem, DiscountAggregator, DiscountBreakdown, DiscountKind,
    ItemPricingBreakdown, Money, PricingBreakdown,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::{fingerprint, ShippingQuoteCache};
use crate::config::{ConfigResult, PricingConfig};
use crate::error::{PricingError, PricingResult};
use crate::ports::{
    InventoryAvailability, InventoryLine, PromotionRequest, PromotionValidator, ProviderQuote,
    ShippableLine, ShippingEstimator, ShippingRequest, TaxCalculator, TaxRequest, TaxableLine,
};
use crate::strategies::{FlatRateShipping, RateTableTax};

/// Metadata key: the promotion code that was applied.
pub const META_PROMOTION_CODE: &str = "promotionCode";
/// Metadata key: a promotion code the validator rejected.
pub const META_PROMOTION_REJECTED: &str = "promotionRejected";
/// Metadata key: the validator's reason text.
pub const META_PROMOTION_REASON: &str = "promotionReason";
/// Metadata key: `hit`, `miss`, `bypass` or `skipped`.
pub const META_SHIPPING_CACHE: &str = "shippingCache";

// =============================================================================
// Command / Result
// =============================================================================

/// Input of one pricing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceCartCommand {
    pub cart: Cart,
    /// Replaces the cart's own promotion code. `Some("")` removes it.
    pub promotion_code: Option<String>,
    pub shipping_address_override: Option<Address>,
    pub billing_address_override: Option<Address>,
    /// Always ask the shipping estimator, refreshing the cached quote.
    pub bypass_shipping_cache: bool,
}

impl PriceCartCommand {
    pub fn new(cart: Cart) -> Self {
        PriceCartCommand {
            cart,
            ..PriceCartCommand::default()
        }
    }

    pub fn with_promotion_code(mut self, code: impl Into<String>) -> Self {
        self.promotion_code = Some(code.into());
        self
    }

    pub fn with_shipping_address(mut self, address: Address) -> Self {
        self.shipping_address_override = Some(address);
        self
    }

    pub fn with_billing_address(mut self, address: Address) -> Self {
        self.billing_address_override = Some(address);
        self
    }

    pub fn bypassing_shipping_cache(mut self) -> Self {
        self.bypass_shipping_cache = true;
        self
    }
}

/// Output of one pricing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCartResult {
    pub breakdown: PricingBreakdown,
    pub estimate: CartEstimate,
}

impl From<PricingBreakdown> for PriceCartResult {
    fn from(breakdown: PricingBreakdown) -> Self {
        let estimate = CartEstimate::from(&breakdown);
        PriceCartResult {
            breakdown,
            estimate,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Per-line working state for one run.
struct Line<'a> {
    item: &'a CartItem,
    subtotal: Money,
    discount: Money,
    tax_weight: i64,
    shipping_weight: i64,
}

impl Line<'_> {
    fn net(&self) -> Money {
        // discount never exceeds subtotal and both are >= 0
        Money::from_minor(self.subtotal.minor() - self.discount.minor())
    }
}

/// Promotion that survived validation and clamping.
struct ResolvedPromotion {
    code: String,
    description: String,
    amount: Money,
}

/// The cart pricing engine.
///
/// ## Example
/// ```rust
/// use hanko_core::{Cart, CartItem, Money};
/// use hanko_pricing::{CartPricingEngine, PriceCartCommand};
///
/// let mut cart = Cart::new("JPY");
/// cart.items.push(CartItem::new("p1", "JITSUIN-18", 2, Money::from_minor(4000)));
///
/// let engine = CartPricingEngine::new();
/// let result = engine.calculate(&PriceCartCommand::new(cart)).unwrap();
/// assert_eq!(result.estimate.total, Money::from_minor(8000));
/// ```
pub struct CartPricingEngine {
    discounts: DiscountAggregator,
    promotions: Option<Arc<dyn PromotionValidator>>,
    tax: Option<Arc<dyn TaxCalculator>>,
    shipping: Option<Arc<dyn ShippingEstimator>>,
    inventory: Option<Arc<dyn InventoryAvailability>>,
    shipping_cache: Arc<ShippingQuoteCache>,
}

impl Default for CartPricingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CartPricingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartPricingEngine")
            .field("discounts", &self.discounts)
            .field("promotions", &self.promotions.is_some())
            .field("tax", &self.tax.is_some())
            .field("shipping", &self.shipping.is_some())
            .field("inventory", &self.inventory.is_some())
            .field("shipping_cache", &self.shipping_cache)
            .finish()
    }
}

impl CartPricingEngine {
    /// An engine with no rules, no collaborators and a default cache.
    pub fn new() -> Self {
        CartPricingEngine {
            discounts: DiscountAggregator::new(),
            promotions: None,
            tax: None,
            shipping: None,
            inventory: None,
            shipping_cache: Arc::new(ShippingQuoteCache::default()),
        }
    }

    /// An engine wired to the reference flat-rate shipping and rate-table
    /// tax strategies described by `config`.
    ///
    /// ## Errors
    /// `ConfigError::Invalid` if `config` fails validation (e.g. a tax rate
    /// above 100%).
    pub fn from_config(config: &PricingConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::new()
            .with_shipping_cache(Arc::new(ShippingQuoteCache::new(config.shipping_cache.ttl())))
            .with_shipping_estimator(Arc::new(FlatRateShipping::from_settings(&config.shipping)))
            .with_tax_calculator(Arc::new(RateTableTax::from_settings(&config.tax))))
    }

    pub fn with_discount_rules(mut self, discounts: DiscountAggregator) -> Self {
        self.discounts = discounts;
        self
    }

    pub fn with_promotion_validator(mut self, validator: Arc<dyn PromotionValidator>) -> Self {
        self.promotions = Some(validator);
        self
    }

    pub fn with_tax_calculator(mut self, calculator: Arc<dyn TaxCalculator>) -> Self {
        self.tax = Some(calculator);
        self
    }

    pub fn with_shipping_estimator(mut self, estimator: Arc<dyn ShippingEstimator>) -> Self {
        self.shipping = Some(estimator);
        self
    }

    pub fn with_inventory(mut self, inventory: Arc<dyn InventoryAvailability>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_shipping_cache(mut self, cache: Arc<ShippingQuoteCache>) -> Self {
        self.shipping_cache = cache;
        self
    }

    pub fn shipping_cache(&self) -> &ShippingQuoteCache {
        &self.shipping_cache
    }

    /// Prices a cart.
    ///
    /// ## Errors
    /// - `Core`: bad quantity/price/weight, missing currency, a negative
    ///   rule discount, line arithmetic overflow (kind `InvalidInput`)
    /// - `InvalidInput`: a negative amount from a provider, cart-level
    ///   arithmetic overflow
    /// - `CurrencyMismatch`: items priced in another currency
    /// - `Inventory` / `Promotion` / `Tax` / `Shipping`: collaborator failure
    ///
    /// Any error aborts the run; there is no partial result.
    #[instrument(
        name = "price_cart",
        skip_all,
        fields(
            cart_id = command.cart.id.as_deref().unwrap_or(""),
            items = command.cart.items.len(),
        )
    )]
    pub fn calculate(&self, command: &PriceCartCommand) -> PricingResult<PriceCartResult> {
        let cart = &command.cart;

        // 1-2. Validation and currency
        if cart.items.is_empty() {
            let currency = normalize_currency(&cart.currency);
            validate_currency_code(&currency)?;
            debug!(%currency, "Empty cart, returning zero breakdown");
            return Ok(PricingBreakdown::empty(currency).into());
        }

        for item in &cart.items {
            validate_item(item)?;
        }
        let currency = resolve_currency(cart)?;

        // 3. Inventory
        if let Some(inventory) = &self.inventory {
            let lines: Vec<InventoryLine> = cart
                .items
                .iter()
                .map(|i| InventoryLine {
                    product_id: i.product_id.clone(),
                    sku: i.sku.clone(),
                    quantity: i.quantity,
                })
                .collect();
            inventory.validate(&lines).map_err(PricingError::Inventory)?;
        }

        // 4. Promotion code
        let promo_code = match &command.promotion_code {
            Some(code) => normalize_promotion_code(code),
            None => cart
                .promotion
                .as_ref()
                .and_then(|p| normalize_promotion_code(&p.code)),
        };

        // 5. Item discount rules
        let mut lines = Vec::with_capacity(cart.items.len());
        let mut rule_totals: BTreeMap<String, (String, Money)> = BTreeMap::new();
        for item in &cart.items {
            let subtotal = item.line_subtotal()?;
            let discount = self.discounts.aggregate(item, subtotal)?;

            for c in discount.contributions {
                let entry = rule_totals
                    .entry(c.rule)
                    .or_insert_with(|| (c.description.clone(), Money::zero()));
                if entry.0.is_empty() {
                    entry.0 = c.description;
                }
                entry.1 = entry
                    .1
                    .checked_add(c.amount)
                    .ok_or_else(|| PricingError::overflow("item discount total"))?;
            }

            let line = Line {
                item,
                subtotal,
                discount: discount.total,
                tax_weight: 0,
                shipping_weight: 0,
            };
            let net = line.net().minor();
            let shipping_weight = if !item.requires_shipping {
                0
            } else {
                match item.line_weight_grams()? {
                    w if w > 0 => w,
                    _ => net,
                }
            };
            lines.push(Line {
                tax_weight: net,
                shipping_weight,
                ..line
            });
        }

        let subtotal = Money::checked_sum(lines.iter().map(|l| l.subtotal))
            .ok_or_else(|| PricingError::overflow("cart subtotal"))?;
        let item_discount_total = Money::checked_sum(lines.iter().map(|l| l.discount))
            .ok_or_else(|| PricingError::overflow("item discount total"))?;

        let mut discounts: Vec<DiscountBreakdown> = rule_totals
            .into_iter()
            .filter(|(_, (_, amount))| amount.is_positive())
            .map(|(rule, (description, amount))| DiscountBreakdown {
                kind: DiscountKind::Item,
                source: rule,
                description,
                amount,
            })
            .collect();
        let mut metadata = BTreeMap::new();

        // 6. Promotion
        let available = subtotal
            .checked_sub(item_discount_total)
            .ok_or_else(|| PricingError::overflow("discountable amount"))?
            .clamp_non_negative();
        let applied = match promo_code {
            Some(code) => self.apply_promotion(code, cart, available, &mut metadata)?,
            None => None,
        };

        let mut promo_discount = Money::zero();
        let mut downstream_code = None;
        if let Some(promo) = applied {
            promo_discount = promo.amount;
            metadata.insert(META_PROMOTION_CODE.to_string(), promo.code.clone());
            discounts.push(DiscountBreakdown {
                kind: DiscountKind::Promotion,
                source: promo.code.clone(),
                description: promo.description,
                amount: promo.amount,
            });
            downstream_code = Some(promo.code);
        }

        // 7. Spread the promotion over lines by net amount
        if promo_discount.is_positive() {
            let weights: Vec<i64> = lines.iter().map(|l| l.tax_weight).collect();
            for (line, share) in lines.iter_mut().zip(allocate_money(promo_discount, &weights)) {
                line.discount = line
                    .discount
                    .checked_add(share)
                    .ok_or_else(|| PricingError::overflow("line discount"))?;
            }
        }
        for line in &mut lines {
            line.tax_weight = line.net().minor();
        }

        let discount_total = item_discount_total
            .checked_add(promo_discount)
            .ok_or_else(|| PricingError::overflow("discount total"))?;

        // 8. Shipping
        let shipping_address = command
            .shipping_address_override
            .as_ref()
            .or(cart.shipping_address.as_ref());
        let billing_address = command
            .billing_address_override
            .as_ref()
            .or(cart.billing_address.as_ref());

        let shipping_quote = self.quote_shipping(
            &currency,
            &lines,
            shipping_address,
            subtotal,
            discount_total,
            downstream_code.as_deref(),
            command.bypass_shipping_cache,
            &mut metadata,
        )?;
        let shipping = shipping_quote.amount;

        // 9. Tax
        let tax_quote = match &self.tax {
            Some(calculator) => {
                let request = TaxRequest {
                    currency: currency.clone(),
                    items: lines
                        .iter()
                        .map(|l| TaxableLine {
                            product_id: l.item.product_id.clone(),
                            sku: l.item.sku.clone(),
                            quantity: l.item.quantity,
                            tax_code: l.item.tax_code.clone(),
                            subtotal: l.subtotal,
                            discount: l.discount,
                            net_amount: l.net(),
                        })
                        .collect(),
                    subtotal,
                    discount_total,
                    shipping_amount: shipping,
                    billing_address: billing_address.cloned(),
                    shipping_address: shipping_address.cloned(),
                    promo_code: downstream_code.clone(),
                };
                let quote = calculator
                    .calculate_tax(&request)
                    .map_err(PricingError::Tax)?;
                if quote.amount.is_negative() {
                    return Err(PricingError::InvalidInput(format!(
                        "tax calculator returned negative amount {}",
                        quote.amount
                    )));
                }
                quote
            }
            None => ProviderQuote::default(),
        };
        let tax = tax_quote.amount;

        // 10. Allocate tax and shipping back onto lines
        let tax_weights: Vec<i64> = lines.iter().map(|l| l.tax_weight).collect();
        let shipping_weights: Vec<i64> = lines.iter().map(|l| l.shipping_weight).collect();
        let tax_shares = allocate_money(tax, &tax_weights);
        let shipping_shares = allocate_money(shipping, &shipping_weights);

        let mut items = Vec::with_capacity(lines.len());
        for ((line, line_tax), line_shipping) in lines.iter().zip(tax_shares).zip(shipping_shares) {
            let total = line
                .net()
                .checked_add(line_tax)
                .and_then(|t| t.checked_add(line_shipping))
                .ok_or_else(|| PricingError::overflow("line total"))?
                .clamp_non_negative();
            items.push(ItemPricingBreakdown {
                product_id: line.item.product_id.clone(),
                sku: line.item.sku.clone(),
                quantity: line.item.quantity,
                unit_price: line.item.unit_price,
                subtotal: line.subtotal,
                discount: line.discount,
                tax: line_tax,
                shipping: line_shipping,
                total,
            });
        }

        // 11. Assemble
        let total = subtotal
            .checked_sub(discount_total)
            .and_then(|net| net.checked_add(tax))
            .and_then(|t| t.checked_add(shipping))
            .ok_or_else(|| PricingError::overflow("cart total"))?
            .clamp_non_negative();

        let breakdown = PricingBreakdown {
            currency,
            subtotal,
            discount: discount_total,
            tax,
            shipping,
            total,
            items,
            discounts,
            tax_lines: tax_quote.breakdown,
            shipping_lines: shipping_quote.breakdown,
            metadata,
        };

        info!(
            currency = %breakdown.currency,
            subtotal = %breakdown.subtotal,
            discount = %breakdown.discount,
            tax = %breakdown.tax,
            shipping = %breakdown.shipping,
            total = %breakdown.total,
            "Cart priced"
        );

        Ok(breakdown.into())
    }

    /// Validates a promotion code and clamps its discount to `available`.
    ///
    /// Returns `None` (and no error) when the code is not eligible or no
    /// validator is configured.
    fn apply_promotion(
        &self,
        code: String,
        cart: &Cart,
        available: Money,
        metadata: &mut BTreeMap<String, String>,
    ) -> PricingResult<Option<ResolvedPromotion>> {
        let Some(validator) = &self.promotions else {
            warn!(%code, "Promotion code present but no validator configured, ignoring it");
            return Ok(None);
        };

        let request = PromotionRequest {
            code: code.clone(),
            user_id: cart.user_id.clone(),
            cart_id: cart.id.clone(),
        };
        let result = validator
            .validate(&request)
            .map_err(PricingError::Promotion)?;

        if !result.eligible {
            warn!(%code, reason = %result.reason, "Promotion not eligible");
            metadata.insert(META_PROMOTION_REJECTED.to_string(), code);
            if !result.reason.is_empty() {
                metadata.insert(META_PROMOTION_REASON.to_string(), result.reason);
            }
            return Ok(None);
        }

        if result.discount_amount.is_negative() {
            return Err(PricingError::InvalidInput(format!(
                "promotion {code} returned negative discount {}",
                result.discount_amount
            )));
        }

        let amount = result.discount_amount.min(available);
        if amount < result.discount_amount {
            debug!(
                %code,
                requested = %result.discount_amount,
                applied = %amount,
                "Promotion discount clamped"
            );
        }

        let code = normalize_promotion_code(&result.code).unwrap_or(code);
        let description = if result.reason.is_empty() {
            format!("Promotion {code}")
        } else {
            metadata.insert(META_PROMOTION_REASON.to_string(), result.reason.clone());
            result.reason
        };

        Ok(Some(ResolvedPromotion {
            code,
            description,
            amount,
        }))
    }

    /// Gets a shipping quote, going through the cache unless bypassed.
    #[allow(clippy::too_many_arguments)]
    fn quote_shipping(
        &self,
        currency: &str,
        lines: &[Line<'_>],
        address: Option<&Address>,
        subtotal: Money,
        discount_total: Money,
        promo_code: Option<&str>,
        bypass_cache: bool,
        metadata: &mut BTreeMap<String, String>,
    ) -> PricingResult<ProviderQuote> {
        let shippable: Vec<&Line<'_>> = lines.iter().filter(|l| l.item.requires_shipping).collect();
        let (Some(address), Some(estimator)) = (address, &self.shipping) else {
            metadata.insert(META_SHIPPING_CACHE.to_string(), "skipped".to_string());
            return Ok(ProviderQuote::default());
        };
        if shippable.is_empty() {
            metadata.insert(META_SHIPPING_CACHE.to_string(), "skipped".to_string());
            return Ok(ProviderQuote::default());
        }

        let request = ShippingRequest {
            currency: currency.to_string(),
            items: shippable
                .iter()
                .map(|l| ShippableLine {
                    product_id: l.item.product_id.clone(),
                    sku: l.item.sku.clone(),
                    quantity: l.item.quantity,
                    weight_grams: l.item.weight_grams,
                    subtotal: l.subtotal,
                })
                .collect(),
            shipping_address: address.clone(),
            subtotal,
            discount_total,
            promo_code: promo_code.map(str::to_string),
        };
        let key = fingerprint(&request);

        if !bypass_cache {
            if let Some(quote) = self.shipping_cache.get(&key) {
                debug!(%key, amount = %quote.amount, "Shipping quote cache hit");
                metadata.insert(META_SHIPPING_CACHE.to_string(), "hit".to_string());
                return Ok(quote);
            }
        }

        let quote = estimator
            .estimate_shipping(&request)
            .map_err(PricingError::Shipping)?;
        if quote.amount.is_negative() {
            return Err(PricingError::InvalidInput(format!(
                "shipping estimator returned negative amount {}",
                quote.amount
            )));
        }

        debug!(%key, amount = %quote.amount, bypass_cache, "Shipping quote fetched");
        self.shipping_cache.insert(key, quote.clone());
        metadata.insert(
            META_SHIPPING_CACHE.to_string(),
            if bypass_cache { "bypass" } else { "miss" }.to_string(),
        );
        Ok(quote)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
