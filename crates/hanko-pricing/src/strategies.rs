//! # Reference Strategies
//!
//! Minimal tax and shipping implementations so the engine can run end to end
//! (quote preview, local development, tests). Production deployments plug in
//! the carrier-rate and tax-authority integrations instead.
//!
//! ## Flat-Rate Shipping
//! ```text
//! net = subtotal - discount
//! net >= free_shipping_threshold ?  → 0
//! otherwise                         → base_fee + ceil(weight_kg) × per_kg_fee
//! ```
//!
//! ## Rate-Table Tax
//! ```text
//! per tax code:   Σ net_amount × rate(code)   (default rate for no code)
//! shipping:       shipping × default rate     (when tax_shipping)
//! ```

use std::collections::BTreeMap;

use hanko_core::{Money, TaxRate};

use crate::config::{ShippingSettings, TaxSettings};
use crate::ports::{
    CollaboratorError, ProviderQuote, ShippingEstimator, ShippingRequest, TaxCalculator, TaxRequest,
};

/// Tax code used for lines that do not carry one.
pub const STANDARD_TAX_CODE: &str = "standard";

// =============================================================================
// Flat-Rate Shipping
// =============================================================================

#[derive(Debug, Clone)]
pub struct FlatRateShipping {
    base_fee: Money,
    per_kg_fee: Money,
    free_shipping_threshold: Option<Money>,
}

impl FlatRateShipping {
    pub fn new(base_fee: Money) -> Self {
        FlatRateShipping {
            base_fee,
            per_kg_fee: Money::zero(),
            free_shipping_threshold: None,
        }
    }

    pub fn with_per_kg_fee(mut self, fee: Money) -> Self {
        self.per_kg_fee = fee;
        self
    }

    pub fn with_free_shipping_threshold(mut self, threshold: Money) -> Self {
        self.free_shipping_threshold = Some(threshold);
        self
    }

    pub fn from_settings(settings: &ShippingSettings) -> Self {
        FlatRateShipping {
            base_fee: Money::from_minor(settings.base_fee),
            per_kg_fee: Money::from_minor(settings.per_kg_fee),
            free_shipping_threshold: settings.free_shipping_threshold.map(Money::from_minor),
        }
    }
}

impl ShippingEstimator for FlatRateShipping {
    fn estimate_shipping(&self, request: &ShippingRequest) -> Result<ProviderQuote, CollaboratorError> {
        let net = request
            .subtotal
            .checked_sub(request.discount_total)
            .ok_or("net subtotal overflow")?;

        if let Some(threshold) = self.free_shipping_threshold {
            if net >= threshold {
                return Ok(ProviderQuote::new(Money::zero()).with_line("free_shipping", Money::zero()));
            }
        }

        let grams = request
            .total_weight_grams()
            .ok_or("shipping weight overflow")?;
        let grams = grams.max(0);
        let started_kg = grams / 1000 + i64::from(grams % 1000 != 0);
        let weight_fee = self
            .per_kg_fee
            .checked_mul_quantity(started_kg)
            .ok_or("weight fee overflow")?;
        let amount = self
            .base_fee
            .checked_add(weight_fee)
            .ok_or("shipping fee overflow")?;

        let mut quote = ProviderQuote::new(amount).with_line("base", self.base_fee);
        if weight_fee.is_positive() {
            quote = quote.with_line("weight", weight_fee);
        }
        Ok(quote)
    }
}

// =============================================================================
// Rate-Table Tax
// =============================================================================

#[derive(Debug, Clone)]
pub struct RateTableTax {
    default_rate: TaxRate,
    rates_by_code: BTreeMap<String, TaxRate>,
    tax_shipping: bool,
}

impl RateTableTax {
    pub fn new(default_rate: TaxRate) -> Self {
        RateTableTax {
            default_rate,
            rates_by_code: BTreeMap::new(),
            tax_shipping: true,
        }
    }

    pub fn with_code_rate(mut self, code: impl Into<String>, rate: TaxRate) -> Self {
        self.rates_by_code.insert(code.into(), rate);
        self
    }

    pub fn with_tax_shipping(mut self, tax_shipping: bool) -> Self {
        self.tax_shipping = tax_shipping;
        self
    }

    pub fn from_settings(settings: &TaxSettings) -> Self {
        RateTableTax {
            default_rate: TaxRate::from_bps(settings.default_rate_bps),
            rates_by_code: settings
                .rates_by_code
                .iter()
                .map(|(code, bps)| (code.clone(), TaxRate::from_bps(*bps)))
                .collect(),
            tax_shipping: settings.tax_shipping,
        }
    }

    fn rate_for(&self, code: &str) -> TaxRate {
        self.rates_by_code
            .get(code)
            .copied()
            .unwrap_or(self.default_rate)
    }
}

impl TaxCalculator for RateTableTax {
    fn calculate_tax(&self, request: &TaxRequest) -> Result<ProviderQuote, CollaboratorError> {
        let mut base_by_code: BTreeMap<&str, Money> = BTreeMap::new();
        for line in &request.items {
            let code = line.tax_code.as_deref().unwrap_or(STANDARD_TAX_CODE);
            let base = base_by_code.entry(code).or_insert_with(Money::zero);
            *base = base
                .checked_add(line.net_amount.clamp_non_negative())
                .ok_or("taxable base overflow")?;
        }

        let mut quote = ProviderQuote::default();
        for (code, base) in base_by_code {
            let tax = base
                .calculate_tax(self.rate_for(code))
                .ok_or("tax overflow")?;
            quote.amount = quote.amount.checked_add(tax).ok_or("tax overflow")?;
            quote = quote.with_line(code, tax);
        }

        if self.tax_shipping && request.shipping_amount.is_positive() {
            let tax = request
                .shipping_amount
                .calculate_tax(self.default_rate)
                .ok_or("shipping tax overflow")?;
            quote.amount = quote.amount.checked_add(tax).ok_or("tax overflow")?;
            quote = quote.with_line("shipping", tax);
        }

        Ok(quote)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{ShippableLine, TaxableLine};
    use hanko_core::Address;

    fn shipping_request(weight_grams: i64, subtotal: i64, discount: i64) -> ShippingRequest {
        ShippingRequest {
            currency: "JPY".into(),
            items: vec![ShippableLine {
                product_id: "p1".into(),
                sku: "JITSUIN-18".into(),
                quantity: 1,
                weight_grams,
                subtotal: Money::from_minor(subtotal),
            }],
            shipping_address: Address::new("JP", "1500001", "Tokyo"),
            subtotal: Money::from_minor(subtotal),
            discount_total: Money::from_minor(discount),
            promo_code: None,
        }
    }

    fn taxable(sku: &str, net: i64, code: Option<&str>) -> TaxableLine {
        TaxableLine {
            product_id: sku.into(),
            sku: sku.into(),
            quantity: 1,
            tax_code: code.map(String::from),
            subtotal: Money::from_minor(net),
            discount: Money::zero(),
            net_amount: Money::from_minor(net),
        }
    }

    fn tax_request(items: Vec<TaxableLine>, shipping: i64) -> TaxRequest {
        TaxRequest {
            currency: "JPY".into(),
            items,
            subtotal: Money::zero(),
            discount_total: Money::zero(),
            shipping_amount: Money::from_minor(shipping),
            billing_address: None,
            shipping_address: None,
            promo_code: None,
        }
    }

    #[test]
    fn test_flat_rate_with_weight() {
        let estimator = FlatRateShipping::new(Money::from_minor(800))
            .with_per_kg_fee(Money::from_minor(150));
        let quote = estimator
            .estimate_shipping(&shipping_request(1_200, 5000, 0))
            .unwrap();
        // 1.2kg → 2 started kilograms
        assert_eq!(quote.amount, Money::from_minor(1100));
        assert_eq!(quote.breakdown.len(), 2);
    }

    #[test]
    fn test_free_shipping_threshold_uses_discounted_subtotal() {
        let estimator = FlatRateShipping::new(Money::from_minor(800))
            .with_free_shipping_threshold(Money::from_minor(10000));

        let free = estimator
            .estimate_shipping(&shipping_request(100, 12000, 1000))
            .unwrap();
        assert_eq!(free.amount, Money::zero());

        let charged = estimator
            .estimate_shipping(&shipping_request(100, 10500, 1000))
            .unwrap();
        assert_eq!(charged.amount, Money::from_minor(800));
    }

    #[test]
    fn test_rate_table_tax_per_code() {
        let calc = RateTableTax::new(TaxRate::from_bps(1000))
            .with_code_rate("reduced", TaxRate::from_bps(800))
            .with_tax_shipping(false);
        let quote = calc
            .calculate_tax(&tax_request(
                vec![taxable("A", 5000, None), taxable("B", 2000, Some("reduced"))],
                950,
            ))
            .unwrap();

        assert_eq!(quote.amount, Money::from_minor(660));
        let labels: Vec<_> = quote.breakdown.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["reduced", "standard"]);
    }

    #[test]
    fn test_rate_table_tax_includes_shipping() {
        let calc = RateTableTax::new(TaxRate::from_bps(1000));
        let quote = calc
            .calculate_tax(&tax_request(vec![taxable("A", 8900, None)], 950))
            .unwrap();
        // 890 + 95
        assert_eq!(quote.amount, Money::from_minor(985));
    }

    #[test]
    fn test_rate_table_tax_overflow_is_an_error() {
        let calc = RateTableTax::new(TaxRate::from_bps(30_000));
        let err = calc
            .calculate_tax(&tax_request(
                vec![taxable("A", 6_148_914_691_236_517_206, None)],
                0,
            ))
            .unwrap_err();
        assert_eq!(err.to_string(), "tax overflow");
    }

    #[test]
    fn test_from_settings() {
        let settings = ShippingSettings {
            base_fee: 500,
            per_kg_fee: 100,
            free_shipping_threshold: None,
        };
        let quote = FlatRateShipping::from_settings(&settings)
            .estimate_shipping(&shipping_request(0, 1000, 0))
            .unwrap();
        assert_eq!(quote.amount, Money::from_minor(500));

        let tax = RateTableTax::from_settings(&TaxSettings::default());
        let quote = tax.calculate_tax(&tax_request(vec![taxable("A", 1000, None)], 0)).unwrap();
        assert_eq!(quote.amount, Money::from_minor(100));
    }
}
