//! # hanko-pricing: Cart Pricing Engine
//!
//! Computes the price of a cart: subtotal, item and promotion discounts,
//! tax, shipping and total, with every cart-level amount distributed back
//! onto the lines so that the lines always add up to the cart.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        hanko-pricing                                    │
//! │                                                                         │
//! │   PriceCartCommand ──► CartPricingEngine::calculate ──► PriceCartResult│
//! │                              │                                          │
//! │        ┌─────────────────────┼──────────────────────┐                   │
//! │        ▼                     ▼                      ▼                   │
//! │   hanko-core            ports (traits)       ShippingQuoteCache         │
//! │   money, allocation,    promotion, tax,      fingerprint → quote        │
//! │   discount rules        shipping, inventory  TTL + injected clock       │
//! │                              ▲                                          │
//! │                              │                                          │
//! │                         strategies: flat-rate shipping, rate-table tax  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - The pricing pipeline
//! - [`ports`] - Collaborator traits and their request/response types
//! - [`cache`] - Shipping quote cache and clocks
//! - [`strategies`] - Reference tax and shipping implementations
//! - [`config`] - TOML + environment configuration
//! - [`error`] - `PricingError`

use tracing_subscriber::EnvFilter;

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod ports;
pub mod strategies;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cache::{fingerprint, Clock, ManualClock, ShippingQuoteCache, SystemClock};
pub use config::{ConfigError, PricingConfig};
pub use engine::{CartPricingEngine, PriceCartCommand, PriceCartResult};
pub use error::{ErrorKind, PricingError, PricingResult};
pub use ports::{
    CollaboratorError, InventoryAvailability, PromotionValidator, ProviderQuote, ShippingEstimator,
    TaxCalculator,
};
pub use strategies::{FlatRateShipping, RateTableTax};

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,hanko=debug";

/// Initializes the tracing subscriber for binaries embedding the engine.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=hanko_pricing=trace` - Trace the engine only
/// - Default: INFO, DEBUG for hanko crates
///
/// Logs go to stderr so stdout stays machine-readable. Calling this twice
/// is harmless; the second call is ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
