//! # Pricing Error Types
//!
//! Errors returned by a pricing run.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Pricing Error Categories                          │
//! │                                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────────┐  ┌─────────────────┐ │
//! │  │   Invalid input     │  │  Currency mismatch  │  │  Collaborator   │ │
//! │  │   (caller's fault)  │  │  (caller's fault)   │  │  (upstream)     │ │
//! │  │                     │  │                     │  │                 │ │
//! │  │  bad qty / price    │  │  JPY cart, USD item │  │  Inventory      │ │
//! │  │  negative rule/quote│  │                     │  │  Promotion      │ │
//! │  │  overflow           │  │                     │  │  Tax            │ │
//! │  │  missing currency   │  │                     │  │  Shipping       │ │
//! │  └─────────────────────┘  └─────────────────────┘  └─────────────────┘ │
//! │          4xx                      4xx                     5xx          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error aborts the whole run; no partial breakdown is ever returned.
//! The 4xx/5xx mapping itself is done by the HTTP layer using [`ErrorKind`].

use hanko_core::CoreError;
use hanko_core::ValidationError;
use thiserror::Error;

use crate::ports::CollaboratorError;

/// Result type alias for pricing operations.
pub type PricingResult<T> = Result<T, PricingError>;

/// Everything that can make a pricing run fail.
#[derive(Debug, Error)]
pub enum PricingError {
    /// The cart snapshot or a provider's answer is unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A domain rule in hanko-core rejected the cart (validation, overflow,
    /// discount rule). Classified as invalid input.
    #[error("Invalid input: {0}")]
    Core(#[source] CoreError),

    /// Items disagree with the resolved cart currency.
    #[error("Currency mismatch: item {sku} is priced in {found}, cart is {expected}")]
    CurrencyMismatch {
        sku: String,
        expected: String,
        found: String,
    },

    /// The inventory availability check failed (fail-closed).
    #[error("Inventory check failed: {0}")]
    Inventory(#[source] CollaboratorError),

    /// The promotion validator failed.
    #[error("Promotion validation failed: {0}")]
    Promotion(#[source] CollaboratorError),

    /// The tax calculator failed.
    #[error("Tax calculation failed: {0}")]
    Tax(#[source] CollaboratorError),

    /// The shipping estimator failed.
    #[error("Shipping estimation failed: {0}")]
    Shipping(#[source] CollaboratorError),
}

/// Coarse classification for callers that only need to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    CurrencyMismatch,
    Collaborator,
}

impl PricingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PricingError::InvalidInput(_) | PricingError::Core(_) => ErrorKind::InvalidInput,
            PricingError::CurrencyMismatch { .. } => ErrorKind::CurrencyMismatch,
            PricingError::Inventory(_)
            | PricingError::Promotion(_)
            | PricingError::Tax(_)
            | PricingError::Shipping(_) => ErrorKind::Collaborator,
        }
    }

    /// True when the caller sent something wrong (as opposed to an upstream failure).
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Collaborator)
    }

    pub(crate) fn overflow(operation: &str) -> Self {
        PricingError::InvalidInput(format!("arithmetic overflow while computing {operation}"))
    }
}

impl From<CoreError> for PricingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CurrencyMismatch {
                sku,
                expected,
                found,
            } => PricingError::CurrencyMismatch {
                sku,
                expected,
                found,
            },
            other => PricingError::Core(other),
        }
    }
}

impl From<ValidationError> for PricingError {
    fn from(err: ValidationError) -> Self {
        PricingError::Core(CoreError::Validation(err))
    }
}
