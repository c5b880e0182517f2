//! # Shipping Quote Cache
//!
//! Remembers shipping quotes per cart fingerprint so identical carts do not
//! hit the carrier-rate estimator again within the TTL.
//!
//! ## Lifecycle of an Entry
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  fingerprint(request) ──► get() ──► hit  (expires_at > now) ──► quote  │
//! │                             │                                           │
//! │                             ├─────► miss ──► estimator ──► insert()    │
//! │                             │                                           │
//! │                             └─────► expired ──► removed under the      │
//! │                                     write lock, treated as a miss      │
//! │                                                                         │
//! │  Locking: get() takes the shared lock; eviction and insert() take the  │
//! │  exclusive lock.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fingerprint
//! Country, postal code and state of the shipping address, currency, total
//! shippable weight, subtotal, discount, promotion code and every shippable
//! line as `sku:quantity:weight` (sorted). Any change to what is being
//! shipped, where, or at what price produces a different key. Separator
//! characters inside text parts are percent-encoded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::ports::{ProviderQuote, ShippingRequest};

/// Default time-to-live for cached quotes (5 minutes).
pub const DEFAULT_TTL_SECS: i64 = 300;

// =============================================================================
// Clock
// =============================================================================

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests and replay tooling.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Cache
// =============================================================================

#[derive(Debug, Clone)]
struct CachedQuote {
    quote: ProviderQuote,
    expires_at: DateTime<Utc>,
}

/// TTL cache of shipping quotes keyed by fingerprint.
pub struct ShippingQuoteCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CachedQuote>>,
}

impl std::fmt::Debug for ShippingQuoteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShippingQuoteCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.len())
            .finish()
    }
}

impl Default for ShippingQuoteCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }
}

impl ShippingQuoteCache {
    /// Creates a cache backed by the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Creates a cache with an injected clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        ShippingQuoteCache {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached quote if present and not expired.
    ///
    /// An expired entry is removed before returning `None`.
    pub fn get(&self, key: &str) -> Option<ProviderQuote> {
        let now = self.clock.now();

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.expires_at > now => return Some(entry.quote.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have refreshed the entry between the two locks.
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.quote.clone()),
            Some(_) => {
                entries.remove(key);
                debug!(key, "Evicted expired shipping quote");
                None
            }
            None => None,
        }
    }

    /// Stores (or replaces) a quote; it expires `ttl` from now.
    ///
    /// Expired entries are swept under the same write lock, so keys that
    /// are never looked up again do not accumulate.
    pub fn insert(&self, key: impl Into<String>, quote: ProviderQuote) {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(now);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let swept = before - entries.len();
        if swept > 0 {
            debug!(swept, "Swept expired shipping quotes");
        }

        entries.insert(key.into(), CachedQuote { quote, expires_at });
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

// =============================================================================
// Fingerprint
// =============================================================================

/// Builds the cache key for a shipping request.
///
/// ## Format
/// ```text
/// JP|1500001|TOKYO|JPY|500|10000|1100|SPRING10|INKAN-A:1:100,JITSUIN-18:2:200
/// ──┬───────────────── ─┬─ ─┬─ ──┬── ──┬─ ───┬──── ──────────┬────────────────
///   address              cur wt  sub   disc  promo    sorted sku:qty:weight
/// ```
pub fn fingerprint(request: &ShippingRequest) -> String {
    let address = &request.shipping_address;
    let weight = request
        .total_weight_grams()
        .map_or_else(|| "overflow".to_string(), |w| w.to_string());

    let mut lines: Vec<String> = request
        .items
        .iter()
        .map(|line| {
            format!(
                "{}:{}:{}",
                escape_part(&line.sku),
                line.quantity,
                line.weight_grams
            )
        })
        .collect();
    lines.sort();

    [
        normalize_part(&address.country),
        normalize_part(&address.postal_code),
        normalize_part(&address.state),
        escape_part(&request.currency),
        weight,
        request.subtotal.to_string(),
        request.discount_total.to_string(),
        escape_part(request.promo_code.as_deref().unwrap_or_default()),
        lines.join(","),
    ]
    .join("|")
}

fn normalize_part(part: &str) -> String {
    escape_part(&part.trim().replace('-', "").to_uppercase())
}

/// Percent-encodes the key's separators so free-text parts cannot collide.
fn escape_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' => out.push_str("%25"),
            '|' => out.push_str("%7C"),
            ':' => out.push_str("%3A"),
            ',' => out.push_str("%2C"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ShippableLine;
    use chrono::TimeZone;
    use hanko_core::{Address, Money};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap(),
        ))
    }

    fn request() -> ShippingRequest {
        ShippingRequest {
            currency: "JPY".to_string(),
            items: vec![
                ShippableLine {
                    product_id: "p1".into(),
                    sku: "JITSUIN-18".into(),
                    quantity: 2,
                    weight_grams: 200,
                    subtotal: Money::from_minor(8000),
                },
                ShippableLine {
                    product_id: "p2".into(),
                    sku: "INKAN-A".into(),
                    quantity: 1,
                    weight_grams: 100,
                    subtotal: Money::from_minor(2000),
                },
            ],
            shipping_address: Address::new("jp", "150-0001", "Tokyo"),
            subtotal: Money::from_minor(10000),
            discount_total: Money::from_minor(1100),
            promo_code: Some("SPRING10".to_string()),
        }
    }

    #[test]
    fn test_fingerprint_format() {
        assert_eq!(
            fingerprint(&request()),
            "JP|1500001|TOKYO|JPY|500|10000|1100|SPRING10|INKAN-A:1:100,JITSUIN-18:2:200"
        );
    }

    #[test]
    fn test_fingerprint_ignores_item_order() {
        let mut reordered = request();
        reordered.items.reverse();
        assert_eq!(fingerprint(&request()), fingerprint(&reordered));
    }

    #[test]
    fn test_fingerprint_changes_with_cart() {
        let base = fingerprint(&request());

        let mut other = request();
        other.promo_code = None;
        assert_ne!(base, fingerprint(&other));

        let mut other = request();
        other.items[0].quantity = 3;
        assert_ne!(base, fingerprint(&other));

        let mut other = request();
        other.shipping_address.postal_code = "530-0001".into();
        assert_ne!(base, fingerprint(&other));
    }

    #[test]
    fn test_fingerprint_separators_in_skus_do_not_collide() {
        let line = |sku: &str| ShippableLine {
            product_id: sku.into(),
            sku: sku.into(),
            quantity: 1,
            weight_grams: 0,
            subtotal: Money::from_minor(1000),
        };

        let mut merged = request();
        merged.items = vec![line("X:1:0,Y")];
        let mut split = request();
        split.items = vec![line("X"), line("Y")];
        assert_ne!(fingerprint(&merged), fingerprint(&split));
        assert!(fingerprint(&merged).ends_with("|X%3A1%3A0%2CY:1:0"));

        let mut piped = request();
        piped.shipping_address.state = "Tokyo|JPY".into();
        assert!(fingerprint(&piped).starts_with("JP|1500001|TOKYO%7CJPY|JPY|"));
    }

    #[test]
    fn test_hit_within_ttl() {
        let clock = clock();
        let cache = ShippingQuoteCache::with_clock(Duration::seconds(300), clock.clone());
        cache.insert("k", ProviderQuote::new(Money::from_minor(950)));

        clock.advance(Duration::seconds(299));
        assert_eq!(cache.get("k").map(|q| q.amount), Some(Money::from_minor(950)));
    }

    #[test]
    fn test_expired_entry_is_evicted_on_lookup() {
        let clock = clock();
        let cache = ShippingQuoteCache::with_clock(Duration::seconds(300), clock.clone());
        cache.insert("k", ProviderQuote::new(Money::from_minor(950)));

        clock.advance(Duration::seconds(300));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_replaces_and_refreshes() {
        let clock = clock();
        let cache = ShippingQuoteCache::with_clock(Duration::seconds(60), clock.clone());
        cache.insert("k", ProviderQuote::new(Money::from_minor(950)));
        clock.advance(Duration::seconds(50));
        cache.insert("k", ProviderQuote::new(Money::from_minor(1200)));
        clock.advance(Duration::seconds(50));

        assert_eq!(cache.get("k").map(|q| q.amount), Some(Money::from_minor(1200)));
    }

    #[test]
    fn test_purge_expired() {
        let clock = clock();
        let cache = ShippingQuoteCache::with_clock(Duration::seconds(60), clock.clone());
        cache.insert("a", ProviderQuote::new(Money::from_minor(1)));
        cache.insert("b", ProviderQuote::new(Money::from_minor(2)));
        clock.advance(Duration::seconds(61));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());

        cache.insert("c", ProviderQuote::new(Money::from_minor(3)));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_single_use_keys_do_not_accumulate() {
        let clock = clock();
        let cache = ShippingQuoteCache::with_clock(Duration::seconds(300), clock.clone());
        for i in 0..1000 {
            cache.insert(format!("cart-{i}"), ProviderQuote::new(Money::from_minor(950)));
            clock.advance(Duration::seconds(600));
        }
        assert_eq!(cache.len(), 1);

        // Live entries survive the sweep.
        cache.insert("x", ProviderQuote::new(Money::from_minor(1)));
        clock.advance(Duration::seconds(10));
        cache.insert("y", ProviderQuote::new(Money::from_minor(2)));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("x").is_some());
    }

    #[test]
    fn test_default_ttl_is_five_minutes() {
        assert_eq!(ShippingQuoteCache::default().ttl(), Duration::minutes(5));
    }
}
