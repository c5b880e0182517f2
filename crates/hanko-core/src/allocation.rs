//! # Weighted Allocation
//!
//! Splits an integer amount across integer weights so that the parts add up
//! to exactly the amount (largest-remainder apportionment).
//!
//! ## Why Not Just Divide?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Tax ¥800 across items weighted 7600 / 1900 / 0                         │
//! │                                                                         │
//! │  Naive floor:     640 + 160 + 0 = 800  (lucky)                         │
//! │  Tax ¥801:        640 + 160 + 0 = 800  → ¥1 vanished ❌                 │
//! │                                                                         │
//! │  Largest remainder:                                                     │
//! │    1. floor shares       640, 160, 0                                   │
//! │    2. remainders         (801×7600) mod 9500 = 7600                    │
//! │                          (801×1900) mod 9500 = 1900                    │
//! │    3. leftover 1 unit → index with largest remainder (0)               │
//! │    result                641, 160, 0   Σ = 801 ✅                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Intermediates are computed in i128, so `total × weight` never overflows.

use crate::money::Money;

/// Distributes `total` across `weights`.
///
/// ## Guarantees
/// - `result.len() == weights.len()`
/// - `result.iter().sum() == total` exactly (for non-empty `weights`)
/// - every element is `>= 0` when `total >= 0`
/// - each element is within one unit of `total × wᵢ / Σw`
///
/// ## Rules
/// - Negative weights count as zero.
/// - If no weight is positive, `total` is split evenly and the remainder goes
///   to the first `total mod n` indices.
/// - Leftover units go to the largest remainders, ties by lower index.
/// - A negative `total` is allocated by magnitude and negated.
///
/// ## Example
/// ```rust
/// use hanko_core::allocation::allocate;
///
/// assert_eq!(allocate(10, &[1, 1, 1]), vec![4, 3, 3]);
/// assert_eq!(allocate(700, &[7600, 1900]), vec![560, 140]);
/// assert_eq!(allocate(5, &[0, 0]), vec![3, 2]);
/// ```
pub fn allocate(total: i64, weights: &[i64]) -> Vec<i64> {
    if weights.is_empty() {
        return Vec::new();
    }

    let magnitude = (total as i128).abs();
    let parts = allocate_magnitude(magnitude, weights);

    // Each part is bounded by |total|, so it fits back into i64 with the sign
    // restored.
    if total < 0 {
        parts.into_iter().map(|p| (-p) as i64).collect()
    } else {
        parts.into_iter().map(|p| p as i64).collect()
    }
}

/// `allocate` for money amounts.
pub fn allocate_money(total: Money, weights: &[i64]) -> Vec<Money> {
    allocate(total.minor(), weights)
        .into_iter()
        .map(Money::from_minor)
        .collect()
}

fn allocate_magnitude(total: i128, weights: &[i64]) -> Vec<i128> {
    let n = weights.len() as i128;
    let clamped: Vec<i128> = weights.iter().map(|&w| (w as i128).max(0)).collect();
    let weight_sum: i128 = clamped.iter().sum();

    if weight_sum == 0 {
        let base = total / n;
        let extra = (total % n) as usize;
        return (0..weights.len())
            .map(|i| if i < extra { base + 1 } else { base })
            .collect();
    }

    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for &w in &clamped {
        let product = total * w;
        shares.push(product / weight_sum);
        remainders.push(product % weight_sum);
    }

    let allocated: i128 = shares.iter().sum();
    let leftover = (total - allocated) as usize;

    if leftover > 0 {
        let mut order: Vec<usize> = (0..weights.len()).collect();
        // Stable sort keeps index order for equal remainders.
        order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]));
        for &idx in order.iter().take(leftover) {
            shares[idx] += 1;
        }
    }

    shares
}

// =============================================================================
// Unit Tests
// =============================================================================
