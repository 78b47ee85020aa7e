//! Tiered pricing: a static lookup table, a volume increment per 10k rows,
//! and a hard cap per tier.

use super::Tier;

#[derive(Debug, Clone, Copy)]
pub struct TierPricing {
    pub base: u64,
    pub per_10k: u64,
    pub cap: u64,
}

/// Pricing constants per tier. Configuration, not derived.
pub fn pricing(tier: Tier) -> TierPricing {
    match tier {
        Tier::Monthly => TierPricing {
            base: 99,
            per_10k: 5,
            cap: 299,
        },
        Tier::Quarterly => TierPricing {
            base: 249,
            per_10k: 10,
            cap: 699,
        },
        Tier::Yearly => TierPricing {
            base: 899,
            per_10k: 20,
            cap: 1999,
        },
        Tier::Bundle => TierPricing {
            base: 2999,
            per_10k: 50,
            cap: 4999,
        },
    }
}

/// `min(cap, base + floor(rows / 10_000) * per_10k)`.
pub fn price(tier: Tier, row_count: u64) -> u64 {
    let p = pricing(tier);
    (p.base + (row_count / 10_000) * p.per_10k).min(p.cap)
}

/// Price from a tier label as found in sidecars or directory names. An
/// unknown label falls back to the monthly table.
pub fn price_for_label(label: &str, row_count: u64) -> u64 {
    price(Tier::from_label(label).unwrap_or(Tier::Monthly), row_count)
}
