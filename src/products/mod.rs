//! Product derivation: partitioning a master table into sellable files,
//! pricing them, and describing them for the catalog.

use serde::Serialize;

pub mod catalog;
pub mod partition;
pub mod pricing;
pub mod sidecar;

/// Partitioning granularity. Variant order is catalog rank order, so the
/// derived `Ord` sorts bundle first and monthly last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Bundle,
    Yearly,
    Quarterly,
    Monthly,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Bundle, Tier::Yearly, Tier::Quarterly, Tier::Monthly];

    /// Subdirectory the tier's files live in.
    pub fn dir_name(self) -> &'static str {
        match self {
            Tier::Bundle => "bundles",
            Tier::Yearly => "yearly",
            Tier::Quarterly => "quarterly",
            Tier::Monthly => "monthly",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Bundle => "bundle",
            Tier::Yearly => "yearly",
            Tier::Quarterly => "quarterly",
            Tier::Monthly => "monthly",
        }
    }

    pub fn from_label(s: &str) -> Option<Tier> {
        match s.trim().to_lowercase().as_str() {
            "bundle" => Some(Tier::Bundle),
            "yearly" => Some(Tier::Yearly),
            "quarterly" => Some(Tier::Quarterly),
            "monthly" => Some(Tier::Monthly),
            _ => None,
        }
    }
}

/// Marketing copy for a (tier, period) pair, shared by the partition writer
/// and the catalog builder.
pub fn describe(tier: Tier, period: &str) -> String {
    match tier {
        Tier::Bundle => "Complete Historical Bundle".to_string(),
        Tier::Yearly => format!("{} Full Year Dataset", period),
        Tier::Quarterly | Tier::Monthly => format!("{} Dataset", period),
    }
}
