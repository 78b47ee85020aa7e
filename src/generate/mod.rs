//! Synthetic row generation for the tracked business verticals.
//!
//! Each vertical owns a typed row struct and a stateless generator. The
//! pipeline only sees the [`RowGenerator`] trait, so tests can substitute a
//! scripted or failing source without touching the real generators.

use anyhow::Result;
use chrono::NaiveDate;

pub mod ai_talent;
pub mod esg;
pub mod fintech;
pub mod regulatory;
pub mod supply_chain;

/// One independently tracked dataset category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vertical {
    Fintech,
    AiTalent,
    Esg,
    Regulatory,
    SupplyChain,
}

impl Vertical {
    pub const ALL: [Vertical; 5] = [
        Vertical::Fintech,
        Vertical::AiTalent,
        Vertical::Esg,
        Vertical::Regulatory,
        Vertical::SupplyChain,
    ];

    /// Filename prefix for every file this vertical produces.
    pub fn slug(self) -> &'static str {
        match self {
            Vertical::Fintech => "fintech_growth_digest",
            Vertical::AiTalent => "ai_talent_heatmap",
            Vertical::Esg => "esg_sentiment_tracker",
            Vertical::Regulatory => "regulatory_risk_index",
            Vertical::SupplyChain => "supply_chain_risk",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Vertical::Fintech => "Fintech Growth Intelligence",
            Vertical::AiTalent => "AI Talent & Capital Prediction",
            Vertical::Esg => "ESG Impact & Greenwashing Detector",
            Vertical::Regulatory => "Regulatory Compliance Prediction",
            Vertical::SupplyChain => "Supply Chain Resilience",
        }
    }

    pub fn generator(self) -> &'static dyn RowGenerator {
        match self {
            Vertical::Fintech => &fintech::FintechGenerator,
            Vertical::AiTalent => &ai_talent::AiTalentGenerator,
            Vertical::Esg => &esg::EsgGenerator,
            Vertical::Regulatory => &regulatory::RegulatoryGenerator,
            Vertical::SupplyChain => &supply_chain::SupplyChainGenerator,
        }
    }
}

/// Source of one day's worth of rows for a vertical.
///
/// Implementations must populate the entity column and the date column on
/// every record; the merge layer relies on both for event-key dedup.
pub trait RowGenerator: Sync {
    /// Header row, fixed per vertical.
    fn headers(&self) -> &'static [&'static str];

    /// Column holding the entity identifier.
    fn entity_column(&self) -> &'static str {
        "company"
    }

    /// Explicit unique-id column, when the vertical carries one. Verticals
    /// without an id dedup on (entity, date) instead.
    fn id_column(&self) -> Option<&'static str> {
        None
    }

    /// Produce every record for `date`, one per tracked entity.
    fn generate(&self, date: NaiveDate) -> Result<Vec<Vec<String>>>;
}

/// All dates of a backfill window ending at `end`, oldest first. The window
/// is inclusive of `end`, so `days_back = 365` yields 366 dates.
pub fn date_range(end: NaiveDate, days_back: u32) -> Vec<NaiveDate> {
    let start = end - chrono::Duration::days(days_back as i64);
    let mut out = Vec::with_capacity(days_back as usize + 1);
    let mut d = start;
    while d <= end {
        out.push(d);
        d = d + chrono::Duration::days(1);
    }
    out
}
