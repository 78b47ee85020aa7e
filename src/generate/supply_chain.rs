use anyhow::Result;
use chrono::NaiveDate;
use rand::Rng;

use super::RowGenerator;

const COMPANIES: &[&str] = &["Apple", "Ford", "Nike", "Toyota", "Samsung"];

const HEADERS: &[&str] = &[
    "company",
    "date",
    "disruption_risk",
    "recovery_days",
    "single_point_failure",
    "cost_inflation",
    "resilience_score",
    "premium_insight",
    "disruption_probability",
    "days_to_impact",
];

/// Daily sourcing-disruption outlook for one manufacturer.
#[derive(Debug, Clone)]
pub struct SupplyChainRow {
    pub company: &'static str,
    pub date: NaiveDate,
    pub disruption_risk: i64,
    pub recovery_days: i64,
    pub single_point_failure: &'static str,
    pub cost_inflation_pct: f64,
    pub resilience_score: i64,
    pub premium_insight: String,
    pub days_to_impact: i64,
}

impl SupplyChainRow {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.company.to_string(),
            self.date.format("%Y-%m-%d").to_string(),
            self.disruption_risk.to_string(),
            self.recovery_days.to_string(),
            self.single_point_failure.to_string(),
            format!("{:.1}%", self.cost_inflation_pct),
            self.resilience_score.to_string(),
            self.premium_insight.clone(),
            self.disruption_risk.to_string(),
            self.days_to_impact.to_string(),
        ]
    }
}

pub fn rows(rng: &mut impl Rng, date: NaiveDate) -> Vec<SupplyChainRow> {
    COMPANIES
        .iter()
        .map(|&company| {
            let disruption_risk = rng.gen_range(10..=80);
            let recovery_days = (disruption_risk as f64 * 0.6) as i64;
            let single_point_failure = if disruption_risk > 60 {
                "High"
            } else if disruption_risk > 30 {
                "Medium"
            } else {
                "Low"
            };
            let cost_inflation_pct = rng.gen_range(10..=150) as f64 / 10.0;
            let resilience_score = 100 - disruption_risk;
            let days_to_impact = rng.gen_range(5..=60);

            let premium_insight = if disruption_risk > 60 {
                "High battery/chip supply risk - alternative suppliers needed urgently".to_string()
            } else if resilience_score > 75 {
                "Strong supplier diversification but regional dependency remains".to_string()
            } else {
                "Stable supply chain with moderate inflationary pressure".to_string()
            };

            SupplyChainRow {
                company,
                date,
                disruption_risk,
                recovery_days,
                single_point_failure,
                cost_inflation_pct,
                resilience_score,
                premium_insight,
                days_to_impact,
            }
        })
        .collect()
}

pub struct SupplyChainGenerator;

impl RowGenerator for SupplyChainGenerator {
    fn headers(&self) -> &'static [&'static str] {
        HEADERS
    }

    fn generate(&self, date: NaiveDate) -> Result<Vec<Vec<String>>> {
        let mut rng = rand::thread_rng();
        Ok(rows(&mut rng, date)
            .iter()
            .map(SupplyChainRow::to_record)
            .collect())
    }
}
