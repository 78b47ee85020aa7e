use anyhow::Result;
use chrono::NaiveDate;
use rand::Rng;

use super::RowGenerator;

const COMPANIES: &[&str] = &["Meta", "Coinbase", "Amazon", "Pfizer", "Goldman Sachs"];

const HEADERS: &[&str] = &[
    "company",
    "date",
    "enforcement_probability",
    "compliance_gap",
    "fines_estimate",
    "remediation_cost",
    "whistleblower_risk",
    "regulatory_foresight",
    "premium_insight",
    "enforcement_probability_pct",
    "fine_impact_usd",
];

/// Daily enforcement-risk outlook for one regulated issuer.
#[derive(Debug, Clone)]
pub struct RegulatoryRow {
    pub company: &'static str,
    pub date: NaiveDate,
    pub enforcement_probability_pct: i64,
    pub compliance_gap: &'static str,
    pub fines_estimate_musd: i64,
    pub remediation_cost_musd: i64,
    pub whistleblower_risk: &'static str,
    pub regulatory_foresight: i64,
    pub premium_insight: String,
    pub fine_impact_usd: i64,
}

impl RegulatoryRow {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.company.to_string(),
            self.date.format("%Y-%m-%d").to_string(),
            format!("{}%", self.enforcement_probability_pct),
            self.compliance_gap.to_string(),
            format!("${}M", self.fines_estimate_musd),
            format!("${}M", self.remediation_cost_musd),
            self.whistleblower_risk.to_string(),
            self.regulatory_foresight.to_string(),
            self.premium_insight.clone(),
            self.enforcement_probability_pct.to_string(),
            self.fine_impact_usd.to_string(),
        ]
    }
}

pub fn rows(rng: &mut impl Rng, date: NaiveDate) -> Vec<RegulatoryRow> {
    COMPANIES
        .iter()
        .map(|&company| {
            let enforcement_probability_pct = rng.gen_range(10..=90);
            let compliance_gap = if enforcement_probability_pct > 70 {
                "Large"
            } else if enforcement_probability_pct > 40 {
                "Medium"
            } else {
                "Small"
            };
            let fines_estimate_musd = rng.gen_range(10..=5000);
            let remediation_cost_musd = rng.gen_range(5..=1000);
            let whistleblower_risk = if enforcement_probability_pct > 60 {
                "High"
            } else {
                "Low"
            };
            let regulatory_foresight = rng.gen_range(20..=90);
            let fine_impact_usd = rng.gen_range(10..=5000) * 1_000_000;

            let premium_insight = if enforcement_probability_pct > 75 {
                "High risk of antitrust action - compliance gaps significant".to_string()
            } else if regulatory_foresight > 80 {
                "Proactive compliance strategy mitigating sector risks".to_string()
            } else {
                "Moderate risk - improving compliance but scrutiny remains".to_string()
            };

            RegulatoryRow {
                company,
                date,
                enforcement_probability_pct,
                compliance_gap,
                fines_estimate_musd,
                remediation_cost_musd,
                whistleblower_risk,
                regulatory_foresight,
                premium_insight,
                fine_impact_usd,
            }
        })
        .collect()
}

pub struct RegulatoryGenerator;

impl RowGenerator for RegulatoryGenerator {
    fn headers(&self) -> &'static [&'static str] {
        HEADERS
    }

    fn generate(&self, date: NaiveDate) -> Result<Vec<Vec<String>>> {
        let mut rng = rand::thread_rng();
        Ok(rows(&mut rng, date)
            .iter()
            .map(RegulatoryRow::to_record)
            .collect())
    }
}
