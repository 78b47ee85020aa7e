use anyhow::Result;
use chrono::NaiveDate;
use rand::Rng;

use super::RowGenerator;

const COMPANIES: &[&str] = &["Tesla", "ExxonMobil", "Unilever", "BlackRock", "Patagonia"];

const HEADERS: &[&str] = &[
    "company",
    "date",
    "esg_claims",
    "verifiable_actions",
    "greenwashing_index",
    "regulatory_risk",
    "stakeholder_score",
    "impact_verified",
    "premium_insight",
    "claims_psi",
    "reality_psi",
    "greenwashing_gap_pct",
];

/// Daily sustainability-claim verification metrics for one issuer.
#[derive(Debug, Clone)]
pub struct EsgRow {
    pub company: &'static str,
    pub date: NaiveDate,
    pub esg_claims: i64,
    pub verifiable_actions: i64,
    pub greenwashing_index: i64,
    pub regulatory_risk: &'static str,
    pub stakeholder_score: i64,
    pub impact_verified_pct: i64,
    pub premium_insight: String,
    pub claims_psi: i64,
    pub reality_psi: i64,
    pub greenwashing_gap_pct: i64,
}

impl EsgRow {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.company.to_string(),
            self.date.format("%Y-%m-%d").to_string(),
            self.esg_claims.to_string(),
            self.verifiable_actions.to_string(),
            self.greenwashing_index.to_string(),
            self.regulatory_risk.to_string(),
            self.stakeholder_score.to_string(),
            format!("{}%", self.impact_verified_pct),
            self.premium_insight.clone(),
            self.claims_psi.to_string(),
            self.reality_psi.to_string(),
            self.greenwashing_gap_pct.to_string(),
        ]
    }
}

pub fn rows(rng: &mut impl Rng, date: NaiveDate) -> Vec<EsgRow> {
    COMPANIES
        .iter()
        .map(|&company| {
            let esg_claims = rng.gen_range(10..=50);
            let verified_ratio = rng.gen_range(0.2..0.9);
            let verifiable_actions = (esg_claims as f64 * verified_ratio) as i64;

            let verified_pct = verifiable_actions as f64 / esg_claims as f64;
            let greenwashing_index = ((1.0 - verified_pct) * 100.0) as i64;
            let regulatory_risk = if greenwashing_index > 60 {
                "High"
            } else if greenwashing_index > 30 {
                "Medium"
            } else {
                "Low"
            };
            let stakeholder_score = rng.gen_range(40..=95);
            let impact_verified_pct = (verified_pct * 100.0) as i64;

            // claims always present as fully stated; reality is the verified share
            let claims_psi = 100;
            let reality_psi = impact_verified_pct;
            let greenwashing_gap_pct = claims_psi - reality_psi;

            let premium_insight = if greenwashing_index > 70 {
                format!(
                    "High greenwashing risk - {}% of claims lack verification",
                    100 - impact_verified_pct
                )
            } else if stakeholder_score > 85 {
                "Strong stakeholder alignment driving brand equity".to_string()
            } else {
                "Strong on operations but weak on supply chain transparency".to_string()
            };

            EsgRow {
                company,
                date,
                esg_claims,
                verifiable_actions,
                greenwashing_index,
                regulatory_risk,
                stakeholder_score,
                impact_verified_pct,
                premium_insight,
                claims_psi,
                reality_psi,
                greenwashing_gap_pct,
            }
        })
        .collect()
}

pub struct EsgGenerator;

impl RowGenerator for EsgGenerator {
    fn headers(&self) -> &'static [&'static str] {
        HEADERS
    }

    fn generate(&self, date: NaiveDate) -> Result<Vec<Vec<String>>> {
        let mut rng = rand::thread_rng();
        Ok(rows(&mut rng, date).iter().map(EsgRow::to_record).collect())
    }
}
