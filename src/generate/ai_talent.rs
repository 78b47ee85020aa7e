use anyhow::Result;
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;

use super::RowGenerator;

const COMPANIES: &[&str] = &["OpenAI", "Anthropic", "StabilityAI", "Cohere", "Hugging Face"];

const HEADERS: &[&str] = &[
    "company",
    "date",
    "github_stars_7d",
    "arxiv_papers",
    "citations",
    "patents_filed",
    "investor_engagement",
    "funding_probability",
    "technical_momentum",
    "talent_score",
    "premium_insight",
    "innovation_delay_days",
    "benchmark_inflation_pct",
    "flight_status",
];

/// Daily research-output and capital signals for an AI lab.
#[derive(Debug, Clone)]
pub struct AiTalentRow {
    pub company: &'static str,
    pub date: NaiveDate,
    pub github_stars_7d: i64,
    pub arxiv_papers: i64,
    pub citations: i64,
    pub patents_filed: i64,
    pub investor_engagement: &'static str,
    pub funding_probability: i64,
    pub technical_momentum: i64,
    pub talent_score: i64,
    pub premium_insight: String,
    pub innovation_delay_days: i64,
    pub benchmark_inflation_pct: i64,
    pub flight_status: &'static str,
}

impl AiTalentRow {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.company.to_string(),
            self.date.format("%Y-%m-%d").to_string(),
            format!("+{}", self.github_stars_7d),
            self.arxiv_papers.to_string(),
            self.citations.to_string(),
            self.patents_filed.to_string(),
            self.investor_engagement.to_string(),
            format!("{}%", self.funding_probability),
            self.technical_momentum.to_string(),
            self.talent_score.to_string(),
            self.premium_insight.clone(),
            self.innovation_delay_days.to_string(),
            self.benchmark_inflation_pct.to_string(),
            self.flight_status.to_string(),
        ]
    }
}

pub fn rows(rng: &mut impl Rng, date: NaiveDate) -> Vec<AiTalentRow> {
    COMPANIES
        .iter()
        .map(|&company| {
            let github_stars_7d = rng.gen_range(0..=600);
            let arxiv_papers = rng.gen_range(0..=5);
            let citations = rng.gen_range(0..=150);
            let patents_filed = *[0, 0, 0, 1, 1, 2].choose(rng).unwrap();
            let investor_engagement = *["High", "Medium", "Low"].choose(rng).unwrap();

            let technical_momentum =
                (arxiv_papers * 10 + citations / 2 + github_stars_7d / 10).min(100);
            let talent_score = rng.gen_range(60..=99);
            let funding_probability =
                ((technical_momentum as f64 * 0.8 + talent_score as f64 * 0.1) as i64).min(99);

            let innovation_delay_days = *[0, 0, 0, 30, 60, 90, 180].choose(rng).unwrap();
            let benchmark_inflation_pct = rng.gen_range(0..=50);
            let flight_status = if technical_momentum > 90 {
                "Accelerating"
            } else if innovation_delay_days == 0 {
                "On Time"
            } else {
                "Delayed"
            };

            let premium_insight = if investor_engagement == "High" && technical_momentum > 80 {
                "Strong Series D candidate - investor engagement at all-time high".to_string()
            } else if technical_momentum < 40 {
                "Momentum slowing - may seek acquisition vs. next round".to_string()
            } else {
                "Steady technical output, organic growth phase".to_string()
            };

            AiTalentRow {
                company,
                date,
                github_stars_7d,
                arxiv_papers,
                citations,
                patents_filed,
                investor_engagement,
                funding_probability,
                technical_momentum,
                talent_score,
                premium_insight,
                innovation_delay_days,
                benchmark_inflation_pct,
                flight_status,
            }
        })
        .collect()
}

pub struct AiTalentGenerator;

impl RowGenerator for AiTalentGenerator {
    fn headers(&self) -> &'static [&'static str] {
        HEADERS
    }

    fn generate(&self, date: NaiveDate) -> Result<Vec<Vec<String>>> {
        let mut rng = rand::thread_rng();
        Ok(rows(&mut rng, date)
            .iter()
            .map(AiTalentRow::to_record)
            .collect())
    }
}
