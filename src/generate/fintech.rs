use anyhow::Result;
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;

use super::RowGenerator;

const COMPANIES: &[&str] = &["Revolut", "Chime", "N26", "Monzo", "SoFi"];

const HEADERS: &[&str] = &[
    "company",
    "date",
    "download_velocity",
    "review_sentiment",
    "hiring_spike",
    "feature_lead_score",
    "adoption_velocity",
    "churn_risk",
    "funding_signal",
    "cac_proxy",
    "premium_insight",
    "alpha_window_days",
    "smart_money_score",
];

/// Daily growth metrics for one consumer-fintech app.
#[derive(Debug, Clone)]
pub struct FintechRow {
    pub company: &'static str,
    pub date: NaiveDate,
    pub download_velocity: i64,
    pub review_sentiment: f64,
    pub hiring_spike: bool,
    pub feature_lead_score: i64,
    pub adoption_velocity: i64,
    pub churn_risk: i64,
    pub funding_signal: &'static str,
    pub cac_proxy: String,
    pub premium_insight: String,
    pub alpha_window_days: i64,
    pub smart_money_score: i64,
}

impl FintechRow {
    fn to_record(&self) -> Vec<String> {
        vec![
            self.company.to_string(),
            self.date.format("%Y-%m-%d").to_string(),
            self.download_velocity.to_string(),
            format!("{:.1}", self.review_sentiment),
            if self.hiring_spike { "Yes" } else { "No" }.to_string(),
            self.feature_lead_score.to_string(),
            self.adoption_velocity.to_string(),
            self.churn_risk.to_string(),
            self.funding_signal.to_string(),
            self.cac_proxy.clone(),
            self.premium_insight.clone(),
            self.alpha_window_days.to_string(),
            self.smart_money_score.to_string(),
        ]
    }
}

pub fn rows(rng: &mut impl Rng, date: NaiveDate) -> Vec<FintechRow> {
    COMPANIES
        .iter()
        .map(|&company| {
            let download_velocity = rng.gen_range(45..=105);
            let review_sentiment = rng.gen_range(38..=49) as f64 / 10.0;
            // hiring spikes are the rare event that drives the funding signal
            let hiring_spike = rng.gen_ratio(1, 4);
            let feature_lead_score = rng.gen_range(60..=95);

            let adoption_velocity =
                (download_velocity as f64 * 0.6 + feature_lead_score as f64 * 0.4) as i64;
            let churn_risk = (((5.0 - review_sentiment) * 10.0) as i64).clamp(1, 10);
            let funding_signal = if hiring_spike && adoption_velocity > 80 {
                "Strong"
            } else if adoption_velocity > 70 {
                "Moderate"
            } else {
                "Weak"
            };
            let cac_proxy = format!("${}", rng.gen_range(35..=85));

            let alpha_window_days = rng.gen_range(14..=45);
            let smart_money_score = if hiring_spike {
                rng.gen_range(85..=99)
            } else {
                rng.gen_range(40..=98)
            };

            let premium_insight = if hiring_spike {
                format!(
                    "Likely Series {} in Q{} based on hiring spike",
                    ["E", "F", "G"].choose(rng).unwrap(),
                    rng.gen_range(1..=4)
                )
            } else if churn_risk > 7 {
                "Critical churn risk detected due to negative sentiment clusters".to_string()
            } else {
                "Stable growth trajectory with optimized CAC".to_string()
            };

            FintechRow {
                company,
                date,
                download_velocity,
                review_sentiment,
                hiring_spike,
                feature_lead_score,
                adoption_velocity,
                churn_risk,
                funding_signal,
                cac_proxy,
                premium_insight,
                alpha_window_days,
                smart_money_score,
            }
        })
        .collect()
}

pub struct FintechGenerator;

impl RowGenerator for FintechGenerator {
    fn headers(&self) -> &'static [&'static str] {
        HEADERS
    }

    fn generate(&self, date: NaiveDate) -> Result<Vec<Vec<String>>> {
        let mut rng = rand::thread_rng();
        Ok(rows(&mut rng, date).iter().map(FintechRow::to_record).collect())
    }
}
