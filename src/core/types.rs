use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENT_AGE: u32 = 30;
pub const DEFAULT_PAYOUT_START_AGE: u32 = 67;
pub const DEFAULT_PAYOUT_END_AGE: u32 = 85;
pub const DEFAULT_EXPECTED_RETURN: f64 = 0.075;
pub const DEFAULT_TER: f64 = 0.0075;
pub const DEFAULT_POLICY_FEE_ANNUAL_PCT: f64 = 0.004;
pub const DEFAULT_POLICY_FIXED_ANNUAL: f64 = 0.0;
pub const DEFAULT_ANNUITY_RATE: f64 = 0.04;
pub const DEFAULT_SAFE_WITHDRAWAL_RATE: f64 = 0.04;
pub const DEFAULT_TAX_RATE_PAYOUT: f64 = 0.25;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutMode {
    /// Lifelong annuity: monthly payout is `annuity_rate` of the balance.
    #[default]
    #[serde(alias = "rente")]
    Annuity,
    /// Flexible drawdown at `safe_withdrawal_rate`.
    #[serde(alias = "entnahme", alias = "flexible")]
    Flex,
}

/// Plan parameters as delivered by a caller. Every field may be absent;
/// [`PlanParameters::resolve`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanParameters {
    pub current_age: Option<u32>,
    pub start_age: Option<u32>,
    pub monthly_contribution: Option<f64>,
    pub start_investment: Option<f64>,
    pub term_years: Option<u32>,
    pub target_maturity_value: Option<f64>,
    pub payout_start_age: Option<u32>,
    pub payout_end_age: Option<u32>,
    pub payout_mode: Option<PayoutMode>,
    pub annuity_rate: Option<f64>,
    pub safe_withdrawal_rate: Option<f64>,
    pub policy_fee_annual_pct: Option<f64>,
    pub policy_fixed_annual: Option<f64>,
    pub ter: Option<f64>,
    pub tax_rate_payout: Option<f64>,
    pub expected_return: Option<f64>,
}

impl PlanParameters {
    /// Applies the default for every absent field. An explicit zero is kept.
    pub fn resolve(&self) -> ResolvedPlan {
        let current_age = self.current_age.unwrap_or(DEFAULT_CURRENT_AGE);
        let start_age = self.start_age.unwrap_or(current_age);
        let payout_start_age = self.payout_start_age.unwrap_or(DEFAULT_PAYOUT_START_AGE);

        ResolvedPlan {
            current_age,
            start_age,
            monthly_contribution: self.monthly_contribution.unwrap_or(0.0),
            start_investment: self.start_investment.unwrap_or(0.0),
            term_years: self
                .term_years
                .unwrap_or_else(|| payout_start_age.saturating_sub(start_age)),
            target_maturity_value: self.target_maturity_value,
            payout_start_age,
            payout_end_age: self.payout_end_age.unwrap_or(DEFAULT_PAYOUT_END_AGE),
            payout_mode: self.payout_mode.unwrap_or_default(),
            annuity_rate: self.annuity_rate.unwrap_or(DEFAULT_ANNUITY_RATE),
            safe_withdrawal_rate: self
                .safe_withdrawal_rate
                .unwrap_or(DEFAULT_SAFE_WITHDRAWAL_RATE),
            policy_fee_annual_pct: self
                .policy_fee_annual_pct
                .unwrap_or(DEFAULT_POLICY_FEE_ANNUAL_PCT),
            policy_fixed_annual: self
                .policy_fixed_annual
                .unwrap_or(DEFAULT_POLICY_FIXED_ANNUAL),
            ter: self.ter.unwrap_or(DEFAULT_TER),
            tax_rate_payout: self.tax_rate_payout.unwrap_or(DEFAULT_TAX_RATE_PAYOUT),
            expected_return: self.expected_return.unwrap_or(DEFAULT_EXPECTED_RETURN),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlan {
    pub current_age: u32,
    pub start_age: u32,
    pub monthly_contribution: f64,
    pub start_investment: f64,
    pub term_years: u32,
    pub target_maturity_value: Option<f64>,
    pub payout_start_age: u32,
    pub payout_end_age: u32,
    pub payout_mode: PayoutMode,
    pub annuity_rate: f64,
    pub safe_withdrawal_rate: f64,
    pub policy_fee_annual_pct: f64,
    pub policy_fixed_annual: f64,
    pub ter: f64,
    pub tax_rate_payout: f64,
    pub expected_return: f64,
}

impl ResolvedPlan {
    /// Annual withdrawal rate of the selected payout mode.
    pub fn payout_rate(&self) -> f64 {
        match self.payout_mode {
            PayoutMode::Annuity => self.annuity_rate,
            PayoutMode::Flex => self.safe_withdrawal_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPoint {
    pub year: i64,
    /// Month within the year, 1..=12.
    pub month: u32,
    pub age: i64,
    pub contribution: f64,
    pub portfolio_value: f64,
    pub fees: f64,
    pub taxes: f64,
    pub is_payout_phase: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub projected_value: f64,
    pub target_gap: f64,
    pub monthly_pension: f64,
    pub total_fees: f64,
    pub total_contributions: f64,
    pub total_taxes: f64,
    pub capital_gains: f64,
    pub total_costs: f64,
    pub net_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    #[serde(rename = "seriesAnspar")]
    pub accumulation: Vec<SimulationPoint>,
    #[serde(rename = "seriesPayout")]
    pub payout: Vec<SimulationPoint>,
    pub kpis: Kpis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub year: i64,
    pub age: i64,
    pub is_payout_phase: bool,
    pub months: u32,
    pub contributions: f64,
    pub fees: f64,
    pub taxes: f64,
    pub net_payout: f64,
    pub end_portfolio_value: f64,
}
