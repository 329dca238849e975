use super::types::{Kpis, PlanParameters, ResolvedPlan, SimulationPoint, SimulationResult};

const MONTHS_PER_YEAR: i64 = 12;

#[derive(Debug, Clone, Copy)]
struct MonthlyRates {
    growth: f64,
    ter: f64,
    policy_pct: f64,
    policy_fixed: f64,
}

impl MonthlyRates {
    fn from_plan(plan: &ResolvedPlan) -> Self {
        Self {
            growth: plan.expected_return / 12.0,
            ter: plan.ter / 12.0,
            policy_pct: plan.policy_fee_annual_pct / 12.0,
            policy_fixed: plan.policy_fixed_annual / 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FeeBreakdown {
    ter: f64,
    policy: f64,
}

impl FeeBreakdown {
    fn total(self) -> f64 {
        self.ter + self.policy
    }
}

#[derive(Debug, Default)]
struct Ledger {
    total_contributions: f64,
    total_fees: f64,
    total_taxes: f64,
}

/// Runs the full accumulation and payout projection for one plan.
pub fn calculate_private_pension(plan: &PlanParameters) -> SimulationResult {
    run_projection(&plan.resolve())
}

pub fn run_projection(plan: &ResolvedPlan) -> SimulationResult {
    let rates = MonthlyRates::from_plan(plan);
    let current_age = i64::from(plan.current_age);
    let total_contribution_months = i64::from(plan.term_years) * MONTHS_PER_YEAR;
    let payout_start_month = (i64::from(plan.payout_start_age) - current_age) * MONTHS_PER_YEAR;
    let payout_end_month = (i64::from(plan.payout_end_age) - current_age) * MONTHS_PER_YEAR;

    let mut portfolio_value = plan.start_investment;
    let mut ledger = Ledger {
        total_contributions: plan.start_investment,
        ..Ledger::default()
    };

    let mut accumulation = Vec::new();
    for month_index in 0..payout_start_month {
        let contribution = if month_index < total_contribution_months {
            plan.monthly_contribution
        } else {
            0.0
        };
        portfolio_value += contribution;
        ledger.total_contributions += contribution;

        portfolio_value = apply_growth(portfolio_value, rates);

        let fees = monthly_fees(portfolio_value, rates).total();
        portfolio_value -= fees;
        ledger.total_fees += fees;

        let (year, month, age) = calendar(month_index, current_age);
        accumulation.push(SimulationPoint {
            year,
            month,
            age,
            contribution,
            portfolio_value,
            fees,
            taxes: 0.0,
            is_payout_phase: false,
            payout: None,
        });
    }

    let maturity_value = portfolio_value;
    let payout_rate = plan.payout_rate();

    let mut payout_series = Vec::new();
    let mut month_index = payout_start_month;
    // Reporting stops once the account is exhausted.
    while month_index < payout_end_month && portfolio_value > 0.0 {
        let gross_payout = monthly_payout(portfolio_value, payout_rate);

        portfolio_value = apply_growth(portfolio_value, rates);
        portfolio_value -= gross_payout;

        let monthly_tax = payout_tax(
            gross_payout,
            ledger.total_contributions,
            maturity_value,
            plan.tax_rate_payout,
        );
        ledger.total_taxes += monthly_tax;

        let fees = monthly_fees(portfolio_value, rates).total();
        portfolio_value -= fees;
        ledger.total_fees += fees;

        let (year, month, age) = calendar(month_index, current_age);
        payout_series.push(SimulationPoint {
            year,
            month,
            age,
            contribution: 0.0,
            portfolio_value: portfolio_value.max(0.0),
            fees,
            taxes: monthly_tax,
            is_payout_phase: true,
            payout: Some(gross_payout - monthly_tax),
        });
        month_index += 1;
    }

    SimulationResult {
        accumulation,
        payout: payout_series,
        kpis: summarize_kpis(plan, maturity_value, &ledger),
    }
}

fn summarize_kpis(plan: &ResolvedPlan, maturity_value: f64, ledger: &Ledger) -> Kpis {
    let projected_value = maturity_value;
    let target_gap = match plan.target_maturity_value {
        Some(target) if target != 0.0 => projected_value - target,
        _ => 0.0,
    };
    let total_costs = ledger.total_fees + ledger.total_taxes;

    Kpis {
        projected_value,
        target_gap,
        monthly_pension: monthly_payout(projected_value, plan.payout_rate()),
        total_fees: ledger.total_fees,
        total_contributions: ledger.total_contributions,
        total_taxes: ledger.total_taxes,
        capital_gains: projected_value - ledger.total_contributions,
        total_costs,
        net_return: projected_value - total_costs,
    }
}

fn calendar(month_index: i64, current_age: i64) -> (i64, u32, i64) {
    let year = month_index.div_euclid(MONTHS_PER_YEAR);
    let month = month_index.rem_euclid(MONTHS_PER_YEAR) as u32 + 1;
    (year, month, current_age + year)
}

fn apply_growth(portfolio_value: f64, rates: MonthlyRates) -> f64 {
    portfolio_value + portfolio_value * rates.growth
}

/// Fees are charged on the balance floored at zero, so they never go negative.
fn monthly_fees(portfolio_value: f64, rates: MonthlyRates) -> FeeBreakdown {
    let base = portfolio_value.max(0.0);
    FeeBreakdown {
        ter: base * rates.ter,
        policy: base * rates.policy_pct + rates.policy_fixed,
    }
}

fn monthly_payout(portfolio_value: f64, annual_rate: f64) -> f64 {
    portfolio_value * annual_rate / 12.0
}

/// Tax on one withdrawal. Only the earnings share of the payout is taxable;
/// returned principal is tax free.
fn payout_tax(payout: f64, total_contributions: f64, maturity_value: f64, tax_rate: f64) -> f64 {
    let contribution_portion = total_contributions / maturity_value;
    let earnings_portion = 1.0 - contribution_portion;
    let taxable_amount = payout * earnings_portion;
    taxable_amount * tax_rate
}
