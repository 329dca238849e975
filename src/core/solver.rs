use serde::Serialize;
use thiserror::Error;

use super::{PlanParameters, calculate_private_pension};

/// Upper bound on bisection steps accepted from callers.
pub const MAX_SOLVER_ITERATIONS: u32 = 200;

const TARGET_SLACK: f64 = 1e-9;

/// What the solved contribution has to reach.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "target", rename_all = "camelCase")]
pub enum Goal {
    /// Projected value at maturity of at least this amount.
    MaturityValue(f64),
    /// Initial gross monthly pension of at least this amount.
    MonthlyPension(f64),
}

impl Goal {
    fn target(self) -> f64 {
        match self {
            Goal::MaturityValue(target) | Goal::MonthlyPension(target) => target,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SolveConfig {
    pub goal: Goal,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub achieved_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub goal: Goal,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_monthly_contribution: Option<f64>,
    pub achieved_value: Option<f64>,
    pub iterations: Vec<SolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    #[error("invalid solver config: {0}")]
    InvalidConfig(String),
}

/// Bisects the monthly contribution until the plan reaches `config.goal`.
///
/// The projected value and the initial pension both grow with the monthly
/// contribution, so the smallest feasible contribution inside the search
/// bounds is unique up to `tolerance`.
pub fn solve_required_contribution(
    plan: &PlanParameters,
    config: SolveConfig,
) -> Result<SolveResult, SolverError> {
    validate_config(config)?;

    let target = config.goal.target();
    let meets_target = |achieved: f64| achieved + TARGET_SLACK >= target;

    let (solved, iterations, converged, feasible, message) =
        if meets_target(evaluate_candidate(plan, config.goal, config.search_min)) {
            (
                Some(config.search_min),
                Vec::new(),
                true,
                true,
                "The lower search bound already reaches the target.",
            )
        } else if !meets_target(evaluate_candidate(plan, config.goal, config.search_max)) {
            (
                None,
                Vec::new(),
                false,
                false,
                "Even the upper search bound falls short of the target.",
            )
        } else {
            let search = bisect(config, |contribution| {
                let achieved = evaluate_candidate(plan, config.goal, contribution);
                (achieved, meets_target(achieved))
            });
            let message = if search.converged {
                "Found the smallest contribution that reaches the target."
            } else {
                "Iteration limit hit before the bracket narrowed to the tolerance; the upper bracket is returned."
            };
            (
                Some(search.upper),
                search.trace,
                search.converged,
                true,
                message,
            )
        };

    Ok(SolveResult {
        goal: config.goal,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_monthly_contribution: solved,
        achieved_value: solved.map(|value| evaluate_candidate(plan, config.goal, value)),
        iterations,
        converged,
        feasible,
        message: message.to_string(),
    })
}

struct Bisection {
    upper: f64,
    trace: Vec<SolveIteration>,
    converged: bool,
}

/// Narrows `[search_min, search_max]` around the first contribution for which
/// `evaluate` reports success. `upper` always satisfies the target.
fn bisect(config: SolveConfig, mut evaluate: impl FnMut(f64) -> (f64, bool)) -> Bisection {
    let (mut lower, mut upper) = (config.search_min, config.search_max);
    let mut trace = Vec::new();

    for iteration in 1..=config.max_iterations {
        let candidate = lower + (upper - lower) / 2.0;
        let (achieved, reached) = evaluate(candidate);
        trace.push(SolveIteration {
            iteration,
            lower_bound: lower,
            upper_bound: upper,
            candidate_value: candidate,
            achieved_value: achieved,
        });
        if reached {
            upper = candidate;
        } else {
            lower = candidate;
        }
        if upper - lower <= config.tolerance {
            return Bisection {
                upper,
                trace,
                converged: true,
            };
        }
    }

    Bisection {
        upper,
        trace,
        converged: false,
    }
}

fn evaluate_candidate(base_plan: &PlanParameters, goal: Goal, monthly_contribution: f64) -> f64 {
    let plan = PlanParameters {
        monthly_contribution: Some(monthly_contribution.max(0.0)),
        ..base_plan.clone()
    };
    let kpis = calculate_private_pension(&plan).kpis;
    match goal {
        Goal::MaturityValue(_) => kpis.projected_value,
        Goal::MonthlyPension(_) => kpis.monthly_pension,
    }
}

fn validate_config(config: SolveConfig) -> Result<(), SolverError> {
    let target = config.goal.target();
    if !target.is_finite() || target <= 0.0 {
        return Err(SolverError::InvalidConfig(
            "goal target must be a finite value > 0".to_string(),
        ));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(SolverError::InvalidConfig(
            "search bounds must be finite".to_string(),
        ));
    }
    if config.search_min < 0.0 {
        return Err(SolverError::InvalidConfig(
            "search_min must be >= 0".to_string(),
        ));
    }
    if config.search_max <= config.search_min {
        return Err(SolverError::InvalidConfig(
            "search_max must be greater than search_min".to_string(),
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolverError::InvalidConfig(
            "tolerance must be > 0".to_string(),
        ));
    }
    if config.max_iterations == 0 || config.max_iterations > MAX_SOLVER_ITERATIONS {
        return Err(SolverError::InvalidConfig(format!(
            "max_iterations must be between 1 and {MAX_SOLVER_ITERATIONS}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PayoutMode;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn frictionless_plan() -> PlanParameters {
        PlanParameters {
            current_age: Some(30),
            start_investment: Some(0.0),
            term_years: Some(10),
            payout_start_age: Some(40),
            payout_end_age: Some(60),
            payout_mode: Some(PayoutMode::Annuity),
            annuity_rate: Some(0.06),
            expected_return: Some(0.0),
            ter: Some(0.0),
            policy_fee_annual_pct: Some(0.0),
            policy_fixed_annual: Some(0.0),
            ..PlanParameters::default()
        }
    }

    fn config(goal: Goal) -> SolveConfig {
        SolveConfig {
            goal,
            search_min: 0.0,
            search_max: 2_000.0,
            tolerance: 0.01,
            max_iterations: 40,
        }
    }

    #[test]
    fn maturity_goal_solves_deterministic_contribution() {
        // 120 months without growth or fees: 120 * c = 60_000 -> c = 500.
        let result = solve_required_contribution(
            &frictionless_plan(),
            config(Goal::MaturityValue(60_000.0)),
        )
        .expect("must solve");

        assert!(result.feasible);
        assert!(result.converged);
        assert_close(
            result.solved_monthly_contribution.expect("value expected"),
            500.0,
            0.02,
        );
        assert!(result.achieved_value.expect("achieved value") >= 60_000.0 - 1e-6);
        assert!(!result.iterations.is_empty());
    }

    #[test]
    fn monthly_pension_goal_solves_deterministic_contribution() {
        // 6% annuity on 120 * c: c * 120 * 0.005 = 300 -> c = 500.
        let result = solve_required_contribution(
            &frictionless_plan(),
            config(Goal::MonthlyPension(300.0)),
        )
        .expect("must solve");

        assert!(result.feasible);
        assert_close(
            result.solved_monthly_contribution.expect("value expected"),
            500.0,
            0.02,
        );
    }

    #[test]
    fn solver_reports_infeasible_when_bounds_too_low() {
        let mut cfg = config(Goal::MaturityValue(60_000.0));
        cfg.search_max = 100.0;
        let result =
            solve_required_contribution(&frictionless_plan(), cfg).expect("must return result");

        assert!(!result.feasible);
        assert!(result.solved_monthly_contribution.is_none());
        assert!(result.achieved_value.is_none());
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn solver_returns_lower_bound_when_already_met() {
        let mut plan = frictionless_plan();
        plan.start_investment = Some(100_000.0);
        let result = solve_required_contribution(&plan, config(Goal::MaturityValue(60_000.0)))
            .expect("must solve");

        assert!(result.feasible);
        assert_eq!(result.solved_monthly_contribution, Some(0.0));
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn solver_reports_unconverged_estimate_when_iterations_run_out() {
        let mut cfg = config(Goal::MaturityValue(60_000.0));
        cfg.max_iterations = 3;
        let result =
            solve_required_contribution(&frictionless_plan(), cfg).expect("must return result");

        assert!(result.feasible);
        assert!(!result.converged);
        assert_eq!(result.iterations.len(), 3);
        assert!(result.solved_monthly_contribution.expect("estimate") >= 500.0);
    }

    #[test]
    fn solver_rejects_invalid_config() {
        let plan = frictionless_plan();
        let mut cfg = config(Goal::MaturityValue(60_000.0));
        cfg.search_max = cfg.search_min;
        let err = solve_required_contribution(&plan, cfg).expect_err("inverted bounds");
        assert!(err.to_string().contains("search_max"));

        let mut cfg = config(Goal::MonthlyPension(0.0));
        cfg.tolerance = 0.1;
        let err = solve_required_contribution(&plan, cfg).expect_err("zero target");
        assert!(err.to_string().contains("goal target"));

        let mut cfg = config(Goal::MaturityValue(1.0));
        cfg.tolerance = 0.0;
        assert_eq!(
            solve_required_contribution(&plan, cfg),
            Err(SolverError::InvalidConfig("tolerance must be > 0".to_string()))
        );
    }

    #[test]
    fn solver_rejects_iteration_counts_outside_limit() {
        let plan = frictionless_plan();
        for max_iterations in [0, MAX_SOLVER_ITERATIONS + 1, u32::MAX] {
            let mut cfg = config(Goal::MaturityValue(60_000.0));
            cfg.max_iterations = max_iterations;
            let err = solve_required_contribution(&plan, cfg).expect_err("out of range");
            assert!(err.to_string().contains("max_iterations"), "{err}");
        }

        let mut cfg = config(Goal::MaturityValue(60_000.0));
        cfg.max_iterations = MAX_SOLVER_ITERATIONS;
        let result = solve_required_contribution(&plan, cfg).expect("limit itself is allowed");
        assert!(result.converged);
    }
}
