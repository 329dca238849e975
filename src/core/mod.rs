mod engine;
mod solver;
mod summary;
mod types;

pub use engine::{calculate_private_pension, run_projection};
pub use solver::{
    Goal, MAX_SOLVER_ITERATIONS, SolveConfig, SolveIteration, SolveResult, SolverError,
    solve_required_contribution,
};
pub use summary::summarize_by_year;
pub use types::{
    DEFAULT_ANNUITY_RATE, DEFAULT_CURRENT_AGE, DEFAULT_EXPECTED_RETURN, DEFAULT_PAYOUT_END_AGE,
    DEFAULT_PAYOUT_START_AGE, DEFAULT_POLICY_FEE_ANNUAL_PCT, DEFAULT_POLICY_FIXED_ANNUAL,
    DEFAULT_SAFE_WITHDRAWAL_RATE, DEFAULT_TAX_RATE_PAYOUT, DEFAULT_TER, Kpis, PayoutMode,
    PlanParameters, ResolvedPlan, SimulationPoint, SimulationResult, YearSummary,
};
