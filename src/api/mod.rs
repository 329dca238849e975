use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    Goal, PayoutMode, PlanParameters, ResolvedPlan, SimulationResult, SolveConfig, SolveResult,
    SolverError, YearSummary, run_projection, solve_required_contribution, summarize_by_year,
};

const MAX_AGE: u32 = 120;
const DEFAULT_SEARCH_MIN: f64 = 0.0;
const DEFAULT_SEARCH_MAX: f64 = 10_000.0;
const DEFAULT_TOLERANCE: f64 = 0.01;
const DEFAULT_MAX_ITERATIONS: u32 = 60;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidPlan(String),

    #[error("Invalid request payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidPlan(_) | ApiError::InvalidPayload(_) | ApiError::Solver(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Serialization(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(status = status.as_u16(), error = %self, "request rejected");
        error_response(status, &self.to_string())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliPayoutMode {
    Annuity,
    Flex,
}

impl From<CliPayoutMode> for PayoutMode {
    fn from(value: CliPayoutMode) -> Self {
        match value {
            CliPayoutMode::Annuity => PayoutMode::Annuity,
            CliPayoutMode::Flex => PayoutMode::Flex,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalKind {
    #[serde(alias = "maturityValue", alias = "maturity_value")]
    MaturityValue,
    #[serde(alias = "monthlyPension", alias = "monthly_pension")]
    MonthlyPension,
}

impl GoalKind {
    fn with_target(self, target: f64) -> Goal {
        match self {
            GoalKind::MaturityValue => Goal::MaturityValue(target),
            GoalKind::MonthlyPension => Goal::MonthlyPension(target),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "privatrente",
    about = "Private pension projection: monthly accumulation and payout with fees and payout tax"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Project a plan and print the result as JSON
    Project(ProjectArgs),
    /// Solve the monthly contribution needed to reach a goal
    Solve(SolveArgs),
    /// Run the HTTP API
    Serve(ServeArgs),
}

/// Plan flags. Rates are decimals (0.065 = 6.5 %); omitted flags fall back to
/// the engine defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    #[arg(long, help = "Current age in years [default: 30]")]
    pub current_age: Option<u32>,
    #[arg(long, help = "Age when contributions start [default: current age]")]
    pub start_age: Option<u32>,
    #[arg(long, help = "Monthly contribution [default: 0]")]
    pub monthly_contribution: Option<f64>,
    #[arg(long, help = "One-off investment at the start [default: 0]")]
    pub start_investment: Option<f64>,
    #[arg(long, help = "Contribution period in years [default: until payout start]")]
    pub term_years: Option<u32>,
    #[arg(long, help = "Target value at maturity for gap analysis")]
    pub target_maturity_value: Option<f64>,
    #[arg(long, help = "Age when payouts begin [default: 67]")]
    pub payout_start_age: Option<u32>,
    #[arg(long, help = "Age when payouts end [default: 85]")]
    pub payout_end_age: Option<u32>,
    #[arg(long, value_enum, help = "Payout mode [default: annuity]")]
    pub payout_mode: Option<CliPayoutMode>,
    #[arg(long, help = "Annual annuity rate [default: 0.04]")]
    pub annuity_rate: Option<f64>,
    #[arg(long, help = "Annual safe withdrawal rate for flex mode [default: 0.04]")]
    pub safe_withdrawal_rate: Option<f64>,
    #[arg(long, help = "Annual policy fee on the balance [default: 0.004]")]
    pub policy_fee_annual_pct: Option<f64>,
    #[arg(long, help = "Fixed annual policy fee [default: 0]")]
    pub policy_fixed_annual: Option<f64>,
    #[arg(long, help = "Fund total expense ratio [default: 0.0075]")]
    pub ter: Option<f64>,
    #[arg(long, help = "Tax rate on the earnings share of payouts [default: 0.25]")]
    pub tax_rate_payout: Option<f64>,
    #[arg(long, help = "Expected annual return [default: 0.075]")]
    pub expected_return: Option<f64>,
}

impl From<PlanArgs> for PlanParameters {
    fn from(args: PlanArgs) -> Self {
        PlanParameters {
            current_age: args.current_age,
            start_age: args.start_age,
            monthly_contribution: args.monthly_contribution,
            start_investment: args.start_investment,
            term_years: args.term_years,
            target_maturity_value: args.target_maturity_value,
            payout_start_age: args.payout_start_age,
            payout_end_age: args.payout_end_age,
            payout_mode: args.payout_mode.map(Into::into),
            annuity_rate: args.annuity_rate,
            safe_withdrawal_rate: args.safe_withdrawal_rate,
            policy_fee_annual_pct: args.policy_fee_annual_pct,
            policy_fixed_annual: args.policy_fixed_annual,
            ter: args.ter,
            tax_rate_payout: args.tax_rate_payout,
            expected_return: args.expected_return,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    #[arg(long, help = "Print per-year rows instead of the monthly series")]
    pub yearly: bool,
}

#[derive(Args, Debug)]
pub struct SolveArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    #[arg(long, value_enum)]
    pub goal: GoalKind,
    #[arg(long, help = "Maturity value or initial monthly pension to reach")]
    pub target: f64,
    #[arg(long, default_value_t = DEFAULT_SEARCH_MIN)]
    pub search_min: f64,
    #[arg(long, default_value_t = DEFAULT_SEARCH_MAX)]
    pub search_max: f64,
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: u32,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CalculateOptions {
    include_yearly: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolvePayload {
    #[serde(default)]
    plan: PlanParameters,
    goal: GoalKind,
    target_value: Option<f64>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalculateResponse {
    #[serde(flatten)]
    result: SimulationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    yearly: Option<Vec<YearSummary>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Checks a plan before it reaches the engine and returns it with defaults
/// applied.
pub fn validate_plan(plan: &PlanParameters) -> Result<ResolvedPlan, ApiError> {
    let resolved = plan.resolve();

    for (name, age) in [
        ("currentAge", resolved.current_age),
        ("startAge", resolved.start_age),
        ("payoutStartAge", resolved.payout_start_age),
        ("payoutEndAge", resolved.payout_end_age),
    ] {
        if age > MAX_AGE {
            return Err(invalid(format!("{name} must be <= {MAX_AGE}")));
        }
    }

    if resolved.start_age < resolved.current_age {
        return Err(invalid("startAge must be >= currentAge"));
    }

    if resolved.payout_start_age < resolved.start_age {
        return Err(invalid("payoutStartAge must be >= startAge"));
    }

    if resolved.payout_end_age <= resolved.payout_start_age {
        return Err(invalid("payoutEndAge must be > payoutStartAge"));
    }

    if plan.term_years == Some(0) {
        return Err(invalid("termYears must be >= 1"));
    }

    for (name, amount) in [
        ("monthlyContribution", resolved.monthly_contribution),
        ("startInvestment", resolved.start_investment),
        ("policyFixedAnnual", resolved.policy_fixed_annual),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(invalid(format!("{name} must be >= 0")));
        }
    }

    for (name, rate) in [
        ("annuityRate", resolved.annuity_rate),
        ("safeWithdrawalRate", resolved.safe_withdrawal_rate),
        ("policyFeeAnnualPct", resolved.policy_fee_annual_pct),
        ("ter", resolved.ter),
        ("taxRatePayout", resolved.tax_rate_payout),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            return Err(invalid(format!("{name} must be between 0 and 1")));
        }
    }

    if !resolved.expected_return.is_finite()
        || resolved.expected_return <= -1.0
        || resolved.expected_return > 1.0
    {
        return Err(invalid("expectedReturn must be > -1 and <= 1"));
    }

    if let Some(target) = resolved.target_maturity_value {
        if !target.is_finite() || target <= 0.0 {
            return Err(invalid("targetMaturityValue must be > 0"));
        }
    }

    Ok(resolved)
}

fn invalid(msg: impl Into<String>) -> ApiError {
    ApiError::InvalidPlan(msg.into())
}

fn project(plan: &PlanParameters) -> Result<SimulationResult, ApiError> {
    let resolved = validate_plan(plan)?;
    let result = run_projection(&resolved);
    debug!(
        accumulation_months = result.accumulation.len(),
        payout_months = result.payout.len(),
        projected_value = result.kpis.projected_value,
        "projection finished"
    );
    Ok(result)
}

fn solve(plan: &PlanParameters, config: SolveConfig) -> Result<SolveResult, ApiError> {
    validate_plan(plan)?;
    let result = solve_required_contribution(plan, config)?;
    debug!(
        feasible = result.feasible,
        converged = result.converged,
        iterations = result.iterations.len(),
        "contribution solve finished"
    );
    Ok(result)
}

/// `project` subcommand: the monthly result, or the yearly rows with
/// `--yearly`, as pretty JSON.
pub fn run_project(args: ProjectArgs) -> Result<String, ApiError> {
    let plan = PlanParameters::from(args.plan);
    let result = project(&plan)?;
    let json = if args.yearly {
        serde_json::to_string_pretty(&summarize_by_year(&result))?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    Ok(json)
}

pub fn run_solve(args: SolveArgs) -> Result<String, ApiError> {
    let plan = PlanParameters::from(args.plan);
    let config = SolveConfig {
        goal: args.goal.with_target(args.target),
        search_min: args.search_min,
        search_max: args.search_max,
        tolerance: args.tolerance,
        max_iterations: args.max_iterations,
    };
    let result = solve(&plan, config)?;
    Ok(serde_json::to_string_pretty(&result)?)
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/calculate",
            get(calculate_get_handler).post(calculate_post_handler),
        )
        .route("/api/solve", post(solve_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "pension API listening");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn calculate_get_handler(
    options: Result<Query<CalculateOptions>, QueryRejection>,
    plan: Result<Query<PlanParameters>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(options) = options.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    let Query(plan) = plan.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    calculate_response(&plan, options)
}

async fn calculate_post_handler(
    options: Result<Query<CalculateOptions>, QueryRejection>,
    plan: Result<Json<PlanParameters>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Query(options) = options.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    let Json(plan) = plan.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    calculate_response(&plan, options)
}

async fn solve_handler(
    payload: Result<Json<SolvePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    let config = solve_config_from_payload(&payload)?;
    let result = solve(&payload.plan, config)?;
    Ok(json_response(StatusCode::OK, result))
}

fn calculate_response(
    plan: &PlanParameters,
    options: CalculateOptions,
) -> Result<Response, ApiError> {
    let result = project(plan)?;
    let yearly = options
        .include_yearly
        .unwrap_or(false)
        .then(|| summarize_by_year(&result));
    Ok(json_response(
        StatusCode::OK,
        CalculateResponse { result, yearly },
    ))
}

fn solve_config_from_payload(payload: &SolvePayload) -> Result<SolveConfig, ApiError> {
    let Some(target) = payload.target_value else {
        return Err(ApiError::InvalidPayload(
            "targetValue is required".to_string(),
        ));
    };
    Ok(SolveConfig {
        goal: payload.goal.with_target(target),
        search_min: payload.search_min.unwrap_or(DEFAULT_SEARCH_MIN),
        search_max: payload.search_max.unwrap_or(DEFAULT_SEARCH_MAX),
        tolerance: payload.tolerance.unwrap_or(DEFAULT_TOLERANCE),
        max_iterations: payload.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
