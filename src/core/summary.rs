use super::types::{SimulationPoint, SimulationResult, YearSummary};

/// Collapses the monthly series into one row per phase and calendar year,
/// accumulation rows first.
pub fn summarize_by_year(result: &SimulationResult) -> Vec<YearSummary> {
    let mut rows: Vec<YearSummary> = Vec::new();
    for point in result.accumulation.iter().chain(result.payout.iter()) {
        match rows.last_mut() {
            Some(row) if row.year == point.year && row.is_payout_phase == point.is_payout_phase => {
                add_point(row, point);
            }
            _ => rows.push(open_row(point)),
        }
    }
    rows
}

fn open_row(point: &SimulationPoint) -> YearSummary {
    let mut row = YearSummary {
        year: point.year,
        age: point.age,
        is_payout_phase: point.is_payout_phase,
        months: 0,
        contributions: 0.0,
        fees: 0.0,
        taxes: 0.0,
        net_payout: 0.0,
        end_portfolio_value: 0.0,
    };
    add_point(&mut row, point);
    row
}

fn add_point(row: &mut YearSummary, point: &SimulationPoint) {
    row.months += 1;
    row.contributions += point.contribution;
    row.fees += point.fees;
    row.taxes += point.taxes;
    row.net_payout += point.payout.unwrap_or(0.0);
    row.end_portfolio_value = point.portfolio_value;
}
