//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting and forecasting code stays clean and testable
//! - output changes are localized

use crate::domain::{GroupBy, MonthlySummary, Rollup};
use crate::io::ingest::RowError;
use crate::report::{GroupOutcome, ReportBundle};

/// Number of changepoints listed in the model diagnostics.
const TOP_CHANGEPOINTS: usize = 5;

/// Format the run summary (dataset stats + accuracy + fit diagnostics).
pub fn format_run_summary(bundle: &ReportBundle) -> String {
    let mut out = String::new();
    let k = &bundle.kpis;

    out.push_str("=== sf - Sales Forecast ===\n");
    if let (Some(first), Some(last)) = (bundle.series.first_date(), bundle.series.last_date()) {
        out.push_str(&format!("History: {first} .. {last} ({} days)\n", k.total_historical_days));
    }
    out.push_str(&format!("Total historical sales: {}\n", fmt_money(k.total_historical_sales)));
    out.push_str(&format!("Average daily sales:    {}\n", fmt_money(k.average_daily_sales)));
    out.push_str(&format!(
        "Predicted {}-day sales: {}\n",
        k.forecast_days,
        fmt_money(k.predicted_horizon_sales)
    ));

    out.push_str("\nAccuracy (in-sample):\n");
    match (k.mae, k.mape) {
        (Some(mae), Some(mape)) => {
            out.push_str(&format!("- MAE : {}\n", fmt_money(mae)));
            out.push_str(&format!("- MAPE: {mape:.1}%\n"));
        }
        (Some(mae), None) => {
            out.push_str(&format!("- MAE : {}\n", fmt_money(mae)));
            out.push_str("- MAPE: undefined (zero-sales day in history)\n");
        }
        _ => out.push_str("- unavailable\n"),
    }

    let model = &bundle.model;
    out.push_str("\nModel diagnostics:\n");
    out.push_str(&format!(
        "- mode={:?} sigma={:.2} iterations={}\n",
        model.mode,
        model.sigma * model.y_scale,
        model.iterations
    ));
    for component in &model.seasonalities {
        if let Some(amp) = model.seasonal_amplitude(&component.name) {
            out.push_str(&format!(
                "- {:<8} order={:<2} amplitude={:.4}\n",
                component.name, component.order, amp
            ));
        }
    }
    if !model.holidays.is_empty() {
        out.push_str(&format!("- holidays: {}\n", model.holidays.len()));
    }
    let top = model.largest_changepoints(TOP_CHANGEPOINTS);
    if !top.is_empty() {
        out.push_str("- largest trend changes:\n");
        for cp in top {
            out.push_str(&format!("    {}  delta={:+.4}\n", cp.date, cp.delta));
        }
    }

    out
}

/// Format the monthly forecast table.
pub fn format_monthly(rows: &[MonthlySummary]) -> String {
    let mut out = String::new();
    out.push_str("Monthly forecast (average daily sales):\n");
    out.push_str(&format!(
        "{:<10} {:>12} {:>12} {:>12} {:>5}\n",
        "period", "yhat", "lower", "upper", "days"
    ));
    out.push_str(&format!("{:-<10} {:-<12} {:-<12} {:-<12} {:-<5}\n", "", "", "", "", ""));
    for m in rows {
        out.push_str(&format!(
            "{:<10} {:>12.2} {:>12.2} {:>12.2} {:>5}\n",
            m.period, m.mean_point_estimate, m.mean_lower_bound, m.mean_upper_bound, m.days
        ));
    }
    out
}

/// Format a category or region rollup table.
pub fn format_rollups(rows: &[Rollup], by: GroupBy) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} analysis:\n", by.label()));
    out.push_str(&format!(
        "{:<18} {:>14} {:>10} {:>12} {:>10} {:>8} {:>7}\n",
        by.label(),
        "sales_sum",
        "sales_avg",
        "profit_sum",
        "profit_avg",
        "qty_avg",
        "share"
    ));
    out.push_str(&format!(
        "{:-<18} {:-<14} {:-<10} {:-<12} {:-<10} {:-<8} {:-<7}\n",
        "", "", "", "", "", "", ""
    ));
    for r in rows {
        out.push_str(&format!(
            "{:<18} {:>14.2} {:>10.2} {:>12.2} {:>10.2} {:>8.2} {:>6.1}%\n",
            truncate(&r.key, 18),
            r.sum_value,
            r.mean_value,
            r.sum_profit,
            r.mean_profit,
            r.mean_quantity,
            r.share_of_value * 100.0
        ));
    }
    out
}

/// Format the per-group forecast outcomes.
pub fn format_group_outcomes(bundle: &ReportBundle) -> String {
    let mut out = String::new();
    if bundle.groups.is_empty() {
        return out;
    }
    out.push_str("Group forecasts:\n");
    for (key, outcome) in &bundle.groups {
        let line = match outcome {
            GroupOutcome::Forecast { model_summary, .. } => format!(
                "ok      {:<18} n={:<5} horizon_sales={}",
                truncate(key, 18),
                model_summary.n_obs,
                fmt_money(model_summary.horizon_total)
            ),
            GroupOutcome::Skipped { reason } => format!("skipped {:<18} {reason}", truncate(key, 18)),
            GroupOutcome::Failed { kind, message } => {
                format!("failed  {:<18} {kind}: {message}", truncate(key, 18))
            }
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Format skipped input rows (only in `--skip-invalid` mode).
pub fn format_row_errors(errors: &[RowError], max: usize) -> String {
    let mut out = String::new();
    if errors.is_empty() {
        return out;
    }
    out.push_str(&format!("Skipped {} invalid row(s):\n", errors.len()));
    for e in errors.iter().take(max) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if errors.len() > max {
        out.push_str(&format!("  ... and {} more\n", errors.len() - max));
    }
    out
}

fn fmt_money(v: f64) -> String {
    let negative = v < 0.0;
    let cents = format!("{:.2}", v.abs());
    let (int_part, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${grouped}.{frac}", if negative { "-" } else { "" })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
