//! Category/region rollups of raw historical records.

use std::collections::BTreeMap;

use crate::domain::{GroupBy, Rollup, SalesRecord};
use crate::math::round_to;

#[derive(Debug, Default)]
struct KeyTotals {
    value: f64,
    profit: f64,
    quantity: f64,
    count: usize,
}

/// Sum and per-record mean of sales, profit and quantity for each key of `by`.
///
/// Keys come back sorted. Records without a label for `by` are skipped, as are
/// records without sales. `GroupBy::Total` yields a single `"Total"` row.
pub fn rollup(records: &[SalesRecord], by: GroupBy) -> Vec<Rollup> {
    let mut keys: BTreeMap<&str, KeyTotals> = BTreeMap::new();
    for record in records {
        let key = match by {
            GroupBy::Total => "Total",
            _ => match record.key(by) {
                Some(k) => k,
                None => continue,
            },
        };
        let Some(sales) = record.sales.filter(|s| s.is_finite()) else {
            continue;
        };
        let totals = keys.entry(key).or_default();
        totals.value += sales;
        totals.profit += record.profit.unwrap_or(0.0);
        totals.quantity += record.quantity.unwrap_or(0.0);
        totals.count += 1;
    }

    let grand_total: f64 = keys.values().map(|t| t.value).sum();

    keys.into_iter()
        .map(|(key, t)| {
            let n = t.count as f64;
            Rollup {
                key: key.to_string(),
                sum_value: round_to(t.value, 2),
                mean_value: round_to(t.value / n, 2),
                sum_profit: round_to(t.profit, 2),
                mean_profit: round_to(t.profit / n, 2),
                sum_quantity: round_to(t.quantity, 2),
                mean_quantity: round_to(t.quantity / n, 2),
                count: t.count,
                share_of_value: if grand_total != 0.0 { t.value / grand_total } else { 0.0 },
            }
        })
        .collect()
}
