//! Declared vs. actual totals reconciliation.

use contracts::{ActualTotals, AdjustmentFactors};

use crate::table::SyncTable;

/// Compute scale factors for both axes.
///
/// Each axis is `actual / declared` when both totals are known, finite
/// and positive, 1.0 otherwise.
pub fn compute(
    declared_duration_ms: Option<f64>,
    declared_distance_km: Option<f64>,
    actual_duration_ms: Option<f64>,
    actual_distance_km: Option<f64>,
) -> AdjustmentFactors {
    AdjustmentFactors::new(
        axis_scale(declared_duration_ms, actual_duration_ms),
        axis_scale(declared_distance_km, actual_distance_km),
    )
}

/// Compute factors for a table against session totals.
///
/// `media_duration_ms` stands in for the actual duration when the
/// session has none.
pub fn compute_for_table(
    table: Option<&SyncTable>,
    actual: ActualTotals,
    media_duration_ms: Option<f64>,
) -> AdjustmentFactors {
    let Some(table) = table else {
        return AdjustmentFactors::default();
    };

    compute(
        table.declared_duration_ms(),
        table.declared_distance_km(),
        actual.duration_ms.or(media_duration_ms),
        actual.distance_km,
    )
}

fn axis_scale(declared: Option<f64>, actual: Option<f64>) -> f64 {
    match (declared, actual) {
        (Some(d), Some(a)) if usable(d) && usable(a) => a / d,
        _ => 1.0,
    }
}

fn usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
