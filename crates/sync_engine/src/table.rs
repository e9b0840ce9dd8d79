//! Course position to video position lookup table.

use contracts::{ContractError, DeclaredTotals, SyncAxis, SyncFile, SyncFilePoint};

/// Validated, immutable sync table
///
/// Invariants: at least one point, all values finite and >= 0, sources
/// non-decreasing.
#[derive(Debug, Clone)]
pub struct SyncTable {
    axis: SyncAxis,
    points: Vec<SyncFilePoint>,
    declared: DeclaredTotals,
}

impl SyncTable {
    /// Validate a parsed sync file.
    ///
    /// `origin` names the file in error messages.
    pub fn from_sync_file(file: SyncFile, origin: &str) -> Result<Self, ContractError> {
        if file.points.is_empty() {
            return Err(ContractError::invalid_sync_file(origin, "table has no points"));
        }

        for (idx, point) in file.points.iter().enumerate() {
            if !point.source.is_finite() || point.source < 0.0 {
                return Err(ContractError::invalid_sync_file(
                    origin,
                    format!("points[{idx}].source must be finite and >= 0, got {}", point.source),
                ));
            }
            if !point.target_ms.is_finite() || point.target_ms < 0.0 {
                return Err(ContractError::invalid_sync_file(
                    origin,
                    format!(
                        "points[{idx}].target_ms must be finite and >= 0, got {}",
                        point.target_ms
                    ),
                ));
            }
        }

        if let Some(idx) = file
            .points
            .windows(2)
            .position(|pair| pair[1].source < pair[0].source)
        {
            return Err(ContractError::invalid_sync_file(
                origin,
                format!("points[{}].source decreases", idx + 1),
            ));
        }

        Ok(Self {
            axis: file.axis,
            points: file.points,
            declared: file.declared,
        })
    }

    /// Map a course position to a video position (ms).
    ///
    /// Clamps to the first/last target outside the recorded range and
    /// interpolates linearly inside it.
    pub fn lookup(&self, position: f64) -> f64 {
        let first = self.first();
        let last = self.last();

        // `!(a > b)` also routes NaN to the first point
        if !(position > first.source) {
            return first.target_ms;
        }
        if position >= last.source {
            return last.target_ms;
        }

        // first.source < position < last.source, so 1 <= idx < len
        let idx = self.points.partition_point(|p| p.source <= position);
        let lo = self.points[idx - 1];
        let hi = self.points[idx];
        let fraction = (position - lo.source) / (hi.source - lo.source);
        lo.target_ms + fraction * (hi.target_ms - lo.target_ms)
    }

    pub fn axis(&self) -> SyncAxis {
        self.axis
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SyncFilePoint] {
        &self.points
    }

    pub fn first_target(&self) -> f64 {
        self.first().target_ms
    }

    pub fn last_target(&self) -> f64 {
        self.last().target_ms
    }

    /// Declared duration, falling back to the last source on a time axis
    pub fn declared_duration_ms(&self) -> Option<f64> {
        self.declared.duration_ms.or(match self.axis {
            SyncAxis::Time => Some(self.last().source),
            SyncAxis::Distance => None,
        })
    }

    /// Declared distance, falling back to the last source on a distance axis
    pub fn declared_distance_km(&self) -> Option<f64> {
        self.declared.distance_km.or(match self.axis {
            SyncAxis::Distance => Some(self.last().source),
            SyncAxis::Time => None,
        })
    }

    fn first(&self) -> SyncFilePoint {
        self.points[0]
    }

    fn last(&self) -> SyncFilePoint {
        self.points[self.points.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(axis: SyncAxis, points: &[(f64, f64)]) -> SyncTable {
        SyncTable::from_sync_file(
            SyncFile {
                axis,
                declared: DeclaredTotals::default(),
                points: points
                    .iter()
                    .map(|&(s, t)| SyncFilePoint::new(s, t))
                    .collect(),
            },
            "test",
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_clamps_at_boundaries() {
        let t = table(SyncAxis::Distance, &[(1.0, 500.0), (2.0, 4500.0), (3.0, 8000.0)]);
        assert_eq!(t.lookup(0.0), 500.0);
        assert_eq!(t.lookup(1.0), 500.0);
        assert_eq!(t.lookup(3.0), 8000.0);
        assert_eq!(t.lookup(99.0), 8000.0);
    }

    #[test]
    fn test_lookup_interpolates() {
        let t = table(SyncAxis::Distance, &[(0.0, 0.0), (2.0, 4000.0), (4.0, 6000.0)]);
        assert!((t.lookup(1.0) - 2000.0).abs() < 1e-9);
        assert!((t.lookup(3.0) - 5000.0).abs() < 1e-9);
        assert!((t.lookup(2.0) - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn test_lookup_monotonic_over_sweep() {
        let t = table(
            SyncAxis::Time,
            &[(0.0, 0.0), (1000.0, 900.0), (1000.0, 950.0), (5000.0, 5200.0), (9000.0, 9100.0)],
        );
        let mut previous = f64::NEG_INFINITY;
        let mut position = -500.0;
        while position < 10_000.0 {
            let value = t.lookup(position);
            assert!(value >= previous, "lookup({position}) = {value} < {previous}");
            previous = value;
            position += 37.5;
        }
    }

    #[test]
    fn test_lookup_nan_maps_to_first() {
        let t = table(SyncAxis::Time, &[(0.0, 100.0), (10.0, 200.0)]);
        assert_eq!(t.lookup(f64::NAN), 100.0);
    }

    #[test]
    fn test_single_point_table() {
        let t = table(SyncAxis::Time, &[(0.0, 1234.0)]);
        assert_eq!(t.lookup(0.0), 1234.0);
        assert_eq!(t.lookup(50.0), 1234.0);
    }

    #[test]
    fn test_rejects_empty_and_unordered() {
        let empty = SyncTable::from_sync_file(SyncFile::default(), "empty.sync.toml");
        assert!(matches!(empty, Err(ContractError::InvalidSyncFile { .. })));

        let unordered = SyncTable::from_sync_file(
            SyncFile {
                points: vec![SyncFilePoint::new(2.0, 0.0), SyncFilePoint::new(1.0, 10.0)],
                ..Default::default()
            },
            "bad",
        );
        let err = unordered.unwrap_err().to_string();
        assert!(err.contains("decreases"), "got: {err}");

        let negative = SyncTable::from_sync_file(
            SyncFile {
                points: vec![SyncFilePoint::new(0.0, -1.0)],
                ..Default::default()
            },
            "bad",
        );
        assert!(negative.is_err());
    }

    #[test]
    fn test_declared_fallbacks() {
        let t = table(SyncAxis::Distance, &[(0.0, 0.0), (12.5, 1_800_000.0)]);
        assert_eq!(t.declared_distance_km(), Some(12.5));
        assert_eq!(t.declared_duration_ms(), None);

        let t = table(SyncAxis::Time, &[(0.0, 0.0), (60_000.0, 60_000.0)]);
        assert_eq!(t.declared_duration_ms(), Some(60_000.0));
        assert_eq!(t.declared_distance_km(), None);
    }
}
