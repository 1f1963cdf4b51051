//! Service level → standard-normal Z lookup.

use crate::error::AnalyticsError;

const STANDARD_POINTS: [(f64, f64); 9] = [
    (0.50, 0.00),
    (0.80, 0.84),
    (0.85, 1.04),
    (0.90, 1.28),
    (0.95, 1.65),
    (0.975, 1.96),
    (0.99, 2.33),
    (0.995, 2.58),
    (0.999, 3.09),
];

/// Ordered table of `(service_level, z)` pairs.
///
/// Lookups between entries interpolate linearly; lookups outside the table clamp
/// to the nearest endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ZTable {
    points: Vec<(f64, f64)>,
}

impl Default for ZTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ZTable {
    pub fn standard() -> Self {
        Self {
            points: STANDARD_POINTS.to_vec(),
        }
    }

    /// Build a table; levels must be strictly increasing and z non-decreasing.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, AnalyticsError> {
        if points.is_empty() {
            return Err(AnalyticsError::InvalidInput("Z table cannot be empty".to_string()));
        }
        for (level, z) in &points {
            if !(level.is_finite() && z.is_finite()) {
                return Err(AnalyticsError::InvalidInput(
                    "Z table entries must be finite".to_string(),
                ));
            }
        }
        for pair in points.windows(2) {
            let ((l0, z0), (l1, z1)) = (pair[0], pair[1]);
            if l1 <= l0 || z1 < z0 {
                return Err(AnalyticsError::InvalidInput(format!(
                    "Z table must be ordered: ({l0}, {z0}) precedes ({l1}, {z1})"
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn z(&self, service_level: f64) -> f64 {
        let (first_level, first_z) = self.points[0];
        let (last_level, last_z) = self.points[self.points.len() - 1];

        if service_level.is_nan() || service_level <= first_level {
            return first_z;
        }
        if service_level >= last_level {
            return last_z;
        }

        // Index of the first entry strictly above the requested level.
        let upper = self.points.partition_point(|(level, _)| *level <= service_level);
        let (l0, z0) = self.points[upper - 1];
        let (l1, z1) = self.points[upper];
        if service_level == l0 {
            return z0;
        }
        z0 + (z1 - z0) * (service_level - l0) / (l1 - l0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_entries_are_returned_verbatim() {
        let t = ZTable::standard();
        assert_eq!(t.z(0.95), 1.65);
        assert_eq!(t.z(0.90), 1.28);
    }

    #[test]
    fn interpolates_between_neighbours() {
        let t = ZTable::standard();
        let z = t.z(0.92);
        assert!((z - 1.428).abs() < 1e-9);
        assert!(z > t.z(0.90) && z < t.z(0.95));
    }

    #[test]
    fn clamps_outside_the_table() {
        let t = ZTable::standard();
        assert_eq!(t.z(0.10), 0.0);
        assert_eq!(t.z(0.9999), 3.09);
        assert_eq!(t.z(f64::NAN), 0.0);
    }

    #[test]
    fn rejects_unordered_tables() {
        assert!(ZTable::new(vec![(0.9, 1.28), (0.8, 0.84)]).is_err());
        assert!(ZTable::new(vec![]).is_err());
        assert!(ZTable::new(vec![(0.9, 1.28), (0.95, 1.65)]).is_ok());
    }

    proptest! {
        /// Property: Z is monotonically non-decreasing in the service level.
        #[test]
        fn z_is_monotone(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let t = ZTable::standard();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(t.z(lo) <= t.z(hi));
        }
    }
}
