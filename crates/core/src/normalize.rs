use crate::error::{RankError, Result};
use crate::models::{Feature, FeatureVector, FEATURE_COUNT};

/// Per-feature mean and sample standard deviation fitted on a pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStats {
    pub mean: FeatureVector,
    pub std_dev: FeatureVector,
}

impl FeatureStats {
    /// Fits the statistics, refusing any feature whose sample standard
    /// deviation is zero or undefined (fewer than two rows).
    ///
    /// A pool therefore needs at least two rows and at least two distinct
    /// values in every feature column before it can be ranked; smaller
    /// pools fail with [`RankError::DegenerateFeature`] instead of
    /// yielding a shorter comparable set.
    pub fn fit(rows: &[FeatureVector]) -> Result<Self> {
        if rows.is_empty() {
            return Err(RankError::InsufficientData(
                "candidate pool is empty".to_string(),
            ));
        }

        let count = rows.len() as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        let mut std_dev = [0.0; FEATURE_COUNT];

        for (column, feature) in Feature::ALL.into_iter().enumerate() {
            let first = rows[0][column];
            if rows.iter().all(|row| row[column] == first) {
                return Err(RankError::DegenerateFeature {
                    feature: feature.column(),
                });
            }

            let column_mean = rows.iter().map(|row| row[column]).sum::<f64>() / count;
            let variance = rows
                .iter()
                .map(|row| (row[column] - column_mean).powi(2))
                .sum::<f64>()
                / (count - 1.0);
            let sd = variance.sqrt();

            if !(sd.is_finite() && sd > 0.0) {
                return Err(RankError::DegenerateFeature {
                    feature: feature.column(),
                });
            }

            mean[column] = column_mean;
            std_dev[column] = sd;
        }

        Ok(Self { mean, std_dev })
    }

    pub fn standardize(&self, row: &FeatureVector) -> FeatureVector {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (column, value) in row.iter().enumerate() {
            scaled[column] = (value - self.mean[column]) / self.std_dev[column];
        }
        scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_uses_sample_standard_deviation() -> std::result::Result<(), RankError> {
        let rows = [
            [10.0, 1.0, 2.0, 48.0],
            [20.0, 2.0, 3.0, 49.0],
            [30.0, 3.0, 4.0, 50.0],
        ];
        let stats = FeatureStats::fit(&rows)?;

        assert_eq!(stats.mean, [20.0, 2.0, 3.0, 49.0]);
        assert_eq!(stats.std_dev, [10.0, 1.0, 1.0, 1.0]);
        assert_eq!(stats.standardize(&rows[2]), [1.0, 1.0, 1.0, 1.0]);
        Ok(())
    }

    #[test]
    fn constant_column_is_degenerate() {
        let rows = [
            [10.0, 2.0, 2.0, 48.0],
            [20.0, 2.0, 3.0, 49.0],
        ];
        assert_eq!(
            FeatureStats::fit(&rows),
            Err(RankError::DegenerateFeature {
                feature: "nombre_pieces_principales"
            })
        );
    }

    #[test]
    fn single_row_is_degenerate() {
        let rows = [[10.0, 2.0, 2.0, 48.0]];
        assert!(matches!(
            FeatureStats::fit(&rows),
            Err(RankError::DegenerateFeature { .. })
        ));
    }

    #[test]
    fn empty_rows_are_insufficient() {
        assert!(matches!(
            FeatureStats::fit(&[]),
            Err(RankError::InsufficientData(_))
        ));
    }
}
