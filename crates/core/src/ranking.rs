use crate::error::{RankError, Result};
use crate::models::{FeatureVector, PropertyRecord};
use crate::normalize::FeatureStats;

/// A pool record paired with its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCandidate<'a> {
    /// Index of the record in the pool it was ranked from.
    pub position: usize,
    pub record: &'a PropertyRecord,
    pub features: FeatureVector,
    pub similarity: f64,
}

/// Orders the whole pool by similarity to `query`, most similar first.
///
/// Features are standardized with the pool's mean and sample standard
/// deviation; similarity is `exp(-d)` where `d` is the Euclidean distance
/// between standardized vectors. Equal scores keep pool order.
pub fn rank<'a>(
    pool: &'a [PropertyRecord],
    query: &PropertyRecord,
) -> Result<Vec<RankedCandidate<'a>>> {
    if pool.is_empty() {
        return Err(RankError::InsufficientData(
            "candidate pool is empty".to_string(),
        ));
    }

    let query_features = checked_features(query, None)?;
    let pool_features = pool
        .iter()
        .enumerate()
        .map(|(position, record)| checked_features(record, Some(position)))
        .collect::<Result<Vec<_>>>()?;

    let stats = FeatureStats::fit(&pool_features)?;
    let scaled_query = stats.standardize(&query_features);

    let mut ranked = pool
        .iter()
        .zip(pool_features)
        .enumerate()
        .map(|(position, (record, features))| {
            let distance = euclidean_distance(&stats.standardize(&features), &scaled_query);
            RankedCandidate {
                position,
                record,
                features,
                similarity: similarity_from_distance(distance),
            }
        })
        .collect::<Vec<_>>();

    // stable: ties stay in pool order
    ranked.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));
    Ok(ranked)
}

pub fn euclidean_distance(left: &FeatureVector, right: &FeatureVector) -> f64 {
    left.iter()
        .zip(right.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Maps a distance onto (0, 1]; zero distance scores 1.
pub fn similarity_from_distance(distance: f64) -> f64 {
    // floor keeps far outliers strictly positive after exp underflow
    (-distance).exp().max(f64::MIN_POSITIVE)
}

fn checked_features(record: &PropertyRecord, pool_position: Option<usize>) -> Result<FeatureVector> {
    let label = || match pool_position {
        Some(position) => format!("pool row {position}"),
        None => "query".to_string(),
    };
    let features = record.features().ok_or_else(|| {
        let missing = record
            .first_missing_feature()
            .map(|feature| feature.column())
            .unwrap_or("unknown");
        RankError::InputValidation(format!(
            "{} (id {}) is missing `{missing}`",
            label(),
            record.id
        ))
    })?;

    if features.iter().any(|value| !value.is_finite()) {
        return Err(RankError::InputValidation(format!(
            "{} (id {}) has a non-finite comparison feature",
            label(),
            record.id
        )));
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, surface: f64, rooms: u32, longitude: f64, latitude: f64) -> PropertyRecord {
        PropertyRecord {
            id: id.to_string(),
            surface: Some(surface),
            rooms: Some(rooms),
            longitude: Some(longitude),
            latitude: Some(latitude),
            ..Default::default()
        }
    }

    fn sample_pool() -> Vec<PropertyRecord> {
        vec![
            record("a", 25.0, 1, 2.330, 48.860),
            record("b", 48.0, 2, 2.345, 48.852),
            record("c", 70.0, 3, 2.360, 48.870),
            record("d", 95.0, 4, 2.300, 48.845),
            record("e", 31.0, 1, 2.390, 48.880),
            record("f", 52.0, 2, 2.351, 48.858),
        ]
    }

    #[test]
    fn rank_returns_a_permutation_of_the_pool() -> Result<()> {
        let pool = sample_pool();
        let query = record("q", 50.0, 2, 2.350, 48.857);
        let ranked = rank(&pool, &query)?;

        assert_eq!(ranked.len(), pool.len());
        let mut positions = ranked.iter().map(|item| item.position).collect::<Vec<_>>();
        positions.sort_unstable();
        assert_eq!(positions, (0..pool.len()).collect::<Vec<_>>());
        for item in &ranked {
            assert_eq!(item.record, &pool[item.position]);
        }
        Ok(())
    }

    #[test]
    fn similarities_are_bounded_and_non_increasing() -> Result<()> {
        let pool = sample_pool();
        let query = record("q", 60.0, 3, 2.340, 48.850);
        let ranked = rank(&pool, &query)?;

        for item in &ranked {
            assert!(item.similarity > 0.0 && item.similarity <= 1.0);
        }
        for pair in ranked.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        Ok(())
    }

    #[test]
    fn exact_duplicate_of_query_ranks_first_with_similarity_one() -> Result<()> {
        let pool = sample_pool();
        let query = record("q", 52.0, 2, 2.351, 48.858);
        let ranked = rank(&pool, &query)?;

        assert_eq!(ranked[0].record.id, "f");
        assert_eq!(ranked[0].similarity, 1.0);
        Ok(())
    }

    #[test]
    fn equal_scores_keep_pool_order() -> Result<()> {
        // "b" and "d" mirror each other around the query
        let pool = vec![
            record("a", 10.0, 1, 2.0, 48.0),
            record("b", 40.0, 3, 2.2, 48.2),
            record("c", 90.0, 5, 2.6, 48.6),
            record("d", 60.0, 3, 2.2, 48.2),
        ];
        let query = record("q", 50.0, 3, 2.2, 48.2);
        let ranked = rank(&pool, &query)?;

        assert_eq!(ranked[0].similarity, ranked[1].similarity);
        assert_eq!(ranked[0].record.id, "b");
        assert_eq!(ranked[1].record.id, "d");
        Ok(())
    }

    #[test]
    fn empty_pool_is_insufficient_data() {
        let query = record("q", 50.0, 2, 2.35, 48.85);
        assert!(matches!(rank(&[], &query), Err(RankError::InsufficientData(_))));
    }

    #[test]
    fn zero_variance_feature_is_rejected() {
        let pool = vec![
            record("a", 25.0, 2, 2.33, 48.86),
            record("b", 48.0, 2, 2.34, 48.85),
            record("c", 70.0, 2, 2.36, 48.87),
        ];
        let query = record("q", 50.0, 2, 2.35, 48.85);
        assert_eq!(
            rank(&pool, &query),
            Err(RankError::DegenerateFeature {
                feature: "nombre_pieces_principales"
            })
        );
    }

    #[test]
    fn query_missing_a_feature_is_invalid() {
        let pool = sample_pool();
        let mut query = record("q", 50.0, 2, 2.35, 48.85);
        query.latitude = None;

        match rank(&pool, &query) {
            Err(RankError::InputValidation(message)) => assert!(message.contains("latitude")),
            other => panic!("expected input validation error, got {other:?}"),
        }
    }

    #[test]
    fn pool_row_missing_a_feature_is_invalid() {
        let mut pool = sample_pool();
        pool[3].surface = None;
        let query = record("q", 50.0, 2, 2.35, 48.85);

        assert!(matches!(rank(&pool, &query), Err(RankError::InputValidation(_))));
    }

    #[test]
    fn non_finite_values_are_invalid() {
        let pool = sample_pool();
        let query = record("q", f64::INFINITY, 2, 2.35, 48.85);
        assert!(matches!(rank(&pool, &query), Err(RankError::InputValidation(_))));
    }

    #[test]
    fn similarity_of_distant_rows_stays_positive() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert!(similarity_from_distance(10_000.0) > 0.0);
    }
}
