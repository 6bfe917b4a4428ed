use crate::error::{RankError, Result};
use crate::geo::{distance_meters, GeoPoint};
use crate::models::{Comparable, ComparableOptions, ComparableSet, PropertyRecord};
use crate::ranking::{rank, RankedCandidate};

/// Takes the first `top_k` ranked candidates as comparables and prices the
/// query at the unweighted mean of their prices.
pub fn build_comparable_set(
    ranked: &[RankedCandidate<'_>],
    query: &PropertyRecord,
    options: &ComparableOptions,
) -> Result<ComparableSet> {
    if options.top_k == 0 {
        return Err(RankError::InputValidation(
            "top_k must be at least 1".to_string(),
        ));
    }

    let origin = query.position().ok_or_else(|| {
        RankError::InputValidation(format!("query (id {}) has no coordinates", query.id))
    })?;

    let comparables = ranked
        .iter()
        .take(options.top_k)
        .map(|candidate| to_comparable(candidate, origin))
        .collect::<Vec<_>>();

    Ok(ComparableSet {
        query_id: query.id.clone(),
        asking_price: query.price,
        estimated_price: mean_price(&comparables),
        comparables,
    })
}

/// Ranks `pool` against `query` and derives the comparable set in one call.
pub fn estimate(
    pool: &[PropertyRecord],
    query: &PropertyRecord,
    options: &ComparableOptions,
) -> Result<ComparableSet> {
    let ranked = rank(pool, query)?;
    build_comparable_set(&ranked, query, options)
}

fn to_comparable(candidate: &RankedCandidate<'_>, origin: GeoPoint) -> Comparable {
    let [surface, rooms, longitude, latitude] = candidate.features;
    let position = GeoPoint {
        latitude,
        longitude,
    };
    let record = candidate.record;

    Comparable {
        id: record.id.clone(),
        surface,
        rooms: rooms as u32,
        price: record.price,
        address: record.address.clone(),
        position,
        similarity: candidate.similarity,
        distance_meters: distance_meters(position, origin),
    }
}

fn mean_price(comparables: &[Comparable]) -> Option<f64> {
    let prices = comparables
        .iter()
        .filter_map(|comparable| comparable.price)
        .collect::<Vec<_>>();

    if prices.is_empty() {
        None
    } else {
        Some(prices.iter().sum::<f64>() / prices.len() as f64)
    }
}
