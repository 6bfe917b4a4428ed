use crate::error::LoadError;
use crate::models::{PreparationOptions, PropertyRecord};
use regex::RegexBuilder;
use std::collections::HashSet;
use std::ops::Deref;

/// Comparison universe: every row has all four comparison features and no
/// two rows share the same feature values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    records: Vec<PropertyRecord>,
}

impl CandidatePool {
    /// Drops rows with a missing feature, then rows duplicating an earlier
    /// row on all four features.
    pub fn from_records(records: impl IntoIterator<Item = PropertyRecord>) -> Self {
        let mut seen = HashSet::new();
        let records = records
            .into_iter()
            .filter(|record| match record.features() {
                Some(features) => seen.insert(features.map(f64::to_bits)),
                None => false,
            })
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PropertyRecord> {
        self.records
    }
}

impl Deref for CandidatePool {
    type Target = [PropertyRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreparedData {
    pub pool: CandidatePool,
    /// Later transactions the user can pick a query from.
    pub held_out: Vec<PropertyRecord>,
}

/// Splits transactions chronologically: the earliest `pool_fraction` of the
/// matching rows become the pool, the remainder the held-out queries.
pub fn prepare_pool(
    mut records: Vec<PropertyRecord>,
    options: &PreparationOptions,
) -> Result<PreparedData, LoadError> {
    if !(options.pool_fraction > 0.0 && options.pool_fraction <= 1.0) {
        return Err(LoadError::InvalidArgument(format!(
            "pool fraction must be in (0, 1], got {}",
            options.pool_fraction
        )));
    }

    // undated rows sort last
    records.sort_by_key(|record| (record.date.is_none(), record.date));
    records.retain(|record| {
        let type_matches = match &options.property_type {
            Some(wanted) => record.property_type.as_deref() == Some(wanted.as_str()),
            None => true,
        };
        type_matches && (!options.sales_only || record.nature.is_sale())
    });

    let pool_size = (options.pool_fraction * records.len() as f64) as usize;
    let held_out = records.split_off(pool_size.min(records.len()));

    Ok(PreparedData {
        pool: CandidatePool::from_records(records),
        held_out: held_out
            .into_iter()
            .filter(|record| record.features().is_some())
            .collect(),
    })
}

/// Dashboard cleaning: sales only, complete rows, and every `Local…`
/// premises type collapsed into `Local`.
pub fn clean_for_display(records: impl IntoIterator<Item = PropertyRecord>) -> Vec<PropertyRecord> {
    records
        .into_iter()
        .filter(|record| record.nature.is_sale())
        .filter(|record| {
            record.price.is_some()
                && record.features().is_some()
                && record.property_type.is_some()
                && record.address.street_number.is_some()
                && record.address.street_name.is_some()
        })
        .map(|mut record| {
            if let Some(kind) = &record.property_type {
                if kind.starts_with("Local") {
                    record.property_type = Some("Local".to_string());
                }
            }
            record
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub only_sales: bool,
    /// Case-insensitive regular expression matched against the street name.
    pub street_pattern: Option<String>,
}

impl TransactionFilter {
    pub fn apply(&self, records: &[PropertyRecord]) -> Result<Vec<PropertyRecord>, LoadError> {
        let street = match self.street_pattern.as_deref().map(str::trim) {
            Some(pattern) if !pattern.is_empty() => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()?,
            ),
            _ => None,
        };

        Ok(records
            .iter()
            .filter(|record| !self.only_sales || record.nature.is_sale())
            .filter(|record| match &street {
                Some(regex) => record
                    .address
                    .street_name
                    .as_deref()
                    .is_some_and(|name| regex.is_match(name)),
                None => true,
            })
            .cloned()
            .collect())
    }
}
