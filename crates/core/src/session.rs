use crate::comparables::build_comparable_set;
use crate::dataset::{prepare_pool, CandidatePool, PreparedData};
use crate::error::SessionError;
use crate::models::{ComparableOptions, ComparableSet, PreparationOptions, PropertyRecord};
use crate::ranking::rank;
use crate::source::SkippedRow;
use crate::traits::RecordSource;
use std::collections::HashSet;
use uuid::Uuid;

/// State owned by one user session. Selecting another dataset means
/// building a new session; nothing here is shared between sessions.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    pool: CandidatePool,
    held_out: Vec<PropertyRecord>,
    last_result: Option<ComparableSet>,
}

impl Session {
    pub fn new(prepared: PreparedData) -> Self {
        Self {
            id: Uuid::new_v4(),
            pool: prepared.pool,
            held_out: prepared.held_out,
            last_result: None,
        }
    }

    /// Loads the source, prepares pool and held-out rows, and returns the
    /// rows the source could not decode alongside the session.
    pub async fn open<S>(
        source: &S,
        options: &PreparationOptions,
    ) -> Result<(Self, Vec<SkippedRow>), SessionError>
    where
        S: RecordSource + Sync,
    {
        let report = source.load().await?;
        let prepared = prepare_pool(report.records, options)?;
        Ok((Self::new(prepared), report.skipped_rows))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    pub fn held_out(&self) -> &[PropertyRecord] {
        &self.held_out
    }

    /// Distinct held-out ids in held-out order, at most `limit` of them.
    pub fn query_ids(&self, limit: usize) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.held_out
            .iter()
            .map(|record| record.id.as_str())
            .filter(|id| seen.insert(*id))
            .take(limit)
            .collect()
    }

    pub fn query(&self, id: &str) -> Option<&PropertyRecord> {
        self.held_out.iter().find(|record| record.id == id)
    }

    pub fn estimate(
        &mut self,
        query_id: &str,
        options: &ComparableOptions,
    ) -> Result<&ComparableSet, SessionError> {
        let query = self
            .query(query_id)
            .ok_or_else(|| SessionError::UnknownQuery(query_id.to_string()))?;

        let ranked = rank(&self.pool, query)?;
        let set = build_comparable_set(&ranked, query, options)?;
        Ok(self.last_result.insert(set))
    }

    pub fn last_result(&self) -> Option<&ComparableSet> {
        self.last_result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoadError, RankError};
    use crate::models::TransactionNature;
    use crate::source::LoadReport;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct FakeSource {
        records: Vec<PropertyRecord>,
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        async fn load(&self) -> Result<LoadReport, LoadError> {
            Ok(LoadReport {
                records: self.records.clone(),
                skipped_rows: vec![SkippedRow {
                    line: 7,
                    reason: "bad row".to_string(),
                }],
            })
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    fn apartment(id: &str, day: u32, surface: f64, rooms: u32, price: f64) -> PropertyRecord {
        PropertyRecord {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2022, 5, day),
            nature: TransactionNature::Sale,
            property_type: Some("Appartement".to_string()),
            price: Some(price),
            surface: Some(surface),
            rooms: Some(rooms),
            longitude: Some(2.33 + f64::from(day) / 1_000.0),
            latitude: Some(48.85 + surface / 10_000.0),
            ..Default::default()
        }
    }

    fn records() -> Vec<PropertyRecord> {
        vec![
            apartment("p1", 1, 22.0, 1, 210_000.0),
            apartment("p2", 2, 35.0, 2, 330_000.0),
            apartment("p3", 3, 48.0, 2, 450_000.0),
            apartment("p4", 4, 63.0, 3, 610_000.0),
            apartment("p5", 5, 80.0, 4, 790_000.0),
            apartment("p6", 6, 27.0, 1, 260_000.0),
            apartment("p7", 7, 55.0, 3, 520_000.0),
            apartment("p8", 8, 90.0, 4, 900_000.0),
            apartment("q1", 20, 36.0, 2, 345_000.0),
            apartment("q2", 21, 75.0, 3, 700_000.0),
        ]
    }

    #[tokio::test]
    async fn open_prepares_pool_and_reports_skipped_rows() -> Result<(), SessionError> {
        let source = FakeSource { records: records() };
        let (session, skipped) = Session::open(&source, &PreparationOptions::default()).await?;

        assert_eq!(session.pool().len(), 8);
        assert_eq!(session.query_ids(50), vec!["q1", "q2"]);
        assert_eq!(session.query_ids(1), vec!["q1"]);
        assert_eq!(skipped.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn estimate_stores_last_result() -> Result<(), Box<dyn std::error::Error>> {
        let source = FakeSource { records: records() };
        let (mut session, _) = Session::open(&source, &PreparationOptions::default()).await?;
        assert!(session.last_result().is_none());

        let set = session.estimate("q1", &ComparableOptions::default())?.clone();
        assert_eq!(set.query_id, "q1");
        assert_eq!(set.len(), 5);
        assert_eq!(set.asking_price, Some(345_000.0));
        assert!(set.estimated_price.is_some());
        assert_eq!(session.last_result(), Some(&set));

        let json = serde_json::to_value(&set)?;
        assert_eq!(json["comparables"].as_array().map(Vec::len), Some(5));
        Ok(())
    }

    #[test]
    fn unknown_query_is_reported() {
        let mut session = Session::new(PreparedData::default());
        assert!(matches!(
            session.estimate("missing", &ComparableOptions::default()),
            Err(SessionError::UnknownQuery(id)) if id == "missing"
        ));
    }

    #[test]
    fn empty_pool_surfaces_insufficient_data() {
        let mut session = Session::new(PreparedData {
            pool: CandidatePool::default(),
            held_out: vec![apartment("q1", 20, 36.0, 2, 345_000.0)],
        });
        assert!(matches!(
            session.estimate("q1", &ComparableOptions::default()),
            Err(SessionError::Rank(RankError::InsufficientData(_)))
        ));
    }

    #[test]
    fn sessions_are_isolated() {
        let first = Session::new(PreparedData::default());
        let second = Session::new(PreparedData::default());
        assert_ne!(first.id(), second.id());
    }
}
