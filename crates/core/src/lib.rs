pub mod comparables;
pub mod dataset;
pub mod error;
pub mod geo;
pub mod models;
pub mod normalize;
pub mod ranking;
pub mod session;
pub mod source;
pub mod stats;
pub mod traits;

pub use comparables::{build_comparable_set, estimate};
pub use dataset::{clean_for_display, prepare_pool, CandidatePool, PreparedData, TransactionFilter};
pub use error::{LoadError, RankError, SessionError};
pub use geo::{distance_meters, haversine_meters, GeoPoint};
pub use models::{
    Address, Comparable, ComparableOptions, ComparableSet, Feature, FeatureVector,
    PreparationOptions, PropertyRecord, TransactionNature, DEFAULT_TOP_K,
};
pub use normalize::FeatureStats;
pub use ranking::{rank, RankedCandidate};
pub use session::Session;
pub use source::{decode_records, dvf_url, CsvSource, LoadReport, SkippedRow, SourceLocation};
pub use stats::{
    describe, map_center, marker_label, median_by_rooms, median_price, ColumnSummary, Metric,
    RoomMedian,
};
pub use traits::RecordSource;
