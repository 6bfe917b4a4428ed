use crate::geo::GeoPoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const FEATURE_COUNT: usize = 4;

/// Raw comparison features in [`Feature::ALL`] order.
pub type FeatureVector = [f64; FEATURE_COUNT];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Feature {
    Surface,
    Rooms,
    Longitude,
    Latitude,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Surface,
        Feature::Rooms,
        Feature::Longitude,
        Feature::Latitude,
    ];

    /// Column name in the DVF extract.
    pub fn column(self) -> &'static str {
        match self {
            Feature::Surface => "surface_reelle_bati",
            Feature::Rooms => "nombre_pieces_principales",
            Feature::Longitude => "longitude",
            Feature::Latitude => "latitude",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionNature {
    Sale,
    Other(String),
}

impl TransactionNature {
    pub fn from_label(label: &str) -> Self {
        if label.trim() == "Vente" {
            TransactionNature::Sale
        } else {
            TransactionNature::Other(label.trim().to_string())
        }
    }

    pub fn is_sale(&self) -> bool {
        matches!(self, TransactionNature::Sale)
    }
}

impl Default for TransactionNature {
    fn default() -> Self {
        TransactionNature::Other(String::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Address {
    pub street_number: Option<u32>,
    pub street_name: Option<String>,
    pub municipality: Option<String>,
}

impl Address {
    /// "12 RUE DE RIVOLI" without the municipality.
    pub fn street_line(&self) -> String {
        match (self.street_number, self.street_name.as_deref()) {
            (Some(number), Some(name)) => format!("{number} {name}"),
            (None, Some(name)) => name.to_string(),
            (Some(number), None) => number.to_string(),
            (None, None) => String::new(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let street = self.street_line();
        match self.municipality.as_deref() {
            Some(municipality) if !street.is_empty() => write!(f, "{street}, {municipality}"),
            Some(municipality) => write!(f, "{municipality}"),
            None => write!(f, "{street}"),
        }
    }
}

/// One transaction row. Comparison features are optional because raw
/// extracts contain gaps; pools are filtered before ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PropertyRecord {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub nature: TransactionNature,
    pub property_type: Option<String>,
    pub price: Option<f64>,
    pub surface: Option<f64>,
    pub rooms: Option<u32>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub address: Address,
}

impl PropertyRecord {
    pub fn feature(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Surface => self.surface,
            Feature::Rooms => self.rooms.map(f64::from),
            Feature::Longitude => self.longitude,
            Feature::Latitude => self.latitude,
        }
    }

    /// All four comparison features, or `None` if any is missing.
    pub fn features(&self) -> Option<FeatureVector> {
        Some([
            self.feature(Feature::Surface)?,
            self.feature(Feature::Rooms)?,
            self.feature(Feature::Longitude)?,
            self.feature(Feature::Latitude)?,
        ])
    }

    pub fn first_missing_feature(&self) -> Option<Feature> {
        Feature::ALL
            .into_iter()
            .find(|feature| self.feature(*feature).is_none())
    }

    pub fn position(&self) -> Option<GeoPoint> {
        Some(GeoPoint {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comparable {
    pub id: String,
    pub surface: f64,
    pub rooms: u32,
    pub price: Option<f64>,
    pub address: Address,
    pub position: GeoPoint,
    pub similarity: f64,
    pub distance_meters: u64,
}

impl Comparable {
    pub fn similarity_percent(&self) -> u32 {
        (self.similarity * 100.0).floor() as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparableSet {
    pub query_id: String,
    pub asking_price: Option<f64>,
    pub estimated_price: Option<f64>,
    pub comparables: Vec<Comparable>,
}

impl ComparableSet {
    pub fn len(&self) -> usize {
        self.comparables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparables.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparableOptions {
    pub top_k: usize,
}

pub const DEFAULT_TOP_K: usize = 5;

impl Default for ComparableOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparationOptions {
    /// Share of the date-sorted rows that forms the candidate pool.
    pub pool_fraction: f64,
    pub property_type: Option<String>,
    pub sales_only: bool,
}

impl Default for PreparationOptions {
    fn default() -> Self {
        Self {
            pool_fraction: 0.8,
            property_type: Some("Appartement".to_string()),
            sales_only: true,
        }
    }
}
