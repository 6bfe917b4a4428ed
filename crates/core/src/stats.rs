use crate::geo::GeoPoint;
use crate::models::PropertyRecord;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Metric {
    Price,
    Surface,
}

impl Metric {
    pub fn column(self) -> &'static str {
        match self {
            Metric::Price => "valeur_fonciere",
            Metric::Surface => "surface_reelle_bati",
        }
    }

    fn value(self, record: &PropertyRecord) -> Option<f64> {
        match self {
            Metric::Price => record.price,
            Metric::Surface => record.surface,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: &'static str,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoomMedian {
    pub rooms: u32,
    pub median: f64,
}

/// Linearly interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

pub fn median(mut values: Vec<f64>) -> Option<f64> {
    values.sort_by(f64::total_cmp);
    quantile(&values, 0.5)
}

pub fn median_price(records: &[PropertyRecord]) -> Option<f64> {
    median(records.iter().filter_map(|record| record.price).collect())
}

/// Summary rows for price, surface and rooms over rows where all three are
/// present.
pub fn describe(records: &[PropertyRecord]) -> Vec<ColumnSummary> {
    let complete = records
        .iter()
        .filter_map(|record| {
            Some((record.price?, record.surface?, f64::from(record.rooms?)))
        })
        .collect::<Vec<_>>();

    if complete.is_empty() {
        return Vec::new();
    }

    let columns: [(&'static str, Vec<f64>); 3] = [
        ("valeur_fonciere", complete.iter().map(|row| row.0).collect()),
        ("surface_reelle_bati", complete.iter().map(|row| row.1).collect()),
        ("nombre_pieces_principales", complete.iter().map(|row| row.2).collect()),
    ];

    columns
        .into_iter()
        .filter_map(|(column, mut values)| {
            values.sort_by(f64::total_cmp);
            Some(ColumnSummary {
                column,
                count: values.len(),
                mean: values.iter().sum::<f64>() / values.len() as f64,
                min: *values.first()?,
                q25: quantile(&values, 0.25)?,
                median: quantile(&values, 0.5)?,
                q75: quantile(&values, 0.75)?,
                max: *values.last()?,
            })
        })
        .collect()
}

/// Median of `metric` per room count, ascending by room count.
pub fn median_by_rooms(records: &[PropertyRecord], metric: Metric) -> Vec<RoomMedian> {
    let mut groups = BTreeMap::<u32, Vec<f64>>::new();
    for record in records {
        if let (Some(rooms), Some(_), Some(_)) = (record.rooms, record.price, record.surface) {
            if let Some(value) = metric.value(record) {
                groups.entry(rooms).or_default().push(value);
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|(rooms, values)| Some(RoomMedian { rooms, median: median(values)? }))
        .collect()
}

/// Mean position of the located records.
pub fn map_center(records: &[PropertyRecord]) -> Option<GeoPoint> {
    let positions = records
        .iter()
        .filter_map(PropertyRecord::position)
        .collect::<Vec<_>>();
    if positions.is_empty() {
        return None;
    }

    let count = positions.len() as f64;
    Some(GeoPoint {
        latitude: positions.iter().map(|point| point.latitude).sum::<f64>() / count,
        longitude: positions.iter().map(|point| point.longitude).sum::<f64>() / count,
    })
}

pub fn marker_label(record: &PropertyRecord) -> String {
    // numbers keep their decimal point: "41.0"
    let display = |value: Option<f64>| {
        value
            .map(|number| format!("{number:?}"))
            .unwrap_or_else(|| "?".to_string())
    };

    format!(
        "Surface: {} m²\nRooms: {}\nType: {}\nPrice: {} €\nAddress: {}",
        display(record.surface),
        display(record.rooms.map(f64::from)),
        record.property_type.as_deref().unwrap_or("?"),
        display(record.price),
        record.address.street_line(),
    )
}
