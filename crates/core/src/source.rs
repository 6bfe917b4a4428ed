use crate::error::LoadError;
use crate::models::{Address, PropertyRecord, TransactionNature};
use crate::traits::RecordSource;
use async_trait::async_trait;
use chrono::NaiveDate;
use flate2::read::MultiGzDecoder;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use url::Url;

pub const DVF_BASE_URL: &str = "https://files.data.gouv.fr/geo-dvf/latest/csv";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Yearly per-department extract of the geolocated DVF dataset.
pub fn dvf_url(year: u16, department: &str) -> String {
    format!("{DVF_BASE_URL}/{year}/departements/{department}.csv.gz")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Local(PathBuf),
    Remote(Url),
}

impl SourceLocation {
    pub fn parse(identifier: &str) -> Result<Self, LoadError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(LoadError::InvalidArgument(
                "source identifier is empty".to_string(),
            ));
        }

        let lowered = identifier.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            Ok(SourceLocation::Remote(Url::parse(identifier)?))
        } else {
            Ok(SourceLocation::Local(PathBuf::from(identifier)))
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Local(path) => write!(f, "{}", path.display()),
            SourceLocation::Remote(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<PropertyRecord>,
    pub skipped_rows: Vec<SkippedRow>,
}

pub struct CsvSource {
    location: SourceLocation,
    client: Client,
}

impl CsvSource {
    pub fn new(location: SourceLocation) -> Self {
        Self {
            location,
            client: Client::new(),
        }
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    async fn fetch_bytes(&self) -> Result<Vec<u8>, LoadError> {
        match &self.location {
            SourceLocation::Local(path) => Ok(tokio::fs::read(path).await?),
            SourceLocation::Remote(url) => {
                let response = self.client.get(url.clone()).send().await?;
                if !response.status().is_success() {
                    return Err(LoadError::Fetch {
                        location: url.to_string(),
                        status: response.status().to_string(),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn load(&self) -> Result<LoadReport, LoadError> {
        let bytes = self.fetch_bytes().await?;
        decode_records(&bytes)
    }

    fn describe(&self) -> String {
        self.location.to_string()
    }
}

/// Decodes a DVF CSV extract, gunzipping it first when it starts with the
/// gzip magic bytes. Rows that cannot be decoded are reported, not fatal.
pub fn decode_records(bytes: &[u8]) -> Result<LoadReport, LoadError> {
    let input: Box<dyn Read + '_> = if bytes.starts_with(&GZIP_MAGIC) {
        Box::new(MultiGzDecoder::new(bytes))
    } else {
        Box::new(bytes)
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    if !headers.iter().any(|header| header == "id_mutation") {
        return Err(LoadError::MissingColumn("id_mutation".to_string()));
    }

    let mut report = LoadReport::default();
    for (index, row) in reader.deserialize::<RawTransaction>().enumerate() {
        // header is line 1
        let fallback_line = index as u64 + 2;
        let decoded = row
            .map_err(|error| SkippedRow {
                line: error
                    .position()
                    .map(|position| position.line())
                    .unwrap_or(fallback_line),
                reason: error.to_string(),
            })
            .and_then(|raw| {
                raw.into_record().map_err(|reason| SkippedRow {
                    line: fallback_line,
                    reason,
                })
            });

        match decoded {
            Ok(record) => report.records.push(record),
            Err(skipped) => report.skipped_rows.push(skipped),
        }
    }

    Ok(report)
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    id_mutation: String,
    #[serde(default)]
    date_mutation: Option<String>,
    #[serde(default)]
    nature_mutation: Option<String>,
    #[serde(default)]
    valeur_fonciere: Option<f64>,
    #[serde(default)]
    adresse_numero: Option<f64>,
    #[serde(default)]
    adresse_nom_voie: Option<String>,
    #[serde(default)]
    nom_commune: Option<String>,
    #[serde(default)]
    type_local: Option<String>,
    #[serde(default)]
    surface_reelle_bati: Option<f64>,
    #[serde(default)]
    nombre_pieces_principales: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    latitude: Option<f64>,
}

impl RawTransaction {
    fn into_record(self) -> Result<PropertyRecord, String> {
        let date = self
            .date_mutation
            .as_deref()
            .map(|value| {
                NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                    .map_err(|error| format!("invalid date_mutation `{value}`: {error}"))
            })
            .transpose()?;

        Ok(PropertyRecord {
            id: self.id_mutation,
            date,
            nature: self
                .nature_mutation
                .as_deref()
                .map(TransactionNature::from_label)
                .unwrap_or_default(),
            property_type: non_blank(self.type_local),
            price: finite(self.valeur_fonciere),
            surface: finite(self.surface_reelle_bati),
            rooms: whole_number(
                finite(self.nombre_pieces_principales),
                "nombre_pieces_principales",
            )?,
            longitude: finite(self.longitude),
            latitude: finite(self.latitude),
            address: Address {
                street_number: whole_number(finite(self.adresse_numero), "adresse_numero")?,
                street_name: non_blank(self.adresse_nom_voie),
                municipality: non_blank(self.nom_commune),
            },
        })
    }
}

/// `NaN` and infinite cells count as missing.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|number| number.is_finite())
}

fn whole_number(value: Option<f64>, column: &str) -> Result<Option<u32>, String> {
    match value {
        None => Ok(None),
        Some(number) if number.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&number) => {
            Ok(Some(number as u32))
        }
        Some(number) => Err(format!("{column} is not a whole number: {number}")),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
