use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::domain::{MarketValues, PropertyDraft, PropertyType};
use super::service::PropertyRegistry;
use crate::domain::{DomainError, PropertyId};

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read property export: {}", err),
            ImportError::Csv(err) => write!(f, "unreadable property CSV: {}", err),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Outcome of a bulk import. Rows are independent: a rejected row does not
/// stop the rest of the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub created: Vec<PropertyId>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRow {
    /// 1-based line number in the source file, header included.
    pub line: usize,
    pub reason: String,
}

pub struct PropertyCsvImporter;

impl PropertyCsvImporter {
    pub fn from_path<P: AsRef<Path>>(
        registry: &PropertyRegistry,
        path: P,
    ) -> Result<ImportReport, ImportError> {
        let file = File::open(path)?;
        Self::from_reader(registry, file)
    }

    pub fn from_reader<R: Read>(
        registry: &PropertyRegistry,
        reader: R,
    ) -> Result<ImportReport, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut report = ImportReport::default();

        for (index, row) in csv_reader.deserialize::<PropertyRow>().enumerate() {
            let line = index + 2;
            let row = match row {
                Ok(row) => row,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    report.rejected.push(RejectedRow {
                        line,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            match registry.create(row.into_draft()) {
                Ok(property) => report.created.push(property.id),
                Err(err) => {
                    if !matches!(err, DomainError::Validation(_)) {
                        warn!(line, error = %err, "property import row failed");
                    }
                    report.rejected.push(RejectedRow {
                        line,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

#[derive(Debug, Deserialize)]
struct PropertyRow {
    #[serde(default)]
    address: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    zip_code: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    country: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    property_type: Option<PropertyType>,
    #[serde(default)]
    year_built: Option<u16>,
    #[serde(default)]
    square_footage: Option<f64>,
    #[serde(default)]
    lot_size: Option<f64>,
    #[serde(default)]
    bedrooms: Option<u32>,
    #[serde(default)]
    bathrooms: Option<f64>,
    #[serde(default)]
    stories: Option<u32>,
    #[serde(default)]
    current_value: Option<f64>,
    #[serde(default)]
    market_value: Option<f64>,
}

impl PropertyRow {
    fn into_draft(self) -> PropertyDraft {
        PropertyDraft {
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            country: self.country,
            latitude: self.latitude,
            longitude: self.longitude,
            property_type: self.property_type,
            year_built: self.year_built,
            square_footage: self.square_footage,
            lot_size: self.lot_size,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            stories: self.stories,
            market: MarketValues {
                current_value: self.current_value,
                market_value: self.market_value,
                ..MarketValues::default()
            },
            ..PropertyDraft::default()
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
