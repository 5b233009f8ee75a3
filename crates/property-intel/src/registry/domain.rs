use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geo::GeoPoint;
use crate::domain::{check_non_negative, require_text, Document, PropertyId, ValidationError};

pub const DEFAULT_COUNTRY: &str = "USA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Residential,
    Commercial,
    Industrial,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionDetails {
    pub construction_type: Option<String>,
    pub roof_type: Option<String>,
    pub foundation_type: Option<String>,
    pub exterior_material: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketValues {
    pub current_value: Option<f64>,
    pub market_value: Option<f64>,
    pub assessed_value: Option<f64>,
    pub tax_assessment: Option<f64>,
}

impl MarketValues {
    fn validate(&self) -> Result<(), ValidationError> {
        check_non_negative("current_value", self.current_value)?;
        check_non_negative("market_value", self.market_value)?;
        check_non_negative("assessed_value", self.assessed_value)?;
        check_non_negative("tax_assessment", self.tax_assessment)
    }
}

/// Caller-supplied fields for registering a property. Required fields are
/// optional here so a missing value surfaces as a validation error naming the
/// field instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyDraft {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub property_type: Option<PropertyType>,
    pub year_built: Option<u16>,
    pub square_footage: Option<f64>,
    pub lot_size: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub stories: Option<u32>,
    pub construction: ConstructionDetails,
    pub market: MarketValues,
    pub satellite_image_url: Option<String>,
    pub street_view_image_url: Option<String>,
    pub property_images: Vec<String>,
    pub additional_data: Document,
}

/// Canonical record of a physical property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub property_type: Option<PropertyType>,
    pub year_built: Option<u16>,
    pub square_footage: Option<f64>,
    pub lot_size: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub stories: Option<u32>,
    pub construction: ConstructionDetails,
    pub market: MarketValues,
    pub satellite_image_url: Option<String>,
    pub street_view_image_url: Option<String>,
    pub property_images: Vec<String>,
    pub is_analyzed: bool,
    pub analysis_version: Option<String>,
    pub last_analysis_date: Option<DateTime<Utc>>,
    pub additional_data: Document,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Property {
    /// Validates a draft and builds a fresh, not-yet-analyzed record.
    pub fn from_draft(
        id: PropertyId,
        draft: PropertyDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        require_text("address", &draft.address)?;
        require_text("city", &draft.city)?;
        require_text("state", &draft.state)?;
        require_text("zip_code", &draft.zip_code)?;
        let latitude = draft
            .latitude
            .ok_or(ValidationError::Missing { field: "latitude" })?;
        let longitude = draft
            .longitude
            .ok_or(ValidationError::Missing { field: "longitude" })?;
        let location = GeoPoint::new(latitude, longitude)?;

        check_non_negative("square_footage", draft.square_footage)?;
        check_non_negative("lot_size", draft.lot_size)?;
        check_non_negative("bathrooms", draft.bathrooms)?;
        draft.market.validate()?;

        let country = draft
            .country
            .map(|country| country.trim().to_string())
            .filter(|country| !country.is_empty())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

        Ok(Self {
            id,
            address: draft.address.trim().to_string(),
            city: draft.city.trim().to_string(),
            state: draft.state.trim().to_string(),
            zip_code: draft.zip_code.trim().to_string(),
            country,
            latitude: location.latitude,
            longitude: location.longitude,
            property_type: draft.property_type,
            year_built: draft.year_built,
            square_footage: draft.square_footage,
            lot_size: draft.lot_size,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            stories: draft.stories,
            construction: draft.construction,
            market: draft.market,
            satellite_image_url: draft.satellite_image_url,
            street_view_image_url: draft.street_view_image_url,
            property_images: draft.property_images,
            is_analyzed: false,
            analysis_version: None,
            last_analysis_date: None,
            additional_data: draft.additional_data,
            created_at: now,
            updated_at: None,
        })
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Flags the property as analyzed. The analysis date only moves forward so
    /// an older run finishing late cannot rewind it.
    pub fn record_analysis(
        &mut self,
        analyzed_at: DateTime<Utc>,
        analysis_version: Option<String>,
        now: DateTime<Utc>,
    ) {
        let newer = self
            .last_analysis_date
            .map_or(true, |previous| analyzed_at >= previous);
        if newer {
            self.last_analysis_date = Some(analyzed_at);
            if analysis_version.is_some() {
                self.analysis_version = analysis_version;
            }
        }
        self.is_analyzed = true;
        self.updated_at = Some(now);
    }

    /// Image references handed to the analysis pipeline.
    pub fn imagery(&self) -> Vec<String> {
        self.satellite_image_url
            .iter()
            .chain(self.street_view_image_url.iter())
            .chain(self.property_images.iter())
            .cloned()
            .collect()
    }
}

/// Attribute filter for property search. Text fields compare
/// case-insensitively after trimming; unset or blank fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyFilter {
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub property_type: Option<PropertyType>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        fn text_matches(wanted: &Option<String>, actual: &str) -> bool {
            wanted
                .as_deref()
                .map(str::trim)
                .filter(|wanted| !wanted.is_empty())
                .map_or(true, |wanted| wanted.eq_ignore_ascii_case(actual))
        }

        text_matches(&self.city, &property.city)
            && text_matches(&self.state, &property.state)
            && text_matches(&self.zip_code, &property.zip_code)
            && self
                .property_type
                .map_or(true, |wanted| property.property_type == Some(wanted))
    }
}

/// A property returned from a proximity query with its distance from the
/// search origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyProperty {
    #[serde(flatten)]
    pub property: Property,
    pub distance_meters: f64,
}

/// Offset/limit window for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Page {
    pub const MAX_LIMIT: usize = 500;

    pub fn clamped(self) -> Self {
        Self {
            skip: self.skip,
            limit: self.limit.clamp(1, Self::MAX_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
        }
    }
}
