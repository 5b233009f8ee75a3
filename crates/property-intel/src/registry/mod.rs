//! Property registry: the aggregation root every other record points at.

pub mod domain;
pub mod geo;
mod import;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    ConstructionDetails, MarketValues, NearbyProperty, Page, Property, PropertyDraft,
    PropertyFilter, PropertyType,
};
pub use geo::{BoundingBox, GeoPoint};
pub use import::{ImportError, ImportReport, PropertyCsvImporter, RejectedRow};
pub use repository::{PropertyCounts, PropertyReferences, PropertyRepository};
pub use router::property_router;
pub use service::PropertyRegistry;
