use std::io::Cursor;
use std::sync::Arc;

use super::common::*;
use crate::domain::{DomainError, EntityKind, PropertyId, ValidationError};
use crate::platform::Repositories;
use crate::registry::{
    Page, PropertyCsvImporter, PropertyFilter, PropertyRegistry, PropertyType,
};
use crate::store::RepositoryError;

#[test]
fn create_rejects_out_of_range_latitude() {
    let (platform, _) = build_platform();
    let err = platform
        .registry
        .create(draft(200.0, -93.6))
        .expect_err("latitude out of range");
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::OutOfRange {
            field: "latitude",
            ..
        })
    ));
}

#[test]
fn create_names_the_missing_field() {
    let (platform, _) = build_platform();
    let mut input = draft(41.5, -93.6);
    input.zip_code = "  ".to_string();
    let err = platform.registry.create(input).expect_err("zip missing");
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::Missing { field: "zip_code" })
    ));

    let mut input = draft(41.5, -93.6);
    input.longitude = None;
    let err = platform.registry.create(input).expect_err("longitude missing");
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::Missing { field: "longitude" })
    ));
}

#[test]
fn new_properties_start_unanalyzed() {
    let (platform, _) = build_platform();
    let property = platform
        .registry
        .create(draft(41.5868, -93.625))
        .expect("registers");
    assert!(!property.is_analyzed);
    assert!(property.last_analysis_date.is_none());
    assert_eq!(property.country, "USA");
    assert_eq!(platform.registry.get(&property.id).expect("stored"), property);
}

#[test]
fn radius_search_orders_nearest_first() {
    let (platform, _) = build_platform();
    let origin = (41.5868, -93.625);
    let far = platform
        .registry
        .create(draft(41.5960, -93.625))
        .expect("registers");
    let near = platform
        .registry
        .create(draft(41.5880, -93.625))
        .expect("registers");
    platform
        .registry
        .create(draft(42.0308, -93.6319))
        .expect("registers");

    let matches = platform
        .registry
        .find_by_location_radius(origin.0, origin.1, 1_500.0)
        .expect("query succeeds");
    let ids: Vec<_> = matches.iter().map(|entry| entry.property.id).collect();
    assert_eq!(ids, vec![near.id, far.id]);
    assert!(matches[0].distance_meters < matches[1].distance_meters);
    assert!(matches.iter().all(|entry| entry.distance_meters <= 1_500.0));
}

#[test]
fn radius_search_rejects_negative_radius() {
    let (platform, _) = build_platform();
    let err = platform
        .registry
        .find_by_location_radius(41.5, -93.6, -10.0)
        .expect_err("negative radius");
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::Negative {
            field: "radius_meters",
            ..
        })
    ));
}

#[test]
fn nearby_excludes_the_property_itself() {
    let (platform, _) = build_platform();
    let anchor = platform
        .registry
        .create(draft(41.5868, -93.625))
        .expect("registers");
    let neighbour = platform
        .registry
        .create(draft(41.5870, -93.626))
        .expect("registers");

    let nearby = platform
        .registry
        .nearby(&anchor.id, 1_000.0)
        .expect("query succeeds");
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].property.id, neighbour.id);
}

#[test]
fn mark_analyzed_never_rewinds_the_analysis_date() {
    let (platform, _) = build_platform();
    let property = platform
        .registry
        .create(draft(41.5868, -93.625))
        .expect("registers");
    let later = chrono::Utc::now();
    let earlier = later - chrono::Duration::hours(2);

    platform
        .registry
        .mark_analyzed(&property.id, later, Some("v2"))
        .expect("marks");
    let updated = platform
        .registry
        .mark_analyzed(&property.id, earlier, Some("v1"))
        .expect("marks");
    assert!(updated.is_analyzed);
    assert_eq!(updated.last_analysis_date, Some(later));
    assert_eq!(updated.analysis_version.as_deref(), Some("v2"));
}

#[test]
fn mark_analyzed_reports_missing_properties() {
    let (platform, _) = build_platform();
    let err = platform
        .registry
        .mark_analyzed(&crate::PropertyId::generate(), chrono::Utc::now(), None)
        .expect_err("unknown property");
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[test]
fn listing_pages_in_creation_order() {
    let (platform, _) = build_platform();
    let ids: Vec<_> = (0..5)
        .map(|offset| {
            platform
                .registry
                .create(draft(41.0 + offset as f64 * 0.01, -93.6))
                .expect("registers")
                .id
        })
        .collect();

    let page = platform
        .registry
        .list(Page { skip: 1, limit: 2 })
        .expect("lists");
    let listed: Vec<_> = page.iter().map(|property| property.id).collect();
    assert_eq!(listed, ids[1..3].to_vec());

    let clamped = platform
        .registry
        .list(Page { skip: 0, limit: 0 })
        .expect("lists");
    assert_eq!(clamped.len(), 1);
}

#[test]
fn store_failures_surface_as_repository_errors() {
    let registry = PropertyRegistry::new(Arc::new(UnavailablePropertyRepository));
    let err = registry
        .create(draft(41.5, -93.6))
        .expect_err("store offline");
    assert!(matches!(
        err,
        DomainError::Repository(RepositoryError::Unavailable(_))
    ));
}

#[test]
fn csv_import_keeps_going_after_bad_rows() {
    let repositories = Repositories::in_memory();
    let registry = PropertyRegistry::new(repositories.properties);
    let csv = "address,city,state,zip_code,latitude,longitude,property_type,square_footage\n\
               400 Locust St,Des Moines,IA,50309,41.5868,-93.625,commercial,12000\n\
               ,Ames,IA,50010,42.03,-93.63,residential,\n\
               9 Elm St,Ankeny,IA,50021,95.0,-93.6,residential,1400\n\
               12 Oak Ave,Ankeny,IA,50021,41.73,-93.6,,\n";

    let report = PropertyCsvImporter::from_reader(&registry, Cursor::new(csv)).expect("imports");
    assert_eq!(report.created.len(), 2);
    let lines: Vec<_> = report.rejected.iter().map(|row| row.line).collect();
    assert_eq!(lines, vec![3, 4]);
    assert!(report.rejected[0].reason.contains("address"));
    assert_eq!(registry.counts().expect("counts").total, 2);
}

#[test]
fn update_revalidates_and_keeps_analysis_state() {
    let (platform, _) = build_platform();
    let (property, analysis) = completed_analysis(&platform);
    let marked = platform.registry.get(&property.id).expect("stored");
    assert!(marked.is_analyzed);

    let mut relocated = draft(41.6, -93.7);
    relocated.address = "410 Locust St".to_string();
    let updated = platform
        .registry
        .update(&property.id, relocated)
        .expect("updates");
    assert_eq!(updated.address, "410 Locust St");
    assert_eq!(updated.latitude, 41.6);
    assert!(updated.is_analyzed);
    assert_eq!(updated.last_analysis_date, analysis.completed_at);
    assert_eq!(updated.created_at, property.created_at);
    assert!(updated.updated_at.is_some());

    let err = platform
        .registry
        .update(&property.id, draft(200.0, -93.7))
        .expect_err("latitude out of range");
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::OutOfRange {
            field: "latitude",
            ..
        })
    ));
    assert_eq!(
        platform.registry.get(&property.id).expect("stored").address,
        "410 Locust St"
    );

    let err = platform
        .registry
        .update(&PropertyId::generate(), draft(41.6, -93.7))
        .expect_err("unknown property");
    assert!(matches!(
        err,
        DomainError::NotFound {
            entity: EntityKind::Property,
            ..
        }
    ));
}

#[test]
fn delete_refuses_properties_with_analyses() {
    let (platform, _) = build_platform();
    let (property, _) = completed_analysis(&platform);

    let err = platform
        .registry
        .delete(&property.id)
        .expect_err("analysis references the property");
    assert!(matches!(err, DomainError::InUse { dependents: 1, .. }));
    assert!(platform.registry.get(&property.id).is_ok());
}

#[test]
fn delete_removes_unreferenced_properties_from_radius_search() {
    let (platform, _) = build_platform();
    let property = platform
        .registry
        .create(draft(41.5868, -93.625))
        .expect("registers");

    let removed = platform.registry.delete(&property.id).expect("deletes");
    assert_eq!(removed.id, property.id);
    assert!(matches!(
        platform.registry.get(&property.id),
        Err(DomainError::NotFound { .. })
    ));
    let nearby = platform
        .registry
        .find_by_location_radius(41.5868, -93.625, 1_000.0)
        .expect("searches");
    assert!(nearby.is_empty());
    assert!(matches!(
        platform.registry.delete(&property.id),
        Err(DomainError::NotFound { .. })
    ));
}

#[test]
fn search_matches_attributes_case_insensitively() {
    let (platform, _) = build_platform();
    let downtown = platform
        .registry
        .create(draft(41.5868, -93.625))
        .expect("registers");
    let mut warehouse = draft(41.60, -93.60);
    warehouse.zip_code = "50313".to_string();
    warehouse.property_type = Some(PropertyType::Industrial);
    let warehouse = platform.registry.create(warehouse).expect("registers");
    let mut ames = draft(42.03, -93.63);
    ames.city = "Ames".to_string();
    platform.registry.create(ames).expect("registers");

    let in_city = platform
        .registry
        .search(
            &PropertyFilter {
                city: Some("des moines".to_string()),
                state: Some(" ia ".to_string()),
                ..PropertyFilter::default()
            },
            Page::default(),
        )
        .expect("searches");
    let ids: Vec<_> = in_city.iter().map(|property| property.id).collect();
    assert_eq!(ids, vec![downtown.id, warehouse.id]);

    let industrial = platform
        .registry
        .search(
            &PropertyFilter {
                zip_code: Some("50313".to_string()),
                property_type: Some(PropertyType::Industrial),
                ..PropertyFilter::default()
            },
            Page::default(),
        )
        .expect("searches");
    assert_eq!(industrial.len(), 1);
    assert_eq!(industrial[0].id, warehouse.id);

    let everything = platform
        .registry
        .search(&PropertyFilter::default(), Page { skip: 2, limit: 10 })
        .expect("searches");
    assert_eq!(everything.len(), 1);
}
