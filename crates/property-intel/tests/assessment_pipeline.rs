use std::sync::Arc;

use property_intel::config::{
    AnalysisConfig, AppConfig, AppEnvironment, SecurityConfig, ServerConfig, ServiceInfo,
    TelemetryConfig,
};
use property_intel::hazards::{HazardScores, HazardSubmission, RiskCategory};
use property_intel::lifecycle::{AnalysisResults, AnalysisStatus, AnalysisType, QueuedDispatcher};
use property_intel::registry::PropertyDraft;
use property_intel::valuation::ValuationSubmission;
use property_intel::{DomainError, Platform};

fn test_config() -> AppConfig {
    AppConfig {
        environment: AppEnvironment::Test,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        telemetry: TelemetryConfig {
            log_level: "warn".to_string(),
        },
        analysis: AnalysisConfig::default(),
        security: SecurityConfig { bcrypt_cost: 4 },
        service: ServiceInfo::default(),
    }
}

fn riverside_draft() -> PropertyDraft {
    PropertyDraft {
        address: "1200 Riverside Dr".to_string(),
        city: "Cedar Rapids".to_string(),
        state: "IA".to_string(),
        zip_code: "52404".to_string(),
        latitude: Some(41.9659),
        longitude: Some(-91.6781),
        satellite_image_url: Some("s3://imagery/sat/1200-riverside.png".to_string()),
        ..PropertyDraft::default()
    }
}

#[test]
fn full_assessment_flows_from_registration_to_dashboard() {
    let dispatcher = QueuedDispatcher::default();
    let platform = Platform::in_memory(&test_config(), Arc::new(dispatcher.clone()));

    let property = platform
        .registry
        .create(riverside_draft())
        .expect("property registers");
    assert!(!property.is_analyzed);

    let analysis = platform
        .lifecycle
        .start(&property.id, AnalysisType::Full)
        .expect("analysis starts");
    let jobs = dispatcher.drain();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].analysis_id, analysis.id);
    assert_eq!(jobs[0].imagery, vec!["s3://imagery/sat/1200-riverside.png"]);

    platform
        .lifecycle
        .advance(&analysis.id, 0.6)
        .expect("progress accepted");
    let completed = platform
        .lifecycle
        .complete(
            &analysis.id,
            AnalysisResults {
                overall_risk_score: Some(71.0),
                confidence_score: Some(0.77),
                ..AnalysisResults::default()
            },
        )
        .expect("completes");
    assert_eq!(completed.status, AnalysisStatus::Completed);

    let refreshed = platform.registry.get(&property.id).expect("still there");
    assert!(refreshed.is_analyzed);
    assert_eq!(refreshed.analysis_version.as_deref(), Some("v1.0"));

    let mut hazard = HazardSubmission::new(
        property.id,
        HazardScores {
            flood: 90.0,
            fire: 80.0,
            earthquake: 70.0,
            wind: 80.0,
            hail: 80.0,
            tornado: 80.0,
            hurricane: 80.0,
            wildfire: 80.0,
            landslide: 80.0,
            subsidence: 80.0,
            coastal_erosion: 80.0,
            crime: 80.0,
            industrial: 80.0,
            traffic: 80.0,
        },
    );
    hazard.analysis_id = Some(analysis.id);
    let assessment = platform.hazards.record(hazard).expect("hazards recorded");
    assert!(assessment.composite_risk_score >= 75.0);
    assert_eq!(assessment.risk_category, RiskCategory::Extreme);

    let mut valuation = ValuationSubmission::new(property.id, 410_000.0);
    valuation.analysis_id = Some(analysis.id);
    valuation.replacement_cost = Some(380_000.0);
    valuation.depreciation_amount = Some(80_000.0);
    let valuation = platform
        .valuations
        .record(valuation)
        .expect("valuation recorded");
    assert_eq!(valuation.actual_cash_value, Some(300_000.0));

    let stats = platform.dashboard.stats().expect("stats");
    assert_eq!(stats.total_properties, 1);
    assert_eq!(stats.analyzed_properties, 1);
    assert_eq!(stats.risk_categories["extreme"], 1);
}

#[test]
fn terminal_runs_reject_further_transitions() {
    let platform = Platform::in_memory(&test_config(), Arc::new(QueuedDispatcher::default()));
    let property = platform
        .registry
        .create(riverside_draft())
        .expect("property registers");
    let analysis = platform
        .lifecycle
        .start(&property.id, AnalysisType::Quick)
        .expect("analysis starts");

    platform
        .lifecycle
        .fail(&analysis.id, "imagery unavailable")
        .expect("fails");
    let err = platform
        .lifecycle
        .complete(&analysis.id, AnalysisResults::default())
        .expect_err("failed runs stay failed");
    assert!(matches!(err, DomainError::InvalidState { .. }));

    let property = platform.registry.get(&property.id).expect("still there");
    assert!(!property.is_analyzed);
}
