use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::accounts::BcryptHasher;
use crate::config::{
    AnalysisConfig, AppConfig, AppEnvironment, SecurityConfig, ServerConfig, ServiceInfo,
    TelemetryConfig,
};
use crate::domain::{AnalysisId, PropertyId};
use crate::hazards::{HazardScores, HazardSubmission};
use crate::lifecycle::{
    AnalysisDispatcher, AnalysisJob, AnalysisRepository, AnalysisResults, DispatchError,
    PropertyAnalysis, QueuedDispatcher,
};
use crate::platform::{Platform, Repositories};
use crate::registry::{
    BoundingBox, Page, Property, PropertyCounts, PropertyDraft, PropertyFilter,
    PropertyRepository,
};
use crate::store::memory::{MemoryAnalysisRepository, MemoryPropertyRepository};
use crate::store::RepositoryError;
use crate::valuation::ValuationSubmission;

pub(super) fn config() -> AppConfig {
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

pub(super) fn build_platform() -> (Platform, QueuedDispatcher) {
    let dispatcher = QueuedDispatcher::default();
    let platform = Platform::in_memory(&config(), Arc::new(dispatcher.clone()));
    (platform, dispatcher)
}

pub(super) fn platform_with(
    repositories: Repositories,
    dispatcher: Arc<dyn AnalysisDispatcher>,
) -> Platform {
    Platform::new(
        &config(),
        repositories,
        dispatcher,
        Arc::new(BcryptHasher::new(4)),
    )
}

pub(super) fn draft(latitude: f64, longitude: f64) -> PropertyDraft {
    PropertyDraft {
        address: "400 Locust St".to_string(),
        city: "Des Moines".to_string(),
        state: "IA".to_string(),
        zip_code: "50309".to_string(),
        latitude: Some(latitude),
        longitude: Some(longitude),
        square_footage: Some(1_850.0),
        bedrooms: Some(3),
        satellite_image_url: Some("s3://imagery/sat/400-locust.png".to_string()),
        ..PropertyDraft::default()
    }
}

pub(super) fn results() -> AnalysisResults {
    AnalysisResults {
        overall_risk_score: Some(38.5),
        confidence_score: Some(0.82),
        processing_time: Some(12.4),
        model_version: Some("v2.3".to_string()),
        ..AnalysisResults::default()
    }
}

/// Registers a property and drives one analysis to completion.
pub(super) fn completed_analysis(platform: &Platform) -> (Property, PropertyAnalysis) {
    let property = platform
        .registry
        .create(draft(41.5868, -93.625))
        .expect("property registers");
    let analysis = platform
        .lifecycle
        .start(&property.id, Default::default())
        .expect("analysis starts");
    let analysis = platform
        .lifecycle
        .complete(&analysis.id, results())
        .expect("analysis completes");
    (property, analysis)
}

pub(super) fn hazard_submission(
    property_id: PropertyId,
    analysis_id: Option<AnalysisId>,
) -> HazardSubmission {
    let mut submission = HazardSubmission::new(
        property_id,
        HazardScores {
            flood: 60.0,
            fire: 20.0,
            earthquake: 10.0,
            crime: 40.0,
            ..HazardScores::default()
        },
    );
    submission.analysis_id = analysis_id;
    submission
}

pub(super) fn valuation_submission(
    property_id: PropertyId,
    analysis_id: Option<AnalysisId>,
) -> ValuationSubmission {
    let mut submission = ValuationSubmission::new(property_id, 315_000.0);
    submission.analysis_id = analysis_id;
    submission.confidence_interval_low = Some(290_000.0);
    submission.confidence_interval_high = Some(340_000.0);
    submission.replacement_cost = Some(260_000.0);
    submission.depreciation_amount = Some(35_000.0);
    submission
}

pub(super) struct FailingDispatcher;

impl AnalysisDispatcher for FailingDispatcher {
    fn dispatch(&self, _job: AnalysisJob) -> Result<(), DispatchError> {
        Err(DispatchError::Unavailable("queue offline".to_string()))
    }
}

pub(super) struct UnavailablePropertyRepository;

impl PropertyRepository for UnavailablePropertyRepository {
    fn insert(&self, _property: Property) -> Result<Property, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _page: Page) -> Result<Vec<Property>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn search(
        &self,
        _filter: &PropertyFilter,
        _page: Page,
    ) -> Result<Vec<Property>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _property: Property) -> Result<Property, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn remove(&self, _id: &PropertyId) -> Result<Property, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn within(&self, _window: &BoundingBox) -> Result<Vec<Property>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn mark_analyzed(
        &self,
        _id: &PropertyId,
        _analyzed_at: DateTime<Utc>,
        _analysis_version: Option<String>,
    ) -> Result<Property, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count(&self) -> Result<PropertyCounts, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Property store whose next `mark_analyzed` fails once, leaving everything
/// else intact.
#[derive(Default)]
pub(super) struct FlakyMarkPropertyRepository {
    pub(super) inner: MemoryPropertyRepository,
    pub(super) fail_next_mark: AtomicBool,
}

impl PropertyRepository for FlakyMarkPropertyRepository {
    fn insert(&self, property: Property) -> Result<Property, RepositoryError> {
        self.inner.insert(property)
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self, page: Page) -> Result<Vec<Property>, RepositoryError> {
        self.inner.list(page)
    }

    fn search(
        &self,
        filter: &PropertyFilter,
        page: Page,
    ) -> Result<Vec<Property>, RepositoryError> {
        self.inner.search(filter, page)
    }

    fn update(&self, property: Property) -> Result<Property, RepositoryError> {
        self.inner.update(property)
    }

    fn remove(&self, id: &PropertyId) -> Result<Property, RepositoryError> {
        self.inner.remove(id)
    }

    fn within(&self, window: &BoundingBox) -> Result<Vec<Property>, RepositoryError> {
        self.inner.within(window)
    }

    fn mark_analyzed(
        &self,
        id: &PropertyId,
        analyzed_at: DateTime<Utc>,
        analysis_version: Option<String>,
    ) -> Result<Property, RepositoryError> {
        if self.fail_next_mark.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write timed out".to_string()));
        }
        self.inner.mark_analyzed(id, analyzed_at, analysis_version)
    }

    fn count(&self) -> Result<PropertyCounts, RepositoryError> {
        self.inner.count()
    }
}

/// Analysis store that accepts inserts but refuses every transition.
#[derive(Default)]
pub(super) struct FrozenAnalysisRepository {
    pub(super) inner: MemoryAnalysisRepository,
}

impl AnalysisRepository for FrozenAnalysisRepository {
    fn insert(&self, analysis: PropertyAnalysis) -> Result<PropertyAnalysis, RepositoryError> {
        self.inner.insert(analysis)
    }

    fn compare_and_swap(
        &self,
        _analysis: PropertyAnalysis,
        _expected_version: u64,
    ) -> Result<PropertyAnalysis, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, id: &AnalysisId) -> Result<Option<PropertyAnalysis>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<PropertyAnalysis>, RepositoryError> {
        self.inner.for_property(property_id)
    }

    fn all(&self) -> Result<Vec<PropertyAnalysis>, RepositoryError> {
        self.inner.all()
    }
}

/// Analysis store whose reads rendezvous on a barrier, so two racing
/// transitions both observe the same version before either writes.
pub(super) struct RendezvousAnalysisRepository {
    pub(super) inner: MemoryAnalysisRepository,
    pub(super) barrier: Arc<Barrier>,
}

impl AnalysisRepository for RendezvousAnalysisRepository {
    fn insert(&self, analysis: PropertyAnalysis) -> Result<PropertyAnalysis, RepositoryError> {
        self.inner.insert(analysis)
    }

    fn compare_and_swap(
        &self,
        analysis: PropertyAnalysis,
        expected_version: u64,
    ) -> Result<PropertyAnalysis, RepositoryError> {
        self.inner.compare_and_swap(analysis, expected_version)
    }

    fn fetch(&self, id: &AnalysisId) -> Result<Option<PropertyAnalysis>, RepositoryError> {
        let found = self.inner.fetch(id);
        self.barrier.wait();
        found
    }

    fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<PropertyAnalysis>, RepositoryError> {
        self.inner.for_property(property_id)
    }

    fn all(&self) -> Result<Vec<PropertyAnalysis>, RepositoryError> {
        self.inner.all()
    }
}

pub(super) fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("serializes")))
        .expect("request builds")
}

pub(super) fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
