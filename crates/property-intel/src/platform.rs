//! Wiring: builds every service from one configuration and exposes the
//! combined API router.

use std::sync::Arc;

use axum::Router;

use crate::accounts::{
    account_router, BcryptHasher, PasswordHasher, UserDirectory, UserRepository,
};
use crate::config::AppConfig;
use crate::dashboard::{dashboard_router, Dashboard};
use crate::domain::PropertyId;
use crate::hazards::{hazard_router, HazardRepository, HazardService};
use crate::lifecycle::{
    analysis_router, AnalysisDispatcher, AnalysisLifecycle, AnalysisRepository,
};
use crate::registry::{
    property_router, PropertyReferences, PropertyRegistry, PropertyRepository,
};
use crate::store::memory::{
    MemoryAnalysisRepository, MemoryHazardRepository, MemoryPropertyRepository,
    MemoryUserRepository, MemoryValuationRepository,
};
use crate::store::RepositoryError;
use crate::valuation::{valuation_router, ValuationRepository, ValuationService};

/// Storage backends for every feature.
#[derive(Clone)]
pub struct Repositories {
    pub properties: Arc<dyn PropertyRepository>,
    pub analyses: Arc<dyn AnalysisRepository>,
    pub hazards: Arc<dyn HazardRepository>,
    pub valuations: Arc<dyn ValuationRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            properties: Arc::new(MemoryPropertyRepository::default()),
            analyses: Arc::new(MemoryAnalysisRepository::default()),
            hazards: Arc::new(MemoryHazardRepository::default()),
            valuations: Arc::new(MemoryValuationRepository::default()),
            users: Arc::new(MemoryUserRepository::default()),
        }
    }
}

/// Analyses, hazard assessments and valuations all hold a property id.
struct DependentRecords {
    analyses: Arc<dyn AnalysisRepository>,
    hazards: Arc<dyn HazardRepository>,
    valuations: Arc<dyn ValuationRepository>,
}

impl PropertyReferences for DependentRecords {
    fn referencing(&self, property_id: &PropertyId) -> Result<usize, RepositoryError> {
        Ok(self.analyses.for_property(property_id)?.len()
            + self.hazards.for_property(property_id)?.len()
            + self.valuations.for_property(property_id)?.len())
    }
}

/// Service handles shared by every request.
#[derive(Clone)]
pub struct Platform {
    pub registry: Arc<PropertyRegistry>,
    pub lifecycle: Arc<AnalysisLifecycle>,
    pub hazards: Arc<HazardService>,
    pub valuations: Arc<ValuationService>,
    pub accounts: Arc<UserDirectory>,
    pub dashboard: Arc<Dashboard>,
}

impl Platform {
    pub fn new(
        config: &AppConfig,
        repositories: Repositories,
        dispatcher: Arc<dyn AnalysisDispatcher>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let dependents = DependentRecords {
            analyses: repositories.analyses.clone(),
            hazards: repositories.hazards.clone(),
            valuations: repositories.valuations.clone(),
        };
        let registry = Arc::new(
            PropertyRegistry::new(repositories.properties).with_references(Arc::new(dependents)),
        );
        let lifecycle = Arc::new(AnalysisLifecycle::new(
            repositories.analyses,
            registry.clone(),
            dispatcher,
            &config.analysis,
        ));
        let hazards = Arc::new(HazardService::new(
            repositories.hazards,
            registry.clone(),
            lifecycle.clone(),
            config.analysis.hazard_weights.clone(),
            config.analysis.risk_thresholds,
        ));
        let valuations = Arc::new(ValuationService::new(
            repositories.valuations,
            registry.clone(),
            lifecycle.clone(),
        ));
        let accounts = Arc::new(UserDirectory::new(repositories.users, hasher));
        let dashboard = Arc::new(Dashboard::new(
            registry.clone(),
            lifecycle.clone(),
            hazards.clone(),
        ));

        Self {
            registry,
            lifecycle,
            hazards,
            valuations,
            accounts,
            dashboard,
        }
    }

    /// In-memory stores and bcrypt at the configured cost.
    pub fn in_memory(config: &AppConfig, dispatcher: Arc<dyn AnalysisDispatcher>) -> Self {
        Self::new(
            config,
            Repositories::in_memory(),
            dispatcher,
            Arc::new(BcryptHasher::new(config.security.bcrypt_cost)),
        )
    }

    pub fn router(&self) -> Router {
        property_router(self.registry.clone())
            .merge(analysis_router(self.lifecycle.clone()))
            .merge(hazard_router(self.hazards.clone()))
            .merge(valuation_router(self.valuations.clone()))
            .merge(account_router(self.accounts.clone()))
            .merge(dashboard_router(self.dashboard.clone()))
    }
}
