//! Aggregate counts for the dashboard landing page.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::domain::DomainError;
use crate::error::AppError;
use crate::hazards::{HazardService, RiskCategory};
use crate::lifecycle::{AnalysisLifecycle, AnalysisStatus};
use crate::registry::PropertyRegistry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_properties: usize,
    pub analyzed_properties: usize,
    pub analyses_by_status: BTreeMap<&'static str, usize>,
    pub risk_categories: BTreeMap<&'static str, usize>,
    pub average_composite_risk_score: Option<f64>,
}

pub struct Dashboard {
    registry: Arc<PropertyRegistry>,
    lifecycle: Arc<AnalysisLifecycle>,
    hazards: Arc<HazardService>,
}

impl Dashboard {
    pub fn new(
        registry: Arc<PropertyRegistry>,
        lifecycle: Arc<AnalysisLifecycle>,
        hazards: Arc<HazardService>,
    ) -> Self {
        Self {
            registry,
            lifecycle,
            hazards,
        }
    }

    pub fn stats(&self) -> Result<DashboardStats, DomainError> {
        let counts = self.registry.counts()?;

        let mut analyses_by_status: BTreeMap<&'static str, usize> = AnalysisStatus::ALL
            .into_iter()
            .map(|status| (status.label(), 0))
            .collect();
        for analysis in self.lifecycle.all()? {
            *analyses_by_status.entry(analysis.status.label()).or_default() += 1;
        }

        let mut risk_categories: BTreeMap<&'static str, usize> = RiskCategory::ALL
            .into_iter()
            .map(|category| (category.label(), 0))
            .collect();
        let assessments = self.hazards.all()?;
        let mut total_score = 0.0;
        for assessment in &assessments {
            *risk_categories
                .entry(assessment.risk_category.label())
                .or_default() += 1;
            total_score += assessment.composite_risk_score;
        }
        let average_composite_risk_score =
            (!assessments.is_empty()).then(|| total_score / assessments.len() as f64);

        Ok(DashboardStats {
            total_properties: counts.total,
            analyzed_properties: counts.analyzed,
            analyses_by_status,
            risk_categories,
            average_composite_risk_score,
        })
    }
}

pub fn dashboard_router(dashboard: Arc<Dashboard>) -> Router {
    Router::new()
        .route("/api/v1/dashboard/stats", get(stats_handler))
        .with_state(dashboard)
}

pub(crate) async fn stats_handler(
    State(dashboard): State<Arc<Dashboard>>,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(dashboard.stats()?))
}
