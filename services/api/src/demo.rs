use crate::infra::parse_hazard_value;
use clap::Args;
use property_intel::config::AppConfig;
use property_intel::error::AppError;
use property_intel::hazards::{HazardKind, HazardScores, HazardSubmission, HazardWeights};
use property_intel::lifecycle::{AnalysisResults, AnalysisType, QueuedDispatcher};
use property_intel::registry::{PropertyCsvImporter, PropertyDraft};
use property_intel::valuation::ValuationSubmission;
use property_intel::Platform;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Hazard score as hazard=value (0-100). Repeat for each hazard.
    #[arg(long = "score", value_parser = parse_hazard_value)]
    pub(crate) scores: Vec<(HazardKind, f64)>,
    /// Custom weight as hazard=value. When given, the weights must sum to 1.
    #[arg(long = "weight", value_parser = parse_hazard_value)]
    pub(crate) weights: Vec<(HazardKind, f64)>,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Property CSV export with address, city, state, zip_code, latitude and longitude columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Latitude of the demo property.
    #[arg(long, default_value_t = 41.5868)]
    pub(crate) latitude: f64,
    /// Longitude of the demo property.
    #[arg(long, default_value_t = -93.625)]
    pub(crate) longitude: f64,
}

fn scratch_platform() -> Result<(Platform, QueuedDispatcher), AppError> {
    let config = AppConfig::load()?;
    let dispatcher = QueuedDispatcher::default();
    let platform = Platform::in_memory(&config, Arc::new(dispatcher.clone()));
    Ok((platform, dispatcher))
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let (platform, _) = scratch_platform()?;
    let scores: BTreeMap<HazardKind, f64> = args.scores.into_iter().collect();
    let weights = if args.weights.is_empty() {
        None
    } else {
        Some(HazardWeights::new(args.weights.into_iter().collect())?)
    };

    let score = platform.hazards.score(&scores, weights.as_ref())?;
    println!("Hazard scoring");
    for (kind, value) in &scores {
        println!("- {kind}: {value:.1}");
    }
    println!(
        "Composite risk score {:.2} ({})",
        score.composite_risk_score, score.risk_category
    );
    Ok(())
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let (platform, _) = scratch_platform()?;
    let report = PropertyCsvImporter::from_path(&platform.registry, &args.csv)?;

    println!(
        "Imported {} properties from {} ({} rejected)",
        report.created.len(),
        args.csv.display(),
        report.rejected.len()
    );
    for rejected in &report.rejected {
        println!("- line {}: {}", rejected.line, rejected.reason);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let (platform, dispatcher) = scratch_platform()?;

    println!("Property intelligence demo");
    let property = platform.registry.create(PropertyDraft {
        address: "400 Locust St".to_string(),
        city: "Des Moines".to_string(),
        state: "IA".to_string(),
        zip_code: "50309".to_string(),
        latitude: Some(args.latitude),
        longitude: Some(args.longitude),
        satellite_image_url: Some("s3://imagery/sat/400-locust.png".to_string()),
        ..PropertyDraft::default()
    })?;
    println!(
        "- registered {} ({}, {}) as {}",
        property.address, property.city, property.state, property.id
    );

    let analysis = platform.lifecycle.start(&property.id, AnalysisType::Full)?;
    for job in dispatcher.drain() {
        println!(
            "- dispatched {} analysis {} with {} image(s), deadline {}",
            job.analysis_type.label(),
            job.analysis_id,
            job.imagery.len(),
            job.deadline.to_rfc3339()
        );
    }

    for progress in [0.25, 0.5, 0.75] {
        let update = platform.lifecycle.advance(&analysis.id, progress)?;
        println!("  {} at {:.0}%", update.status, update.progress * 100.0);
    }
    let completed = platform.lifecycle.complete(
        &analysis.id,
        AnalysisResults {
            overall_risk_score: Some(42.0),
            confidence_score: Some(0.86),
            processing_time: Some(184.0),
            ..AnalysisResults::default()
        },
    )?;
    println!("- analysis {} {}", completed.id, completed.status);

    let mut hazards = HazardSubmission::new(
        property.id,
        HazardScores {
            flood: 62.0,
            fire: 18.0,
            earthquake: 6.0,
            wind: 44.0,
            hail: 51.0,
            tornado: 57.0,
            crime: 33.0,
            traffic: 29.0,
            ..HazardScores::default()
        },
    );
    hazards.analysis_id = Some(completed.id);
    let assessment = platform.hazards.record(hazards)?;
    println!(
        "- composite risk {:.1} ({})",
        assessment.composite_risk_score, assessment.risk_category
    );

    let mut valuation = ValuationSubmission::new(property.id, 315_000.0);
    valuation.analysis_id = Some(completed.id);
    valuation.confidence_interval_low = Some(290_000.0);
    valuation.confidence_interval_high = Some(340_000.0);
    valuation.replacement_cost = Some(260_000.0);
    valuation.depreciation_amount = Some(35_000.0);
    let valuation = platform.valuations.record(valuation)?;
    println!(
        "- estimated value ${:.0}, actual cash value ${:.0}",
        valuation.estimated_value,
        valuation.actual_cash_value.unwrap_or_default()
    );

    let stats = platform.dashboard.stats()?;
    println!(
        "Dashboard: {} properties, {} analyzed",
        stats.total_properties, stats.analyzed_properties
    );
    for (category, count) in &stats.risk_categories {
        println!("  {category}: {count}");
    }
    Ok(())
}
