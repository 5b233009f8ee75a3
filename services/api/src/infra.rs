use metrics_exporter_prometheus::PrometheusHandle;
use property_intel::config::ServiceInfo;
use property_intel::hazards::HazardKind;
use property_intel::ValidationError;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) service: ServiceInfo,
}

/// Parses a `hazard=value` command-line pair.
pub(crate) fn parse_hazard_value(raw: &str) -> Result<(HazardKind, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected hazard=value, got '{raw}'"))?;
    let kind: HazardKind = name
        .parse()
        .map_err(|err: ValidationError| err.to_string())?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("'{value}' is not a number ({err})"))?;
    Ok((kind, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hazard_pairs() {
        assert_eq!(
            parse_hazard_value("coastal-erosion=12.5"),
            Ok((HazardKind::CoastalErosion, 12.5))
        );
        assert!(parse_hazard_value("flood").is_err());
        assert!(parse_hazard_value("flood=high").is_err());
        assert!(parse_hazard_value("lava=3").is_err());
    }
}
