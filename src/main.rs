use anyhow::Result;
use saa_manifold::application::InMemoryEventBus;
use saa_manifold::config::Settings;
use saa_manifold::detection::AnomalyDetector;
use saa_manifold::domain::GeographicRegion;
use saa_manifold::geomagnetic::DipoleTransformer;
use saa_manifold::infrastructure::SyntheticFluxSource;
use saa_manifold::manifold::ManifoldBuilder;
use saa_manifold::ports::CoordinateTransformPort;
use saa_manifold::{AnalysisOrchestrator, AnalysisRequest};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match settings.logging.format.as_str() {
        "compact" => builder.compact().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    let settings = Settings::new()?;
    init_tracing(&settings);

    info!("Starting SAA manifold analysis");

    let transformer = Arc::new(match &settings.geomagnetic.coefficients_path {
        Some(path) => DipoleTransformer::from_file(path),
        None => DipoleTransformer::new(),
    });
    let orchestrator = AnalysisOrchestrator::new(
        Arc::new(SyntheticFluxSource::new(settings.retrieval)),
        transformer.clone(),
        Arc::new(InMemoryEventBus::new()),
        AnomalyDetector::new(settings.detection),
        ManifoldBuilder::new(settings.manifold.parameters()),
    )
    .with_min_valid_fraction(settings.analysis.min_valid_fraction);

    let region = GeographicRegion::new(-90.0, 0.0, -50.0, 0.0, 200.0, 1000.0)?;
    let request = AnalysisRequest::new(region).with_sample_resolution(settings.analysis.sample_resolution);
    let result = orchestrator.analyze(request).await?;

    info!(
        analysis_id = %result.analysis_id,
        anomalies = result.anomaly_count(),
        total_flux = result.total_flux(),
        processing_seconds = result.processing_time.as_secs_f64(),
        "Analysis finished"
    );

    if let Some(primary) = result.primary_anomaly() {
        info!(
            anomaly_id = %primary.id(),
            center = %primary.center(),
            intensity = primary.intensity_peak().value(),
            "Primary anomaly"
        );
        match transformer.geographic_to_geomagnetic(primary.center(), None).await {
            Ok(geomagnetic) => info!(
                magnetic_latitude = geomagnetic.magnetic_latitude(),
                l_shell = geomagnetic.l_shell(),
                "Primary anomaly geomagnetic position"
            ),
            Err(e) => warn!(error = %e, "Geomagnetic position unavailable"),
        }
    }

    if let Some(manifold) = &result.manifold {
        info!(
            vertices = manifold.metadata.vertex_count,
            faces = manifold.metadata.face_count,
            method = %manifold.metadata.generation_parameters.interpolation_method,
            "Manifold generated"
        );
    }

    Ok(())
}
