use crate::config::Config;
use common::TelemetryGuard;

pub const SERVICE_NAME: &str = "detector-gateway";

/// OTLP export plus logging when an endpoint is configured, logging alone otherwise.
///
/// Keep the returned guard alive for the lifetime of the process.
pub fn setup_observability(config: &Config) -> anyhow::Result<Option<TelemetryGuard>> {
    match &config.otel_endpoint {
        Some(endpoint) => {
            let guard = TelemetryGuard::init(
                SERVICE_NAME,
                endpoint,
                config.log_level,
                config.environment,
            )?;
            tracing::info!(endpoint = %endpoint, "OpenTelemetry export enabled");
            Ok(Some(guard))
        }
        None => {
            common::setup_logging(config.log_level, config.environment);
            Ok(None)
        }
    }
}
