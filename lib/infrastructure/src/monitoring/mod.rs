pub mod meter;

use std::error::Error;
use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{ExporterBuildError, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitoringConfig {
    pub service_name: String,
    pub app_name: String,
    pub logs: EnvFilterConfig,
    pub traces: EnvFilterConfig,
    pub otlp: Option<OtlpConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EnvFilterConfig {
    pub default_level: String,
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Without an url, telemetry is written to stdout.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OtlpConfig {
    pub url: Option<String>,
}

impl EnvFilterConfig {
    // Every layer needs its own filter instance, a shared one drops events.
    fn env_filter(&self) -> Result<EnvFilter, ParseError> {
        EnvFilter::builder()
            .with_default_directive(self.default_level.parse()?)
            .parse(self.filters.join(","))
    }
}

impl MonitoringConfig {
    pub fn init(&self) -> Result<(), Box<dyn Error>> {
        let Some(otlp) = &self.otlp else {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer())
                .with(self.logs.env_filter()?)
                .init();
            return Ok(());
        };

        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::default());

        let target = ExportTarget::from(otlp);
        let resource = Resource::builder()
            .with_attribute(KeyValue::new("service.name", self.service_name.clone()))
            .with_attribute(KeyValue::new("app.name", self.app_name.clone()))
            .build();

        let tracer = target.tracer_provider(resource.clone())?.tracer(self.app_name.clone());
        let logger_provider = target.logger_provider(resource.clone())?;
        opentelemetry::global::set_meter_provider(target.meter_provider(resource)?);

        tracing_subscriber::registry()
            .with(OpenTelemetryLayer::new(tracer).with_filter(self.traces.env_filter()?))
            .with(OpenTelemetryTracingBridge::new(&logger_provider).with_filter(self.logs.env_filter()?))
            .with(tracing_subscriber::fmt::layer().with_filter(self.logs.env_filter()?))
            .init();

        Ok(())
    }
}

enum ExportTarget {
    Collector(String),
    Stdout,
}

impl From<&OtlpConfig> for ExportTarget {
    fn from(config: &OtlpConfig) -> Self {
        match &config.url {
            Some(url) => ExportTarget::Collector(url.clone()),
            None => ExportTarget::Stdout,
        }
    }
}

impl ExportTarget {
    fn tracer_provider(&self, resource: Resource) -> Result<SdkTracerProvider, ExporterBuildError> {
        let builder = SdkTracerProvider::builder().with_resource(resource);

        Ok(match self {
            ExportTarget::Collector(url) => builder
                .with_batch_exporter(
                    opentelemetry_otlp::SpanExporter::builder()
                        .with_tonic()
                        .with_endpoint(url)
                        .build()?,
                )
                .build(),
            ExportTarget::Stdout => builder
                .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
                .build(),
        })
    }

    fn logger_provider(&self, resource: Resource) -> Result<SdkLoggerProvider, ExporterBuildError> {
        let builder = SdkLoggerProvider::builder().with_resource(resource);

        Ok(match self {
            ExportTarget::Collector(url) => builder
                .with_batch_exporter(
                    opentelemetry_otlp::LogExporter::builder()
                        .with_tonic()
                        .with_endpoint(url)
                        .build()?,
                )
                .build(),
            ExportTarget::Stdout => builder
                .with_simple_exporter(opentelemetry_stdout::LogExporter::default())
                .build(),
        })
    }

    fn meter_provider(&self, resource: Resource) -> Result<SdkMeterProvider, ExporterBuildError> {
        let builder = SdkMeterProvider::builder().with_resource(resource);

        Ok(match self {
            ExportTarget::Collector(url) => builder
                .with_reader(
                    PeriodicReader::builder(
                        opentelemetry_otlp::MetricExporter::builder()
                            .with_tonic()
                            .with_endpoint(url)
                            .build()?,
                    )
                    .with_interval(Duration::from_secs(15))
                    .build(),
                )
                .build(),
            ExportTarget::Stdout => builder
                .with_reader(
                    PeriodicReader::builder(opentelemetry_stdout::MetricExporter::default())
                        .with_interval(Duration::from_secs(60))
                        .build(),
                )
                .build(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_from_level_and_directives() {
        let config = EnvFilterConfig {
            default_level: "info".to_owned(),
            filters: vec!["savant_scenes=debug".to_owned(), "actix_web=warn".to_owned()],
        };

        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn env_filter_rejects_invalid_level() {
        let config = EnvFilterConfig {
            default_level: "info=verbose".to_owned(),
            filters: vec![],
        };

        assert!(config.env_filter().is_err());
    }

    #[test]
    fn otlp_without_url_exports_to_stdout() {
        let target = ExportTarget::from(&OtlpConfig { url: None });

        assert!(matches!(target, ExportTarget::Stdout));
    }
}
