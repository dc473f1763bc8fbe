use std::{collections::HashMap, net::SocketAddr, time::Duration};

use clap::Parser;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use opentelemetry::KeyValue;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{Resource, logs::SdkLoggerProvider};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const AXIOM_LOGS_API: &str = "https://api.axiom.co/v1/logs";
const AXIOM_EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Logging and metrics options.
#[derive(Debug, Clone, Parser)]
pub struct TelemetryOpts {
    /// The log filter, in `RUST_LOG` syntax.
    #[clap(long = "log.filter", env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
    /// Whether to use ANSI colors in the logs. Disable when the logs are collected by another
    /// service.
    #[clap(long = "telemetry.use-ansi", env = "SYNCER_TELEMETRY_USE_ANSI", default_value_t = true)]
    pub use_ansi: bool,
    /// Axiom API token. The logs are also exported to Axiom when the dataset is set too.
    #[clap(long = "telemetry.axiom-token", env = "AXIOM_TOKEN")]
    pub axiom_token: Option<String>,
    /// The Axiom dataset receiving the logs.
    #[clap(long = "telemetry.axiom-dataset", env = "AXIOM_DATASET")]
    pub axiom_dataset: Option<String>,
    /// The port serving the Prometheus metrics.
    #[clap(long = "metrics.port", env = "SYNCER_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,
    /// Disable the Prometheus metrics exporter.
    #[clap(long = "metrics.disable", env = "SYNCER_DISABLE_METRICS", default_value_t = false)]
    pub disable_metrics: bool,
}

/// Holds the Axiom log exporter, if any, so that pending logs can be flushed on shutdown.
#[derive(Debug, Default)]
pub struct LogProvider(Option<SdkLoggerProvider>);

impl LogProvider {
    /// Flush the pending logs and stop the exporter.
    pub fn shutdown(&self) {
        if let Some(provider) = &self.0 {
            if let Err(err) = provider.shutdown() {
                warn!(%err, "Failed to flush the exported logs");
            }
        }
    }
}

impl TelemetryOpts {
    /// Install the global log subscriber, then the Prometheus exporter unless disabled.
    pub fn setup(&self, instance_name: &str) -> Result<LogProvider, BuildError> {
        let (filter, filter_err) = match EnvFilter::try_new(&self.log_filter) {
            Ok(filter) => (filter, None),
            Err(err) => (EnvFilter::new("info"), Some(err)),
        };

        let axiom = self.axiom_provider(instance_name).transpose();
        let bridge =
            axiom.as_ref().ok().and_then(Option::as_ref).map(OpenTelemetryTracingBridge::new);

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_ansi(self.use_ansi))
            .with(bridge)
            .init();

        if let Some(err) = filter_err {
            warn!(%err, filter = %self.log_filter, "Invalid log filter, logging at info level");
        }

        let provider = match axiom {
            Ok(Some(provider)) => {
                info!("Exporting logs to Axiom");
                Some(provider)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(%err, "Failed to build the Axiom log exporter, logging to stdout only");
                None
            }
        };

        if self.disable_metrics {
            warn!("Metrics are disabled");
        } else {
            let address = SocketAddr::from(([0, 0, 0, 0], self.metrics_port));

            PrometheusBuilder::new()
                .with_http_listener(address)
                .add_global_label("instance", instance_name)
                .install()?;

            info!(%address, "Serving Prometheus metrics");
        }

        Ok(LogProvider(provider))
    }

    /// Build the Axiom log provider. `None` unless both the token and the dataset are set.
    fn axiom_provider(&self, instance_name: &str) -> Option<Result<SdkLoggerProvider, String>> {
        let token = self.axiom_token.as_ref()?;
        let dataset = self.axiom_dataset.as_ref()?;

        let headers = HashMap::from([
            ("Authorization".to_owned(), format!("Bearer {token}")),
            ("X-Axiom-Dataset".to_owned(), dataset.clone()),
        ]);

        let exporter = LogExporter::builder()
            .with_http()
            .with_headers(headers)
            .with_endpoint(AXIOM_LOGS_API)
            .with_timeout(AXIOM_EXPORT_TIMEOUT)
            .build()
            .map_err(|err| err.to_string());

        Some(exporter.map(|exporter| {
            let resource = Resource::builder()
                .with_attribute(KeyValue::new("service.name", instance_name.to_owned()))
                .build();

            SdkLoggerProvider::builder().with_batch_exporter(exporter).with_resource(resource).build()
        }))
    }
}
