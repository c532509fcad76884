//! Logging and optional OTLP trace export.
//!
//! Spans are exported only when `OTEL_EXPORTER_OTLP_ENDPOINT` is set; otherwise
//! logs go to stdout through the fmt layer alone.

use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, propagation::TextMapCompositePropagator, trace::TracerProvider as _};
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
};
use std::{env::var, time::Duration};
use tonic::{
    metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

const DEFAULT_ENDPOINT: &str = "http://localhost:4317";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Exporter settings taken from the standard `OTEL_*` variables.
#[derive(Debug, PartialEq, Eq)]
struct ExporterSettings {
    endpoint: String,
    headers: Vec<(String, String)>,
    instance_id: String,
}

impl ExporterSettings {
    fn from_env() -> Self {
        Self::from_lookup(|name| var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(protocol) = lookup("OTEL_EXPORTER_OTLP_PROTOCOL") {
            if protocol != "grpc" {
                debug!("OTEL_EXPORTER_OTLP_PROTOCOL='{protocol}' ignored, exporting over gRPC");
            }
        }

        let endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
            .map_or_else(|| DEFAULT_ENDPOINT.to_string(), normalize_endpoint);
        let headers = lookup("OTEL_EXPORTER_OTLP_HEADERS")
            .map(|raw| parse_headers(&raw))
            .unwrap_or_default();
        let instance_id =
            lookup("OTEL_SERVICE_INSTANCE_ID").unwrap_or_else(|| Ulid::new().to_string());

        Self {
            endpoint,
            headers,
            instance_id,
        }
    }

    /// TLS is used for `https` endpoints only; the host doubles as SNI name.
    fn tls_domain(&self) -> Option<&str> {
        self.endpoint
            .strip_prefix("https://")
            .and_then(|rest| rest.split(['/', ':']).next())
            .filter(|host| !host.is_empty())
    }

    fn metadata(&self) -> Result<MetadataMap> {
        let mut metadata = MetadataMap::with_capacity(self.headers.len());
        for (key, value) in &self.headers {
            let name = MetadataKey::<Ascii>::from_bytes(key.to_ascii_lowercase().as_bytes())
                .map_err(|err| anyhow!("invalid OTLP header name {key}: {err}"))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .map_err(|err| anyhow!("invalid OTLP header value for {key}: {err}"))?;
            metadata.insert(name, value);
        }
        Ok(metadata)
    }
}

/// `k1=v1,k2=v2`, malformed pairs skipped.
fn parse_headers(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn normalize_endpoint(endpoint: String) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

fn init_tracer(settings: &ExporterSettings) -> Result<Tracer> {
    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.endpoint)
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT);

    if let Some(domain) = settings.tls_domain() {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain.to_string())
                .with_native_roots(),
        );
    }

    if !settings.headers.is_empty() {
        builder = builder.with_metadata(settings.metadata()?);
    }

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(builder.build()?)
        .with_resource(
            Resource::builder_empty()
                .with_attributes(vec![
                    KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    KeyValue::new("service.instance.id", settings.instance_id.clone()),
                ])
                .build(),
        )
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Initialize logging and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, the
/// OTLP/gRPC span exporter.
///
/// # Errors
///
/// Returns an error if tracer or subscriber initialization fails
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // RUST_LOG overrides the verbosity flag.
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    if var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = init_tracer(&ExporterSettings::from_env())?;
        let subscriber = Registry::default()
            .with(fmt_layer)
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        tracing::subscriber::set_global_default(Registry::default().with(fmt_layer).with(filter))?;
    }

    Ok(())
}

/// Flush and shut down the tracer provider; no-op when tracing is off.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        if let Err(err) = provider.shutdown() {
            eprintln!("tracer provider shutdown failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> ExporterSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        ExporterSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn parse_headers_skips_malformed_pairs() {
        assert!(parse_headers("").is_empty());

        let headers = parse_headers("key1 = value1 ,malformed, =orphan, key2=a=b");
        assert_eq!(
            headers,
            vec![
                ("key1".to_string(), "value1".to_string()),
                ("key2".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn defaults_without_environment() {
        let settings = settings(&[]);
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert!(settings.headers.is_empty());
        assert!(Ulid::from_string(&settings.instance_id).is_ok());
        assert_eq!(settings.tls_domain(), None);
    }

    #[test]
    fn bare_endpoint_gets_https_and_tls_domain() {
        let settings = settings(&[
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "collector.example.com:4317/"),
            ("OTEL_SERVICE_INSTANCE_ID", "pod-1"),
        ]);
        assert_eq!(settings.endpoint, "https://collector.example.com:4317");
        assert_eq!(settings.tls_domain(), Some("collector.example.com"));
        assert_eq!(settings.instance_id, "pod-1");
    }

    #[test]
    fn headers_become_lowercase_metadata() -> Result<()> {
        let settings = settings(&[(
            "OTEL_EXPORTER_OTLP_HEADERS",
            "Authorization=Bearer token123,x-tenant=shop",
        )]);

        let metadata = settings.metadata()?;
        assert_eq!(metadata.len(), 2);
        assert_eq!(
            metadata.get("authorization").and_then(|v| v.to_str().ok()),
            Some("Bearer token123")
        );
        Ok(())
    }

    #[test]
    fn invalid_header_value_is_rejected() {
        let settings = settings(&[("OTEL_EXPORTER_OTLP_HEADERS", "x-tenant=bad\u{7f}value")]);
        let err = settings.metadata().err().map(|e| e.to_string());
        assert!(err.is_some_and(|e| e.contains("invalid OTLP header value for x-tenant")));
    }

    #[test]
    fn shutdown_without_provider_is_noop() {
        shutdown_tracer();
    }
}
