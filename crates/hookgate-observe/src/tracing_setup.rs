//! Global tracing subscriber for the `hookgate` binary.
//!
//! Logs go to stderr through a `fmt` layer that also reports span
//! durations. With OpenTelemetry enabled, the same spans are exported by a
//! stdout span exporter, which is enough to inspect webhook and workflow
//! spans locally without a collector.

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Tracer name reported on exported spans.
pub const TRACER_NAME: &str = "hookgate";

static PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

pub type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Filter directive for a CLI verbosity level. `--quiet` only applies
/// without `-v`.
pub fn filter_for_verbosity(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn,hookgate=info",
        1 => "info,hookgate=debug,hookgate_core=debug,hookgate_infra=debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces `default_filter`. Fails if the directive
/// does not parse or a global subscriber is already installed.
pub fn init_tracing(default_filter: &str, enable_otel: bool) -> Result<(), InitError> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(directive)?,
        _ => EnvFilter::try_new(default_filter)?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    let otel_layer = enable_otel.then(|| {
        let provider = PROVIDER.get_or_init(|| {
            SdkTracerProvider::builder()
                .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
                .build()
        });
        opentelemetry::global::set_tracer_provider(provider.clone());
        tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush and stop the span exporter. No-op when OpenTelemetry was never enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("warning: tracer provider shutdown failed: {e}");
        }
    }
}
