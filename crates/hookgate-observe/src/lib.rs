//! Observability setup for hookgate: structured logging with optional
//! OpenTelemetry span export.

pub mod tracing_setup;
