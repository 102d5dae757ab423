//! Observability setup for the funnel engine: the process-wide `tracing`
//! subscriber and optional OpenTelemetry export.

pub mod tracing_setup;
