//! Tracing subscriber initialization for the Quill binaries.
//!
//! Always installs a structured `fmt` layer; when the `QUILL_OTEL`
//! environment variable is truthy, additionally bridges spans to
//! OpenTelemetry through a stdout exporter (swap for OTLP in production).
//! Log verbosity comes from `RUST_LOG`, defaulting to `info`.

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable that turns on OpenTelemetry export.
pub const OTEL_ENV_VAR: &str = "QUILL_OTEL";

/// Kept so buffered spans can be flushed at exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Whether [`OTEL_ENV_VAR`] asks for OpenTelemetry export.
pub fn otel_enabled_from_env() -> bool {
    parse_otel_flag(std::env::var(OTEL_ENV_VAR).ok().as_deref())
}

/// Truthy values are `1` and `true` (any case); everything else, including
/// an unset variable, is off.
fn parse_otel_flag(value: Option<&str>) -> bool {
    match value {
        Some(v) => {
            let v = v.trim();
            v == "1" || v.eq_ignore_ascii_case("true")
        }
        None => false,
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(enable_otel: bool) -> Result<(), Box<dyn std::error::Error>> {
    let otel_layer = if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("quill");

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending traces and shut down the tracer provider. No-op when
/// OTel export was never enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otel_flag_truthy_values() {
        assert!(parse_otel_flag(Some("1")));
        assert!(parse_otel_flag(Some("true")));
        assert!(parse_otel_flag(Some("TRUE")));
        assert!(parse_otel_flag(Some(" true ")));
    }

    #[test]
    fn test_otel_flag_off_by_default() {
        assert!(!parse_otel_flag(None));
        assert!(!parse_otel_flag(Some("")));
        assert!(!parse_otel_flag(Some("0")));
        assert!(!parse_otel_flag(Some("false")));
        assert!(!parse_otel_flag(Some("yes")));
    }
}
