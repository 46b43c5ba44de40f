use serde::{Deserialize, Serialize};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TracingConfig {
    /// Emit one JSON object per event instead of compact text.
    #[serde(default)]
    pub structured_logging: bool,
}

pub fn get_env_filter() -> tracing_subscriber::EnvFilter {
    // RUST_LOG used to control logging level.
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::default()
            .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
    })
}

pub fn get_log_layer<S>(config: &TracingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    S: tracing::Subscriber,
{
    if config.structured_logging {
        return Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_span_list(false)
                .flatten_event(true),
        );
    }

    Box::new(tracing_subscriber::fmt::layer().compact())
}

/// Registry with the env filter and the configured log layer.
pub fn build_subscriber(config: &TracingConfig) -> impl tracing::Subscriber + Send + Sync {
    let env_filter_layer = get_env_filter();
    let log_layer = get_log_layer(config);
    tracing_subscriber::Registry::default().with(log_layer.with_filter(env_filter_layer))
}

/// Installs the global subscriber. Embedding binaries that install their own
/// subscriber should not call this.
pub fn setup_tracing(config: &TracingConfig) {
    if let Err(e) = tracing::subscriber::set_global_default(build_subscriber(config)) {
        error!("logger was already initiated, continuing: {:?}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_for_both_formats() {
        for structured_logging in [true, false] {
            let subscriber = build_subscriber(&TracingConfig { structured_logging });
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(structured_logging, "logging initialized");
            });
        }
    }
}
