use tower::ServiceBuilder;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    DefaultMakeSpan,
    DefaultOnRequest,
    DefaultOnResponse,
>;

/// Request spans for every route. There is no timeout layer, so a probe runs
/// until its connection attempt resolves.
pub fn create_middleware_stack(
) -> ServiceBuilder<tower::layer::util::Stack<HttpTraceLayer, tower::layer::util::Identity>> {
    ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Filter used when `RUST_LOG` is unset: probe outcomes and one span per request.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global JSON subscriber. `docker logs` shows one JSON object
/// per line, with the request span list attached to probe outcome events.
/// Fails if a subscriber is already installed.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(true)
                .with_target(true),
        )
        .try_init()?;

    tracing::debug!(default_filter = DEFAULT_LOG_FILTER, "JSON logging ready");
    Ok(())
}
