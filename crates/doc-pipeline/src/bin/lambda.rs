//! Function entry point: one invocation per object-created notification batch
//!
//! Run locally with: cargo lambda watch -p doc-pipeline --bin doc-pipeline-lambda

use doc_pipeline::{DocumentDispatcher, NotificationBatch, PipelineConfig};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_pipeline=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .without_time(),
        )
        .init();

    let config = PipelineConfig::load(None)?;
    tracing::info!(
        backend = ?config.backend,
        model = %config.inference.model_id,
        max_tokens = config.inference.max_tokens,
        "Configuration loaded"
    );

    // Clients are created once per execution environment and reused across invocations
    let dispatcher = DocumentDispatcher::from_config(&config).await?;

    run(service_fn(|event: LambdaEvent<NotificationBatch>| {
        let dispatcher = &dispatcher;
        async move {
            let request_id = event.context.request_id.clone();
            let outcome = dispatcher.handle(&event.payload).await?;
            tracing::info!(
                %request_id,
                batch_id = %outcome.batch_id,
                written = outcome.written.len(),
                "Invocation complete"
            );
            Ok::<(), Error>(())
        }
    }))
    .await
}
