use metrics_exporter_prometheus::PrometheusBuilder;
use pagecraft::application::context::{AppContext, WorkerContext};
use pagecraft::application::handlers::HandlerRegistry;
use pagecraft::application::usecases::issue_api_key::IssueApiKeyUseCase;
use pagecraft::application::usecases::worker_loop::WorkerLoopUseCase;
use pagecraft::config::{self, ProducerMode, Settings};
use pagecraft::domain::value_objects::ids::UserId;
use pagecraft::infrastructure::db::postgres::PostgresDatabase;
use pagecraft::infrastructure::db::repositories::Repositories;
use pagecraft::infrastructure::producers::{
    HttpContentProducer, HttpProducerConfig, ScriptedProducer,
};
use pagecraft::interface::http;
use pagecraft::interface::http::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Step 1: Structured JSON logs, filtered by RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .json()
        .with_target(false)
        .init();

    // Step 2: Load configuration.
    let settings = config::load().expect("load config");

    // Step 3: Build the user-facing and worker repositories.
    let (repos, worker_repos) = build_repositories(&settings).await;

    // Step 4: Install the metrics recorder.
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| tracing::warn!(error = %e, "metrics_recorder_unavailable"))
        .ok();

    // Step 5: Wire content producers into the handler registry.
    let handlers = build_handlers(&settings);

    // Step 6: Assemble shared contexts.
    let ctx = Arc::new(AppContext::new(repos, settings.workers.retry_policy()));
    let worker = Arc::new(WorkerContext::new(
        worker_repos,
        Arc::new(handlers),
        settings.workers.worker_config(),
    ));

    // Step 7: A throwaway store has no other way to mint credentials.
    if settings.db.is_memory() {
        let issued = IssueApiKeyUseCase::execute(&ctx, UserId::new())
            .await
            .expect("issue dev api key");
        tracing::info!(
            user_id = %issued.user_id,
            api_key = %issued.api_key,
            "dev_api_key_issued"
        );
    }

    // Step 8: Start the embedded worker loop when enabled.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let worker_task = settings.workers.embedded.then(|| {
        let worker = worker.clone();
        let tick_interval = settings.workers.tick_interval();
        tokio::spawn(async move {
            WorkerLoopUseCase::run(&worker, tick_interval, shutdown_rx).await;
        })
    });

    // Step 9: Build the HTTP app.
    let state = AppState {
        ctx,
        worker,
        settings: settings.clone(),
        metrics,
    };
    let app = http::app(state);
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);

    // Step 10: Bind and serve until ctrl-c.
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("bind server");
    tracing::info!(bind_addr = %bind_addr, "server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("serve");

    // Step 11: Let the worker finish its current tick.
    let _ = shutdown_tx.send(true);
    if let Some(task) = worker_task {
        let _ = task.await;
    }
}

async fn build_repositories(settings: &Settings) -> (Repositories, Repositories) {
    if settings.db.is_memory() {
        let repos = Repositories::in_memory();
        return (repos.clone(), repos);
    }

    let db = Arc::new(
        PostgresDatabase::connect(&settings.db.url)
            .await
            .expect("connect database"),
    );
    let worker_db = if settings.db.worker_url() == settings.db.url {
        db.clone()
    } else {
        Arc::new(
            PostgresDatabase::connect_with(settings.db.worker_url(), 2)
                .await
                .expect("connect worker database"),
        )
    };
    (
        Repositories::postgres(db),
        Repositories::postgres(worker_db),
    )
}

fn build_handlers(settings: &Settings) -> HandlerRegistry {
    match settings.producers.mode {
        ProducerMode::Http => {
            let producer = Arc::new(
                HttpContentProducer::new(HttpProducerConfig {
                    story_url: settings.producers.story_url.clone(),
                    speech_url: settings.producers.speech_url.clone(),
                    image_url: settings.producers.image_url.clone(),
                    api_key: settings.producers.api_key.clone(),
                    timeout: Duration::from_millis(settings.producers.timeout_ms),
                })
                .expect("build http producer"),
            );
            HandlerRegistry::with_producers(producer.clone(), producer.clone(), producer)
        }
        ProducerMode::Scripted => {
            let producer = Arc::new(ScriptedProducer::new());
            HandlerRegistry::with_producers(producer.clone(), producer.clone(), producer)
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown_signal_received");
}
