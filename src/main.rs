use apcd_empanel::config::AppConfig;
use apcd_empanel::error::AppError;
use apcd_empanel::telemetry;
use apcd_empanel::workflows::empanelment::{
    empanelment_router, CriterionRegistry, DeviceTypeId, EmpanelmentService, EvaluationConfig,
    InMemoryApplicationRepository, InMemoryDecisionNotifier, LifecycleEngine, VerificationGate,
    VerificationPolicy,
};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "APCD Empanelment Service",
    about = "Run the OEM empanelment evaluation and lifecycle service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect the scoring rubric
    Rubric {
        #[command(subcommand)]
        command: RubricCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum RubricCommand {
    /// Print the standard rubric criteria and maxima
    Show,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Rubric {
            command: RubricCommand::Show,
        } => {
            render_rubric();
            Ok(())
        }
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let service = build_service(&config);

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(empanelment_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "empanelment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_service(
    config: &AppConfig,
) -> Arc<EmpanelmentService<InMemoryApplicationRepository, InMemoryDecisionNotifier>> {
    let registry = Arc::new(CriterionRegistry::standard());
    let policy = VerificationPolicy::new(
        config
            .verification
            .inspection_device_types
            .iter()
            .cloned()
            .map(DeviceTypeId),
    );
    let engine = LifecycleEngine::new(
        registry,
        VerificationGate::new(policy),
        EvaluationConfig {
            approval_ratio: config.evaluation.approval_ratio,
            rejection_ratio: config.evaluation.rejection_ratio,
        },
    );

    Arc::new(EmpanelmentService::new(
        Arc::new(InMemoryApplicationRepository::default()),
        Arc::new(InMemoryDecisionNotifier::default()),
        engine,
    ))
}

fn render_rubric() {
    let registry = CriterionRegistry::standard();

    println!("Empanelment scoring rubric");
    for definition in registry.criteria() {
        let kind = if definition.optional {
            "optional"
        } else {
            "mandatory"
        };
        println!(
            "- {} | {} | max {} | {}",
            definition.id, definition.label, definition.max_score, kind
        );
    }
    println!(
        "Maximum attainable: {} (mandatory only), {} (with optional)",
        registry.max_possible_score(false),
        registry.max_possible_score(true)
    );
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
