mod config;
mod connectors;
mod http;
mod idempotency;
mod jobs;
mod metrics;
mod models;
mod pricing;
mod sync;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use config::AppConfig;
use connectors::PricePublisher;
use idempotency::{IdempotencyStore, Reservation};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use models::{
    ApiError, BatchSyncRequest, ChannelsRequest, ChannelsResponse, MarginRequest,
    MarketplacesResponse, QuoteRequest, QuoteResponse, SyncRequest, SyncResponse,
};
use pricing::{MarginCheck, Marketplace, PricingError, PricingErrorKind};
use serde::Serialize;
use serde_json::json;
use std::{net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};
use sync::SyncService;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    exit_status(run().await)
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn exit_status(result: Result<(), BoxError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target = "pricesync.api", "server crashed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::from_env()?;
    let engine = config.build_engine()?;
    info!(
        target = "pricesync.api",
        marketplaces = engine.schedule().len(),
        minimum_margin = engine.policy().minimum_margin,
        unknown_marketplace = ?engine.policy().unknown_marketplace,
        "pricing engine ready"
    );
    let service = SyncService::new(engine, PricePublisher::from_config(&config));
    let (queue, _worker) = jobs::JobQueue::spawn(
        service.clone(),
        config.queue_capacity,
        Duration::from_secs(config.job_retention_secs),
    );
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|err| format!("prometheus recorder: {err}"))?;

    let state = AppState {
        service,
        queue,
        idempotency: IdempotencyStore::from_url(
            config.redis_url.as_deref(),
            config.idempotency_ttl_secs,
        ),
        openapi: Arc::new(load_openapi()),
        prometheus_handle,
    };
    let app = router(state, config.request_max_bytes);

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!(target = "pricesync.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    service: SyncService,
    queue: jobs::JobQueue,
    idempotency: IdempotencyStore,
    openapi: Arc<serde_json::Value>,
    prometheus_handle: PrometheusHandle,
}

fn router(state: AppState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);

    let pricing = Router::new()
        .route("/quote", post(quote_price))
        .route("/margin", post(check_margin))
        .route("/channels", post(quote_channels))
        .route("/sync", post(sync_prices));

    let jobs = Router::new()
        .route("/sync", post(enqueue_sync_job))
        .route("/{id}", get(get_job_status));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
        .route("/marketplaces", get(list_marketplaces))
        .nest("/pricing", pricing)
        .nest("/jobs", jobs)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

fn load_openapi() -> serde_json::Value {
    serde_yaml::from_str(include_str!("../docs/openapi.yaml"))
        .unwrap_or_else(|_| json!({"openapi": "3.0.3"}))
}

/// Health and readiness check.
///
/// - Method: `GET`
/// - Path: `/health`
///
/// Returns a small JSON payload with `status` and `service`.
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "pricesync-api-rs",
    }))
}

async fn openapi_json(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Ok(key) = std::env::var("OPENAPI_KEY")
        && presented(&headers, "X-Docs-Key") != key
    {
        return Err(AppError::Unauthorized);
    }
    Ok(Json((*state.openapi).clone()))
}

async fn swagger_ui() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html>
<head>
  <meta charset='utf-8'/>
  <title>PriceSync API Docs</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: '/openapi.json', dom_id: '#swagger-ui' });
    };
  </script>
</body>
</html>"#,
    )
}

async fn metrics_endpoint(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Ok(secret) = std::env::var("METRICS_KEY")
        && presented(&headers, "X-Metrics-Key") != secret
    {
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus_handle.render(),
    )
        .into_response()
}

fn presented<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Fee schedule and margin policy the engine was started with.
async fn list_marketplaces(State(state): State<AppState>) -> Response {
    let engine = &state.service.engine;
    Json(MarketplacesResponse {
        fees: engine.schedule(),
        policy: engine.policy(),
    })
    .into_response()
}

/// List price that realises a target margin on one marketplace.
///
/// - Method: `POST`
/// - Path: `/pricing/quote`
/// - Body: `QuoteRequest`
/// - Response: `QuoteResponse` (422 when the margin plus fees reach 100%)
async fn quote_price(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    crate::metrics::inc_requests("/pricing/quote");
    let engine = &state.service.engine;
    let quote = engine.price_for_margin(
        req.cost,
        req.target_margin,
        &req.marketplace,
        req.fulfillment_fee,
    )?;
    let meets_minimum = engine.policy().meets_minimum(req.target_margin);
    if !meets_minimum {
        warn!(
            target = "pricesync.api",
            marketplace = %req.marketplace,
            target_margin = req.target_margin,
            minimum = engine.policy().minimum_margin,
            "quoted below minimum margin"
        );
    }
    Ok(Json(QuoteResponse {
        quote,
        meets_minimum,
    }))
}

/// Margin realised by a price already in effect.
async fn check_margin(
    State(state): State<AppState>,
    Json(req): Json<MarginRequest>,
) -> Result<Json<MarginCheck>, AppError> {
    crate::metrics::inc_requests("/pricing/margin");
    let check = state.service.engine.margin_for_price(
        req.price,
        req.cost,
        &req.marketplace,
        req.fulfillment_fee,
    )?;
    Ok(Json(check))
}

async fn quote_channels(
    State(state): State<AppState>,
    Json(req): Json<ChannelsRequest>,
) -> Result<Json<ChannelsResponse>, AppError> {
    crate::metrics::inc_requests("/pricing/channels");
    let targets: &[Marketplace] = match &req.marketplaces {
        Some(list) if list.is_empty() => {
            return Err(PricingError::invalid_input("marketplaces", "must not be empty").into());
        }
        Some(list) => list.as_slice(),
        None => &[],
    };
    let engine = &state.service.engine;
    let quotes = engine.quote_all(req.cost, req.target_margin, targets, req.fulfillment_fee)?;
    Ok(Json(ChannelsResponse {
        target_margin_fraction: req.target_margin,
        meets_minimum: engine.policy().meets_minimum(req.target_margin),
        prices: quotes
            .into_iter()
            .map(|quote| (quote.marketplace, quote.computed_price))
            .collect(),
    }))
}

/// Reprice every marketplace to the margin realised on the source channel.
///
/// - Method: `POST`
/// - Path: `/pricing/sync`
/// - Body: `SyncRequest`
/// - Response: `SyncResponse`
///
/// With an `Idempotency-Key` header the first response for the key is
/// replayed and no second push happens. A request arriving while the key's
/// first sync is still running gets 409.
async fn sync_prices(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    crate::metrics::inc_requests("/pricing/sync");

    if let Some(key) = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        match state.idempotency.reserve(&key).await {
            Reservation::Replay(existing) => {
                info!(target = "pricesync.api", idempotency_key = %key, "replaying sync response");
                return Ok(Json(existing));
            }
            Reservation::InFlight => return Err(AppError::Conflict),
            Reservation::Acquired => {}
        }
        return match state.service.run(payload).await {
            Ok(response) => {
                state.idempotency.complete(&key, &response).await;
                Ok(Json(response))
            }
            Err(err) => {
                state.idempotency.release(&key).await;
                Err(err.into())
            }
        };
    }

    let response = state.service.run(payload).await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnqueueResponse {
    job_id: String,
    items: usize,
}

async fn enqueue_sync_job(
    State(state): State<AppState>,
    Json(payload): Json<BatchSyncRequest>,
) -> Result<Json<EnqueueResponse>, AppError> {
    crate::metrics::inc_requests("/jobs/sync");
    if payload.items.is_empty() {
        return Err(
            PricingError::invalid_input("items", "batch must contain at least one item").into(),
        );
    }
    let items = payload.items.len();
    let id = state
        .queue
        .enqueue_batch(payload.items)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(EnqueueResponse {
        job_id: id.to_string(),
        items,
    }))
}

async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<jobs::JobInfo>, AppError> {
    let Ok(uuid) = uuid::Uuid::parse_str(&id) else {
        return Err(PricingError::invalid_input("jobId", "not a valid job id").into());
    };
    state
        .queue
        .get(uuid)
        .await
        .map(Json)
        .ok_or(AppError::NotFound("job"))
}

#[derive(Debug)]
enum AppError {
    Pricing(PricingError),
    NotFound(&'static str),
    Conflict,
    Unauthorized,
    Internal(ApiError),
}

impl From<PricingError> for AppError {
    fn from(value: PricingError) -> Self {
        Self::Pricing(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, payload) = match self {
            AppError::Pricing(err) => {
                let kind = err.kind();
                crate::metrics::pricing_rejected(kind.code());
                let status = match kind {
                    PricingErrorKind::InvalidInput | PricingErrorKind::UnknownMarketplace => {
                        StatusCode::BAD_REQUEST
                    }
                    PricingErrorKind::MarginUnachievable => StatusCode::UNPROCESSABLE_ENTITY,
                    PricingErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, ApiError::new(kind.code(), err.to_string()))
            }
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ApiError::new("not_found", format!("{what} not found")),
            ),
            AppError::Conflict => (
                StatusCode::CONFLICT,
                ApiError::new(
                    "idempotency_in_flight",
                    "a request with this Idempotency-Key is still running",
                ),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ApiError::new("unauthorized", "missing or invalid key"),
            ),
            AppError::Internal(err) => {
                error!(target = "pricesync.api", error = %err.message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("internal", err.message),
                )
            }
        };
        (status, Json(payload)).into_response()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}
