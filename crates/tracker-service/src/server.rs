//! HTTP server for the tracker API.
//!
//! Exposes the dispatched and completed views and the dispatch/complete
//! actions as JSON endpoints under `/api`, plus `/health`.

use axum::{
	extract::{Path, State},
	http::{HeaderValue, Method, StatusCode},
	response::Json,
	routing::{get, post},
	Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	timeout::TimeoutLayer,
	trace::TraceLayer,
};
use tracker_config::ApiConfig;
use tracker_core::TrackerEngine;
use tracker_types::{APIError, DispatchListResponse, DispatchView, HealthResponse};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<TrackerEngine>,
}

fn cors_layer(api_config: &ApiConfig) -> Result<CorsLayer, Box<dyn std::error::Error>> {
	let Some(cors) = &api_config.cors else {
		return Ok(CorsLayer::permissive());
	};

	let origins = cors
		.allowed_origins
		.iter()
		.map(|origin| origin.parse::<HeaderValue>())
		.collect::<Result<Vec<_>, _>>()?;

	Ok(CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_methods([Method::GET, Method::POST])
		.allow_headers(Any))
}

/// Builds the API router.
pub fn router(
	api_config: &ApiConfig,
	engine: Arc<TrackerEngine>,
) -> Result<Router, Box<dyn std::error::Error>> {
	let middleware = ServiceBuilder::new()
		.layer(TraceLayer::new_for_http())
		.layer(TimeoutLayer::new(Duration::from_secs(
			api_config.timeout_seconds,
		)))
		.layer(cors_layer(api_config)?);

	let app = Router::new()
		.route("/health", get(handle_health))
		.nest(
			"/api",
			Router::new()
				.route("/dispatched", get(handle_list_dispatched))
				.route("/dispatched/{id}", get(handle_get_dispatched))
				.route("/dispatched/{id}/complete", post(handle_complete))
				.route("/completed", get(handle_list_completed))
				.route("/orders/{id}/dispatch", post(handle_dispatch)),
		)
		.layer(middleware)
		.with_state(AppState { engine });

	Ok(app)
}

/// Serves the API until interrupted.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<TrackerEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(&api_config, engine)?;

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Tracker API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::warn!(error = %e, "Failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}
	tracing::info!("Shutdown signal received");
}

async fn handle_health() -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
	})
}

/// Handles GET /api/dispatched requests.
async fn handle_list_dispatched(
	State(state): State<AppState>,
) -> Result<Json<DispatchListResponse>, APIError> {
	crate::apis::dispatch::list_dispatched(&state.engine)
		.await
		.map(Json)
}

/// Handles GET /api/completed requests.
async fn handle_list_completed(
	State(state): State<AppState>,
) -> Result<Json<DispatchListResponse>, APIError> {
	crate::apis::dispatch::list_completed(&state.engine)
		.await
		.map(Json)
}

/// Handles GET /api/dispatched/{id} requests.
async fn handle_get_dispatched(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<DispatchView>, APIError> {
	crate::apis::dispatch::get_dispatched(&state.engine, &id)
		.await
		.map(Json)
}

/// Handles POST /api/orders/{id}/dispatch requests.
///
/// Answers 201 when the order was dispatched by this call and 200 when it
/// was already tracked.
async fn handle_dispatch(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<(StatusCode, Json<DispatchView>), APIError> {
	let (view, created) = crate::apis::dispatch::dispatch_order(&state.engine, &id).await?;
	let status = if created {
		StatusCode::CREATED
	} else {
		StatusCode::OK
	};
	Ok((status, Json(view)))
}

/// Handles POST /api/dispatched/{id}/complete requests.
async fn handle_complete(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<StatusCode, APIError> {
	crate::apis::dispatch::complete_order(&state.engine, &id).await?;
	Ok(StatusCode::NO_CONTENT)
}
