//! HTTP server for the comanda API.
//!
//! This module provides the axum server consumed by the console view layer:
//! the order board, transition and action-surface endpoints, the dashboard
//! aggregates, the session context, and the catalog proxy.

use axum::{
	http::{HeaderName, HeaderValue, Method},
	routing::{any, get, post},
	Router,
};
use comanda_config::{ApiConfig, CorsConfig};
use comanda_core::BoardEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the board engine for processing requests.
	pub board: Arc<BoardEngine>,
}

/// Starts the HTTP server for the API.
///
/// This function creates and configures the HTTP server with routing,
/// CORS, and error handling for the console endpoints.
pub async fn start_server(
	api_config: ApiConfig,
	board: Arc<BoardEngine>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let app_state = AppState { board };

	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", get(crate::apis::orders::get_board))
				.route("/orders/{id}", get(crate::apis::orders::get_order_detail))
				.route(
					"/orders/{id}/actions",
					get(crate::apis::orders::get_actions),
				)
				.route(
					"/orders/{id}/transition",
					post(crate::apis::orders::post_transition),
				)
				.route(
					"/dashboard/revenue",
					get(crate::apis::dashboard::get_revenue),
				)
				.route(
					"/dashboard/products",
					get(crate::apis::dashboard::get_products),
				)
				.route("/dashboard/totals", get(crate::apis::dashboard::get_totals))
				.route(
					"/session",
					get(crate::apis::session::get_session)
						.put(crate::apis::session::put_session),
				)
				.route("/catalog/{resource}", any(crate::apis::catalog::proxy_root))
				.route(
					"/catalog/{resource}/{*rest}",
					any(crate::apis::catalog::proxy_sub),
				),
		)
		.layer(ServiceBuilder::new().layer(build_cors(api_config.cors.as_ref())))
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Comanda API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Builds the CORS layer from configuration.
///
/// Without an explicit CORS section the layer is permissive, matching how
/// the console is served in development.
fn build_cors(config: Option<&CorsConfig>) -> CorsLayer {
	let Some(config) = config else {
		return CorsLayer::permissive();
	};

	let origins: Vec<HeaderValue> = config
		.allowed_origins
		.iter()
		.filter_map(|origin| match origin.parse::<HeaderValue>() {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(%origin, "Ignoring invalid CORS origin");
				None
			},
		})
		.collect();

	let methods: Vec<Method> = config
		.allowed_methods
		.iter()
		.filter_map(|method| match method.parse::<Method>() {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(%method, "Ignoring invalid CORS method");
				None
			},
		})
		.collect();

	let headers: Vec<HeaderName> = config
		.allowed_headers
		.iter()
		.filter_map(|header| match header.parse::<HeaderName>() {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(%header, "Ignoring invalid CORS header");
				None
			},
		})
		.collect();

	CorsLayer::new()
		.allow_origin(origins)
		.allow_methods(methods)
		.allow_headers(headers)
}
