//! Catalog proxy endpoints.
//!
//! The console manages companies, branches, categories, articles, promotions
//! and employees directly against the backend; this proxy relays those
//! requests with the authorization header attached and backend statuses
//! passed through verbatim. Only whitelisted resources are forwarded, and
//! payloads are never interpreted here.

use crate::apis::map_remote_error;
use crate::server::AppState;
use axum::{
	body::Bytes,
	extract::{Path, State},
	http::{Method, StatusCode},
	response::{IntoResponse, Json, Response},
};
use comanda_types::{ApiError, CatalogResource};

/// Handles requests for /api/catalog/{resource}.
pub async fn proxy_root(
	State(state): State<AppState>,
	Path(resource): Path<String>,
	method: Method,
	body: Bytes,
) -> Result<Response, ApiError> {
	forward(&state, &resource, None, method, body).await
}

/// Handles requests for /api/catalog/{resource}/{rest}.
pub async fn proxy_sub(
	State(state): State<AppState>,
	Path((resource, rest)): Path<(String, String)>,
	method: Method,
	body: Bytes,
) -> Result<Response, ApiError> {
	forward(&state, &resource, Some(&rest), method, body).await
}

/// Relays a catalog request to the backend.
async fn forward(
	state: &AppState,
	resource: &str,
	rest: Option<&str>,
	method: Method,
	body: Bytes,
) -> Result<Response, ApiError> {
	let resource: CatalogResource = resource.parse().map_err(|_| ApiError::NotFound {
		message: format!("Unknown catalog resource '{}'", resource),
	})?;

	let path = match rest {
		Some(rest) => format!("{}/{}", resource.as_path(), rest),
		None => resource.as_path().to_string(),
	};

	let payload = if body.is_empty() {
		None
	} else {
		Some(
			serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest {
				error_type: "invalid_json".to_string(),
				message: format!("Request body is not valid JSON: {}", e),
			})?,
		)
	};

	tracing::debug!(%method, path, "Forwarding catalog request");

	let (status, response_body) = state
		.board
		.remote()
		.forward(method.as_str(), &path, payload)
		.await
		.map_err(map_remote_error)?;

	let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
	Ok((status, Json(response_body)).into_response())
}
