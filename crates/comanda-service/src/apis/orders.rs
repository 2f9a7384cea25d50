//! Order board endpoints.
//!
//! The board listing, the per-order detail, the role-scoped action surface,
//! and the transition endpoint.

use crate::apis::map_board_error;
use crate::server::AppState;
use axum::{
	extract::{Path, Query, State},
	response::Json,
};
use comanda_types::{
	ActionSurfaceResponse, ApiError, BoardResponse, Order, Role, TransitionRequest,
};
use serde::Deserialize;

/// Query parameters for the board listing.
#[derive(Debug, Deserialize)]
pub struct BoardQuery {
	/// Branch whose orders are listed.
	pub branch: u64,
	/// Forces a backend refresh before answering.
	#[serde(default)]
	pub refresh: bool,
}

/// Query parameters for the action surface.
#[derive(Debug, Deserialize)]
pub struct ActionsQuery {
	/// Role the surface is computed for.
	pub role: Role,
}

/// Handles GET /api/orders requests.
///
/// Returns the cached order list for a branch together with the current
/// revision token. An unknown branch is fetched from the backend first;
/// `refresh=true` forces that fetch.
pub async fn get_board(
	State(state): State<AppState>,
	Query(query): Query<BoardQuery>,
) -> Result<Json<BoardResponse>, ApiError> {
	state
		.board
		.board(query.branch, query.refresh)
		.await
		.map(Json)
		.map_err(map_board_error)
}

/// Handles GET /api/orders/{id} requests.
///
/// Returns the cached order detail. Available to every role, no state guard.
pub async fn get_order_detail(
	State(state): State<AppState>,
	Path(id): Path<u64>,
) -> Result<Json<Order>, ApiError> {
	state
		.board
		.order_detail(id)
		.await
		.map(Json)
		.map_err(map_board_error)
}

/// Handles GET /api/orders/{id}/actions requests.
///
/// Computes the set of enabled transition actions for the given role on the
/// order's current status. The console renders exactly this set.
pub async fn get_actions(
	State(state): State<AppState>,
	Path(id): Path<u64>,
	Query(query): Query<ActionsQuery>,
) -> Result<Json<ActionSurfaceResponse>, ApiError> {
	let actions = state
		.board
		.available_actions(query.role, id)
		.await
		.map_err(map_board_error)?;

	Ok(Json(ActionSurfaceResponse {
		order_id: id,
		role: query.role,
		actions,
	}))
}

/// Handles POST /api/orders/{id}/transition requests.
///
/// Applies a lifecycle transition on behalf of the acting employee. Failures
/// always surface: refusals as 403/422, conflicts as 409, backend faults as
/// 502/504 after the rollback has restored the cached order.
pub async fn post_transition(
	State(state): State<AppState>,
	Path(id): Path<u64>,
	Json(request): Json<TransitionRequest>,
) -> Result<Json<Order>, ApiError> {
	match state
		.board
		.apply_transition(id, request.action, request.actor)
		.await
	{
		Ok(order) => Ok(Json(order)),
		Err(e) => {
			tracing::warn!(order_id = id, action = %request.action, error = %e, "Transition failed");
			Err(map_board_error(e))
		},
	}
}
