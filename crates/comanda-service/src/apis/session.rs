//! Session context endpoints.
//!
//! The selected company/branch is server-held state with an explicit
//! serialization boundary; the console reads and replaces it as a whole.

use crate::apis::map_board_error;
use crate::server::AppState;
use axum::{extract::State, response::Json};
use comanda_types::{ApiError, SessionContext};

/// Handles GET /api/session requests.
///
/// Returns the persisted context; a missing or stale-schema context comes
/// back as the default selection.
pub async fn get_session(
	State(state): State<AppState>,
) -> Result<Json<SessionContext>, ApiError> {
	state
		.board
		.session()
		.await
		.map(Json)
		.map_err(map_board_error)
}

/// Handles PUT /api/session requests.
///
/// Replaces the persisted context. The schema version is stamped by the
/// engine, so clients cannot downgrade it.
pub async fn put_session(
	State(state): State<AppState>,
	Json(context): Json<SessionContext>,
) -> Result<Json<SessionContext>, ApiError> {
	state
		.board
		.update_session(context)
		.await
		.map(Json)
		.map_err(map_board_error)
}
