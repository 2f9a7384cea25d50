//! Dashboard aggregate endpoints.
//!
//! The series are pre-aggregated by the backend; these handlers only carry
//! them through with the unified error mapping. Nothing is computed locally.

use crate::apis::map_remote_error;
use crate::server::AppState;
use axum::{
	extract::{Query, State},
	response::Json,
};
use comanda_types::{ApiError, DateRangeQuery, ProductCount, RevenuePoint, SalesTotal};

/// Handles GET /api/dashboard/revenue requests.
pub async fn get_revenue(
	State(state): State<AppState>,
	Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<RevenuePoint>>, ApiError> {
	state
		.board
		.remote()
		.profit_by_date(query.branch, query.from, query.to)
		.await
		.map(Json)
		.map_err(map_remote_error)
}

/// Handles GET /api/dashboard/products requests.
pub async fn get_products(
	State(state): State<AppState>,
	Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<ProductCount>>, ApiError> {
	state
		.board
		.remote()
		.products_by_date(query.branch, query.from, query.to)
		.await
		.map(Json)
		.map_err(map_remote_error)
}

/// Handles GET /api/dashboard/totals requests.
pub async fn get_totals(
	State(state): State<AppState>,
	Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<SalesTotal>>, ApiError> {
	state
		.board
		.remote()
		.totals_by_date(query.branch, query.from, query.to)
		.await
		.map(Json)
		.map_err(map_remote_error)
}
