//! API types for the comanda HTTP surface.
//!
//! This module defines the request and response types exchanged with the
//! console view layer, the dashboard aggregate series carried from the
//! backend, and the structured error type mapped to HTTP statuses.

use crate::order::{ActionKind, Order};
use crate::staff::{Employee, Role};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Response for board listings: the cached orders plus the re-render token.
///
/// The revision increases on every applied transition, rollback and refresh;
/// the console re-renders rows whenever it observes a larger value instead
/// of reloading the whole screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardResponse {
	pub revision: u64,
	pub orders: Vec<Order>,
}

/// Request body for applying a transition to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
	/// The action to apply.
	pub action: ActionKind,
	/// The staff member performing it, assigned by the console.
	pub actor: Employee,
}

/// Response for the action-surface endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSurfaceResponse {
	#[serde(rename = "orderId")]
	pub order_id: u64,
	pub role: Role,
	pub actions: BTreeSet<ActionKind>,
}

/// Query parameters for the dashboard aggregate endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeQuery {
	/// Branch the aggregates are scoped to.
	pub branch: u64,
	/// Inclusive start date.
	pub from: NaiveDate,
	/// Inclusive end date.
	pub to: NaiveDate,
}

/// One point of the profit-by-date series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenuePoint {
	#[serde(rename = "fecha")]
	pub date: NaiveDate,
	#[serde(rename = "ganancia")]
	pub profit: Decimal,
}

/// One row of the products-sold ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCount {
	#[serde(rename = "denominacion")]
	pub name: String,
	#[serde(rename = "cantidad")]
	pub quantity: u64,
}

/// One point of the sales-total series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTotal {
	#[serde(rename = "fecha")]
	pub date: NaiveDate,
	pub total: Decimal,
}

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code.
	pub error: String,
	/// Human-readable description.
	pub message: String,
	/// Additional error context.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds.
	#[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

/// Structured API error with HTTP status mapping.
///
/// Every failure surfaced to the console goes through this type; transitions
/// in particular must never fail without a user-visible error.
#[derive(Debug)]
pub enum ApiError {
	/// Malformed request (400).
	BadRequest { error_type: String, message: String },
	/// The role may not perform the action (403).
	Forbidden { message: String },
	/// Unknown order or resource (404).
	NotFound { message: String },
	/// A concurrent writer got there first; refresh and retry (409).
	Conflict { message: String },
	/// Valid request refused by a lifecycle precondition (422).
	UnprocessableEntity { error_type: String, message: String },
	/// The backend answered with an error or nonsense (502).
	BadGateway { message: String },
	/// The backend did not answer within the bounded wait (504).
	GatewayTimeout { message: String },
	/// Anything else (500).
	Internal { message: String },
}

impl ApiError {
	/// HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::Forbidden { .. } => 403,
			ApiError::NotFound { .. } => 404,
			ApiError::Conflict { .. } => 409,
			ApiError::UnprocessableEntity { .. } => 422,
			ApiError::BadGateway { .. } => 502,
			ApiError::GatewayTimeout { .. } => 504,
			ApiError::Internal { .. } => 500,
		}
	}

	/// Converts to the JSON error body.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, retry_after) = match self {
			ApiError::BadRequest {
				error_type,
				message,
			} => (error_type.clone(), message.clone(), None),
			ApiError::Forbidden { message } => {
				("forbidden".to_string(), message.clone(), None)
			},
			ApiError::NotFound { message } => {
				("not_found".to_string(), message.clone(), None)
			},
			ApiError::Conflict { message } => {
				("conflict".to_string(), message.clone(), Some(0))
			},
			ApiError::UnprocessableEntity {
				error_type,
				message,
			} => (error_type.clone(), message.clone(), None),
			ApiError::BadGateway { message } => {
				("bad_gateway".to_string(), message.clone(), Some(5))
			},
			ApiError::GatewayTimeout { message } => {
				("gateway_timeout".to_string(), message.clone(), Some(5))
			},
			ApiError::Internal { message } => {
				("internal".to_string(), message.clone(), None)
			},
		};
		ErrorResponse {
			error,
			message,
			details: None,
			retry_after,
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({})", response.message, self.status_code())
	}
}

impl std::error::Error for ApiError {}

impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
