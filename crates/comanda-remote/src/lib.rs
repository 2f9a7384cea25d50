//! Remote backend client for the comanda service.
//!
//! Every persistent operation of the board is delegated to the El Buen Sabor
//! REST API; this module owns that boundary. It provides the
//! `BackendInterface` trait, the `RemoteService` wrapper that adds the
//! bounded single retry for idempotent mutations, and the reqwest-based
//! `http` implementation with the real wire paths.

use async_trait::async_trait;
use chrono::NaiveDate;
use comanda_types::{
	ConfigSchema, ImplementationRegistry, Order, ProductCount, RevenuePoint, SalesTotal,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Errors that can occur talking to the remote backend.
///
/// Non-success responses are always errors here; the board never ignores an
/// HTTP status. The variants follow the unified taxonomy: user-fixable
/// validation failures, conflicts that require a refresh, retryable server
/// faults, and transport problems.
#[derive(Debug, Error)]
pub enum RemoteError {
	/// The backend refused the request as malformed or invalid (4xx other
	/// than 409).
	#[error("Backend rejected request ({status}): {message}")]
	Validation { status: u16, message: String },
	/// A concurrent writer updated the resource first (409).
	#[error("Conflict: {0}")]
	Conflict(String),
	/// The backend failed (5xx). Retryable.
	#[error("Backend error ({status}): {message}")]
	Server { status: u16, message: String },
	/// Transport-level failure before a response arrived. Retryable.
	#[error("Network error: {0}")]
	Network(String),
	/// The bounded wait elapsed without a response. Retryable.
	#[error("Request timed out")]
	Timeout,
	/// A response body could not be decoded.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The implementation configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl RemoteError {
	/// Whether a retry can safely be attempted for this error.
	///
	/// Mutations carry an idempotency key and are whole-object replacements,
	/// so retrying after a server fault or a dropped connection cannot apply
	/// the change twice. Validation failures and conflicts are final.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			RemoteError::Server { .. } | RemoteError::Network(_) | RemoteError::Timeout
		)
	}
}

/// Trait defining the interface to the remote order backend.
///
/// One implementation exists per transport; the `http` implementation talks
/// to the production REST API. Tests substitute their own.
#[async_trait]
pub trait BackendInterface: Send + Sync {
	/// Returns the configuration schema for this backend implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches the full order list for a branch.
	///
	/// `GET /pedido/findBySucursal/{branchId}`
	async fn fetch_branch_orders(&self, branch_id: u64) -> Result<Vec<Order>, RemoteError>;

	/// Replaces an order with the given state.
	///
	/// `PUT /pedido/{id}` with the full order payload; the backend echoes the
	/// stored object. The idempotency key makes the single retry safe.
	async fn update_order(
		&self,
		order: &Order,
		idempotency_key: &str,
	) -> Result<Order, RemoteError>;

	/// Profit series for a branch and date range.
	///
	/// `GET /pedido/gananciaByFecha`
	async fn profit_by_date(
		&self,
		branch_id: u64,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<RevenuePoint>, RemoteError>;

	/// Product sales ranking for a branch and date range.
	///
	/// `GET /pedido/productosByFecha`
	async fn products_by_date(
		&self,
		branch_id: u64,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<ProductCount>, RemoteError>;

	/// Sales totals for a branch and date range.
	///
	/// `GET /pedido/totalByFecha`
	async fn totals_by_date(
		&self,
		branch_id: u64,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<SalesTotal>, RemoteError>;

	/// Forwards an arbitrary catalog request to the backend.
	///
	/// Used by the catalog proxy: payloads pass through untouched, only the
	/// authorization header and the unified status mapping are added here.
	async fn forward(
		&self,
		method: &str,
		path: &str,
		body: Option<serde_json::Value>,
	) -> Result<(u16, serde_json::Value), RemoteError>;
}

/// Type alias for backend factory functions.
pub type BackendFactory = fn(&toml::Value) -> Result<Box<dyn BackendInterface>, RemoteError>;

/// Registry trait for backend implementations.
pub trait BackendRegistry: ImplementationRegistry<Factory = BackendFactory> {}

/// Get all registered backend implementations.
pub fn get_all_implementations() -> Vec<(&'static str, BackendFactory)> {
	use implementations::http;

	vec![(http::Registry::NAME, http::Registry::factory())]
}

/// Service wrapping a backend implementation with retry policy.
///
/// Reads pass through unchanged. Mutations are retried idempotently at most
/// once, and only for faults where a retry can help; validation failures and
/// conflicts surface immediately.
pub struct RemoteService {
	/// The underlying backend implementation.
	backend: Box<dyn BackendInterface>,
}

impl RemoteService {
	/// Creates a new RemoteService with the specified backend.
	pub fn new(backend: Box<dyn BackendInterface>) -> Self {
		Self { backend }
	}

	/// Fetches the full order list for a branch.
	pub async fn fetch_branch_orders(&self, branch_id: u64) -> Result<Vec<Order>, RemoteError> {
		self.backend.fetch_branch_orders(branch_id).await
	}

	/// Replaces an order, retrying once on retryable faults.
	pub async fn update_order(
		&self,
		order: &Order,
		idempotency_key: &str,
	) -> Result<Order, RemoteError> {
		match self.backend.update_order(order, idempotency_key).await {
			Ok(updated) => Ok(updated),
			Err(e) if e.is_retryable() => {
				tracing::warn!(
					order_id = order.id,
					key = %comanda_types::truncate_id(idempotency_key),
					error = %e,
					"Order update failed, retrying once"
				);
				self.backend.update_order(order, idempotency_key).await
			},
			Err(e) => Err(e),
		}
	}

	/// Profit series for a branch and date range.
	pub async fn profit_by_date(
		&self,
		branch_id: u64,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<RevenuePoint>, RemoteError> {
		self.backend.profit_by_date(branch_id, from, to).await
	}

	/// Product sales ranking for a branch and date range.
	pub async fn products_by_date(
		&self,
		branch_id: u64,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<ProductCount>, RemoteError> {
		self.backend.products_by_date(branch_id, from, to).await
	}

	/// Sales totals for a branch and date range.
	pub async fn totals_by_date(
		&self,
		branch_id: u64,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<SalesTotal>, RemoteError> {
		self.backend.totals_by_date(branch_id, from, to).await
	}

	/// Forwards a catalog request to the backend, untouched.
	pub async fn forward(
		&self,
		method: &str,
		path: &str,
		body: Option<serde_json::Value>,
	) -> Result<(u16, serde_json::Value), RemoteError> {
		self.backend.forward(method, path, body).await
	}
}
