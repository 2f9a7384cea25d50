//! HTTP implementation of the backend interface.
//!
//! Talks to the El Buen Sabor REST API over reqwest with connection pooling
//! and a bounded per-request timeout. The bearer token from configuration is
//! attached to every request, order mutations included.

use crate::{BackendFactory, BackendInterface, BackendRegistry, RemoteError};
use async_trait::async_trait;
use chrono::NaiveDate;
use comanda_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Order, ProductCount, RevenuePoint,
	SalesTotal, Schema, SecretString, ValidationError,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default bounded wait for a backend response.
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Maps a non-success status and body to the unified error taxonomy.
///
/// 409 is a conflict, any other 4xx a validation failure, 5xx a server
/// fault. Success statuses never reach this function.
fn classify_status(status: u16, message: String) -> RemoteError {
	match status {
		409 => RemoteError::Conflict(message),
		400..=499 => RemoteError::Validation { status, message },
		_ => RemoteError::Server { status, message },
	}
}

/// Maps a transport failure to the unified error taxonomy.
fn classify_transport(e: reqwest::Error) -> RemoteError {
	if e.is_timeout() {
		RemoteError::Timeout
	} else {
		RemoteError::Network(e.to_string())
	}
}

/// Backend client over the REST API.
pub struct HttpBackend {
	client: reqwest::Client,
	base_url: String,
	auth_token: Option<SecretString>,
}

impl HttpBackend {
	/// Creates a new HttpBackend.
	pub fn new(
		base_url: String,
		timeout: Duration,
		auth_token: Option<SecretString>,
	) -> Result<Self, RemoteError> {
		let client = reqwest::Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.pool_max_idle_per_host(10)
			.timeout(timeout)
			.build()
			.map_err(|e| RemoteError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
			auth_token,
		})
	}

	/// Joins a path onto the configured base URL.
	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path.trim_start_matches('/'))
	}

	/// Attaches the bearer token, when configured.
	fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
		match &self.auth_token {
			Some(token) => builder.bearer_auth(token.expose_secret()),
			None => builder,
		}
	}

	/// Sends a request and decodes a JSON body, mapping failures to the
	/// unified taxonomy.
	async fn expect_json<T: DeserializeOwned>(
		&self,
		builder: RequestBuilder,
	) -> Result<T, RemoteError> {
		let response = self
			.authorize(builder)
			.send()
			.await
			.map_err(classify_transport)?;

		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(classify_status(status.as_u16(), message));
		}

		response
			.json::<T>()
			.await
			.map_err(|e| RemoteError::Serialization(e.to_string()))
	}

	/// Decodes any response into a relayable (status, body) pair.
	async fn relay(&self, response: Response) -> Result<(u16, serde_json::Value), RemoteError> {
		let status = response.status().as_u16();
		let body = if response.content_length() == Some(0) {
			serde_json::Value::Null
		} else {
			response
				.json::<serde_json::Value>()
				.await
				.unwrap_or(serde_json::Value::Null)
		};
		Ok((status, body))
	}
}

#[async_trait]
impl BackendInterface for HttpBackend {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpBackendSchema)
	}

	async fn fetch_branch_orders(&self, branch_id: u64) -> Result<Vec<Order>, RemoteError> {
		let url = self.url(&format!("pedido/findBySucursal/{}", branch_id));
		self.expect_json(self.client.get(url)).await
	}

	async fn update_order(
		&self,
		order: &Order,
		idempotency_key: &str,
	) -> Result<Order, RemoteError> {
		let url = self.url(&format!("pedido/{}", order.id));
		// Whole-object replacement; the version travels in the payload and a
		// stale one comes back as 409.
		let builder = self
			.client
			.put(url)
			.header("Idempotency-Key", idempotency_key)
			.json(order);
		self.expect_json(builder).await
	}

	async fn profit_by_date(
		&self,
		branch_id: u64,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<RevenuePoint>, RemoteError> {
		let url = self.url("pedido/gananciaByFecha");
		let builder = self.client.get(url).query(&[
			("sucursal", branch_id.to_string()),
			("desde", from.to_string()),
			("hasta", to.to_string()),
		]);
		self.expect_json(builder).await
	}

	async fn products_by_date(
		&self,
		branch_id: u64,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<ProductCount>, RemoteError> {
		let url = self.url("pedido/productosByFecha");
		let builder = self.client.get(url).query(&[
			("sucursal", branch_id.to_string()),
			("desde", from.to_string()),
			("hasta", to.to_string()),
		]);
		self.expect_json(builder).await
	}

	async fn totals_by_date(
		&self,
		branch_id: u64,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<SalesTotal>, RemoteError> {
		let url = self.url("pedido/totalByFecha");
		let builder = self.client.get(url).query(&[
			("sucursal", branch_id.to_string()),
			("desde", from.to_string()),
			("hasta", to.to_string()),
		]);
		self.expect_json(builder).await
	}

	async fn forward(
		&self,
		method: &str,
		path: &str,
		body: Option<serde_json::Value>,
	) -> Result<(u16, serde_json::Value), RemoteError> {
		let method = Method::from_bytes(method.as_bytes())
			.map_err(|_| RemoteError::Validation {
				status: StatusCode::METHOD_NOT_ALLOWED.as_u16(),
				message: format!("Unsupported method: {}", method),
			})?;

		let mut builder = self.client.request(method, self.url(path));
		if let Some(body) = body {
			builder = builder.json(&body);
		}

		let response = self
			.authorize(builder)
			.send()
			.await
			.map_err(classify_transport)?;

		// The proxy relays backend statuses verbatim; only transport
		// failures are errors at this layer.
		self.relay(response).await
	}
}

/// Configuration schema for the HTTP backend.
pub struct HttpBackendSchema;

impl ConfigSchema for HttpBackendSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("base_url", FieldType::String).with_validator(|v| {
					let url = v.as_str().unwrap_or_default();
					if url.starts_with("http://") || url.starts_with("https://") {
						Ok(())
					} else {
						Err("base_url must start with http:// or https://".to_string())
					}
				}),
			],
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				Field::new("auth_token", FieldType::String),
			],
		);
		schema.validate(config)
	}
}

/// Registry for the HTTP backend implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = BackendFactory;

	fn factory() -> Self::Factory {
		create_backend
	}
}

impl BackendRegistry for Registry {}

/// Factory function to create an HTTP backend from configuration.
///
/// Configuration parameters:
/// - `base_url`: Backend root, e.g. "https://api.elbuensabor.com.ar" (required)
/// - `timeout_seconds`: Bounded wait per request (default: 10)
/// - `auth_token`: Bearer token attached to every request (optional)
pub fn create_backend(config: &toml::Value) -> Result<Box<dyn BackendInterface>, RemoteError> {
	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| RemoteError::Configuration("base_url is required".into()))?
		.to_string();

	let timeout_seconds = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	let auth_token = config
		.get("auth_token")
		.and_then(|v| v.as_str())
		.filter(|s| !s.is_empty())
		.map(SecretString::from);

	let backend = HttpBackend::new(
		base_url,
		Duration::from_secs(timeout_seconds),
		auth_token,
	)?;
	Ok(Box::new(backend))
}
