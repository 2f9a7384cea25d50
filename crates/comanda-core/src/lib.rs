//! Core board engine for the comanda service.
//!
//! This module provides the orchestration logic for the order-tracking
//! board: applying role-gated lifecycle transitions optimistically against
//! the local cache, confirming them with the remote backend, rolling back
//! when the backend refuses, and keeping the visible order list synchronized
//! through branch refreshes. It includes the event bus and the factory
//! pattern for building engine instances from configuration.

use crate::event_bus::EventBus;
use crate::state::order::{OrderStateError, OrderStateMachine};
use comanda_config::Config;
use comanda_remote::{BackendFactory, RemoteError, RemoteService};
use comanda_storage::{StorageFactory, StorageService};
use comanda_types::{
	ActionKind, BoardEvent, BoardResponse, Employee, Order, OrderEvent, OrderStatus, Role,
	SessionContext, StorageKey, SyncEvent,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

pub mod event_bus;
pub mod policy;
pub mod state;

/// Identifier under which the session context is persisted.
const SESSION_ID: &str = "current";

/// Errors that can occur during board operations.
#[derive(Debug, Error)]
pub enum BoardError {
	/// Error related to configuration issues.
	#[error("Configuration error: {0}")]
	Config(String),
	/// Error from the local cache.
	#[error("Storage error: {0}")]
	Storage(String),
	/// The order is not in the cache.
	#[error("Order not found: {0}")]
	OrderNotFound(u64),
	/// The role may not perform the action.
	#[error("Role {role} may not perform {action}")]
	Forbidden { role: Role, action: ActionKind },
	/// The order is not in the action's source status.
	#[error("Action {action} is not applicable from status {from}")]
	InvalidTransition {
		action: ActionKind,
		from: OrderStatus,
	},
	/// A concurrent writer updated the order first.
	#[error("Conflict: {0}")]
	Conflict(String),
	/// The remote backend refused or failed the operation.
	#[error(transparent)]
	Remote(RemoteError),
	/// Invariant violation inside the engine.
	#[error("Internal error: {0}")]
	Internal(String),
}

impl From<OrderStateError> for BoardError {
	fn from(e: OrderStateError) -> Self {
		match e {
			OrderStateError::Storage(s) => BoardError::Storage(s),
			OrderStateError::OrderNotFound(id) => BoardError::OrderNotFound(id),
			OrderStateError::InvalidAction { action, from } => {
				BoardError::InvalidTransition { action, from }
			},
			OrderStateError::InvalidTransition { from, to } => {
				BoardError::Internal(format!("unexpected edge {} -> {}", from, to))
			},
			e @ OrderStateError::StaleVersion { .. } => BoardError::Conflict(e.to_string()),
		}
	}
}

impl From<RemoteError> for BoardError {
	fn from(e: RemoteError) -> Self {
		match e {
			RemoteError::Conflict(m) => BoardError::Conflict(m),
			e => BoardError::Remote(e),
		}
	}
}

/// Main engine orchestrating the order board.
///
/// The BoardEngine coordinates between:
/// - Remote: the El Buen Sabor REST API holding the source of truth
/// - Storage: the local cache of orders, branch indexes and the session
/// - State: transition validation and cache mutation
/// - Events: the broadcast bus announcing outcomes
pub struct BoardEngine {
	/// Board configuration.
	config: Config,
	/// Local cache service.
	storage: Arc<StorageService>,
	/// Remote backend service.
	remote: Arc<RemoteService>,
	/// Order state machine over the cache.
	state: OrderStateMachine,
	/// Event bus for component communication.
	event_bus: EventBus,
	/// Re-render token, monotonically increasing.
	revision: AtomicU64,
}

impl BoardEngine {
	/// Creates a new engine from already-constructed services.
	pub fn new(config: Config, storage: Arc<StorageService>, remote: Arc<RemoteService>) -> Self {
		Self {
			config,
			state: OrderStateMachine::new(storage.clone()),
			storage,
			remote,
			event_bus: EventBus::new(1000),
			revision: AtomicU64::new(0),
		}
	}

	/// Current re-render token.
	pub fn revision(&self) -> u64 {
		self.revision.load(Ordering::SeqCst)
	}

	/// Bumps the re-render token and returns the new value.
	fn bump_revision(&self) -> u64 {
		self.revision.fetch_add(1, Ordering::SeqCst) + 1
	}

	/// Returns the board for a branch: cached orders plus the revision.
	///
	/// A branch that was never fetched is refreshed first; `force_refresh`
	/// refreshes unconditionally.
	pub async fn board(
		&self,
		branch_id: u64,
		force_refresh: bool,
	) -> Result<BoardResponse, BoardError> {
		let cached = self.state.branch_orders(branch_id).await?;

		let orders = match (cached, force_refresh) {
			(Some(orders), false) => orders,
			_ => {
				self.refresh_branch(branch_id).await?;
				self.state
					.branch_orders(branch_id)
					.await?
					.unwrap_or_default()
			},
		};

		Ok(BoardResponse {
			revision: self.revision(),
			orders,
		})
	}

	/// Fetches a branch order list from the backend and replaces the cache.
	#[instrument(skip(self))]
	pub async fn refresh_branch(&self, branch_id: u64) -> Result<usize, BoardError> {
		match self.remote.fetch_branch_orders(branch_id).await {
			Ok(orders) => {
				self.state.replace_branch_orders(branch_id, &orders).await?;
				let revision = self.bump_revision();
				tracing::debug!(orders = orders.len(), revision, "Branch refreshed");
				self.event_bus
					.publish(BoardEvent::Sync(SyncEvent::BranchRefreshed {
						branch_id,
						orders: orders.len(),
						revision,
					}))
					.ok();
				Ok(orders.len())
			},
			Err(e) => {
				self.event_bus
					.publish(BoardEvent::Sync(SyncEvent::RefreshFailed {
						branch_id,
						error: e.to_string(),
					}))
					.ok();
				Err(e.into())
			},
		}
	}

	/// Returns a cached order by id.
	pub async fn order_detail(&self, order_id: u64) -> Result<Order, BoardError> {
		Ok(self.state.get_order(order_id).await?)
	}

	/// Computes the action surface for a role on a cached order.
	pub async fn available_actions(
		&self,
		role: Role,
		order_id: u64,
	) -> Result<BTreeSet<ActionKind>, BoardError> {
		let order = self.state.get_order(order_id).await?;
		Ok(policy::available_actions(role, &order))
	}

	/// Applies a lifecycle transition to an order.
	///
	/// The transition is validated (source status, then role gate), applied
	/// optimistically to the cache, and confirmed with a whole-object PUT to
	/// the backend. A refused or failed PUT restores the snapshot, bumps the
	/// revision so the rollback re-renders, and surfaces a typed error; a
	/// conflict additionally refreshes the order's branch so the operator
	/// sees the concurrent change.
	#[instrument(skip(self, actor), fields(role = %actor.role))]
	pub async fn apply_transition(
		&self,
		order_id: u64,
		action: ActionKind,
		actor: Employee,
	) -> Result<Order, BoardError> {
		let order = self.state.get_order(order_id).await?;

		if let Err(e) = policy::transition_target(action, &order) {
			self.reject(order_id, action, &e.to_string());
			return Err(BoardError::InvalidTransition {
				action,
				from: order.status,
			});
		}
		if let Err(e) = policy::authorize(actor.role, action, &order) {
			self.reject(order_id, action, &e.to_string());
			return Err(BoardError::Forbidden {
				role: actor.role,
				action,
			});
		}

		// Snapshot before the optimistic write so a refused PUT can restore it
		let snapshot = order.clone();

		let updated = self
			.state
			.apply_action(order_id, action, &actor, Some(order.version))
			.await?;
		self.bump_revision();

		let idempotency_key = uuid::Uuid::new_v4().to_string();
		match self.remote.update_order(&updated, &idempotency_key).await {
			Ok(echoed) => {
				// Keep the server-normalized object
				self.state.store_order(&echoed).await?;
				self.bump_revision();
				tracing::info!(
					from = %snapshot.status,
					to = %echoed.status,
					"Transition applied"
				);
				self.event_bus
					.publish(BoardEvent::Order(OrderEvent::TransitionApplied {
						order_id,
						action,
						from: snapshot.status,
						to: echoed.status,
						actor,
					}))
					.ok();
				Ok(echoed)
			},
			Err(e) => {
				self.state.store_order(&snapshot).await?;
				self.bump_revision();
				tracing::error!(error = %e, "Transition refused by backend, rolled back");
				self.event_bus
					.publish(BoardEvent::Order(OrderEvent::TransitionRolledBack {
						order_id,
						action,
						restored: snapshot.status,
						error: e.to_string(),
					}))
					.ok();

				if matches!(e, RemoteError::Conflict(_)) {
					if let Err(refresh_err) = self.refresh_branch(snapshot.branch_id).await {
						tracing::warn!(
							branch_id = snapshot.branch_id,
							error = %refresh_err,
							"Post-conflict refresh failed"
						);
					}
				}

				Err(e.into())
			},
		}
	}

	/// Publishes a rejection event.
	fn reject(&self, order_id: u64, action: ActionKind, reason: &str) {
		tracing::warn!(order_id, %action, reason, "Transition rejected");
		self.event_bus
			.publish(BoardEvent::Order(OrderEvent::TransitionRejected {
				order_id,
				action,
				reason: reason.to_string(),
			}))
			.ok();
	}

	/// Loads the persisted session context.
	///
	/// A missing context, or one written under an older schema, yields the
	/// default instead of misreading stored fields.
	pub async fn session(&self) -> Result<SessionContext, BoardError> {
		match self
			.storage
			.retrieve::<SessionContext>(StorageKey::Session.as_str(), SESSION_ID)
			.await
		{
			Ok(ctx) if ctx.is_current_schema() => Ok(ctx),
			Ok(stale) => {
				tracing::warn!(
					stored_schema = stale.schema_version,
					"Session context schema is stale, resetting"
				);
				Ok(SessionContext::default())
			},
			Err(comanda_storage::StorageError::NotFound) => Ok(SessionContext::default()),
			Err(e) => Err(BoardError::Storage(e.to_string())),
		}
	}

	/// Persists a new session context, stamping the current schema version.
	pub async fn update_session(
		&self,
		mut context: SessionContext,
	) -> Result<SessionContext, BoardError> {
		context.schema_version = comanda_types::SESSION_SCHEMA_VERSION;
		self.storage
			.store(StorageKey::Session.as_str(), SESSION_ID, &context)
			.await
			.map_err(|e| BoardError::Storage(e.to_string()))?;
		Ok(context)
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the cache service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Returns a reference to the remote backend service.
	pub fn remote(&self) -> &Arc<RemoteService> {
		&self.remote
	}

	/// Main execution loop for the board engine.
	///
	/// This method:
	/// 1. Periodically refreshes the selected branch so the board stays
	///    consistent across sessions
	/// 2. Periodically expires stale cache entries
	/// 3. Logs transition and sync events from the bus
	/// 4. Handles graceful shutdown on Ctrl+C
	pub async fn run(&self) -> Result<(), BoardError> {
		let refresh_period =
			std::time::Duration::from_secs(self.config.board.refresh_interval_seconds);
		let cleanup_period =
			std::time::Duration::from_secs(self.config.storage.cleanup_interval_seconds);

		let mut refresh_timer = tokio::time::interval(refresh_period);
		let mut cleanup_timer = tokio::time::interval(cleanup_period);
		let mut events = self.event_bus.subscribe();

		loop {
			tokio::select! {
				_ = refresh_timer.tick() => {
					match self.session().await {
						Ok(SessionContext { branch_id: Some(branch_id), .. }) => {
							if let Err(e) = self.refresh_branch(branch_id).await {
								tracing::warn!(branch_id, error = %e, "Background refresh failed");
							}
						}
						Ok(_) => {
							tracing::debug!("No branch selected, skipping background refresh");
						}
						Err(e) => {
							tracing::warn!(error = %e, "Could not load session context");
						}
					}
				}

				_ = cleanup_timer.tick() => {
					match self.storage.cleanup_expired().await {
						Ok(0) => {},
						Ok(removed) => tracing::debug!(removed, "Expired cache entries removed"),
						Err(e) => tracing::warn!(error = %e, "Cache cleanup failed"),
					}
				}

				Ok(event) = events.recv() => {
					log_event(&event);
				}

				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutdown signal received");
					break;
				}
			}
		}

		Ok(())
	}
}

/// Logs a board event at a severity matching its outcome.
fn log_event(event: &BoardEvent) {
	match event {
		BoardEvent::Order(OrderEvent::TransitionApplied {
			order_id,
			action,
			to,
			..
		}) => {
			tracing::info!(order_id, %action, to = %to, "Order transitioned");
		},
		BoardEvent::Order(OrderEvent::TransitionRejected {
			order_id,
			action,
			reason,
		}) => {
			tracing::warn!(order_id, %action, %reason, "Transition rejected");
		},
		BoardEvent::Order(OrderEvent::TransitionRolledBack {
			order_id,
			action,
			restored,
			error,
		}) => {
			tracing::error!(order_id, %action, restored = %restored, %error, "Transition rolled back");
		},
		BoardEvent::Sync(SyncEvent::BranchRefreshed {
			branch_id,
			orders,
			revision,
		}) => {
			tracing::debug!(branch_id, orders, revision, "Branch refreshed");
		},
		BoardEvent::Sync(SyncEvent::RefreshFailed { branch_id, error }) => {
			tracing::warn!(branch_id, %error, "Branch refresh failed");
		},
	}
}

/// Factories for the pluggable services of the engine.
pub struct BoardFactories {
	/// Storage backend factories by configuration name.
	pub storage_factories: HashMap<String, StorageFactory>,
	/// Remote backend factories by configuration name.
	pub backend_factories: HashMap<String, BackendFactory>,
}

/// Builder for constructing a BoardEngine with pluggable implementations.
///
/// Selects the primary implementation of each section from configuration,
/// validates the matching TOML against the implementation's schema, and
/// wires the services together.
pub struct BoardBuilder {
	config: Config,
}

impl BoardBuilder {
	/// Creates a new BoardBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the BoardEngine using the provided factories.
	pub fn build(self, factories: BoardFactories) -> Result<BoardEngine, BoardError> {
		// Storage backend
		let storage_name = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(storage_name)
			.ok_or_else(|| {
				BoardError::Config(format!("Storage '{}' has no configuration", storage_name))
			})?;
		let storage_factory = factories.storage_factories.get(storage_name).ok_or_else(|| {
			BoardError::Config(format!("Unknown storage implementation '{}'", storage_name))
		})?;
		let storage_backend = storage_factory(storage_config).map_err(|e| {
			tracing::error!(component = "storage", implementation = %storage_name, error = %e, "Failed to create storage backend");
			BoardError::Config(format!(
				"Failed to create storage backend '{}': {}",
				storage_name, e
			))
		})?;
		storage_backend
			.config_schema()
			.validate(storage_config)
			.map_err(|e| {
				BoardError::Config(format!(
					"Invalid configuration for storage '{}': {}",
					storage_name, e
				))
			})?;
		let storage = Arc::new(StorageService::new(storage_backend));
		tracing::info!(component = "storage", implementation = %storage_name, "Loaded");

		// Remote backend
		let backend_name = &self.config.backend.primary;
		let backend_config = self
			.config
			.backend
			.implementations
			.get(backend_name)
			.ok_or_else(|| {
				BoardError::Config(format!("Backend '{}' has no configuration", backend_name))
			})?;
		let backend_factory = factories.backend_factories.get(backend_name).ok_or_else(|| {
			BoardError::Config(format!("Unknown backend implementation '{}'", backend_name))
		})?;
		let backend = backend_factory(backend_config).map_err(|e| {
			tracing::error!(component = "backend", implementation = %backend_name, error = %e, "Failed to create backend client");
			BoardError::Config(format!(
				"Failed to create backend client '{}': {}",
				backend_name, e
			))
		})?;
		backend
			.config_schema()
			.validate(backend_config)
			.map_err(|e| {
				BoardError::Config(format!(
					"Invalid configuration for backend '{}': {}",
					backend_name, e
				))
			})?;
		let remote = Arc::new(RemoteService::new(backend));
		tracing::info!(component = "backend", implementation = %backend_name, "Loaded");

		Ok(BoardEngine::new(self.config, storage, remote))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use chrono::NaiveDate;
	use comanda_config::{BackendConfig, BoardConfig, StorageConfig};
	use comanda_remote::BackendInterface;
	use comanda_storage::implementations::memory::MemoryStorage;
	use comanda_types::{ConfigSchema, Fulfillment, ProductCount, RevenuePoint, SalesTotal};
	use mockall::mock;
	use mockall::predicate::*;

	mock! {
		Backend {}

		#[async_trait]
		impl BackendInterface for Backend {
			fn config_schema(&self) -> Box<dyn ConfigSchema>;
			async fn fetch_branch_orders(&self, branch_id: u64) -> Result<Vec<Order>, RemoteError>;
			async fn update_order(&self, order: &Order, idempotency_key: &str) -> Result<Order, RemoteError>;
			async fn profit_by_date(&self, branch_id: u64, from: NaiveDate, to: NaiveDate) -> Result<Vec<RevenuePoint>, RemoteError>;
			async fn products_by_date(&self, branch_id: u64, from: NaiveDate, to: NaiveDate) -> Result<Vec<ProductCount>, RemoteError>;
			async fn totals_by_date(&self, branch_id: u64, from: NaiveDate, to: NaiveDate) -> Result<Vec<SalesTotal>, RemoteError>;
			async fn forward(&self, method: &str, path: &str, body: Option<serde_json::Value>) -> Result<(u16, serde_json::Value), RemoteError>;
		}
	}

	fn test_config() -> Config {
		Config {
			board: BoardConfig {
				id: "comanda-test".to_string(),
				refresh_interval_seconds: 30,
			},
			backend: BackendConfig {
				primary: "http".to_string(),
				implementations: HashMap::new(),
			},
			storage: StorageConfig {
				primary: "memory".to_string(),
				implementations: HashMap::new(),
				cleanup_interval_seconds: 3600,
			},
			api: None,
		}
	}

	fn engine_with(backend: MockBackend) -> BoardEngine {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let remote = Arc::new(RemoteService::new(Box::new(backend)));
		BoardEngine::new(test_config(), storage, remote)
	}

	fn order(id: u64, status: OrderStatus, fulfillment: Fulfillment) -> Order {
		Order {
			id,
			status,
			fulfillment,
			branch_id: 7,
			total: Default::default(),
			total_cost: Default::default(),
			lines: vec![],
			employee: None,
			version: 0,
			created_at: 0,
			updated_at: 0,
		}
	}

	fn cashier() -> Employee {
		Employee {
			id: 3,
			name: "Marta".into(),
			role: Role::Cajero,
		}
	}

	async fn seed(engine: &BoardEngine, orders: Vec<Order>) {
		engine
			.state
			.replace_branch_orders(7, &orders)
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn invoice_success_confirms_and_bumps_revision() {
		let mut backend = MockBackend::new();
		backend
			.expect_update_order()
			.times(1)
			.returning(|order, _| Ok(order.clone()));

		let engine = engine_with(backend);
		seed(
			&engine,
			vec![order(1, OrderStatus::Pending, Fulfillment::TakeAway)],
		)
		.await;
		let before = engine.revision();

		let updated = engine
			.apply_transition(1, ActionKind::Invoice, cashier())
			.await
			.unwrap();

		assert_eq!(updated.status, OrderStatus::Invoiced);
		assert_eq!(updated.employee.as_ref().map(|e| e.id), Some(3));
		assert_eq!(updated.version, 1);
		// Optimistic apply + confirmed echo
		assert_eq!(engine.revision(), before + 2);

		let cached = engine.order_detail(1).await.unwrap();
		assert_eq!(cached.status, OrderStatus::Invoiced);
	}

	#[tokio::test]
	async fn server_fault_rolls_back_after_single_retry() {
		let mut backend = MockBackend::new();
		// The remote service retries exactly once on retryable faults
		backend.expect_update_order().times(2).returning(|_, _| {
			Err(RemoteError::Server {
				status: 500,
				message: "boom".into(),
			})
		});

		let engine = engine_with(backend);
		seed(
			&engine,
			vec![order(1, OrderStatus::Pending, Fulfillment::TakeAway)],
		)
		.await;
		let before = engine.revision();

		let result = engine
			.apply_transition(1, ActionKind::Invoice, cashier())
			.await;
		assert!(matches!(result, Err(BoardError::Remote(_))));

		// Snapshot restored, and the rollback itself re-renders
		let cached = engine.order_detail(1).await.unwrap();
		assert_eq!(cached.status, OrderStatus::Pending);
		assert_eq!(cached.version, 0);
		assert_eq!(cached.employee, None);
		assert_eq!(engine.revision(), before + 2);
	}

	#[tokio::test]
	async fn conflict_rolls_back_and_refreshes_branch() {
		let mut backend = MockBackend::new();
		backend
			.expect_update_order()
			.times(1)
			.returning(|_, _| Err(RemoteError::Conflict("version mismatch".into())));
		// The post-conflict refresh pulls the concurrent writer's result
		backend
			.expect_fetch_branch_orders()
			.with(eq(7u64))
			.times(1)
			.returning(|_| {
				let mut fresh = order(1, OrderStatus::Invoiced, Fulfillment::TakeAway);
				fresh.version = 2;
				Ok(vec![fresh])
			});

		let engine = engine_with(backend);
		seed(
			&engine,
			vec![order(1, OrderStatus::Pending, Fulfillment::TakeAway)],
		)
		.await;

		let result = engine
			.apply_transition(1, ActionKind::Invoice, cashier())
			.await;
		assert!(matches!(result, Err(BoardError::Conflict(_))));

		let cached = engine.order_detail(1).await.unwrap();
		assert_eq!(cached.status, OrderStatus::Invoiced);
		assert_eq!(cached.version, 2);
	}

	#[tokio::test]
	async fn invalid_transition_never_reaches_the_backend() {
		// No update_order expectation: a call would panic the mock
		let backend = MockBackend::new();
		let engine = engine_with(backend);
		seed(
			&engine,
			vec![order(1, OrderStatus::Pending, Fulfillment::TakeAway)],
		)
		.await;

		let result = engine
			.apply_transition(1, ActionKind::SendToKitchen, cashier())
			.await;
		assert!(matches!(
			result,
			Err(BoardError::InvalidTransition {
				action: ActionKind::SendToKitchen,
				from: OrderStatus::Pending,
			})
		));

		let cached = engine.order_detail(1).await.unwrap();
		assert_eq!(cached.status, OrderStatus::Pending);
	}

	#[tokio::test]
	async fn forbidden_role_never_reaches_the_backend() {
		let backend = MockBackend::new();
		let engine = engine_with(backend);
		seed(
			&engine,
			vec![order(1, OrderStatus::Pending, Fulfillment::TakeAway)],
		)
		.await;

		let cook = Employee {
			id: 5,
			name: "Julián".into(),
			role: Role::Cocinero,
		};
		let result = engine
			.apply_transition(1, ActionKind::Cancel, cook)
			.await;
		assert!(matches!(
			result,
			Err(BoardError::Forbidden {
				role: Role::Cocinero,
				action: ActionKind::Cancel,
			})
		));
	}

	#[tokio::test]
	async fn prepared_branches_by_fulfillment_through_the_engine() {
		let mut backend = MockBackend::new();
		backend
			.expect_update_order()
			.times(2)
			.returning(|order, _| Ok(order.clone()));

		let engine = engine_with(backend);
		let cook = Employee {
			id: 5,
			name: "Julián".into(),
			role: Role::Cocinero,
		};
		seed(
			&engine,
			vec![
				order(1, OrderStatus::InPreparation, Fulfillment::Delivery),
				order(2, OrderStatus::InPreparation, Fulfillment::TakeAway),
			],
		)
		.await;

		let delivery = engine
			.apply_transition(1, ActionKind::MarkPrepared, cook.clone())
			.await
			.unwrap();
		assert_eq!(delivery.status, OrderStatus::Delivery);

		let takeaway = engine
			.apply_transition(2, ActionKind::MarkPrepared, cook)
			.await
			.unwrap();
		assert_eq!(takeaway.status, OrderStatus::Ready);
	}

	#[tokio::test]
	async fn board_lazily_fetches_unknown_branches() {
		let mut backend = MockBackend::new();
		backend
			.expect_fetch_branch_orders()
			.with(eq(7u64))
			.times(1)
			.returning(|_| Ok(vec![order(1, OrderStatus::Pending, Fulfillment::TakeAway)]));

		let engine = engine_with(backend);
		let response = engine.board(7, false).await.unwrap();
		assert_eq!(response.orders.len(), 1);
		assert_eq!(response.revision, 1);

		// Second read hits the cache; the mock would panic on a second fetch
		let response = engine.board(7, false).await.unwrap();
		assert_eq!(response.orders.len(), 1);
	}

	#[tokio::test]
	async fn refresh_failure_keeps_cached_list() {
		let mut backend = MockBackend::new();
		backend
			.expect_fetch_branch_orders()
			.times(1)
			.returning(|_| Err(RemoteError::Network("offline".into())));

		let engine = engine_with(backend);
		seed(
			&engine,
			vec![order(1, OrderStatus::Pending, Fulfillment::TakeAway)],
		)
		.await;

		let result = engine.refresh_branch(7).await;
		assert!(matches!(result, Err(BoardError::Remote(_))));

		let board = engine.board(7, false).await.unwrap();
		assert_eq!(board.orders.len(), 1);
	}

	#[tokio::test]
	async fn session_round_trip_and_stale_reset() {
		let engine = engine_with(MockBackend::new());

		// Fresh engine yields the default context
		let ctx = engine.session().await.unwrap();
		assert_eq!(ctx.branch_id, None);

		let mut ctx = SessionContext::default();
		ctx.select_company(1);
		ctx.select_branch(7);
		engine.update_session(ctx.clone()).await.unwrap();

		let loaded = engine.session().await.unwrap();
		assert_eq!(loaded.branch_id, Some(7));

		// A context stored under an older schema resets to defaults
		let stale = SessionContext {
			schema_version: 0,
			company_id: Some(9),
			branch_id: Some(99),
		};
		engine
			.storage()
			.store(StorageKey::Session.as_str(), SESSION_ID, &stale)
			.await
			.unwrap();
		let reset = engine.session().await.unwrap();
		assert_eq!(reset.branch_id, None);
	}

	#[tokio::test]
	async fn available_actions_uses_cached_order() {
		let engine = engine_with(MockBackend::new());
		seed(
			&engine,
			vec![order(1, OrderStatus::Invoiced, Fulfillment::TakeAway)],
		)
		.await;

		let actions = engine
			.available_actions(Role::Cajero, 1)
			.await
			.unwrap();
		assert!(actions.contains(&ActionKind::SendToKitchen));
		assert!(!actions.contains(&ActionKind::Invoice));
	}

	#[tokio::test]
	async fn builder_rejects_unknown_implementations() {
		let mut config = test_config();
		config
			.storage
			.implementations
			.insert("memory".into(), toml::Value::Table(Default::default()));
		config
			.backend
			.implementations
			.insert("http".into(), toml::Value::Table(Default::default()));

		let factories = BoardFactories {
			storage_factories: HashMap::new(),
			backend_factories: HashMap::new(),
		};
		let result = BoardBuilder::new(config).build(factories);
		assert!(matches!(result, Err(BoardError::Config(_))));
	}
}
