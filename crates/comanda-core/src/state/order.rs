//! Order state machine implementation.
//!
//! Manages order state transitions with validation, ensuring orders only
//! move along the lifecycle graph: PENDING -> INVOICED -> IN_PREPARATION ->
//! READY/DELIVERY -> DELIVERED, with CANCELLED reachable from PENDING only.
//! Also maintains the per-branch order index and the monotonic version used
//! to reject stale transitions.

use crate::policy;
use comanda_types::{
	current_unix_secs, ActionKind, Employee, Order, OrderStatus, StorageKey,
};
use comanda_storage::{StorageError, StorageService};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during order state management.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Order not found: {0}")]
	OrderNotFound(u64),
	#[error("Action {action} is not applicable from status {from}")]
	InvalidAction {
		action: ActionKind,
		from: OrderStatus,
	},
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Order {order_id} changed underneath the transition (expected version {expected}, found {actual})")]
	StaleVersion {
		order_id: u64,
		expected: u64,
		actual: u64,
	},
}

impl From<StorageError> for OrderStateError {
	fn from(e: StorageError) -> Self {
		OrderStateError::Storage(e.to_string())
	}
}

/// Manages order state transitions and cache persistence.
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Gets a cached order by id.
	pub async fn get_order(&self, order_id: u64) -> Result<Order, OrderStateError> {
		match self
			.storage
			.retrieve::<Order>(StorageKey::Orders.as_str(), &order_id.to_string())
			.await
		{
			Ok(order) => Ok(order),
			Err(StorageError::NotFound) => Err(OrderStateError::OrderNotFound(order_id)),
			Err(e) => Err(e.into()),
		}
	}

	/// Stores an order, overwriting any cached copy.
	pub async fn store_order(&self, order: &Order) -> Result<(), OrderStateError> {
		self.storage
			.store(StorageKey::Orders.as_str(), &order.id.to_string(), order)
			.await
			.map_err(Into::into)
	}

	/// Replaces the cached order set for a branch.
	///
	/// Stores each order and rewrites the branch index so `branch_orders`
	/// reflects exactly the fetched list.
	pub async fn replace_branch_orders(
		&self,
		branch_id: u64,
		orders: &[Order],
	) -> Result<(), OrderStateError> {
		for order in orders {
			self.store_order(order).await?;
		}

		let ids: Vec<u64> = orders.iter().map(|o| o.id).collect();
		self.storage
			.store(
				StorageKey::BranchOrders.as_str(),
				&branch_id.to_string(),
				&ids,
			)
			.await
			.map_err(Into::into)
	}

	/// Returns the cached orders of a branch, in the order the backend
	/// listed them. An absent index means the branch was never fetched.
	pub async fn branch_orders(
		&self,
		branch_id: u64,
	) -> Result<Option<Vec<Order>>, OrderStateError> {
		let ids: Vec<u64> = match self
			.storage
			.retrieve(StorageKey::BranchOrders.as_str(), &branch_id.to_string())
			.await
		{
			Ok(ids) => ids,
			Err(StorageError::NotFound) => return Ok(None),
			Err(e) => return Err(e.into()),
		};

		let mut orders = Vec::with_capacity(ids.len());
		for id in ids {
			match self.get_order(id).await {
				Ok(order) => orders.push(order),
				Err(OrderStateError::OrderNotFound(id)) => {
					tracing::warn!(order_id = id, "Indexed order missing from cache");
				},
				Err(e) => return Err(e),
			}
		}
		Ok(Some(orders))
	}

	/// Updates an order with a closure and persists it.
	pub async fn update_order_with<F>(
		&self,
		order_id: u64,
		updater: F,
	) -> Result<Order, OrderStateError>
	where
		F: FnOnce(&mut Order),
	{
		let mut order = self.get_order(order_id).await?;

		updater(&mut order);

		// Bookkeeping happens here so callers cannot forget it
		order.updated_at = current_unix_secs();

		self.store_order(&order).await?;
		Ok(order)
	}

	/// Applies a transition action to a cached order.
	///
	/// The action's source-status precondition is evaluated first; an order
	/// not in the required status is refused with `InvalidAction` and left
	/// untouched. When `expected_version` is given, the cached order must
	/// still carry that version or the transition is refused as stale. On
	/// success the status is replaced, the actor recorded where the action
	/// calls for it, and the version bumped.
	pub async fn apply_action(
		&self,
		order_id: u64,
		action: ActionKind,
		actor: &Employee,
		expected_version: Option<u64>,
	) -> Result<Order, OrderStateError> {
		let order = self.get_order(order_id).await?;

		if let Some(expected) = expected_version {
			if order.version != expected {
				return Err(OrderStateError::StaleVersion {
					order_id,
					expected,
					actual: order.version,
				});
			}
		}

		let target = policy::transition_target(action, &order).map_err(|_| {
			OrderStateError::InvalidAction {
				action,
				from: order.status,
			}
		})?;

		// The edge table is the authority on the graph itself; the policy
		// layer must never produce an edge outside it.
		if !is_valid_edge(order.status, target) {
			return Err(OrderStateError::InvalidTransition {
				from: order.status,
				to: target,
			});
		}

		self.update_order_with(order_id, |order| {
			order.status = target;
			if policy::records_employee(action) {
				order.employee = Some(actor.clone());
			}
			order.version += 1;
		})
		.await
	}
}

/// Checks if a (from, to) status edge belongs to the lifecycle graph.
fn is_valid_edge(from: OrderStatus, to: OrderStatus) -> bool {
	// Static transition table - each status maps to its allowed successors
	static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
		let mut m = HashMap::new();
		m.insert(
			OrderStatus::Pending,
			HashSet::from([OrderStatus::Invoiced, OrderStatus::Cancelled]),
		);
		m.insert(
			OrderStatus::Invoiced,
			HashSet::from([OrderStatus::InPreparation]),
		);
		m.insert(
			OrderStatus::InPreparation,
			HashSet::from([OrderStatus::Ready, OrderStatus::Delivery]),
		);
		m.insert(OrderStatus::Ready, HashSet::from([OrderStatus::Delivered]));
		m.insert(
			OrderStatus::Delivery,
			HashSet::from([OrderStatus::Delivered]),
		);
		m.insert(OrderStatus::Delivered, HashSet::new()); // terminal
		m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
		m
	});

	TRANSITIONS
		.get(&from)
		.is_some_and(|set| set.contains(&to))
}

#[cfg(test)]
mod tests {
	use super::*;
	use comanda_storage::implementations::memory::MemoryStorage;
	use comanda_types::{Fulfillment, Role};

	fn machine() -> OrderStateMachine {
		OrderStateMachine::new(Arc::new(StorageService::new(Box::new(
			MemoryStorage::new(),
		))))
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

	#[tokio::test]
	async fn invoice_records_actor_and_bumps_version() {
		let machine = machine();
		machine
			.store_order(&order(1, OrderStatus::Pending, Fulfillment::TakeAway))
			.await
			.unwrap();

		let updated = machine
			.apply_action(1, ActionKind::Invoice, &cashier(), Some(0))
			.await
			.unwrap();

		assert_eq!(updated.status, OrderStatus::Invoiced);
		assert_eq!(updated.version, 1);
		assert_eq!(updated.employee.as_ref().map(|e| e.id), Some(3));
	}

	#[tokio::test]
	async fn send_to_kitchen_does_not_touch_actor() {
		let machine = machine();
		machine
			.store_order(&order(1, OrderStatus::Invoiced, Fulfillment::TakeAway))
			.await
			.unwrap();

		let updated = machine
			.apply_action(1, ActionKind::SendToKitchen, &cashier(), None)
			.await
			.unwrap();

		assert_eq!(updated.status, OrderStatus::InPreparation);
		assert_eq!(updated.employee, None);
	}

	#[tokio::test]
	async fn invalid_action_leaves_order_untouched() {
		let machine = machine();
		machine
			.store_order(&order(1, OrderStatus::Pending, Fulfillment::TakeAway))
			.await
			.unwrap();

		let result = machine
			.apply_action(1, ActionKind::MarkPrepared, &cashier(), None)
			.await;
		assert!(matches!(
			result,
			Err(OrderStateError::InvalidAction {
				action: ActionKind::MarkPrepared,
				from: OrderStatus::Pending,
			})
		));

		let unchanged = machine.get_order(1).await.unwrap();
		assert_eq!(unchanged.status, OrderStatus::Pending);
		assert_eq!(unchanged.version, 0);
	}

	#[tokio::test]
	async fn stale_version_is_refused() {
		let machine = machine();
		let mut stored = order(1, OrderStatus::Pending, Fulfillment::TakeAway);
		stored.version = 5;
		machine.store_order(&stored).await.unwrap();

		let result = machine
			.apply_action(1, ActionKind::Invoice, &cashier(), Some(4))
			.await;
		assert!(matches!(
			result,
			Err(OrderStateError::StaleVersion {
				order_id: 1,
				expected: 4,
				actual: 5,
			})
		));

		let unchanged = machine.get_order(1).await.unwrap();
		assert_eq!(unchanged.status, OrderStatus::Pending);
	}

	#[tokio::test]
	async fn terminal_orders_absorb_actions() {
		let machine = machine();
		for (id, status) in [(1, OrderStatus::Delivered), (2, OrderStatus::Cancelled)] {
			machine
				.store_order(&order(id, status, Fulfillment::Delivery))
				.await
				.unwrap();

			for action in ActionKind::all() {
				let result = machine.apply_action(id, action, &cashier(), None).await;
				assert!(result.is_err(), "{action} from {status}");
			}

			let unchanged = machine.get_order(id).await.unwrap();
			assert_eq!(unchanged.status, status);
		}
	}

	#[tokio::test]
	async fn missing_order_reported_as_not_found() {
		let machine = machine();
		let result = machine.get_order(99).await;
		assert!(matches!(result, Err(OrderStateError::OrderNotFound(99))));
	}

	#[tokio::test]
	async fn branch_index_round_trip() {
		let machine = machine();
		let orders = vec![
			order(1, OrderStatus::Pending, Fulfillment::TakeAway),
			order(2, OrderStatus::Invoiced, Fulfillment::Delivery),
		];

		assert!(machine.branch_orders(7).await.unwrap().is_none());

		machine.replace_branch_orders(7, &orders).await.unwrap();
		let cached = machine.branch_orders(7).await.unwrap().unwrap();
		assert_eq!(cached.len(), 2);
		assert_eq!(cached[0].id, 1);
		assert_eq!(cached[1].id, 2);

		// A refresh with fewer orders shrinks the index
		machine
			.replace_branch_orders(7, &orders[..1])
			.await
			.unwrap();
		let cached = machine.branch_orders(7).await.unwrap().unwrap();
		assert_eq!(cached.len(), 1);
	}

	#[test]
	fn edge_table_matches_lifecycle() {
		assert!(is_valid_edge(OrderStatus::Pending, OrderStatus::Invoiced));
		assert!(is_valid_edge(OrderStatus::Pending, OrderStatus::Cancelled));
		assert!(is_valid_edge(
			OrderStatus::InPreparation,
			OrderStatus::Delivery
		));
		assert!(!is_valid_edge(OrderStatus::Invoiced, OrderStatus::Pending));
		assert!(!is_valid_edge(OrderStatus::Delivered, OrderStatus::Pending));
		assert!(!is_valid_edge(OrderStatus::Cancelled, OrderStatus::Invoiced));
	}
}
