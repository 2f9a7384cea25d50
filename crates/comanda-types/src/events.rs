//! Event types for inter-component communication.
//!
//! This module defines the events published on the board's broadcast bus.
//! Consumers (the run loop, logging, tests) react to transition outcomes and
//! synchronization results without coupling to the engine internals.

use crate::order::{ActionKind, OrderStatus};
use crate::staff::Employee;
use serde::{Deserialize, Serialize};

/// Main event type encompassing all board events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BoardEvent {
	/// Events from the order transition path.
	Order(OrderEvent),
	/// Events from the refresh/synchronization path.
	Sync(SyncEvent),
}

/// Events related to order transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A transition was applied locally and confirmed by the backend.
	TransitionApplied {
		order_id: u64,
		action: ActionKind,
		from: OrderStatus,
		to: OrderStatus,
		actor: Employee,
	},
	/// A transition was refused before any write (policy or precondition).
	TransitionRejected {
		order_id: u64,
		action: ActionKind,
		reason: String,
	},
	/// An optimistic transition was undone after the backend refused it.
	TransitionRolledBack {
		order_id: u64,
		action: ActionKind,
		restored: OrderStatus,
		error: String,
	},
}

/// Events related to board synchronization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncEvent {
	/// A branch order list was fetched and the cache replaced.
	BranchRefreshed {
		branch_id: u64,
		orders: usize,
		revision: u64,
	},
	/// A refresh attempt failed; the cached list is kept.
	RefreshFailed { branch_id: u64, error: String },
}
