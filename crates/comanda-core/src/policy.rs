//! Role-gated action policy for the order board.
//!
//! Pure functions over `(role, order.status, order.fulfillment)`: which
//! actions a role may see on an order, and which status an action moves an
//! order to. No side effects anywhere in this module, so the authorization
//! rules are testable independent of storage and rendering.

use comanda_types::{ActionKind, Fulfillment, Order, OrderStatus, Role};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors produced by the pure transition function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
	/// The action is not applicable from the order's current status. The
	/// order must be left untouched.
	#[error("Action {action} is not applicable from status {from}")]
	InvalidTransition {
		action: ActionKind,
		from: OrderStatus,
	},
	/// The role may not perform the action on this order.
	#[error("Role {role} may not perform {action} on an order in status {status}")]
	Forbidden {
		role: Role,
		action: ActionKind,
		status: OrderStatus,
	},
}

/// Whether an action records the acting employee on the order.
///
/// Only invoicing and cancellation attribute the actor; the remaining
/// transitions leave `empleado` as it was.
pub fn records_employee(action: ActionKind) -> bool {
	matches!(action, ActionKind::Invoice | ActionKind::Cancel)
}

/// Whether `role` is in the eligibility set of `action`, ignoring order state.
fn role_eligible(role: Role, action: ActionKind) -> bool {
	match action {
		ActionKind::Invoice | ActionKind::Cancel | ActionKind::SendToKitchen => {
			matches!(role, Role::Superadmin | Role::Cajero)
		},
		ActionKind::MarkPrepared => matches!(role, Role::Superadmin | Role::Cocinero),
		ActionKind::MarkDelivered => {
			matches!(role, Role::Superadmin | Role::Cajero | Role::Delivery)
		},
		ActionKind::ViewDetail => true,
	}
}

/// Source statuses from which `role` may mark an order delivered.
///
/// The handover stage is split by role: the cashier hands over counter
/// orders (READY), the courier hands over delivery orders (DELIVERY), and a
/// superadmin may do either. Confirmed business rule, implemented as
/// observed.
fn delivery_sources(role: Role) -> &'static [OrderStatus] {
	match role {
		Role::Superadmin => &[OrderStatus::Ready, OrderStatus::Delivery],
		Role::Cajero => &[OrderStatus::Ready],
		Role::Delivery => &[OrderStatus::Delivery],
		_ => &[],
	}
}

/// Checks that `role` may apply `action` to an order in its current status.
///
/// This is the role gate only; the structural precondition is checked by
/// [`transition_target`]. `ViewDetail` passes for every role and status.
pub fn authorize(role: Role, action: ActionKind, order: &Order) -> Result<(), PolicyError> {
	let permitted = match action {
		ActionKind::MarkDelivered => delivery_sources(role).contains(&order.status),
		_ => role_eligible(role, action),
	};

	if permitted {
		Ok(())
	} else {
		Err(PolicyError::Forbidden {
			role,
			action,
			status: order.status,
		})
	}
}

/// Computes the status an action moves the order to.
///
/// Returns `InvalidTransition` when the order is not in the action's source
/// status; callers must treat that as a refusal and leave the order
/// untouched. `ViewDetail` is not a transition and is always refused here.
pub fn transition_target(action: ActionKind, order: &Order) -> Result<OrderStatus, PolicyError> {
	let invalid = || PolicyError::InvalidTransition {
		action,
		from: order.status,
	};

	match (action, order.status) {
		(ActionKind::Invoice, OrderStatus::Pending) => Ok(OrderStatus::Invoiced),
		(ActionKind::Cancel, OrderStatus::Pending) => Ok(OrderStatus::Cancelled),
		(ActionKind::SendToKitchen, OrderStatus::Invoiced) => Ok(OrderStatus::InPreparation),
		(ActionKind::MarkPrepared, OrderStatus::InPreparation) => match order.fulfillment {
			Fulfillment::Delivery => Ok(OrderStatus::Delivery),
			Fulfillment::TakeAway => Ok(OrderStatus::Ready),
		},
		(ActionKind::MarkDelivered, OrderStatus::Ready | OrderStatus::Delivery) => {
			Ok(OrderStatus::Delivered)
		},
		_ => Err(invalid()),
	}
}

/// Computes the set of actions enabled for `role` on `order`.
///
/// Pure function of `(role, order.status, order.fulfillment)`: the same
/// inputs always yield the same set. `ViewDetail` is always present.
pub fn available_actions(role: Role, order: &Order) -> BTreeSet<ActionKind> {
	ActionKind::all()
		.filter(|&action| {
			if action == ActionKind::ViewDetail {
				return true;
			}
			authorize(role, action, order).is_ok()
				&& transition_target(action, order).is_ok()
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use comanda_types::{Fulfillment, Order};

	fn order(status: OrderStatus, fulfillment: Fulfillment) -> Order {
		Order {
			id: 1,
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

	fn actions(role: Role, status: OrderStatus, fulfillment: Fulfillment) -> BTreeSet<ActionKind> {
		available_actions(role, &order(status, fulfillment))
	}

	#[test]
	fn pending_cashier_gets_invoice_and_cancel() {
		let set = actions(Role::Cajero, OrderStatus::Pending, Fulfillment::TakeAway);
		assert!(set.contains(&ActionKind::Invoice));
		assert!(set.contains(&ActionKind::Cancel));
		assert!(!set.contains(&ActionKind::MarkPrepared));
		assert!(!set.contains(&ActionKind::SendToKitchen));
	}

	#[test]
	fn invoiced_cashier_gets_send_to_kitchen_only() {
		let set = actions(Role::Cajero, OrderStatus::Invoiced, Fulfillment::TakeAway);
		let expected: BTreeSet<_> = [ActionKind::SendToKitchen, ActionKind::ViewDetail]
			.into_iter()
			.collect();
		assert_eq!(set, expected);
	}

	#[test]
	fn cook_marks_prepared_only_in_preparation() {
		let set = actions(
			Role::Cocinero,
			OrderStatus::InPreparation,
			Fulfillment::Delivery,
		);
		assert!(set.contains(&ActionKind::MarkPrepared));

		for status in [
			OrderStatus::Pending,
			OrderStatus::Invoiced,
			OrderStatus::Ready,
			OrderStatus::Delivery,
			OrderStatus::Delivered,
			OrderStatus::Cancelled,
		] {
			let set = actions(Role::Cocinero, status, Fulfillment::Delivery);
			assert!(!set.contains(&ActionKind::MarkPrepared), "status {status}");
		}
	}

	#[test]
	fn handover_asymmetry_ready_takeaway() {
		// Courier must not hand over a counter order; the cashier does.
		let courier = actions(Role::Delivery, OrderStatus::Ready, Fulfillment::TakeAway);
		assert!(!courier.contains(&ActionKind::MarkDelivered));

		let cashier = actions(Role::Cajero, OrderStatus::Ready, Fulfillment::TakeAway);
		assert!(cashier.contains(&ActionKind::MarkDelivered));
	}

	#[test]
	fn handover_asymmetry_delivery_stage() {
		let courier = actions(Role::Delivery, OrderStatus::Delivery, Fulfillment::Delivery);
		assert!(courier.contains(&ActionKind::MarkDelivered));

		let cashier = actions(Role::Cajero, OrderStatus::Delivery, Fulfillment::Delivery);
		assert!(!cashier.contains(&ActionKind::MarkDelivered));

		// Superadmin may deliver from either stage
		for status in [OrderStatus::Ready, OrderStatus::Delivery] {
			let set = actions(Role::Superadmin, status, Fulfillment::Delivery);
			assert!(set.contains(&ActionKind::MarkDelivered), "status {status}");
		}
	}

	#[test]
	fn view_detail_always_available_to_every_role() {
		let roles = [
			Role::Superadmin,
			Role::Admin,
			Role::Cajero,
			Role::Cocinero,
			Role::Delivery,
		];
		let statuses = [
			OrderStatus::Pending,
			OrderStatus::Invoiced,
			OrderStatus::InPreparation,
			OrderStatus::Ready,
			OrderStatus::Delivery,
			OrderStatus::Delivered,
			OrderStatus::Cancelled,
		];
		for role in roles {
			for status in statuses {
				let set = actions(role, status, Fulfillment::TakeAway);
				assert!(set.contains(&ActionKind::ViewDetail), "{role} {status}");
			}
		}
	}

	#[test]
	fn admin_is_view_only() {
		for status in [
			OrderStatus::Pending,
			OrderStatus::Invoiced,
			OrderStatus::InPreparation,
			OrderStatus::Ready,
			OrderStatus::Delivery,
		] {
			let set = actions(Role::Admin, status, Fulfillment::Delivery);
			let expected: BTreeSet<_> = [ActionKind::ViewDetail].into_iter().collect();
			assert_eq!(set, expected, "status {status}");
		}
	}

	#[test]
	fn prepared_branches_on_fulfillment() {
		let delivery = order(OrderStatus::InPreparation, Fulfillment::Delivery);
		assert_eq!(
			transition_target(ActionKind::MarkPrepared, &delivery),
			Ok(OrderStatus::Delivery)
		);

		let takeaway = order(OrderStatus::InPreparation, Fulfillment::TakeAway);
		assert_eq!(
			transition_target(ActionKind::MarkPrepared, &takeaway),
			Ok(OrderStatus::Ready)
		);
	}

	#[test]
	fn terminal_statuses_absorb_every_action() {
		for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
			for action in ActionKind::all() {
				let order = order(status, Fulfillment::Delivery);
				assert!(
					transition_target(action, &order).is_err(),
					"{action} from {status}"
				);
			}
		}
	}

	#[test]
	fn wrong_source_status_is_invalid() {
		let order = order(OrderStatus::Pending, Fulfillment::TakeAway);
		assert_eq!(
			transition_target(ActionKind::SendToKitchen, &order),
			Err(PolicyError::InvalidTransition {
				action: ActionKind::SendToKitchen,
				from: OrderStatus::Pending,
			})
		);
		assert!(transition_target(ActionKind::MarkDelivered, &order).is_err());
	}

	#[test]
	fn view_detail_is_not_a_transition() {
		let order = order(OrderStatus::Pending, Fulfillment::TakeAway);
		assert!(transition_target(ActionKind::ViewDetail, &order).is_err());
	}

	#[test]
	fn available_actions_is_pure() {
		let order = order(OrderStatus::Invoiced, Fulfillment::Delivery);
		let first = available_actions(Role::Cajero, &order);
		let second = available_actions(Role::Cajero, &order);
		assert_eq!(first, second);
	}

	#[test]
	fn only_invoice_and_cancel_record_the_actor() {
		assert!(records_employee(ActionKind::Invoice));
		assert!(records_employee(ActionKind::Cancel));
		assert!(!records_employee(ActionKind::SendToKitchen));
		assert!(!records_employee(ActionKind::MarkPrepared));
		assert!(!records_employee(ActionKind::MarkDelivered));
	}

	#[test]
	fn forbidden_error_carries_context() {
		let order = order(OrderStatus::InPreparation, Fulfillment::Delivery);
		let err = authorize(Role::Cajero, ActionKind::MarkPrepared, &order).unwrap_err();
		assert_eq!(
			err,
			PolicyError::Forbidden {
				role: Role::Cajero,
				action: ActionKind::MarkPrepared,
				status: OrderStatus::InPreparation,
			}
		);
	}
}
