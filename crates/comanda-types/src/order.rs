//! Order domain types for the comanda system.
//!
//! This module defines the order entity as exchanged with the El Buen Sabor
//! backend, its lifecycle statuses, the fulfillment modes that steer the
//! post-preparation branch, and the transition actions the board can apply.
//! Wire field names follow the backend's Spanish vocabulary via serde renames.

use crate::staff::Employee;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A customer order tracked on the board.
///
/// Orders are created by an external ordering channel and mutated here only
/// through lifecycle transitions. Monetary aggregates are carried as received,
/// never recomputed locally. The `version` field is a monotonic write counter
/// exchanged with the backend so stale transitions are rejected instead of
/// silently overwriting concurrent changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	/// Backend-assigned numeric identifier.
	pub id: u64,
	/// Current lifecycle status.
	#[serde(rename = "estado")]
	pub status: OrderStatus,
	/// Fulfillment mode chosen by the customer.
	#[serde(rename = "tipoEnvio")]
	pub fulfillment: Fulfillment,
	/// Branch this order belongs to.
	#[serde(rename = "sucursalId", default)]
	pub branch_id: u64,
	/// Sale total, carried as received.
	pub total: Decimal,
	/// Cost total, carried as received.
	#[serde(rename = "totalCosto")]
	pub total_cost: Decimal,
	/// Line items; read-only in this view.
	#[serde(rename = "detallePedidos", default)]
	pub lines: Vec<OrderLine>,
	/// Staff member who performed the most recent state-changing action.
	#[serde(rename = "empleado", skip_serializing_if = "Option::is_none")]
	pub employee: Option<Employee>,
	/// Monotonic write counter for conflict detection.
	#[serde(default)]
	pub version: u64,
	/// Timestamp when this order was created (Unix seconds).
	#[serde(rename = "createdAt", default)]
	pub created_at: u64,
	/// Timestamp when this order was last updated (Unix seconds).
	#[serde(rename = "updatedAt", default)]
	pub updated_at: u64,
}

impl Order {
	/// Whether the order sits in a terminal status.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self.status,
			OrderStatus::Delivered | OrderStatus::Cancelled
		)
	}
}

/// Lifecycle status of an order.
///
/// Statuses only ever move forward along the transition graph, with
/// cancellation reachable from the initial status only. `Delivered` and
/// `Cancelled` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Order received from the ordering channel, not yet invoiced.
	Pending,
	/// Invoice issued, waiting to be sent to the kitchen.
	Invoiced,
	/// Kitchen is working on the order.
	InPreparation,
	/// Prepared and waiting for counter pickup (take-away orders).
	Ready,
	/// Prepared and out with a courier (delivery orders).
	Delivery,
	/// Handed to the customer. Terminal.
	Delivered,
	/// Cancelled before invoicing. Terminal.
	Cancelled,
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			OrderStatus::Pending => "PENDING",
			OrderStatus::Invoiced => "INVOICED",
			OrderStatus::InPreparation => "IN_PREPARATION",
			OrderStatus::Ready => "READY",
			OrderStatus::Delivery => "DELIVERY",
			OrderStatus::Delivered => "DELIVERED",
			OrderStatus::Cancelled => "CANCELLED",
		};
		write!(f, "{}", name)
	}
}

/// Fulfillment mode of an order.
///
/// Decides which post-preparation status an order moves to: delivery orders
/// go out with a courier, take-away orders wait at the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Fulfillment {
	/// Courier delivery to the customer's address.
	Delivery,
	/// Customer picks the order up at the branch.
	TakeAway,
}

impl fmt::Display for Fulfillment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Fulfillment::Delivery => write!(f, "DELIVERY"),
			Fulfillment::TakeAway => write!(f, "TAKE_AWAY"),
		}
	}
}

/// A single order line: a quantity of one sellable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
	/// Units ordered.
	#[serde(rename = "cantidad")]
	pub quantity: u32,
	/// Line subtotal, carried as received.
	#[serde(rename = "subTotal")]
	pub subtotal: Decimal,
	/// The item this line sells.
	#[serde(flatten)]
	pub item: LineItem,
}

/// The sellable item referenced by an order line.
///
/// Exactly one of the backend's article/promotion fields is set per line;
/// the externally tagged representation mirrors that shape on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LineItem {
	/// A prepared menu item.
	#[serde(rename = "articuloManufacturado")]
	Manufactured(ItemRef),
	/// A stocked ingredient sold directly.
	#[serde(rename = "articuloInsumo")]
	Supply(ItemRef),
	/// A bundled promotion.
	#[serde(rename = "promocion")]
	Promotion(ItemRef),
}

/// Reference to an article or promotion by id and display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRef {
	pub id: u64,
	#[serde(rename = "denominacion")]
	pub name: String,
}

/// Transition actions the board exposes on an order row.
///
/// Which actions are enabled for a given role and order is computed by the
/// pure policy function; applying one goes through the state machine.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
	/// Issue the invoice for a pending order.
	Invoice,
	/// Cancel a pending order.
	Cancel,
	/// Hand an invoiced order to the kitchen.
	SendToKitchen,
	/// Mark a kitchen order as prepared.
	MarkPrepared,
	/// Mark a prepared order as handed to the customer.
	MarkDelivered,
	/// Open the order detail. Never gated by status.
	ViewDetail,
}

impl ActionKind {
	/// Returns an iterator over all actions.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Invoice,
			Self::Cancel,
			Self::SendToKitchen,
			Self::MarkPrepared,
			Self::MarkDelivered,
			Self::ViewDetail,
		]
		.into_iter()
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ActionKind::Invoice => "INVOICE",
			ActionKind::Cancel => "CANCEL",
			ActionKind::SendToKitchen => "SEND_TO_KITCHEN",
			ActionKind::MarkPrepared => "MARK_PREPARED",
			ActionKind::MarkDelivered => "MARK_DELIVERED",
			ActionKind::ViewDetail => "VIEW_DETAIL",
		};
		write!(f, "{}", name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::staff::Role;
	use rust_decimal::Decimal;

	fn sample_order() -> Order {
		Order {
			id: 42,
			status: OrderStatus::Pending,
			fulfillment: Fulfillment::TakeAway,
			branch_id: 7,
			total: Decimal::new(250_050, 2),
			total_cost: Decimal::new(120_000, 2),
			lines: vec![OrderLine {
				quantity: 2,
				subtotal: Decimal::new(125_025, 2),
				item: LineItem::Manufactured(ItemRef {
					id: 7,
					name: "Pizza napolitana".into(),
				}),
			}],
			employee: Some(Employee {
				id: 3,
				name: "Marta".into(),
				role: Role::Cajero,
			}),
			version: 4,
			created_at: 1_700_000_000,
			updated_at: 1_700_000_300,
		}
	}

	#[test]
	fn order_uses_backend_wire_names() {
		let json = serde_json::to_value(sample_order()).unwrap();
		assert_eq!(json["estado"], "PENDING");
		assert_eq!(json["tipoEnvio"], "TAKE_AWAY");
		assert_eq!(json["totalCosto"], "1200.00");
		assert!(json["detallePedidos"].is_array());
		assert_eq!(json["empleado"]["nombre"], "Marta");
	}

	#[test]
	fn order_round_trips() {
		let order = sample_order();
		let json = serde_json::to_string(&order).unwrap();
		let back: Order = serde_json::from_str(&json).unwrap();
		assert_eq!(back, order);
	}

	#[test]
	fn line_item_is_externally_tagged() {
		let line = OrderLine {
			quantity: 1,
			subtotal: Decimal::new(9_990, 2),
			item: LineItem::Promotion(ItemRef {
				id: 11,
				name: "Combo familiar".into(),
			}),
		};
		let json = serde_json::to_value(&line).unwrap();
		assert_eq!(json["promocion"]["denominacion"], "Combo familiar");
		assert!(json.get("articuloManufacturado").is_none());
	}

	#[test]
	fn terminal_statuses() {
		let mut order = sample_order();
		assert!(!order.is_terminal());
		order.status = OrderStatus::Delivered;
		assert!(order.is_terminal());
		order.status = OrderStatus::Cancelled;
		assert!(order.is_terminal());
	}
}
