//! Staff roles and employee references.
//!
//! Roles are enumerated credentials attached to an authenticated staff
//! member. They are read-only within this subsystem: the console assigns the
//! acting employee at transition time and the board records it on the order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Enumerated credential of a staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	/// Full access to every board action.
	Superadmin,
	/// Management access; view-only on the board.
	Admin,
	/// Cashier: invoices, cancels and hands over counter orders.
	Cajero,
	/// Cook: marks kitchen orders as prepared.
	Cocinero,
	/// Courier: hands over delivery orders.
	Delivery,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Role::Superadmin => "SUPERADMIN",
			Role::Admin => "ADMIN",
			Role::Cajero => "CAJERO",
			Role::Cocinero => "COCINERO",
			Role::Delivery => "DELIVERY",
		};
		write!(f, "{}", name)
	}
}

/// A staff member acting on the board.
///
/// Carried on transition requests and recorded on the order as `empleado`.
/// The role travels with the reference because the backend does not verify
/// it in this view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
	pub id: u64,
	#[serde(rename = "nombre")]
	pub name: String,
	#[serde(rename = "rol")]
	pub role: Role,
}
