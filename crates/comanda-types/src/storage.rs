//! Storage namespace types for the local cache.

use std::str::FromStr;

/// Namespaces for the board's cached data.
///
/// Provides type safety for storage operations by replacing string literals
/// with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Cached orders, keyed by order id.
	Orders,
	/// Per-branch index of cached order ids, keyed by branch id.
	BranchOrders,
	/// The persisted session context.
	Session,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::BranchOrders => "branch_orders",
			StorageKey::Session => "session",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Orders, Self::BranchOrders, Self::Session].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orders" => Ok(Self::Orders),
			"branch_orders" => Ok(Self::BranchOrders),
			"session" => Ok(Self::Session),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
