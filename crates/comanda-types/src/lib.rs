//! Common types module for the comanda order-tracking system.
//!
//! This module defines the core data types and structures shared by every
//! comanda component. It provides a centralized location for domain types
//! (orders, staff, actions), wire-format types for the El Buen Sabor backend,
//! and the configuration validation framework.

/// API types for the HTTP surface consumed by the console view layer.
pub mod api;
/// Catalog resource routing for the backend proxy.
pub mod catalog;
/// Session context for the selected company and branch.
pub mod context;
/// Event types for inter-component communication.
pub mod events;
/// Order domain types: statuses, fulfillment modes, line items, actions.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secret handling for bearer tokens.
pub mod secret_string;
/// Staff roles and employee references.
pub mod staff;
/// Storage namespace types for the local cache.
pub mod storage;
/// Small shared helpers.
pub mod utils;
/// Configuration validation framework for TOML sections.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use catalog::*;
pub use context::*;
pub use events::*;
pub use order::*;
pub use registry::*;
pub use secret_string::*;
pub use staff::*;
pub use storage::*;
pub use utils::{current_unix_secs, truncate_id};
pub use validation::*;
