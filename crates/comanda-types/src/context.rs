//! Session context: the selected company and branch.
//!
//! The console keeps one piece of client-side state, the company/branch the
//! operator is working on. It is an explicit object persisted through the
//! storage layer under a versioned schema, so a stored context written by an
//! older release is reset instead of misread.

use serde::{Deserialize, Serialize};

/// Current schema version for persisted session contexts.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

fn current_schema_version() -> u32 {
	SESSION_SCHEMA_VERSION
}

/// The operator's working selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
	/// Schema version stamped at write time.
	#[serde(rename = "schemaVersion", default = "current_schema_version")]
	pub schema_version: u32,
	/// Selected company, if any.
	#[serde(rename = "companyId", skip_serializing_if = "Option::is_none")]
	pub company_id: Option<u64>,
	/// Selected branch, if any. Orders are scoped to this branch.
	#[serde(rename = "branchId", skip_serializing_if = "Option::is_none")]
	pub branch_id: Option<u64>,
}

impl Default for SessionContext {
	fn default() -> Self {
		Self {
			schema_version: SESSION_SCHEMA_VERSION,
			company_id: None,
			branch_id: None,
		}
	}
}

impl SessionContext {
	/// Whether this context was written with the current schema.
	pub fn is_current_schema(&self) -> bool {
		self.schema_version == SESSION_SCHEMA_VERSION
	}

	/// Selects a company, clearing any branch that belonged to another one.
	pub fn select_company(&mut self, company_id: u64) {
		if self.company_id != Some(company_id) {
			self.branch_id = None;
		}
		self.company_id = Some(company_id);
	}

	/// Selects a branch within the current company.
	pub fn select_branch(&mut self, branch_id: u64) {
		self.branch_id = Some(branch_id);
	}
}
