//! Catalog resource routing for the backend proxy.
//!
//! The console manages companies, branches, categories, articles, promotions
//! and employees by delegating their CRUD to the remote backend. The proxy
//! carries those payloads untouched; this module only provides the typed
//! whitelist of resources it will forward.

use std::fmt;
use std::str::FromStr;

/// Backend resources the catalog proxy forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogResource {
	/// Companies (`empresa`).
	Company,
	/// Branches (`sucursal`).
	Branch,
	/// Category tree nodes (`categoria`).
	Category,
	/// Prepared menu items (`articuloManufacturado`).
	ManufacturedArticle,
	/// Stocked ingredients (`articuloInsumo`).
	SupplyArticle,
	/// Bundled offers (`promocion`).
	Promotion,
	/// Staff members (`empleado`).
	Employee,
}

impl CatalogResource {
	/// The backend path segment for this resource.
	pub fn as_path(&self) -> &'static str {
		match self {
			CatalogResource::Company => "empresa",
			CatalogResource::Branch => "sucursal",
			CatalogResource::Category => "categoria",
			CatalogResource::ManufacturedArticle => "articuloManufacturado",
			CatalogResource::SupplyArticle => "articuloInsumo",
			CatalogResource::Promotion => "promocion",
			CatalogResource::Employee => "empleado",
		}
	}

	/// Returns an iterator over all resources.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Company,
			Self::Branch,
			Self::Category,
			Self::ManufacturedArticle,
			Self::SupplyArticle,
			Self::Promotion,
			Self::Employee,
		]
		.into_iter()
	}
}

impl fmt::Display for CatalogResource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_path())
	}
}

impl FromStr for CatalogResource {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"empresa" => Ok(Self::Company),
			"sucursal" => Ok(Self::Branch),
			"categoria" => Ok(Self::Category),
			"articuloManufacturado" => Ok(Self::ManufacturedArticle),
			"articuloInsumo" => Ok(Self::SupplyArticle),
			"promocion" => Ok(Self::Promotion),
			"empleado" => Ok(Self::Employee),
			_ => Err(()),
		}
	}
}
