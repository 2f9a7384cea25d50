//! Configuration validation framework for TOML sections.
//!
//! Pluggable implementations (storage backends, backend clients) declare the
//! shape of their own TOML section through a small schema: required and
//! optional fields, each with a type and an optional custom validator.
//! Validation runs before an implementation is constructed, so bad
//! configuration fails at startup with a precise field path.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// The type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	/// A string value.
	String,
	/// An integer value with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	/// A boolean value.
	Boolean,
	/// An array of values, all of the same type.
	Array(Box<FieldType>),
	/// A nested table with its own schema.
	Table(Schema),
}

/// Custom validator run after type checking.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a configuration schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	/// Creates a new field with the given name and type.
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// A validation schema for one TOML table.
///
/// Schemas nest through [`FieldType::Table`] to validate hierarchical
/// configurations; error paths are prefixed with the enclosing field name.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	/// Creates a new schema with required and optional fields.
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// Checks presence of required fields, types of every present field,
	/// custom validators, and recursively validates nested tables.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			Self::check_field(&field.name, value, field)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				Self::check_field(&field.name, value, field)?;
			}
		}

		Ok(())
	}

	fn check_field(
		name: &str,
		value: &toml::Value,
		field: &Field,
	) -> Result<(), ValidationError> {
		Self::check_type(name, value, &field.field_type)?;
		if let Some(validator) = &field.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: name.to_string(),
				message,
			})?;
		}
		Ok(())
	}

	fn check_type(
		field_name: &str,
		value: &toml::Value,
		expected: &FieldType,
	) -> Result<(), ValidationError> {
		let mismatch = |expected: &str| ValidationError::TypeMismatch {
			field: field_name.to_string(),
			expected: expected.to_string(),
			actual: value.type_str().to_string(),
		};

		match expected {
			FieldType::String => {
				if !value.is_str() {
					return Err(mismatch("string"));
				}
			},
			FieldType::Integer { min, max } => {
				let int_val = value.as_integer().ok_or_else(|| mismatch("integer"))?;
				if let Some(min_val) = min {
					if int_val < *min_val {
						return Err(ValidationError::InvalidValue {
							field: field_name.to_string(),
							message: format!(
								"Value {} is less than minimum {}",
								int_val, min_val
							),
						});
					}
				}
				if let Some(max_val) = max {
					if int_val > *max_val {
						return Err(ValidationError::InvalidValue {
							field: field_name.to_string(),
							message: format!(
								"Value {} is greater than maximum {}",
								int_val, max_val
							),
						});
					}
				}
			},
			FieldType::Boolean => {
				if !value.is_bool() {
					return Err(mismatch("boolean"));
				}
			},
			FieldType::Array(inner) => {
				let array = value.as_array().ok_or_else(|| mismatch("array"))?;
				for (i, item) in array.iter().enumerate() {
					Self::check_type(&format!("{}[{}]", field_name, i), item, inner)?;
				}
			},
			FieldType::Table(schema) => {
				schema.validate(value).map_err(|e| match e {
					ValidationError::MissingField(f) => {
						ValidationError::MissingField(format!("{}.{}", field_name, f))
					},
					ValidationError::InvalidValue { field, message } => {
						ValidationError::InvalidValue {
							field: format!("{}.{}", field_name, field),
							message,
						}
					},
					ValidationError::TypeMismatch {
						field,
						expected,
						actual,
					} => ValidationError::TypeMismatch {
						field: format!("{}.{}", field_name, field),
						expected,
						actual,
					},
				})?;
			},
		}

		Ok(())
	}
}

/// Trait for implementation-specific configuration schemas.
///
/// Each pluggable implementation returns its schema through this trait so the
/// builder can validate the matching TOML section before constructing it.
pub trait ConfigSchema: Send + Sync {
	/// Validates a TOML configuration value against this schema.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}
