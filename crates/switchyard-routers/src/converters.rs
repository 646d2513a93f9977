//! Conversion of raw path segments into typed argument values.

use crate::model::Model;
use crate::services::ModelFactory;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use switchyard_exception::{Error, Result};

/// A path argument after type conversion.
#[derive(Debug, Clone, Default)]
pub enum ArgValue {
	/// The segment was absent from the path.
	#[default]
	Null,
	String(String),
	Int(i64),
	Float(f64),
	List(Vec<String>),
	Model(Arc<dyn Model>),
}

impl ArgValue {
	pub fn is_null(&self) -> bool {
		matches!(self, ArgValue::Null)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			ArgValue::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			ArgValue::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			ArgValue::Float(f) => Some(*f),
			ArgValue::Int(i) => Some(*i as f64),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[String]> {
		match self {
			ArgValue::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_model(&self) -> Option<&Arc<dyn Model>> {
		match self {
			ArgValue::Model(model) => Some(model),
			_ => None,
		}
	}

	/// JSON form used for diagnostics. Models become `{"class", "id"}`.
	pub fn to_json(&self) -> Value {
		match self {
			ArgValue::Null => Value::Null,
			ArgValue::String(s) => Value::String(s.clone()),
			ArgValue::Int(i) => Value::from(*i),
			ArgValue::Float(f) => Value::from(*f),
			ArgValue::List(items) => Value::from(items.clone()),
			ArgValue::Model(model) => serde_json::json!({
				"class": model.class_name(),
				"id": model.id(),
			}),
		}
	}
}

/// Text used when the value is substituted into a string.
impl fmt::Display for ArgValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ArgValue::Null => Ok(()),
			ArgValue::String(s) => f.write_str(s),
			ArgValue::Int(i) => write!(f, "{}", i),
			ArgValue::Float(v) => write!(f, "{}", v),
			ArgValue::List(items) => f.write_str(&items.join(";")),
			ArgValue::Model(model) => f.write_str(&model.id()),
		}
	}
}

impl PartialEq for ArgValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(ArgValue::Null, ArgValue::Null) => true,
			(ArgValue::String(a), ArgValue::String(b)) => a == b,
			(ArgValue::Int(a), ArgValue::Int(b)) => a == b,
			(ArgValue::Float(a), ArgValue::Float(b)) => a == b,
			(ArgValue::List(a), ArgValue::List(b)) => a == b,
			(ArgValue::Model(a), ArgValue::Model(b)) => {
				Arc::ptr_eq(a, b) || (a.class_name() == b.class_name() && a.id() == b.id())
			}
			_ => false,
		}
	}
}

impl From<&str> for ArgValue {
	fn from(value: &str) -> Self {
		ArgValue::String(value.to_string())
	}
}

impl From<String> for ArgValue {
	fn from(value: String) -> Self {
		ArgValue::String(value)
	}
}

impl From<i64> for ArgValue {
	fn from(value: i64) -> Self {
		ArgValue::Int(value)
	}
}

/// How a placeholder's type name converts its segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentType {
	/// No type, or `string`: the raw text.
	Untyped,
	/// `option`: the raw text, also set as a route option named after the
	/// placeholder.
	Option,
	/// `list`, `array`, `semicolon_list`, `comma_list`, `dash_list`.
	List(char),
	/// `float` or `double`.
	Float,
	/// `int` or `integer`.
	Int,
	/// Any other type names a model class.
	Model(String),
}

impl ArgumentType {
	/// Interpret a cleaned placeholder type name.
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_routers::converters::ArgumentType;
	///
	/// assert_eq!(ArgumentType::parse(""), ArgumentType::Untyped);
	/// assert_eq!(ArgumentType::parse("comma_list"), ArgumentType::List(','));
	/// assert_eq!(ArgumentType::parse("integer"), ArgumentType::Int);
	/// assert_eq!(ArgumentType::parse("User"), ArgumentType::Model("User".into()));
	/// ```
	pub fn parse(type_name: &str) -> Self {
		match type_name {
			"" | "string" => ArgumentType::Untyped,
			"option" => ArgumentType::Option,
			"list" | "array" | "semicolon_list" => ArgumentType::List(';'),
			"comma_list" => ArgumentType::List(','),
			"dash_list" => ArgumentType::List('-'),
			"float" | "double" => ArgumentType::Float,
			"int" | "integer" => ArgumentType::Int,
			class => ArgumentType::Model(class.to_string()),
		}
	}
}

/// Whether `raw` is a decimal number, allowing surrounding whitespace, a sign,
/// a fraction and an exponent.
pub fn is_numeric(raw: &str) -> bool {
	let trimmed = raw.trim();
	!trimmed.is_empty()
		&& trimmed
			.chars()
			.all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
		&& trimmed.parse::<f64>().is_ok()
}

/// Convert to an integer. Fractions are truncated toward zero.
///
/// # Examples
///
/// ```
/// use switchyard_routers::converters::to_int;
///
/// assert_eq!(to_int("42").unwrap(), 42);
/// assert_eq!(to_int("4.5").unwrap(), 4);
/// assert!(to_int("abc").is_err());
/// ```
pub fn to_int(raw: &str) -> Result<i64> {
	if !is_numeric(raw) {
		return Err(Error::Syntax(format!("\"{}\" is not an integer", raw)));
	}
	let trimmed = raw.trim();
	if let Ok(value) = trimmed.parse::<i64>() {
		return Ok(value);
	}
	let value = trimmed
		.parse::<f64>()
		.map_err(|e| Error::Syntax(format!("\"{}\": {}", raw, e)))?;
	if !value.is_finite() || value.abs() >= i64::MAX as f64 {
		return Err(Error::Syntax(format!("\"{}\" is out of integer range", raw)));
	}
	Ok(value.trunc() as i64)
}

/// Convert to a float.
pub fn to_float(raw: &str) -> Result<f64> {
	if !is_numeric(raw) {
		return Err(Error::Syntax(format!("\"{}\" is not a number", raw)));
	}
	raw.trim()
		.parse::<f64>()
		.map_err(|e| Error::Syntax(format!("\"{}\": {}", raw, e)))
}

/// Split on `separator`. An empty segment is an empty list.
pub fn to_list(raw: &str, separator: char) -> Vec<String> {
	if raw.is_empty() {
		return Vec::new();
	}
	raw.split(separator).map(str::to_string).collect()
}

/// Resolve a model segment through the factory.
///
/// A factory error and an absent model both become [`Error::NotFound`].
pub async fn to_model(
	factory: &dyn ModelFactory,
	class: &str,
	raw: &str,
	argument: &str,
) -> Result<Arc<dyn Model>> {
	let not_found = || {
		Error::NotFound(format!(
			"{} ({}) not found with value \"{}\"",
			argument, class, raw
		))
	};
	match factory.create(class, raw).await {
		Ok(Some(model)) => Ok(model),
		Ok(None) => Err(not_found()),
		Err(err) => {
			tracing::debug!(class, raw, error = %err, "Model factory failed");
			Err(not_found())
		}
	}
}
