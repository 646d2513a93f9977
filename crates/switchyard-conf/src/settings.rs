//! Router settings and the layered builder that produces them.

use crate::sources::{SettingsError, SettingsSource};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Methods accepted by a route whose pattern has no `METHOD:` prefix.
pub const DEFAULT_METHODS: [&str; 3] = ["OPTIONS", "GET", "POST"];

/// Settings that shape route compilation, matching and reverse routing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
	/// Global path prefix stripped before matching and prepended to reverse routes.
	pub prefix: String,

	/// Routes without an explicit weight get `counter / weight_divisor`.
	pub weight_divisor: u32,

	/// Trace every rejected candidate route while matching.
	pub debug: bool,

	/// Methods used when a pattern declares none.
	pub default_methods: Vec<String>,

	/// Warn about patterns that fall back to lenient literal matching.
	pub lint_patterns: bool,

	/// Longest pattern string accepted by the compiler, in bytes.
	pub max_pattern_length: usize,
}

impl Default for RouterSettings {
	fn default() -> Self {
		Self {
			prefix: "/".to_string(),
			weight_divisor: 1000,
			debug: false,
			default_methods: DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
			lint_patterns: true,
			max_pattern_length: 1024,
		}
	}
}

impl RouterSettings {
	/// Start a layered settings builder.
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_conf::RouterSettings;
	/// use switchyard_conf::sources::DefaultSource;
	/// use serde_json::Value;
	///
	/// let settings = RouterSettings::builder()
	///     .add_source(DefaultSource::new().with_value("prefix", Value::String("".into())))
	///     .build()
	///     .unwrap();
	/// assert_eq!(settings.prefix, "");
	/// assert_eq!(settings.weight_divisor, 1000);
	/// ```
	pub fn builder() -> SettingsBuilder {
		SettingsBuilder::new()
	}

	/// Set the global prefix.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}

	/// Enable or disable candidate tracing.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// Set the implicit weight divisor.
	pub fn with_weight_divisor(mut self, divisor: u32) -> Self {
		self.weight_divisor = divisor;
		self
	}

	/// Check invariants the router relies on.
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.weight_divisor == 0 {
			return Err(SettingsError::Invalid(
				"weight_divisor must be greater than zero".to_string(),
			));
		}
		if self.default_methods.is_empty() {
			return Err(SettingsError::Invalid(
				"default_methods must name at least one method".to_string(),
			));
		}
		if self.max_pattern_length == 0 {
			return Err(SettingsError::Invalid(
				"max_pattern_length must be greater than zero".to_string(),
			));
		}
		Ok(())
	}
}

/// Merges settings sources by priority and deserializes the result.
#[derive(Default)]
pub struct SettingsBuilder {
	sources: Vec<Box<dyn SettingsSource>>,
}

impl SettingsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a configuration source.
	pub fn add_source<S: SettingsSource + 'static>(mut self, source: S) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Merge all sources (lowest priority first) into a raw value map.
	pub fn merged(&self) -> Result<IndexMap<String, Value>, SettingsError> {
		let mut sources: Vec<&Box<dyn SettingsSource>> = self.sources.iter().collect();
		sources.sort_by_key(|source| source.priority());

		let mut merged = IndexMap::new();
		for source in sources {
			let values = source.load()?;
			tracing::trace!(
				source = %source.description(),
				keys = values.len(),
				"Loaded router settings source"
			);
			merged.extend(values);
		}
		Ok(merged)
	}

	/// Build and validate [`RouterSettings`].
	pub fn build(&self) -> Result<RouterSettings, SettingsError> {
		let merged = self.merged()?;
		let object: serde_json::Map<String, Value> = merged.into_iter().collect();
		let settings: RouterSettings = serde_json::from_value(Value::Object(object))?;
		settings.validate()?;
		Ok(settings)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sources::DefaultSource;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let settings = RouterSettings::default();
		assert_eq!(settings.prefix, "/");
		assert_eq!(settings.weight_divisor, 1000);
		assert_eq!(settings.default_methods, vec!["OPTIONS", "GET", "POST"]);
		assert!(settings.validate().is_ok());
	}

	#[rstest]
	fn test_zero_divisor_is_rejected() {
		let result = RouterSettings::builder()
			.add_source(DefaultSource::new().with_value("weight_divisor", Value::from(0)))
			.build();
		assert!(matches!(result, Err(SettingsError::Invalid(_))));
	}

	#[rstest]
	fn test_empty_method_list_is_rejected() {
		let settings = RouterSettings {
			default_methods: vec![],
			..Default::default()
		};
		assert!(settings.validate().is_err());
	}

	#[rstest]
	fn test_wrong_type_is_a_json_error() {
		let result = RouterSettings::builder()
			.add_source(DefaultSource::new().with_value("debug", Value::from("sometimes")))
			.build();
		assert!(matches!(result, Err(SettingsError::Json(_))));
	}
}
