//! Configuration sources for layered router settings
//!
//! Sources are merged in priority order
//! (environment variables > TOML file > defaults).

use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Prefix for environment variables read by [`EnvSource::new`].
pub const ENV_PREFIX: &str = "SWITCHYARD_";

/// Trait for configuration sources
pub trait SettingsSource: Send + Sync {
	/// Load configuration from this source
	fn load(&self) -> Result<IndexMap<String, Value>, SettingsError>;

	/// Get the priority of this source (higher = more important)
	fn priority(&self) -> u8;

	/// Get a description of this source
	fn description(&self) -> String;
}

/// Error type for settings loading
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Invalid settings: {0}")]
	Invalid(String),
}

/// Environment variable configuration source
pub struct EnvSource {
	prefix: String,
}

impl EnvSource {
	/// Create a source reading `SWITCHYARD_*` variables
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_conf::sources::EnvSource;
	///
	/// let source = EnvSource::new();
	// Loads SWITCHYARD_PREFIX, SWITCHYARD_DEBUG, ...
	/// ```
	pub fn new() -> Self {
		Self {
			prefix: ENV_PREFIX.to_string(),
		}
	}

	/// Replace the variable prefix filter
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}

	fn parse_value(key: &str, value: String) -> Value {
		match key {
			"debug" | "lint_patterns" => match value.trim().to_lowercase().as_str() {
				"true" | "1" | "yes" | "on" => Value::Bool(true),
				"false" | "0" | "no" | "off" => Value::Bool(false),
				_ => Value::String(value),
			},
			"default_methods" => Value::Array(
				value
					.split([',', '|'])
					.map(str::trim)
					.filter(|s| !s.is_empty())
					.map(|s| Value::String(s.to_string()))
					.collect(),
			),
			// The prefix is a path; "0" or "true" must stay strings.
			"prefix" => Value::String(value),
			_ => {
				if let Ok(num) = value.parse::<i64>() {
					Value::Number(num.into())
				} else {
					Value::String(value)
				}
			}
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl SettingsSource for EnvSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SettingsError> {
		let mut config = IndexMap::new();

		for (key, value) in std::env::vars() {
			let Some(clean_key) = key.strip_prefix(&self.prefix) else {
				continue;
			};
			let lower_key = clean_key.to_lowercase();
			let parsed = Self::parse_value(&lower_key, value);
			config.insert(lower_key, parsed);
		}

		Ok(config)
	}

	fn priority(&self) -> u8 {
		100 // Highest priority
	}

	fn description(&self) -> String {
		format!("Environment variables (prefix: {})", self.prefix)
	}
}

/// TOML file configuration source
///
/// Router settings may live at the root of the file or under a `[router]`
/// table.
pub struct TomlFileSource {
	path: PathBuf,
}

impl TomlFileSource {
	/// Create a new TOML file configuration source
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_conf::sources::TomlFileSource;
	/// use std::path::PathBuf;
	///
	/// let source = TomlFileSource::new(PathBuf::from("switchyard.toml"));
	/// ```
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl SettingsSource for TomlFileSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SettingsError> {
		if !self.path.exists() {
			return Ok(IndexMap::new());
		}

		let content = fs::read_to_string(&self.path)?;
		let toml_value: toml::Value = toml::from_str(&content)?;
		let json_value = serde_json::to_value(&toml_value)?;

		let map = json_value
			.as_object()
			.ok_or_else(|| SettingsError::Invalid("Expected table at root".to_string()))?;
		let map = match map.get("router").and_then(Value::as_object) {
			Some(router) => router,
			None => map,
		};

		Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
	}

	fn priority(&self) -> u8 {
		50 // Medium priority
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// Explicit key/value configuration source
pub struct DefaultSource {
	values: IndexMap<String, Value>,
}

impl DefaultSource {
	/// Create an empty default source
	pub fn new() -> Self {
		Self {
			values: IndexMap::new(),
		}
	}

	/// Add a default value
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_conf::sources::DefaultSource;
	/// use serde_json::Value;
	///
	/// let source = DefaultSource::new()
	///     .with_value("prefix", Value::String("/app/".to_string()));
	/// ```
	pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
		self.values.insert(key.into(), value);
		self
	}
}

impl Default for DefaultSource {
	fn default() -> Self {
		Self::new()
	}
}

impl SettingsSource for DefaultSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SettingsError> {
		Ok(self.values.clone())
	}

	fn priority(&self) -> u8 {
		0 // Lowest priority
	}

	fn description(&self) -> String {
		"Default values".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	#[rstest]
	#[case("debug", "yes", Value::Bool(true))]
	#[case("debug", "0", Value::Bool(false))]
	#[case("weight_divisor", "5000", Value::Number(5000.into()))]
	#[case("prefix", "0", Value::String("0".to_string()))]
	fn test_env_value_parsing(#[case] key: &str, #[case] raw: &str, #[case] expected: Value) {
		assert_eq!(EnvSource::parse_value(key, raw.to_string()), expected);
	}

	#[rstest]
	fn test_env_method_list_parsing() {
		let value = EnvSource::parse_value("default_methods", "GET|POST, PUT".to_string());
		assert_eq!(value, serde_json::json!(["GET", "POST", "PUT"]));
	}

	#[rstest]
	fn test_toml_source_missing_file_is_empty() {
		let source = TomlFileSource::new("/nonexistent/switchyard.toml");
		assert!(source.load().unwrap().is_empty());
	}

	#[rstest]
	fn test_toml_source_reads_router_table() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[router]\nprefix = \"/api/\"\ndebug = true").unwrap();

		let values = TomlFileSource::new(file.path()).load().unwrap();
		assert_eq!(values.get("prefix"), Some(&Value::String("/api/".into())));
		assert_eq!(values.get("debug"), Some(&Value::Bool(true)));
	}

	#[rstest]
	fn test_source_priorities() {
		assert!(EnvSource::new().priority() > TomlFileSource::new("x").priority());
		assert!(TomlFileSource::new("x").priority() > DefaultSource::new().priority());
	}
}
