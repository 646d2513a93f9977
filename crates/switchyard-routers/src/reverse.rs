//! Inputs to reverse routing.

use crate::model::Model;
use crate::route::RouteMatch;
use std::collections::BTreeMap;
use std::sync::Arc;
use switchyard_exception::{Error, Result};

/// What a reverse lookup is for.
#[derive(Debug, Clone, Copy, Default)]
pub enum ReverseTarget<'a> {
	/// Only routes registered for `*` (or found by id) apply.
	#[default]
	None,
	/// A model instance. Its class hierarchy selects routes and its id fills
	/// matching placeholders.
	Object(&'a dyn Model),
	/// A class name.
	Class(&'a str),
	/// Several class names, tried in order.
	Classes(&'a [&'a str]),
}

impl<'a> ReverseTarget<'a> {
	pub fn object(&self) -> Option<&'a dyn Model> {
		match self {
			ReverseTarget::Object(object) => Some(*object),
			_ => None,
		}
	}
}

impl<'a> From<&'a dyn Model> for ReverseTarget<'a> {
	fn from(object: &'a dyn Model) -> Self {
		ReverseTarget::Object(object)
	}
}

impl<'a> From<&'a str> for ReverseTarget<'a> {
	fn from(class: &'a str) -> Self {
		ReverseTarget::Class(class)
	}
}

/// A value supplied to reverse routing.
#[derive(Debug, Clone)]
pub enum ReverseValue {
	Text(String),
	/// A model whose id fills the placeholder of the same name.
	Model(Arc<dyn Model>),
}

/// Values, derived ids and query parameters for a reverse lookup.
///
/// # Examples
///
/// ```
/// use switchyard_routers::reverse::ReverseOptions;
///
/// let options = ReverseOptions::new()
///     .with_value("page", "2")
///     .with_query("sort", "name");
/// assert!(options.has_text("page"));
/// assert_eq!(options.append_query("users".to_string()), "users?sort=name");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReverseOptions {
	values: BTreeMap<String, ReverseValue>,
	derived_classes: BTreeMap<String, String>,
	query: Vec<(String, String)>,
}

impl ReverseOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fill placeholder `name` with `value`. Explicit values win over ids
	/// taken from the target object.
	pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.values
			.insert(name.into(), ReverseValue::Text(value.into()));
		self
	}

	pub fn with_model(mut self, name: impl Into<String>, model: Arc<dyn Model>) -> Self {
		self.values.insert(name.into(), ReverseValue::Model(model));
		self
	}

	/// Fill placeholders typed `class` with `id`.
	pub fn with_derived_class(mut self, class: &str, id: impl Into<String>) -> Self {
		self.derived_classes.insert(class.to_lowercase(), id.into());
		self
	}

	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));
		self
	}

	/// Add query parameters from an encoded query string. A leading `?` is
	/// accepted.
	pub fn with_query_string(mut self, query: &str) -> Result<Self> {
		let query = query.strip_prefix('?').unwrap_or(query);
		let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
			.map_err(|e| Error::Configuration(format!("invalid query string {:?}: {}", query, e)))?;
		self.query.extend(pairs);
		Ok(self)
	}

	/// Reuse the raw arguments of the current match for placeholders that
	/// have no explicit value.
	pub fn inherit(mut self, current: &RouteMatch) -> Self {
		let inherited: Vec<(String, String)> = current
			.route()
			.pattern()
			.variables()
			.filter_map(|(_, _, name)| current.raw(name).map(|raw| (name.to_string(), raw.to_string())))
			.collect();
		for (name, raw) in inherited {
			self.values
				.entry(name)
				.or_insert(ReverseValue::Text(raw));
		}
		self
	}

	pub fn has_text(&self, name: &str) -> bool {
		matches!(self.values.get(name), Some(ReverseValue::Text(_)))
	}

	pub fn model(&self, name: &str) -> Option<&Arc<dyn Model>> {
		match self.values.get(name) {
			Some(ReverseValue::Model(model)) => Some(model),
			_ => None,
		}
	}

	pub fn derived_class(&self, class: &str) -> Option<&str> {
		self.derived_classes
			.get(&class.to_lowercase())
			.map(String::as_str)
	}

	/// Textual values as a token map.
	pub fn text_values(&self) -> BTreeMap<String, String> {
		self.values
			.iter()
			.filter_map(|(name, value)| match value {
				ReverseValue::Text(text) => Some((name.clone(), text.clone())),
				ReverseValue::Model(_) => None,
			})
			.collect()
	}

	pub(crate) fn merge_text_defaults(&mut self, defaults: BTreeMap<String, String>) {
		for (name, value) in defaults {
			self.values.entry(name).or_insert(ReverseValue::Text(value));
		}
	}

	pub(crate) fn merge_derived_classes(&mut self, derived: BTreeMap<String, String>) {
		for (class, id) in derived {
			self.derived_classes
				.entry(class.to_lowercase())
				.or_insert(id);
		}
	}

	pub fn query(&self) -> &[(String, String)] {
		&self.query
	}

	/// Append the query parameters to `url` with `?`, or `&` when `url`
	/// already has a query.
	pub fn append_query(&self, url: String) -> String {
		if self.query.is_empty() {
			return url;
		}
		let Ok(encoded) = serde_urlencoded::to_string(&self.query) else {
			return url;
		};
		let separator = if url.contains('?') { '&' } else { '?' };
		format!("{}{}{}", url, separator, encoded)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("users", "users?a=1&b=two+words")]
	#[case("users?x=0", "users?x=0&a=1&b=two+words")]
	fn test_append_query(#[case] url: &str, #[case] expected: &str) {
		let options = ReverseOptions::new()
			.with_query("a", "1")
			.with_query("b", "two words");
		assert_eq!(options.append_query(url.to_string()), expected);
	}

	#[rstest]
	fn test_query_string_with_leading_question_mark() {
		let options = ReverseOptions::new().with_query_string("?q=rust&page=2").unwrap();
		assert_eq!(
			options.query(),
			&[
				("q".to_string(), "rust".to_string()),
				("page".to_string(), "2".to_string())
			]
		);
	}

	#[rstest]
	fn test_defaults_do_not_override_explicit_values() {
		let mut options = ReverseOptions::new().with_value("tab", "posts");
		options.merge_text_defaults(BTreeMap::from([
			("tab".to_string(), "profile".to_string()),
			("lang".to_string(), "en".to_string()),
		]));
		let values = options.text_values();
		assert_eq!(values["tab"], "posts");
		assert_eq!(values["lang"], "en");
	}

	#[rstest]
	fn test_derived_classes_are_case_insensitive() {
		let options = ReverseOptions::new().with_derived_class("Account", "12");
		assert_eq!(options.derived_class("account"), Some("12"));
		assert_eq!(options.derived_class("ACCOUNT"), Some("12"));
	}
}
