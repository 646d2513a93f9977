//! Domain models as seen by the router.
//!
//! The router never loads models itself. It only needs to know a model's
//! class, its id, and where the class sits in the inheritance hierarchy so
//! that typed arguments can be indexed by every ancestor class and reverse
//! routes registered for a parent class can serve its subclasses.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Name of the class every model hierarchy ends in.
pub const ROOT_MODEL: &str = "Model";

/// A domain object resolved from a typed path segment.
pub trait Model: Send + Sync + fmt::Debug {
	/// Class name used for hierarchy lookups and reverse routing.
	fn class_name(&self) -> &str;

	/// Identifier substituted into reverse routes.
	fn id(&self) -> String;
}

#[derive(Debug, Clone)]
struct ClassEntry {
	name: String,
	parent: Option<String>,
}

/// Class hierarchy and alias table.
///
/// Lookups are case-insensitive; the spelling used at registration is the
/// one returned.
///
/// # Examples
///
/// ```
/// use switchyard_routers::model::ModelRegistry;
///
/// let mut registry = ModelRegistry::new();
/// registry.register("Person", None).register("Author", Some("Person"));
/// registry.alias("writer", "Author");
///
/// assert_eq!(registry.resolve("WRITER"), "Author");
/// assert_eq!(registry.hierarchy("author"), vec!["Author", "Person", "Model"]);
/// assert!(registry.is_a("Author", "person"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
	classes: HashMap<String, ClassEntry>,
	aliases: HashMap<String, String>,
}

impl ModelRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `class` with its parent. `None` makes it a direct child of
	/// [`ROOT_MODEL`].
	pub fn register(&mut self, class: impl Into<String>, parent: Option<&str>) -> &mut Self {
		let name = class.into();
		let parent = parent
			.filter(|p| !p.eq_ignore_ascii_case(ROOT_MODEL))
			.map(str::to_string);
		self.classes
			.insert(name.to_lowercase(), ClassEntry { name, parent });
		self
	}

	/// Make `alias` resolve to `class`.
	pub fn alias(&mut self, alias: &str, class: impl Into<String>) -> &mut Self {
		self.aliases.insert(alias.to_lowercase(), class.into());
		self
	}

	/// Canonical class name for `name`, following aliases.
	pub fn resolve(&self, name: &str) -> String {
		let key = name.to_lowercase();
		let target = self.aliases.get(&key).map(String::as_str).unwrap_or(name);
		self.classes
			.get(&target.to_lowercase())
			.map(|entry| entry.name.clone())
			.unwrap_or_else(|| target.to_string())
	}

	/// `class` followed by its ancestors, ending in [`ROOT_MODEL`].
	pub fn hierarchy(&self, class: &str) -> Vec<String> {
		let mut chain = Vec::new();
		let mut seen = HashSet::new();
		let mut current = Some(self.resolve(class));
		while let Some(name) = current {
			if name.eq_ignore_ascii_case(ROOT_MODEL) || !seen.insert(name.to_lowercase()) {
				break;
			}
			current = self
				.classes
				.get(&name.to_lowercase())
				.and_then(|entry| entry.parent.as_deref())
				.map(|parent| self.resolve(parent));
			chain.push(name);
		}
		chain.push(ROOT_MODEL.to_string());
		chain
	}

	/// Whether `class` is `ancestor` or inherits from it.
	pub fn is_a(&self, class: &str, ancestor: &str) -> bool {
		self.hierarchy(class)
			.iter()
			.any(|name| name.eq_ignore_ascii_case(ancestor))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn registry() -> ModelRegistry {
		let mut registry = ModelRegistry::new();
		registry
			.register("Content", None)
			.register("Article", Some("Content"))
			.register("NewsArticle", Some("Article"));
		registry.alias("news", "NewsArticle");
		registry
	}

	#[rstest]
	fn test_hierarchy_ends_in_root(registry: ModelRegistry) {
		assert_eq!(
			registry.hierarchy("NewsArticle"),
			vec!["NewsArticle", "Article", "Content", "Model"]
		);
	}

	#[rstest]
	fn test_unknown_class_is_its_own_hierarchy(registry: ModelRegistry) {
		assert_eq!(registry.hierarchy("Widget"), vec!["Widget", "Model"]);
	}

	#[rstest]
	fn test_root_hierarchy(registry: ModelRegistry) {
		assert_eq!(registry.hierarchy("model"), vec!["Model"]);
	}

	#[rstest]
	#[case("news", "NewsArticle")]
	#[case("article", "Article")]
	#[case("Unregistered", "Unregistered")]
	fn test_resolve(registry: ModelRegistry, #[case] name: &str, #[case] expected: &str) {
		assert_eq!(registry.resolve(name), expected);
	}

	#[rstest]
	fn test_cycles_terminate() {
		let mut registry = ModelRegistry::new();
		registry.register("A", Some("B")).register("B", Some("A"));
		assert_eq!(registry.hierarchy("A"), vec!["A", "B", "Model"]);
	}

	#[rstest]
	fn test_is_a(registry: ModelRegistry) {
		assert!(registry.is_a("news", "content"));
		assert!(registry.is_a("Article", "Model"));
		assert!(!registry.is_a("Content", "Article"));
	}
}
