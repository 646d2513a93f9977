//! Loading routes from TOML route files.
//!
//! ```toml
//! [[route]]
//! pattern = "GET:users/{User user}"
//! controller = "Users"
//! action = "view"
//! classes = ["User"]
//! "permission context" = "{user}"
//! ```

use crate::options::RouteOptions;
use crate::route::Route;
use crate::router::Router;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use switchyard_exception::{Error, Result};
use tracing::info;

#[derive(Debug, Deserialize)]
struct RouteFile {
	#[serde(default, rename = "route")]
	routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
	pattern: String,
	#[serde(flatten)]
	options: RouteOptions,
}

impl Router {
	/// Add every `[[route]]` table in `contents`, in file order.
	///
	/// Every entry is compiled before any is added, so a bad entry leaves the
	/// router unchanged.
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_routers::Router;
	///
	/// let mut router = Router::default();
	/// let added = router
	///     .import_toml("[[route]]\npattern = \"about\"\nmethod = \"Pages::about\"\n")
	///     .unwrap();
	/// assert_eq!(added.len(), 1);
	/// assert!(router.match_path("/about", "GET").is_ok());
	/// ```
	pub fn import_toml(&mut self, contents: &str) -> Result<Vec<Arc<Route>>> {
		let file: RouteFile = toml::from_str(contents)
			.map_err(|e| Error::Configuration(format!("invalid route file: {}", e)))?;
		for entry in &file.routes {
			self.check_route(&entry.pattern, &entry.options)?;
		}
		let added = file
			.routes
			.into_iter()
			.map(|entry| self.add_route(&entry.pattern, entry.options))
			.collect::<Result<Vec<_>>>()?;
		info!(routes = added.len(), "Imported routes");
		Ok(added)
	}

	/// Read and import a TOML route file.
	pub fn import_toml_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<Arc<Route>>> {
		let path = path.as_ref();
		let contents = std::fs::read_to_string(path).map_err(|e| {
			Error::Configuration(format!("cannot read route file {}: {}", path.display(), e))
		})?;
		self.import_toml(&contents)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::options::{RouteArgument, RouteKind};
	use rstest::rstest;

	#[rstest]
	fn test_import_options() {
		let mut router = Router::default();
		let added = router
			.import_toml(
				r#"
[[route]]
pattern = "GET:users/{User user}"
controller = "Users"
action = "view"
classes = "User"
weight = 2
arguments = [1, "{request}"]
"permission context" = "{user}"
template = "users/view"

[[route]]
pattern = "old-home"
redirect = "/"
"#,
			)
			.unwrap();

		assert_eq!(added.len(), 2);
		let users = &added[0];
		assert_eq!(users.weight(), 2.0);
		assert_eq!(users.options().classes, vec!["User"]);
		assert_eq!(
			users.options().arguments.as_deref(),
			Some(&[RouteArgument::Position(1), RouteArgument::Literal("{request}".into())][..])
		);
		assert_eq!(users.options().permission_context.as_deref(), Some("{user}"));
		assert_eq!(users.option("template"), Some(&serde_json::json!("users/view")));
		assert_eq!(added[1].kind(), RouteKind::Redirect { url: "/".into() });
	}

	#[rstest]
	fn test_entry_without_pattern_is_rejected() {
		let mut router = Router::default();
		let result = router.import_toml("[[route]]\ncontroller = \"Users\"\n");
		assert!(matches!(result, Err(Error::Configuration(_))));
		assert!(router.is_empty());
	}

	#[rstest]
	fn test_bad_entry_adds_nothing() {
		let mut router = Router::default();
		let result = router.import_toml(
			r#"
[[route]]
pattern = "about"
method = "Pages::about"

[[route]]
pattern = "contact"
aliases = [1]
"#,
		);
		assert!(matches!(result, Err(Error::Configuration(_))));
		assert!(router.is_empty());
		assert!(router.aliases().is_empty());

		let added = router
			.import_toml("[[route]]\npattern = \"about\"\n")
			.unwrap();
		assert_eq!(added[0].weight(), 0.0);
	}

	#[rstest]
	fn test_missing_file() {
		let mut router = Router::default();
		let result = router.import_toml_file("/nonexistent/routes.toml");
		assert!(matches!(result, Err(Error::Configuration(_))));
	}
}
