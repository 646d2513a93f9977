//! The route table: registration, weighted matching and reverse lookup.

use crate::cache::RouterSnapshot;
use crate::options::RouteOptions;
use crate::pattern::PatternCompiler;
use crate::reverse::{ReverseOptions, ReverseTarget};
use crate::route::{Route, RouteMatch};
use crate::services::Services;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use switchyard_conf::RouterSettings;
use switchyard_exception::{Error, Result};
use switchyard_http::{Request, Response};
use tracing::{debug, trace, warn};

/// State shared between a router and its routes.
#[derive(Debug)]
pub struct RouterContext {
	pub(crate) services: Services,
	pub(crate) debug: bool,
}

type ReverseIndex = HashMap<String, HashMap<String, Vec<Arc<Route>>>>;

/// An ordered collection of routes.
///
/// Build the router at startup, then share it immutably (for example in an
/// `Arc`). Matching and reverse lookups take `&self`; registration takes
/// `&mut self` and invalidates the cached weight order.
///
/// # Examples
///
/// ```
/// use switchyard_routers::{Router, RouteOptions};
///
/// let mut router = Router::default();
/// router.add_route("GET:users/{int id}", RouteOptions::new().with_controller("Users")).unwrap();
///
/// let matched = router.match_path("/users/5", "GET").unwrap();
/// assert_eq!(matched.raw("id"), Some("5"));
/// assert!(router.match_path("/users/5", "POST").is_err());
/// ```
#[derive(Debug)]
pub struct Router {
	context: Arc<RouterContext>,
	settings: RouterSettings,
	compiler: PatternCompiler,
	prefix: String,
	routes: IndexMap<String, Arc<Route>>,
	by_id: HashMap<String, Arc<Route>>,
	reverse: ReverseIndex,
	aliases: IndexMap<String, String>,
	default_route: Option<String>,
	weight_index: u64,
	sorted: OnceCell<Vec<Arc<Route>>>,
}

impl Default for Router {
	fn default() -> Self {
		Self::new(RouterSettings::default(), Services::default())
	}
}

impl Router {
	pub fn new(settings: RouterSettings, services: Services) -> Self {
		Self {
			context: Arc::new(RouterContext {
				services,
				debug: settings.debug,
			}),
			compiler: PatternCompiler::from_settings(&settings),
			prefix: settings.prefix.clone(),
			settings,
			routes: IndexMap::new(),
			by_id: HashMap::new(),
			reverse: HashMap::new(),
			aliases: IndexMap::new(),
			default_route: None,
			weight_index: 0,
			sorted: OnceCell::new(),
		}
	}

	pub fn settings(&self) -> &RouterSettings {
		&self.settings
	}

	pub fn services(&self) -> &Services {
		&self.context.services
	}

	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// Set the prefix stripped before matching and prepended to reverse
	/// routes.
	pub fn set_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
		self.prefix = prefix.into();
		self
	}

	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}

	/// Register a route.
	///
	/// The pattern `.` registers the default route under the empty path.
	/// Routes without a `weight` option get `counter / weight_divisor`, so
	/// implicitly weighted routes keep their insertion order. Re-adding a
	/// pattern replaces the earlier route.
	pub fn add_route(&mut self, pattern: &str, mut options: RouteOptions) -> Result<Arc<Route>> {
		let is_default = pattern == ".";
		let pattern = if is_default { "" } else { pattern };

		let divisor = self.settings.weight_divisor.max(1);
		let implicit_weight = options.weight.is_none();
		if implicit_weight {
			options.weight = Some(self.weight_index as f64 / f64::from(divisor));
		}

		let mut route = Route::new(pattern, options, &self.compiler)?;
		let aliases = route.alias_paths()?;
		if implicit_weight {
			self.weight_index += 1;
			if self.weight_index == u64::from(divisor) {
				warn!(
					divisor,
					"Implicit route weights reached 1.0 and now interleave with explicit weights"
				);
			}
		}
		route.attach(&self.context);
		let route = Arc::new(route);

		self.insert(pattern.to_string(), Arc::clone(&route));
		for (alias, target) in aliases {
			self.add_alias(alias, target);
		}
		if is_default {
			self.default_route = Some(pattern.to_string());
		}
		debug!(pattern, weight = route.weight(), kind = route.kind().name(), "Route added");
		Ok(route)
	}

	/// Compile a declaration without registering it.
	pub(crate) fn check_route(&self, pattern: &str, options: &RouteOptions) -> Result<()> {
		let pattern = if pattern == "." { "" } else { pattern };
		Route::new(pattern, options.clone(), &self.compiler)?.alias_paths()?;
		Ok(())
	}

	pub(crate) fn insert(&mut self, key: String, route: Arc<Route>) {
		if let Some(previous) = self.routes.insert(key, Arc::clone(&route)) {
			self.unindex(&previous);
		}
		let registry = self.context.services.registry();
		for (class, actions) in route.class_actions() {
			let class = if class == "*" {
				class
			} else {
				registry.resolve(&class).to_lowercase()
			};
			let by_action = self.reverse.entry(class).or_default();
			for action in actions {
				by_action
					.entry(action.to_lowercase())
					.or_default()
					.push(Arc::clone(&route));
			}
		}
		self.by_id
			.insert(route.lookup_id().to_lowercase(), route);
		self.sorted = OnceCell::new();
	}

	fn unindex(&mut self, previous: &Arc<Route>) {
		for by_action in self.reverse.values_mut() {
			for routes in by_action.values_mut() {
				routes.retain(|route| !Arc::ptr_eq(route, previous));
			}
		}
		self.by_id.retain(|_, route| !Arc::ptr_eq(route, previous));
	}

	/// Routes in match order: ascending weight, insertion order for ties.
	pub fn routes(&self) -> &[Arc<Route>] {
		self.sorted.get_or_init(|| {
			let mut routes: Vec<Arc<Route>> = self.routes.values().cloned().collect();
			routes.sort_by(|a, b| a.weight().total_cmp(&b.weight()));
			routes
		})
	}

	/// The route registered with the pattern `.`.
	pub fn default_route(&self) -> Option<&Arc<Route>> {
		self.default_route
			.as_ref()
			.and_then(|key| self.routes.get(key))
	}

	/// Look up a route by its `id` option or clean pattern.
	pub fn route(&self, id: &str) -> Result<&Arc<Route>> {
		self.by_id
			.get(&id.to_lowercase())
			.ok_or_else(|| Error::NotFound(format!("no route with id {}", id)))
	}

	/// Make requests for `from` match as if they were for `to`.
	pub fn add_alias(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
		self.aliases.insert(from.into(), to.into());
		self
	}

	pub fn aliases(&self) -> &IndexMap<String, String> {
		&self.aliases
	}

	/// Find the first route, in weight order, accepting `path` and `method`.
	///
	/// The prefix is removed from `path` when present and aliases are
	/// resolved before matching.
	pub fn match_path(&self, path: &str, method: &str) -> Result<RouteMatch> {
		let path = if self.prefix.is_empty() {
			path
		} else {
			path.strip_prefix(self.prefix.as_str()).unwrap_or(path)
		};
		let path = self.aliases.get(path).map(String::as_str).unwrap_or(path);

		for route in self.routes() {
			if let Some(matched) = route.matches(path, method) {
				debug!(path, method, route = %route, "Route matched");
				return Ok(matched);
			}
			if self.context.debug {
				trace!(
					path,
					method,
					route = %route,
					regex = route.pattern().regex().as_str(),
					"Route rejected"
				);
			}
		}
		debug!(path, method, routes = self.routes.len(), "No route matched");
		Err(Error::NotFound(format!("no route for {} {}", method, path)))
	}

	pub fn match_request(&self, request: &Request) -> Result<RouteMatch> {
		self.match_path(&request.path, request.method_str())
	}

	/// Match and execute `request`.
	pub async fn dispatch(&self, request: &Request) -> Result<Response> {
		let mut matched = self.match_request(request)?;
		matched.execute(request).await
	}

	/// Generate a URL for `action` on `target`.
	///
	/// A route whose id (or clean pattern) equals `action` is used first.
	/// Otherwise routes registered for each class of the target, then for
	/// `*`, are tried with `action` and then `*`; the first non-empty URL
	/// wins. The hooks' fallback is consulted last.
	pub fn get_route(
		&self,
		action: &str,
		target: ReverseTarget<'_>,
		options: ReverseOptions,
	) -> Result<String> {
		let services = &self.context.services;
		let registry = services.registry();
		let object = target.object();
		let mut options = options;
		if let Some(object) = object {
			options.merge_text_defaults(services.hooks().route_options(object, action));
			options.merge_derived_classes(services.hooks().derived_classes(object));
		}

		if let Some(route) = self.by_id.get(&action.to_lowercase()) {
			let url = route.get_route(action, object, &options)?;
			return Ok(self.finish_url(url, action, &target, &options));
		}

		let mut classes: Vec<String> = match target {
			ReverseTarget::None => Vec::new(),
			ReverseTarget::Object(object) => registry.hierarchy(object.class_name()),
			ReverseTarget::Class(class) => registry.hierarchy(class),
			ReverseTarget::Classes(classes) => {
				classes.iter().map(|class| registry.resolve(class)).collect()
			}
		};
		classes.push("*".to_string());

		let actions = [action.to_lowercase(), "*".to_string()];
		for class in &classes {
			let Some(by_action) = self.reverse.get(&class.to_lowercase()) else {
				continue;
			};
			for candidate in &actions {
				for route in by_action.get(candidate).into_iter().flatten() {
					let url = route.get_route(action, object, &options)?;
					if !url.is_empty() {
						debug!(action, class = %class, route = %route, url = %url, "Reverse route");
						return Ok(self.finish_url(url, action, &target, &options));
					}
				}
			}
		}

		if let Some(url) = services.hooks().fallback_route(action, &target, &options) {
			return Ok(format!("{}{}", self.prefix, options.append_query(url)));
		}
		Err(Error::NotFound(format!(
			"no reverse route for {} on {}",
			action,
			classes.join(", ")
		)))
	}

	fn finish_url(
		&self,
		url: String,
		action: &str,
		target: &ReverseTarget<'_>,
		options: &ReverseOptions,
	) -> String {
		let url = options.append_query(url);
		let url = self.context.services.hooks().alter_url(url, action, target);
		format!("{}{}", self.prefix, url)
	}

	pub(crate) fn snapshot(&self, id: &str) -> RouterSnapshot {
		RouterSnapshot {
			id: id.to_string(),
			prefix: self.prefix.clone(),
			weight_index: self.weight_index,
			routes: self
				.routes
				.iter()
				.map(|(key, route)| (key.clone(), Route::clone(route)))
				.collect(),
			aliases: self.aliases.clone(),
			default_route: self.default_route.clone(),
		}
	}

	pub(crate) fn restore(snapshot: RouterSnapshot, settings: RouterSettings, services: Services) -> Self {
		let mut router = Self::new(settings, services);
		router.prefix = snapshot.prefix;
		router.weight_index = snapshot.weight_index;
		router.aliases = snapshot.aliases;
		router.default_route = snapshot.default_route;
		for (key, mut route) in snapshot.routes {
			route.attach(&router.context);
			router.insert(key, Arc::new(route));
		}
		router
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn router() -> Router {
		Router::new(RouterSettings::default().with_prefix(""), Services::default())
	}

	#[rstest]
	fn test_implicit_weights_follow_insertion(mut router: Router) {
		let a = router.add_route("a", RouteOptions::new()).unwrap();
		let b = router.add_route("b", RouteOptions::new()).unwrap();
		assert_eq!(a.weight(), 0.0);
		assert_eq!(b.weight(), 0.001);
	}

	#[rstest]
	fn test_weight_divisor_from_settings() {
		let mut router = Router::new(
			RouterSettings::default().with_weight_divisor(10),
			Services::default(),
		);
		router.add_route("a", RouteOptions::new()).unwrap();
		let b = router.add_route("b", RouteOptions::new()).unwrap();
		assert_eq!(b.weight(), 0.1);
	}

	#[rstest]
	fn test_sorted_cache_is_invalidated(mut router: Router) {
		router.add_route("{x}", RouteOptions::new().with_weight(5.0)).unwrap();
		assert_eq!(router.routes().len(), 1);
		router.add_route("fixed", RouteOptions::new().with_weight(1.0)).unwrap();
		assert_eq!(router.routes()[0].original_pattern(), "fixed");
		assert_eq!(router.match_path("fixed", "GET").unwrap().route().original_pattern(), "fixed");
	}

	#[rstest]
	fn test_failed_add_keeps_weight_counter(mut router: Router) {
		router.add_route("a", RouteOptions::new()).unwrap();
		let bad = RouteOptions::from_json(serde_json::json!({"aliases": [1]})).unwrap();
		assert!(router.add_route("bad", bad).is_err());
		let b = router.add_route("b", RouteOptions::new()).unwrap();
		assert_eq!(b.weight(), 0.001);
	}

	#[rstest]
	fn test_default_route(mut router: Router) {
		router.add_route(".", RouteOptions::new().with_method("Home::index")).unwrap();
		assert_eq!(router.default_route().unwrap().original_pattern(), "");
		assert!(router.match_path("", "GET").is_ok());
	}

	#[rstest]
	fn test_replacing_pattern_reindexes(mut router: Router) {
		router
			.add_route("users", RouteOptions::new().with_id("users").with_classes(["User"]))
			.unwrap();
		router
			.add_route("users", RouteOptions::new().with_id("people").with_classes(["Person"]))
			.unwrap();
		assert_eq!(router.len(), 1);
		assert!(router.route("users").is_err());
		assert!(router.route("people").is_ok());
		assert!(router.reverse.get("user").map_or(true, |actions| actions.values().all(Vec::is_empty)));
	}

	#[rstest]
	fn test_route_by_clean_pattern(mut router: Router) {
		router.add_route("GET:users/{int id}", RouteOptions::new()).unwrap();
		assert!(router.route("USERS/{id}").is_ok());
		assert!(matches!(router.route("nope"), Err(Error::NotFound(_))));
	}

	#[rstest]
	fn test_prefix_is_stripped() {
		let mut router = Router::new(
			RouterSettings::default().with_prefix("/app/"),
			Services::default(),
		);
		router.add_route("about", RouteOptions::new()).unwrap();
		assert!(router.match_path("/app/about", "GET").is_ok());
		assert!(router.match_path("about", "GET").is_ok());
		assert!(router.match_path("/about", "GET").is_err());
	}
}
