//! Routes, match results and route execution.
//!
//! A [`Route`] is immutable once added to a router. Matching produces a
//! [`RouteMatch`] that owns all per-request state: the raw URL parts, the
//! typed [`Arguments`] and the request-mapped options used during
//! execution. Concurrent requests therefore never observe each other.

use crate::converters::{self, ArgValue, ArgumentType};
use crate::model::Model;
use crate::options::{CacheOption, PermissionRule, RouteArgument, RouteKind, RouteOptions};
use crate::pattern::{CompiledPattern, PatternCompiler, SegmentType};
use crate::reverse::ReverseOptions;
use crate::router::RouterContext;
use crate::services::{Argument, Invocation, Services};
use crate::substitution::{clean_tokens, map_tokens, token_name};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use switchyard_exception::{Error, Result};
use switchyard_http::{Request, Response, StatusCode};
use tracing::{debug, warn};

/// Typed arguments of a matched route.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
	url_parts: Vec<ArgValue>,
	args: Vec<ArgValue>,
	named: IndexMap<String, ArgValue>,
	by_class: HashMap<String, IndexMap<String, Arc<dyn Model>>>,
	options: BTreeMap<String, String>,
}

impl Arguments {
	/// URL parts with typed segments replaced by their converted values.
	pub fn url_parts(&self) -> &[ArgValue] {
		&self.url_parts
	}

	/// Values of the route's `arguments` option.
	pub fn args(&self) -> &[ArgValue] {
		&self.args
	}

	/// Typed values by placeholder name and by `uri<index>`.
	pub fn named(&self) -> &IndexMap<String, ArgValue> {
		&self.named
	}

	pub fn get(&self, name: &str) -> Option<&ArgValue> {
		self.named.get(name)
	}

	/// Models indexed by every class in their hierarchy, then by name.
	pub fn by_class(&self, class: &str) -> Option<&IndexMap<String, Arc<dyn Model>>> {
		self.by_class.get(&class.to_lowercase())
	}

	/// First model of `class`, optionally under a specific argument name.
	pub fn model(&self, class: &str, name: Option<&str>) -> Option<&Arc<dyn Model>> {
		let models = self.by_class(class)?;
		match name {
			Some(name) => models.get(name),
			None => models.values().next(),
		}
	}

	/// Route options set by `{option name}` segments.
	pub fn options(&self) -> &BTreeMap<String, String> {
		&self.options
	}

	/// Token values for mapping: URL part indexes, argument names and the
	/// request's `request.*`/`url.*` variables.
	pub fn substitutions(&self, request: Option<&Request>) -> BTreeMap<String, String> {
		let mut values: BTreeMap<String, String> = self
			.url_parts
			.iter()
			.enumerate()
			.filter(|(_, value)| !value.is_null())
			.map(|(index, value)| (index.to_string(), value.to_string()))
			.collect();
		for (name, value) in &self.named {
			values.insert(name.clone(), value.to_string());
		}
		if let Some(request) = request {
			values.extend(request.substitution_map());
		}
		values
	}
}

/// A compiled pattern with its options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
	pattern: CompiledPattern,
	options: RouteOptions,
	#[serde(skip)]
	router: Weak<RouterContext>,
}

impl fmt::Display for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.pattern.source())
	}
}

impl Route {
	/// Compile `pattern` and pre-map options that refer to static parts of
	/// the path by index (`{0}`, `{1}`, ...).
	///
	/// The route is detached until a router adds it.
	pub fn new(pattern: &str, options: RouteOptions, compiler: &PatternCompiler) -> Result<Self> {
		let pattern = compiler.compile(pattern)?;
		let static_parts: BTreeMap<String, String> = pattern
			.clean_pattern()
			.split('/')
			.zip(pattern.segments())
			.enumerate()
			.filter(|(_, (part, segment))| {
				**segment == SegmentType::Literal && !part.contains('{')
			})
			.map(|(index, (part, _))| (index.to_string(), part.to_string()))
			.collect();
		let options = options.map_tokens(&static_parts);
		Ok(Self {
			pattern,
			options,
			router: Weak::new(),
		})
	}

	pub(crate) fn attach(&mut self, context: &Arc<RouterContext>) {
		self.router = Arc::downgrade(context);
	}

	pub fn is_attached(&self) -> bool {
		self.router.strong_count() > 0
	}

	fn context(&self) -> Result<Arc<RouterContext>> {
		self.router
			.upgrade()
			.ok_or_else(|| Error::Detached(self.pattern.source().to_string()))
	}

	pub fn pattern(&self) -> &CompiledPattern {
		&self.pattern
	}

	pub fn original_pattern(&self) -> &str {
		self.pattern.source()
	}

	pub fn clean_pattern(&self) -> &str {
		self.pattern.clean_pattern()
	}

	pub fn options(&self) -> &RouteOptions {
		&self.options
	}

	/// An option not modelled by [`RouteOptions`].
	pub fn option(&self, key: &str) -> Option<&Value> {
		self.options.extra.get(key)
	}

	/// Target kind as declared, before request mapping.
	pub fn kind(&self) -> RouteKind {
		RouteKind::from_options(&self.options)
	}

	/// Explicit `id` option.
	pub fn id(&self) -> Option<&str> {
		self.options.id.as_deref().filter(|id| !id.is_empty())
	}

	/// Id under which the router indexes this route: the `id` option or the
	/// clean pattern.
	pub fn lookup_id(&self) -> &str {
		self.id().unwrap_or_else(|| self.clean_pattern())
	}

	pub fn weight(&self) -> f64 {
		self.options.weight.unwrap_or(0.0)
	}

	pub fn class_actions(&self) -> IndexMap<String, Vec<String>> {
		self.options.class_actions()
	}

	/// Match `path` and `method`, returning the per-request match state.
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use switchyard_routers::{PatternCompiler, Route, RouteOptions};
	///
	/// let route = Arc::new(
	///     Route::new("GET:users/{int id}", RouteOptions::new(), &PatternCompiler::new()).unwrap(),
	/// );
	/// let matched = route.matches("users/42", "GET").unwrap();
	/// assert_eq!(matched.raw("id"), Some("42"));
	/// assert!(route.matches("users/42", "POST").is_none());
	/// ```
	pub fn matches(self: &Arc<Self>, path: &str, method: &str) -> Option<RouteMatch> {
		if !self.pattern.accepts_method(method) || !self.pattern.is_match(path) {
			return None;
		}
		let mut url_parts: Vec<Option<String>> =
			path.split('/').map(|part| Some(part.to_string())).collect();
		let segments = self.pattern.segments().len();
		if url_parts.len() < segments {
			url_parts.resize(segments, None);
		}
		Some(RouteMatch {
			route: Arc::clone(self),
			path: path.to_string(),
			method: method.to_string(),
			url_parts,
			arguments: None,
		})
	}

	/// Check the declaration for mistakes that would only surface at
	/// request time.
	pub fn validate(&self) -> Result<()> {
		if let Some(aliases) = &self.options.aliases {
			aliases.paths()?;
		}
		let names: HashSet<&str> = self.pattern.variables().map(|(_, _, name)| name).collect();
		for rule in self.permission_rules() {
			if let Some(name) = rule.context().and_then(token_name) {
				if !names.contains(name) {
					return Err(Error::Configuration(format!(
						"{}: permission context {{{}}} names no path argument",
						self, name
					)));
				}
			}
		}
		if let Some(code) = self.options.status_code {
			if StatusCode::from_u16(code).is_err() {
				return Err(Error::Configuration(format!(
					"{}: invalid status code {}",
					self, code
				)));
			}
		}
		Ok(())
	}

	/// Diagnostic snapshot of the route.
	pub fn variables(&self) -> Value {
		serde_json::json!({
			"kind": self.kind().name(),
			"original_pattern": self.pattern.source(),
			"clean_pattern": self.pattern.clean_pattern(),
			"pattern": self.pattern.regex().as_str(),
			"methods": self.pattern.methods(),
			"types": serde_json::to_value(self.pattern.segments()).unwrap_or_default(),
			"options": serde_json::to_value(&self.options).unwrap_or_default(),
			"lints": self.pattern.lints().iter().map(ToString::to_string).collect::<Vec<_>>(),
		})
	}

	/// `(alias, target)` pairs declared by the `aliases` option.
	pub(crate) fn alias_paths(&self) -> Result<Vec<(String, String)>> {
		let Some(aliases) = &self.options.aliases else {
			return Ok(Vec::new());
		};
		let target = self
			.options
			.alias_target
			.clone()
			.unwrap_or_else(|| self.clean_pattern().to_string());
		Ok(aliases
			.paths()?
			.into_iter()
			.map(|(alias, explicit)| (alias, explicit.unwrap_or_else(|| target.clone())))
			.collect())
	}

	fn permission_rules(&self) -> Vec<PermissionRule> {
		let mut rules = Vec::new();
		if let Some(action) = self.options.permission.as_deref().filter(|a| !a.is_empty()) {
			rules.push(PermissionRule::Detailed {
				action: action.to_string(),
				context: self.options.permission_context.clone(),
				options: self.options.permission_options.clone(),
			});
		}
		rules.extend(self.options.permissions.iter().cloned());
		rules
	}

	/// Execute a match of this route.
	///
	/// Argument conversion failures become a `404` response. Permission
	/// failures propagate. Executor failures of kind not-found, syntax or
	/// system become response statuses.
	pub async fn execute(&self, matched: &mut RouteMatch, request: &Request) -> Result<Response> {
		let context = self.context()?;
		let services = &context.services;
		let mut raw = matched.raw_variables();
		raw.extend(request.substitution_map());
		let mut live = self.options.map_tokens(&raw);

		let arguments = match matched.process_arguments_with(services).await {
			Ok(arguments) => arguments.clone(),
			Err(err @ (Error::NotFound(_) | Error::Syntax(_))) => {
				debug!(route = %self, error = %err, "Route arguments not found");
				let mut response = self.response_factory(services, request, &live);
				response.set_status(404).set_status_message(err.message());
				return Ok(response);
			}
			Err(err) => return Err(err),
		};

		for (name, value) in arguments.options() {
			live.set_option(name, value.clone());
		}
		let values = arguments.substitutions(Some(request));
		self.check_permissions(services, request, &arguments, &values)
			.await?;

		let kind = RouteKind::from_options(&live);
		let response = self.response_factory(services, request, &live);
		let result = match &kind {
			RouteKind::Redirect { url } => {
				let mut response = response;
				response.redirect(url.as_str());
				Ok(response)
			}
			_ => {
				let invocation = Invocation {
					request,
					route: self,
					kind: kind.clone(),
					options: &live,
					arguments: &arguments,
					args: self.map_arguments(&arguments, &values),
				};
				services.executor().execute(&invocation, response).await
			}
		};

		let mut response = match result {
			Ok(response) => response,
			Err(err @ (Error::NotFound(_) | Error::Syntax(_) | Error::System { .. })) => {
				warn!(route = %self, kind = kind.name(), error = %err, "Route execution failed");
				let mut response = self.response_factory(services, request, &live);
				response
					.set_status(err.status_code())
					.set_status_message(err.message());
				response
			}
			Err(err) => return Err(err),
		};

		if let Some(url) = live.redirect.as_deref().filter(|url| !url.is_empty()) {
			response.redirect(url);
		}
		debug!(route = %self, status = %response.status, "Route executed");
		Ok(response)
	}

	fn response_factory(
		&self,
		services: &Services,
		request: &Request,
		options: &RouteOptions,
	) -> Response {
		let mut response = services
			.response_factory()
			.create(request, options.content_type.as_deref());
		match &options.cache {
			Some(CacheOption::Flag(true)) => {
				response.set_cache_forever();
			}
			Some(CacheOption::Settings(settings)) => {
				response.set_cache(settings.clone());
			}
			Some(CacheOption::Invalid(cache)) => {
				warn!(route = %self.clean_pattern(), cache = %cache, "Invalid cache setting for route");
			}
			Some(CacheOption::Flag(false)) | None => {}
		}
		if let Some(code) = options.status_code.filter(|code| *code != 0) {
			response.set_status(code);
		}
		if let Some(message) = options.status_message.as_deref().filter(|m| !m.is_empty()) {
			response.set_status_message(message);
		}
		if let Some(handler) = options.output_handler.as_deref().filter(|h| !h.is_empty()) {
			response.set_output_handler(handler);
		}
		if options.json {
			response.make_json();
		} else if options.html {
			response.make_html();
		}
		response
	}

	async fn check_permissions(
		&self,
		services: &Services,
		request: &Request,
		arguments: &Arguments,
		values: &BTreeMap<String, String>,
	) -> Result<()> {
		for rule in self.permission_rules() {
			let action = map_tokens(rule.action(), values);
			let context = match rule.context().filter(|c| !c.is_empty()) {
				None => None,
				Some(declared) => {
					let model = token_name(declared)
						.and_then(|name| arguments.get(name))
						.and_then(ArgValue::as_model);
					if model.is_none() {
						warn!(
							route = %self.clean_pattern(),
							action = %action,
							context = %map_tokens(declared, values),
							"Invalid permission context, checking without one"
						);
					}
					model.cloned()
				}
			};
			let options: Map<String, Value> = rule
				.options()
				.map(|options| {
					options
						.iter()
						.map(|(k, v)| (k.clone(), crate::options::map_value(v, values)))
						.collect()
				})
				.unwrap_or_default();
			services
				.authorizer()
				.must(request, &action, context.as_deref(), &options)
				.await?;
		}
		Ok(())
	}

	fn map_arguments(&self, arguments: &Arguments, values: &BTreeMap<String, String>) -> Vec<Argument> {
		self.options
			.arguments
			.iter()
			.flatten()
			.map(|argument| match argument {
				RouteArgument::Position(index) => {
					Argument::Value(positional(arguments.url_parts(), *index))
				}
				RouteArgument::Literal(text) => {
					if let Some(object) = Argument::object_token(text) {
						return object;
					}
					if let Some(value) = token_name(text).and_then(|name| arguments.get(name)) {
						return Argument::Value(value.clone());
					}
					Argument::Value(ArgValue::String(map_tokens(text, values)))
				}
			})
			.collect()
	}

	/// Reverse-route this route for `action`, returning an empty string when
	/// nothing useful can be produced.
	///
	/// Placeholders are filled from explicit option values first, then from
	/// `object` when the placeholder's type is in the object's hierarchy,
	/// then from derived classes, then from model-valued options. Unfilled
	/// placeholders are removed and trailing slashes trimmed.
	pub fn get_route(
		&self,
		action: &str,
		object: Option<&dyn Model>,
		options: &ReverseOptions,
	) -> Result<String> {
		let context = self.context()?;
		let map = self.route_map(&context.services, action, object, options);
		let url = clean_tokens(&map_tokens(self.clean_pattern(), &map));
		Ok(url.trim_end_matches('/').to_string())
	}

	fn route_map(
		&self,
		services: &Services,
		action: &str,
		object: Option<&dyn Model>,
		options: &ReverseOptions,
	) -> BTreeMap<String, String> {
		let registry = services.registry();
		let mut map = options.text_values();
		map.insert("action".to_string(), action.to_string());

		let hierarchy: Vec<String> = object
			.map(|object| {
				registry
					.hierarchy(object.class_name())
					.into_iter()
					.map(|class| class.to_lowercase())
					.collect()
			})
			.unwrap_or_default();

		for (_, type_name, name) in self.pattern.variables() {
			if options.has_text(name) {
				continue;
			}
			let class = registry.resolve(type_name).to_lowercase();
			let value = match object {
				Some(object) if !class.is_empty() && hierarchy.contains(&class) => Some(object.id()),
				_ => options
					.derived_class(&class)
					.map(str::to_string)
					.or_else(|| options.model(name).map(|model| model.id())),
			};
			if let Some(value) = value {
				map.insert(name.to_string(), value);
			}
		}
		if let Some(object) = object {
			map.entry("id".to_string()).or_insert_with(|| object.id());
		}
		services.hooks().alter_route_map(self, &mut map);
		map
	}
}

fn positional(url_parts: &[ArgValue], index: usize) -> ArgValue {
	match url_parts.get(index) {
		Some(value) if !value.is_null() => value.clone(),
		_ => ArgValue::String(String::new()),
	}
}

/// The result of matching a route against one request.
#[derive(Debug, Clone)]
pub struct RouteMatch {
	route: Arc<Route>,
	path: String,
	method: String,
	url_parts: Vec<Option<String>>,
	arguments: Option<Arguments>,
}

impl RouteMatch {
	pub fn route(&self) -> &Arc<Route> {
		&self.route
	}

	/// The matched path, after prefix removal and alias resolution.
	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn method(&self) -> &str {
		&self.method
	}

	/// The path split on `/`, padded with `None` to the segment count.
	pub fn url_parts(&self) -> &[Option<String>] {
		&self.url_parts
	}

	/// Raw text of URL part `index`, or `default`.
	pub fn arg<'a>(&'a self, index: usize, default: &'a str) -> &'a str {
		self.url_parts
			.get(index)
			.and_then(Option::as_deref)
			.unwrap_or(default)
	}

	/// Raw text of the segment bound to placeholder `name`.
	pub fn raw(&self, name: &str) -> Option<&str> {
		let (index, _, _) = self
			.route
			.pattern()
			.variables()
			.find(|(_, _, candidate)| *candidate == name)?;
		self.url_parts.get(index).and_then(Option::as_deref)
	}

	/// Raw values by URL part index and placeholder name.
	pub fn raw_variables(&self) -> BTreeMap<String, String> {
		let mut values: BTreeMap<String, String> = self
			.url_parts
			.iter()
			.enumerate()
			.filter_map(|(index, part)| part.as_ref().map(|p| (index.to_string(), p.clone())))
			.collect();
		for (index, _, name) in self.route.pattern().variables() {
			if let Some(Some(raw)) = self.url_parts.get(index) {
				values.insert(name.to_string(), raw.clone());
			}
		}
		values
	}

	/// Typed arguments, if already processed.
	pub fn arguments(&self) -> Option<&Arguments> {
		self.arguments.as_ref()
	}

	/// Convert typed segments using the services of the route's router.
	pub async fn process_arguments(&mut self) -> Result<&Arguments> {
		let context = self.route.context()?;
		self.process_arguments_with(&context.services).await
	}

	/// Convert typed segments. The result is computed once per match.
	pub async fn process_arguments_with(&mut self, services: &Services) -> Result<&Arguments> {
		let arguments = match self.arguments.take() {
			Some(arguments) => arguments,
			None => self.build_arguments(services).await?,
		};
		Ok(self.arguments.insert(arguments))
	}

	async fn build_arguments(&self, services: &Services) -> Result<Arguments> {
		let mut arguments = Arguments {
			url_parts: self
				.url_parts
				.iter()
				.map(|part| part.clone().map(ArgValue::String).unwrap_or_default())
				.collect(),
			..Arguments::default()
		};

		for (index, type_name, name) in self.route.pattern().variables() {
			let raw = self.url_parts.get(index).cloned().flatten();
			let value = match raw {
				None => ArgValue::Null,
				Some(raw) => match ArgumentType::parse(type_name) {
					ArgumentType::Untyped => ArgValue::String(raw),
					ArgumentType::Option => {
						arguments.options.insert(name.to_string(), raw.clone());
						ArgValue::String(raw)
					}
					ArgumentType::List(separator) => {
						ArgValue::List(converters::to_list(&raw, separator))
					}
					ArgumentType::Float => ArgValue::Float(converters::to_float(&raw)?),
					ArgumentType::Int => ArgValue::Int(converters::to_int(&raw)?),
					ArgumentType::Model(class) => {
						let registry = services.registry();
						let class = registry.resolve(&class);
						let model =
							converters::to_model(services.model_factory(), &class, &raw, name)
								.await?;
						for ancestor in registry.hierarchy(model.class_name()) {
							arguments
								.by_class
								.entry(ancestor.to_lowercase())
								.or_default()
								.insert(name.to_string(), Arc::clone(&model));
						}
						ArgValue::Model(model)
					}
				},
			};
			arguments.named.insert(name.to_string(), value.clone());
			arguments.named.insert(format!("uri{}", index), value.clone());
			if let Some(slot) = arguments.url_parts.get_mut(index) {
				*slot = value;
			}
		}

		arguments.args = self
			.route
			.options()
			.arguments
			.iter()
			.flatten()
			.map(|argument| match argument {
				RouteArgument::Position(index) => positional(&arguments.url_parts, *index),
				RouteArgument::Literal(text) => ArgValue::String(text.clone()),
			})
			.collect();
		Ok(arguments)
	}

	/// Execute the matched route.
	pub async fn execute(&mut self, request: &Request) -> Result<Response> {
		let route = Arc::clone(&self.route);
		route.execute(self, request).await
	}

	/// Fill the route's clean pattern with `values`, then with this match's
	/// arguments. Unfilled tokens are kept.
	pub fn url_replace(&self, values: &BTreeMap<String, String>) -> String {
		let mut map = match &self.arguments {
			Some(arguments) => arguments
				.named()
				.iter()
				.map(|(name, value)| (name.clone(), value.to_string()))
				.collect(),
			None => self.raw_variables(),
		};
		map.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
		map_tokens(self.route.clean_pattern(), &map)
	}
}
