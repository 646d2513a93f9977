//! Collaborators the router calls out to.
//!
//! Model lookup, authorization, target execution and response creation all
//! belong to the host application. The router reaches them through the
//! traits in this module, bundled in [`Services`].

use crate::converters::ArgValue;
use crate::model::{Model, ModelRegistry};
use crate::options::{RouteKind, RouteOptions};
use crate::reverse::{ReverseOptions, ReverseTarget};
use crate::route::{Arguments, Route};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use switchyard_exception::{Error, Result};
use switchyard_http::{DefaultResponseFactory, Request, Response, ResponseFactory};

/// Creates models for typed path segments.
#[async_trait]
pub trait ModelFactory: Send + Sync {
	/// Load an instance of `class` identified by the raw segment text.
	///
	/// `Ok(None)` means no such model exists.
	async fn create(&self, class: &str, raw: &str) -> Result<Option<Arc<dyn Model>>>;
}

/// Checks permissions declared on routes.
#[async_trait]
pub trait Authorizer: Send + Sync {
	/// Succeed when the request may perform `action`, or return
	/// [`Error::PermissionDenied`].
	async fn must(
		&self,
		request: &Request,
		action: &str,
		context: Option<&dyn Model>,
		options: &Map<String, Value>,
	) -> Result<()>;
}

/// Runs a matched route's target.
#[async_trait]
pub trait Executor: Send + Sync {
	/// Execute the invocation, returning the final response.
	///
	/// [`Error::NotFound`] and [`Error::System`] are turned into response
	/// statuses by the caller; other errors propagate.
	async fn execute(&self, invocation: &Invocation<'_>, response: Response) -> Result<Response>;
}

/// Extension points for reverse routing.
///
/// Every method has a no-op default.
pub trait RouterHooks: Send + Sync {
	/// Extra reverse-routing options contributed by `object` for `action`.
	fn route_options(&self, _object: &dyn Model, _action: &str) -> BTreeMap<String, String> {
		BTreeMap::new()
	}

	/// Ids of related objects, keyed by class, usable in reverse routes.
	fn derived_classes(&self, _object: &dyn Model) -> BTreeMap<String, String> {
		BTreeMap::new()
	}

	/// Adjust the token map before it is applied to a route's clean pattern.
	fn alter_route_map(&self, _route: &Route, _map: &mut BTreeMap<String, String>) {}

	/// Adjust a reverse-routed URL before the prefix is added.
	fn alter_url(&self, url: String, _action: &str, _target: &ReverseTarget<'_>) -> String {
		url
	}

	/// Produce a URL when no route serves the reverse lookup.
	fn fallback_route(
		&self,
		_action: &str,
		_target: &ReverseTarget<'_>,
		_options: &ReverseOptions,
	) -> Option<String> {
		None
	}
}

/// Hooks that change nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl RouterHooks for NoHooks {}

/// Factory that knows no models. Every typed model segment is not found.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModels;

#[async_trait]
impl ModelFactory for NoModels {
	async fn create(&self, _class: &str, _raw: &str) -> Result<Option<Arc<dyn Model>>> {
		Ok(None)
	}
}

/// Authorizer that refuses every permission check.
///
/// Routes without permissions never consult the authorizer, so this only
/// affects routes that declare one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl Authorizer for DenyAll {
	async fn must(
		&self,
		_request: &Request,
		action: &str,
		_context: Option<&dyn Model>,
		_options: &Map<String, Value>,
	) -> Result<()> {
		Err(Error::PermissionDenied(format!(
			"{}: no authorizer configured",
			action
		)))
	}
}

/// Executor used until one is configured. Every non-redirect route fails
/// with `501`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unimplemented;

#[async_trait]
impl Executor for Unimplemented {
	async fn execute(&self, invocation: &Invocation<'_>, _response: Response) -> Result<Response> {
		Err(Error::system_with_status(
			501,
			format!("no executor for {} route", invocation.kind.name()),
		))
	}
}

/// A route argument after request mapping.
#[derive(Debug, Clone)]
pub enum Argument {
	Value(ArgValue),
	/// The current request.
	Request,
	/// The response being built.
	Response,
	/// The executing route.
	Route,
	/// The router that matched.
	Router,
	/// The host application.
	Application,
}

impl Argument {
	/// Map a declared argument token to the live object it names.
	pub fn object_token(token: &str) -> Option<Self> {
		match token {
			"{request}" => Some(Argument::Request),
			"{response}" => Some(Argument::Response),
			"{route}" => Some(Argument::Route),
			"{router}" => Some(Argument::Router),
			"{application}" => Some(Argument::Application),
			_ => None,
		}
	}

	pub fn value(&self) -> Option<&ArgValue> {
		match self {
			Argument::Value(value) => Some(value),
			_ => None,
		}
	}
}

/// Everything an executor needs to run a matched route.
#[derive(Debug)]
pub struct Invocation<'a> {
	pub request: &'a Request,
	pub route: &'a Route,
	/// Target kind derived from the request-mapped options.
	pub kind: RouteKind,
	/// Route options with `{token}`s mapped for this request.
	pub options: &'a RouteOptions,
	pub arguments: &'a Arguments,
	/// The route's `arguments` option, mapped.
	pub args: Vec<Argument>,
}

/// The collaborators a router is built with.
///
/// # Examples
///
/// ```
/// use switchyard_routers::services::{NoHooks, Services};
/// use switchyard_routers::model::ModelRegistry;
///
/// let mut registry = ModelRegistry::new();
/// registry.register("User", None);
///
/// let services = Services::builder()
///     .registry(registry)
///     .hooks(NoHooks)
///     .build();
/// assert_eq!(services.registry().hierarchy("user"), vec!["User", "Model"]);
/// ```
#[derive(Clone)]
pub struct Services {
	model_factory: Arc<dyn ModelFactory>,
	authorizer: Arc<dyn Authorizer>,
	executor: Arc<dyn Executor>,
	response_factory: Arc<dyn ResponseFactory>,
	hooks: Arc<dyn RouterHooks>,
	registry: Arc<ModelRegistry>,
}

impl Default for Services {
	fn default() -> Self {
		Self::builder().build()
	}
}

impl std::fmt::Debug for Services {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Services")
			.field("registry", &self.registry)
			.finish_non_exhaustive()
	}
}

impl Services {
	pub fn builder() -> ServicesBuilder {
		ServicesBuilder::default()
	}

	pub fn model_factory(&self) -> &dyn ModelFactory {
		self.model_factory.as_ref()
	}

	pub fn authorizer(&self) -> &dyn Authorizer {
		self.authorizer.as_ref()
	}

	pub fn executor(&self) -> &dyn Executor {
		self.executor.as_ref()
	}

	pub fn response_factory(&self) -> &dyn ResponseFactory {
		self.response_factory.as_ref()
	}

	pub fn hooks(&self) -> &dyn RouterHooks {
		self.hooks.as_ref()
	}

	pub fn registry(&self) -> &ModelRegistry {
		&self.registry
	}
}

/// Builder for [`Services`]. Unset collaborators use [`NoModels`],
/// [`DenyAll`], [`Unimplemented`], [`DefaultResponseFactory`] and [`NoHooks`].
#[derive(Default)]
pub struct ServicesBuilder {
	model_factory: Option<Arc<dyn ModelFactory>>,
	authorizer: Option<Arc<dyn Authorizer>>,
	executor: Option<Arc<dyn Executor>>,
	response_factory: Option<Arc<dyn ResponseFactory>>,
	hooks: Option<Arc<dyn RouterHooks>>,
	registry: Option<ModelRegistry>,
}

impl ServicesBuilder {
	pub fn model_factory(mut self, factory: impl ModelFactory + 'static) -> Self {
		self.model_factory = Some(Arc::new(factory));
		self
	}

	pub fn authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
		self.authorizer = Some(Arc::new(authorizer));
		self
	}

	pub fn executor(mut self, executor: impl Executor + 'static) -> Self {
		self.executor = Some(Arc::new(executor));
		self
	}

	/// Share an executor that is also used elsewhere.
	pub fn shared_executor(mut self, executor: Arc<dyn Executor>) -> Self {
		self.executor = Some(executor);
		self
	}

	pub fn response_factory(mut self, factory: impl ResponseFactory + 'static) -> Self {
		self.response_factory = Some(Arc::new(factory));
		self
	}

	pub fn hooks(mut self, hooks: impl RouterHooks + 'static) -> Self {
		self.hooks = Some(Arc::new(hooks));
		self
	}

	pub fn registry(mut self, registry: ModelRegistry) -> Self {
		self.registry = Some(registry);
		self
	}

	pub fn build(self) -> Services {
		Services {
			model_factory: self.model_factory.unwrap_or_else(|| Arc::new(NoModels)),
			authorizer: self.authorizer.unwrap_or_else(|| Arc::new(DenyAll)),
			executor: self.executor.unwrap_or_else(|| Arc::new(Unimplemented)),
			response_factory: self
				.response_factory
				.unwrap_or_else(|| Arc::new(DefaultResponseFactory)),
			hooks: self.hooks.unwrap_or_else(|| Arc::new(NoHooks)),
			registry: Arc::new(self.registry.unwrap_or_default()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("{request}", true)]
	#[case("{application}", true)]
	#[case("{request.id}", false)]
	#[case("request", false)]
	fn test_object_tokens(#[case] token: &str, #[case] is_object: bool) {
		assert_eq!(Argument::object_token(token).is_some(), is_object);
	}

	#[rstest]
	#[tokio::test]
	async fn test_default_collaborators() {
		let services = Services::default();
		let request = Request::get("/");

		assert!(services.model_factory().create("User", "1").await.unwrap().is_none());

		let denied = services
			.authorizer()
			.must(&request, "edit", None, &Map::new())
			.await;
		assert!(matches!(denied, Err(Error::PermissionDenied(_))));
	}
}
