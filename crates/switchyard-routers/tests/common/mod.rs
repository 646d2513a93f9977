//! Shared collaborators for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use switchyard_exception::{Error, Result};
use switchyard_http::{Request, Response};
use switchyard_routers::{
	Argument, Authorizer, Executor, Invocation, Model, ModelFactory, ModelRegistry, RouteKind,
	RouteOptions,
};

#[derive(Debug)]
pub struct TestModel {
	class: String,
	id: String,
}

impl TestModel {
	pub fn new(class: &str, id: &str) -> Arc<dyn Model> {
		Arc::new(Self {
			class: class.to_string(),
			id: id.to_string(),
		})
	}
}

impl Model for TestModel {
	fn class_name(&self) -> &str {
		&self.class
	}

	fn id(&self) -> String {
		self.id.clone()
	}
}

/// Models keyed by lowercase class and id.
#[derive(Default)]
pub struct MemoryModels {
	models: HashMap<(String, String), Arc<dyn Model>>,
}

impl MemoryModels {
	pub fn with(mut self, class: &str, id: &str) -> Self {
		self.models
			.insert((class.to_lowercase(), id.to_string()), TestModel::new(class, id));
		self
	}
}

#[async_trait]
impl ModelFactory for MemoryModels {
	async fn create(&self, class: &str, raw: &str) -> Result<Option<Arc<dyn Model>>> {
		Ok(self
			.models
			.get(&(class.to_lowercase(), raw.to_string()))
			.cloned())
	}
}

#[derive(Debug, Clone)]
pub struct Call {
	pub kind: RouteKind,
	pub args: Vec<Argument>,
	pub named: Vec<(String, String)>,
	pub options: RouteOptions,
}

/// Executor that records invocations and answers with the kind name.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
	calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingExecutor {
	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn last(&self) -> Call {
		self.calls.lock().last().cloned().expect("executor was not called")
	}
}

#[async_trait]
impl Executor for RecordingExecutor {
	async fn execute(&self, invocation: &Invocation<'_>, response: Response) -> Result<Response> {
		self.calls.lock().push(Call {
			kind: invocation.kind.clone(),
			args: invocation.args.clone(),
			named: invocation
				.arguments
				.named()
				.iter()
				.map(|(k, v)| (k.clone(), v.to_string()))
				.collect(),
			options: invocation.options.clone(),
		});
		Ok(response.with_body(invocation.kind.name()))
	}
}

/// Executor that always fails with a copy of the configured error.
pub enum FailingExecutor {
	NotFound,
	System(u16),
	Denied,
}

#[async_trait]
impl Executor for FailingExecutor {
	async fn execute(&self, _invocation: &Invocation<'_>, _response: Response) -> Result<Response> {
		Err(match self {
			FailingExecutor::NotFound => Error::NotFound("missing record".to_string()),
			FailingExecutor::System(status) => Error::system_with_status(*status, "backend down"),
			FailingExecutor::Denied => Error::PermissionDenied("executor refused".to_string()),
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Check {
	pub action: String,
	pub context: Option<String>,
	pub options: Map<String, Value>,
}

/// Authorizer that records checks and refuses the configured actions.
#[derive(Clone, Default)]
pub struct RecordingAuthorizer {
	denied: Arc<HashSet<String>>,
	checks: Arc<Mutex<Vec<Check>>>,
}

impl RecordingAuthorizer {
	pub fn denying(actions: &[&str]) -> Self {
		Self {
			denied: Arc::new(actions.iter().map(|a| a.to_string()).collect()),
			checks: Arc::default(),
		}
	}

	pub fn checks(&self) -> Vec<Check> {
		self.checks.lock().clone()
	}
}

#[async_trait]
impl Authorizer for RecordingAuthorizer {
	async fn must(
		&self,
		_request: &Request,
		action: &str,
		context: Option<&dyn Model>,
		options: &Map<String, Value>,
	) -> Result<()> {
		self.checks.lock().push(Check {
			action: action.to_string(),
			context: context.map(|model| format!("{}:{}", model.class_name(), model.id())),
			options: options.clone(),
		});
		if self.denied.contains(action) {
			return Err(Error::PermissionDenied(action.to_string()));
		}
		Ok(())
	}
}

/// `Person <- Author`, `Article`, `User`.
pub fn registry() -> ModelRegistry {
	let mut registry = ModelRegistry::new();
	registry
		.register("Person", None)
		.register("Author", Some("Person"))
		.register("Article", None)
		.register("User", None);
	registry
}
