//! Declarative route options.

use crate::converters::is_numeric;
use crate::substitution::map_tokens;
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use switchyard_exception::{Error, Result};
use switchyard_http::CacheSettings;

/// One entry of the `arguments` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteArgument {
	/// The URL part at this segment index, or an empty string if absent.
	Position(usize),
	/// Literal text, subject to `{token}` mapping.
	Literal(String),
}

impl Serialize for RouteArgument {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		match self {
			RouteArgument::Position(index) => serializer.serialize_u64(*index as u64),
			RouteArgument::Literal(text) => serializer.serialize_str(text),
		}
	}
}

impl<'de> Deserialize<'de> for RouteArgument {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		match Value::deserialize(deserializer)? {
			Value::Number(n) => n
				.as_u64()
				.map(|index| RouteArgument::Position(index as usize))
				.ok_or_else(|| de::Error::custom(format!("invalid argument index {}", n))),
			Value::String(text) => Ok(match text.parse::<usize>() {
				Ok(index) => RouteArgument::Position(index),
				Err(_) => RouteArgument::Literal(text),
			}),
			other => Ok(RouteArgument::Literal(other.to_string())),
		}
	}
}

/// An entry of the `permissions` option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionRule {
	/// Just the action name.
	Action(String),
	/// Action with context token and options.
	Detailed {
		action: String,
		#[serde(default)]
		context: Option<String>,
		#[serde(default)]
		options: Map<String, Value>,
	},
}

impl PermissionRule {
	pub fn action(&self) -> &str {
		match self {
			PermissionRule::Action(action) | PermissionRule::Detailed { action, .. } => action,
		}
	}

	pub fn context(&self) -> Option<&str> {
		match self {
			PermissionRule::Action(_) => None,
			PermissionRule::Detailed { context, .. } => context.as_deref(),
		}
	}

	pub fn options(&self) -> Option<&Map<String, Value>> {
		match self {
			PermissionRule::Action(_) => None,
			PermissionRule::Detailed { options, .. } => Some(options),
		}
	}
}

/// The `cache` option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheOption {
	/// `true` caches forever.
	Flag(bool),
	Settings(CacheSettings),
	/// Anything else is reported and ignored.
	Invalid(Value),
}

/// The `aliases` option: extra paths that match this route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasesOption {
	List(Vec<Value>),
	Map(IndexMap<String, Value>),
}

impl AliasesOption {
	/// `(alias, target)` pairs. A map entry with a non-numeric key aliases
	/// the key to the value. List entries and numeric keys alias the value
	/// to the route itself (`None`). All values must be strings.
	pub fn paths(&self) -> Result<Vec<(String, Option<String>)>> {
		let entries: Vec<(Option<&str>, &Value)> = match self {
			AliasesOption::List(values) => values.iter().map(|value| (None, value)).collect(),
			AliasesOption::Map(values) => values
				.iter()
				.map(|(key, value)| (Some(key.as_str()).filter(|key| !is_numeric(key)), value))
				.collect(),
		};
		entries
			.into_iter()
			.map(|(key, value)| match (key, value) {
				(Some(alias), Value::String(target)) => Ok((alias.to_string(), Some(target.clone()))),
				(None, Value::String(alias)) => Ok((alias.clone(), None)),
				(_, other) => Err(Error::Configuration(format!(
					"route alias must be a string, got {}",
					other
				))),
			})
			.collect()
	}
}

/// Everything a route declaration can say besides its pattern.
///
/// Unknown keys are kept in [`RouteOptions::extra`] and take part in token
/// mapping, so executors can read their own options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
	pub controller: Option<String>,
	pub command: Option<String>,
	pub theme: Option<String>,
	pub method: Option<String>,
	pub file: Option<String>,
	pub redirect: Option<String>,
	pub action: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub arguments: Option<Vec<RouteArgument>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub permission: Option<String>,
	#[serde(
		rename = "permission context",
		alias = "permission_context",
		skip_serializing_if = "Option::is_none"
	)]
	pub permission_context: Option<String>,
	#[serde(
		rename = "permission options",
		alias = "permission_options",
		skip_serializing_if = "Map::is_empty"
	)]
	pub permission_options: Map<String, Value>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub permissions: Vec<PermissionRule>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub cache: Option<CacheOption>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status_code: Option<u16>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status_message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub output_handler: Option<String>,
	#[serde(rename = "contentType", alias = "content_type", skip_serializing_if = "Option::is_none")]
	pub content_type: Option<String>,
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub json: bool,
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub html: bool,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub weight: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,

	#[serde(deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
	pub classes: Vec<String>,
	#[serde(deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
	pub actions: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub class_actions: Option<IndexMap<String, Vec<String>>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub aliases: Option<AliasesOption>,
	#[serde(rename = "aliasTarget", alias = "alias_target", skip_serializing_if = "Option::is_none")]
	pub alias_target: Option<String>,

	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum OneOrMany {
		One(String),
		Many(Vec<String>),
	}
	Ok(match OneOrMany::deserialize(deserializer)? {
		OneOrMany::One(value) => vec![value],
		OneOrMany::Many(values) => values,
	})
}

impl RouteOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_controller(mut self, controller: impl Into<String>) -> Self {
		self.controller = Some(controller.into());
		self
	}

	pub fn with_action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn with_command(mut self, command: impl Into<String>) -> Self {
		self.command = Some(command.into());
		self
	}

	pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
		self.theme = Some(theme.into());
		self
	}

	pub fn with_method(mut self, method: impl Into<String>) -> Self {
		self.method = Some(method.into());
		self
	}

	pub fn with_file(mut self, file: impl Into<String>) -> Self {
		self.file = Some(file.into());
		self
	}

	pub fn with_redirect(mut self, url: impl Into<String>) -> Self {
		self.redirect = Some(url.into());
		self
	}

	pub fn with_weight(mut self, weight: f64) -> Self {
		self.weight = Some(weight);
		self
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn with_classes<I, S>(mut self, classes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.classes = classes.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_actions<I, S>(mut self, actions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.actions = actions.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_arguments(mut self, arguments: Vec<RouteArgument>) -> Self {
		self.arguments = Some(arguments);
		self
	}

	pub fn with_permission(mut self, action: impl Into<String>, context: Option<&str>) -> Self {
		self.permission = Some(action.into());
		self.permission_context = context.map(str::to_string);
		self
	}

	pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.extra.insert(key.into(), value.into());
		self
	}

	/// Set a textual option by its declared key. Keys without a dedicated
	/// field go to [`RouteOptions::extra`].
	pub fn set_option(&mut self, key: &str, value: String) {
		let slot = match key {
			"controller" => &mut self.controller,
			"command" => &mut self.command,
			"theme" => &mut self.theme,
			"method" => &mut self.method,
			"file" => &mut self.file,
			"redirect" => &mut self.redirect,
			"action" => &mut self.action,
			"status_message" => &mut self.status_message,
			"output_handler" => &mut self.output_handler,
			"contentType" | "content_type" => &mut self.content_type,
			_ => {
				self.extra.insert(key.to_string(), Value::String(value));
				return;
			}
		};
		*slot = Some(value);
	}

	/// Build options from a JSON object, as found in route files.
	pub fn from_json(value: Value) -> Result<Self> {
		Ok(serde_json::from_value(value)?)
	}

	/// Class to actions table used for reverse routing.
	///
	/// An explicit `class_actions` option wins. Otherwise each of `classes`
	/// serves `actions`, or the single `action` when it is concrete, or `*`.
	pub fn class_actions(&self) -> IndexMap<String, Vec<String>> {
		if let Some(class_actions) = &self.class_actions {
			return class_actions.clone();
		}
		let actions = if !self.actions.is_empty() {
			self.actions.clone()
		} else {
			match self.action.as_deref() {
				Some(action) if !action.is_empty() && action != "{action}" => {
					vec![action.to_string()]
				}
				_ => vec!["*".to_string()],
			}
		};
		self.classes
			.iter()
			.map(|class| (class.clone(), actions.clone()))
			.collect()
	}

	/// Copy with `{token}`s in the textual options replaced from `values`.
	///
	/// Identity options (`id`, `classes`, `actions`, `weight`) are left alone.
	pub fn map_tokens(&self, values: &BTreeMap<String, String>) -> Self {
		let map = |text: &Option<String>| text.as_ref().map(|t| map_tokens(t, values));
		let mut mapped = self.clone();
		mapped.controller = map(&self.controller);
		mapped.command = map(&self.command);
		mapped.theme = map(&self.theme);
		mapped.method = map(&self.method);
		mapped.file = map(&self.file);
		mapped.redirect = map(&self.redirect);
		mapped.action = map(&self.action);
		mapped.permission = map(&self.permission);
		mapped.permission_context = map(&self.permission_context);
		mapped.status_message = map(&self.status_message);
		mapped.output_handler = map(&self.output_handler);
		mapped.content_type = map(&self.content_type);
		mapped.arguments = self.arguments.as_ref().map(|arguments| {
			arguments
				.iter()
				.map(|argument| match argument {
					RouteArgument::Literal(text) => {
						RouteArgument::Literal(map_tokens(text, values))
					}
					position => position.clone(),
				})
				.collect()
		});
		mapped.extra = self
			.extra
			.iter()
			.map(|(key, value)| (key.clone(), map_value(value, values)))
			.collect();
		mapped
	}
}

pub(crate) fn map_value(value: &Value, values: &BTreeMap<String, String>) -> Value {
	match value {
		Value::String(text) => Value::String(map_tokens(text, values)),
		Value::Array(items) => Value::Array(items.iter().map(|v| map_value(v, values)).collect()),
		Value::Object(entries) => Value::Object(
			entries
				.iter()
				.map(|(k, v)| (k.clone(), map_value(v, values)))
				.collect(),
		),
		other => other.clone(),
	}
}

/// What a route does when executed.
///
/// Derived from options in a fixed priority order: `controller`, `command`,
/// `theme`, `method`, `file`, `redirect`, otherwise plain content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteKind {
	Controller {
		controller: String,
		action: Option<String>,
	},
	Command {
		command: String,
	},
	Theme {
		theme: String,
	},
	Method {
		method: String,
	},
	File {
		file: String,
	},
	Redirect {
		url: String,
	},
	Content,
}

impl RouteKind {
	/// # Examples
	///
	/// ```
	/// use switchyard_routers::options::{RouteKind, RouteOptions};
	///
	/// let options = RouteOptions::new()
	///     .with_redirect("/elsewhere")
	///     .with_method("Pages::show");
	/// assert_eq!(
	///     RouteKind::from_options(&options),
	///     RouteKind::Method { method: "Pages::show".into() }
	/// );
	/// assert_eq!(RouteKind::from_options(&RouteOptions::new()), RouteKind::Content);
	/// ```
	pub fn from_options(options: &RouteOptions) -> Self {
		let present = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
		if let Some(controller) = present(&options.controller) {
			RouteKind::Controller {
				controller,
				action: present(&options.action),
			}
		} else if let Some(command) = present(&options.command) {
			RouteKind::Command { command }
		} else if let Some(theme) = present(&options.theme) {
			RouteKind::Theme { theme }
		} else if let Some(method) = present(&options.method) {
			RouteKind::Method { method }
		} else if let Some(file) = present(&options.file) {
			RouteKind::File { file }
		} else if let Some(url) = present(&options.redirect) {
			RouteKind::Redirect { url }
		} else {
			RouteKind::Content
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			RouteKind::Controller { .. } => "controller",
			RouteKind::Command { .. } => "command",
			RouteKind::Theme { .. } => "theme",
			RouteKind::Method { .. } => "method",
			RouteKind::File { .. } => "file",
			RouteKind::Redirect { .. } => "redirect",
			RouteKind::Content => "content",
		}
	}
}
