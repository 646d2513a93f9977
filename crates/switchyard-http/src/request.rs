use http::Method;
use std::collections::BTreeMap;

/// The parts of an incoming HTTP request the router reads.
///
/// Header, cookie and body handling belong to the serving layer; the router
/// only needs the method, the path and the request/url variables used for
/// `{request.*}` and `{url.*}` substitutions.
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub path: String,
	/// Query and form variables.
	pub variables: BTreeMap<String, String>,
	/// Components of the request URL (`scheme`, `host`, `path`, `query`, ...).
	pub url_components: BTreeMap<String, String>,
}

impl Request {
	/// Create a request for `method` and `path`.
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_http::Request;
	/// use http::Method;
	///
	/// let request = Request::new(Method::GET, "/users/5");
	/// assert_eq!(request.method_str(), "GET");
	/// assert_eq!(request.url_components.get("path").map(String::as_str), Some("/users/5"));
	/// ```
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		let path = path.into();
		let mut url_components = BTreeMap::new();
		url_components.insert("path".to_string(), path.clone());
		Self {
			method,
			path,
			variables: BTreeMap::new(),
			url_components,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Add a request variable.
	pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.variables.insert(name.into(), value.into());
		self
	}

	/// Add a URL component.
	pub fn with_url_component(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.url_components.insert(name.into(), value.into());
		self
	}

	pub fn method_str(&self) -> &str {
		self.method.as_str()
	}

	/// Variables keyed for token substitution: `request.<name>` and `url.<name>`.
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_http::Request;
	///
	/// let request = Request::get("/").with_variable("q", "rust");
	/// let map = request.substitution_map();
	/// assert_eq!(map.get("request.q").map(String::as_str), Some("rust"));
	/// assert_eq!(map.get("url.path").map(String::as_str), Some("/"));
	/// ```
	pub fn substitution_map(&self) -> BTreeMap<String, String> {
		let request = self
			.variables
			.iter()
			.map(|(k, v)| (format!("request.{}", k), v.clone()));
		let url = self
			.url_components
			.iter()
			.map(|(k, v)| (format!("url.{}", k), v.clone()));
		request.chain(url).collect()
	}
}
