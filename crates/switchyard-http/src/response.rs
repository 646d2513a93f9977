use crate::request::Request;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

pub const CONTENT_TYPE_HTML: &str = "text/html";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Explicit cache settings for a route response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
	pub seconds: Option<u64>,
	pub level: Option<String>,
	pub parts: Vec<String>,
	pub headers: Vec<String>,
	pub expires: Option<String>,
}

/// How a response may be cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CachePolicy {
	#[default]
	None,
	Forever,
	Settings(CacheSettings),
}

/// HTTP response produced by route execution.
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub status_message: Option<String>,
	pub headers: HeaderMap,
	pub body: Bytes,
	pub content_type: Option<String>,
	pub cache: CachePolicy,
	pub output_handler: Option<String>,
	pub redirect: Option<String>,
}

impl Response {
	/// Create a new Response with the given status code
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_http::Response;
	/// use http::StatusCode;
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			status_message: None,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			content_type: None,
			cache: CachePolicy::None,
			output_handler: None,
			redirect: None,
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	/// Set the status code. Codes outside 100..=999 become 500.
	pub fn set_status(&mut self, code: u16) -> &mut Self {
		self.status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		self
	}

	pub fn set_status_message(&mut self, message: impl Into<String>) -> &mut Self {
		self.status_message = Some(message.into());
		self
	}

	pub fn set_cache_forever(&mut self) -> &mut Self {
		self.cache = CachePolicy::Forever;
		self
	}

	pub fn set_cache(&mut self, settings: CacheSettings) -> &mut Self {
		self.cache = CachePolicy::Settings(settings);
		self
	}

	pub fn set_output_handler(&mut self, handler: impl Into<String>) -> &mut Self {
		self.output_handler = Some(handler.into());
		self
	}

	pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
		self.content_type = Some(content_type.into());
		self
	}

	pub fn make_json(&mut self) -> &mut Self {
		self.set_content_type(CONTENT_TYPE_JSON)
	}

	pub fn make_html(&mut self) -> &mut Self {
		self.set_content_type(CONTENT_TYPE_HTML)
	}

	/// Redirect to `url` with a 302 unless a redirect status is already set.
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_http::Response;
	/// use http::StatusCode;
	///
	/// let mut response = Response::ok();
	/// response.redirect("/login");
	/// assert_eq!(response.status, StatusCode::FOUND);
	/// assert_eq!(response.redirect.as_deref(), Some("/login"));
	/// ```
	pub fn redirect(&mut self, url: impl Into<String>) -> &mut Self {
		if !self.status.is_redirection() {
			self.status = StatusCode::FOUND;
		}
		self.redirect = Some(url.into());
		self
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn is_json(&self) -> bool {
		self.content_type.as_deref() == Some(CONTENT_TYPE_JSON)
	}
}

/// Creates the response a route execution starts from.
pub trait ResponseFactory: Send + Sync {
	fn create(&self, request: &Request, content_type: Option<&str>) -> Response;
}

/// `200 OK` response using the content type hint, or HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponseFactory;

impl ResponseFactory for DefaultResponseFactory {
	fn create(&self, _request: &Request, content_type: Option<&str>) -> Response {
		let mut response = Response::ok();
		response.set_content_type(content_type.unwrap_or(CONTENT_TYPE_HTML));
		response
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_invalid_status_becomes_server_error() {
		let mut response = Response::ok();
		response.set_status(42);
		assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
		response.set_status(404);
		assert_eq!(response.status, StatusCode::NOT_FOUND);
	}

	#[rstest]
	fn test_redirect_keeps_explicit_redirect_status() {
		let mut response = Response::ok();
		response.set_status(301).redirect("/new");
		assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
	}

	#[rstest]
	fn test_default_factory_uses_hint() {
		let request = Request::get("/");
		let factory = DefaultResponseFactory;
		assert_eq!(
			factory.create(&request, None).content_type.as_deref(),
			Some(CONTENT_TYPE_HTML)
		);
		assert!(factory.create(&request, Some(CONTENT_TYPE_JSON)).is_json());
	}

	#[rstest]
	fn test_cache_settings_deserialize_partial() {
		let settings: CacheSettings = serde_json::from_str(r#"{"seconds": 60}"#).unwrap();
		assert_eq!(settings.seconds, Some(60));
		assert!(settings.parts.is_empty());
	}
}
