//! HTTP request and response types consumed by the switchyard router.
//!
//! These are intentionally small: the router reads a request's method, path
//! and substitution variables, and configures a response's status, caching,
//! content type and redirect. Everything else belongs to the serving layer.

pub mod request;
pub mod response;

pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::{
	CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, CachePolicy, CacheSettings, DefaultResponseFactory,
	Response, ResponseFactory,
};
