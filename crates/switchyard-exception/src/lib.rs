//! Error types for the switchyard routing engine.
//!
//! Every crate in the workspace reports failures through [`Error`]. The
//! variants follow the dispatch lifecycle:
//!
//! - [`Error::NotFound`]: no route for a path, no reverse route for an
//!   action, or a typed model segment that resolved to nothing
//! - [`Error::Syntax`]: a numeric path segment that is not numeric
//! - [`Error::PermissionDenied`]: an authorization check refused the request
//! - [`Error::System`]: a route executor failed
//!
//! "Not found" is an expected outcome of matching and reverse lookup, so it
//! is always returned as a value and never raised as a panic.

use thiserror::Error;

/// HTTP status used when an executor failure carries no status of its own.
pub const DEFAULT_SYSTEM_STATUS: u16 = 500;

/// Errors raised while compiling, matching, executing or reversing routes.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
	/// No route, reverse route, route id or model matched.
	#[error("Not found: {0}")]
	NotFound(String),

	/// A path segment could not be converted to its declared type.
	#[error("Syntax error: {0}")]
	Syntax(String),

	/// An authorization collaborator refused the action.
	#[error("Permission denied: {0}")]
	PermissionDenied(String),

	/// A route executor failed.
	#[error("System error: {message}")]
	System {
		/// Status code requested by the failing executor, if any.
		status: Option<u16>,
		/// Human readable failure description.
		message: String,
	},

	/// A route pattern could not be compiled into a matcher.
	#[error("Invalid pattern: {0}")]
	Pattern(String),

	/// Route or router declarations are inconsistent.
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// A route was used before being attached to a router.
	#[error("Route is not attached to a router: {0}")]
	Detached(String),

	/// The route cache could not be read or written.
	#[error("Cache error: {0}")]
	Cache(String),

	/// JSON serialization failed.
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl Error {
	/// Create a [`Error::System`] failure without an explicit status.
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_exception::Error;
	///
	/// let err = Error::system("controller exploded");
	/// assert_eq!(err.status_code(), 500);
	/// ```
	pub fn system(message: impl Into<String>) -> Self {
		Self::System {
			status: None,
			message: message.into(),
		}
	}

	/// Create a [`Error::System`] failure carrying the status to respond with.
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_exception::Error;
	///
	/// let err = Error::system_with_status(503, "maintenance");
	/// assert_eq!(err.status_code(), 503);
	/// ```
	pub fn system_with_status(status: u16, message: impl Into<String>) -> Self {
		Self::System {
			status: Some(status),
			message: message.into(),
		}
	}

	/// HTTP status code a surrounding layer should use for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			Self::NotFound(_) | Self::Syntax(_) => 404,
			Self::PermissionDenied(_) => 403,
			Self::System { status, .. } => status.unwrap_or(DEFAULT_SYSTEM_STATUS),
			_ => DEFAULT_SYSTEM_STATUS,
		}
	}

	/// Whether the error means "the requested path does not resolve".
	///
	/// Syntax failures count: a malformed typed segment is a bad path, not a
	/// server fault.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound(_) | Self::Syntax(_))
	}

	/// Message without the variant prefix, used as a response status message.
	pub fn message(&self) -> String {
		match self {
			Self::NotFound(msg)
			| Self::Syntax(msg)
			| Self::PermissionDenied(msg)
			| Self::Pattern(msg)
			| Self::Configuration(msg)
			| Self::Detached(msg)
			| Self::Cache(msg) => msg.clone(),
			Self::System { message, .. } => message.clone(),
			Self::Serialization(err) => err.to_string(),
		}
	}
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Error::NotFound("x".into()), 404)]
	#[case(Error::Syntax("x".into()), 404)]
	#[case(Error::PermissionDenied("x".into()), 403)]
	#[case(Error::system("x"), 500)]
	#[case(Error::system_with_status(418, "teapot"), 418)]
	#[case(Error::Configuration("x".into()), 500)]
	fn test_status_code(#[case] err: Error, #[case] expected: u16) {
		assert_eq!(err.status_code(), expected);
	}

	#[rstest]
	fn test_not_found_classification() {
		assert!(Error::NotFound("a".into()).is_not_found());
		assert!(Error::Syntax("a".into()).is_not_found());
		assert!(!Error::PermissionDenied("a".into()).is_not_found());
		assert!(!Error::system("a").is_not_found());
	}

	#[rstest]
	fn test_display_and_message() {
		let err = Error::NotFound("No match for users/5 (POST)".to_string());
		assert_eq!(err.to_string(), "Not found: No match for users/5 (POST)");
		assert_eq!(err.message(), "No match for users/5 (POST)");

		let err = Error::system_with_status(502, "upstream");
		assert_eq!(err.to_string(), "System error: upstream");
		assert_eq!(err.message(), "upstream");
	}
}
