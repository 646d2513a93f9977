//! # Switchyard
//!
//! A declarative URL routing engine. Routes are declared as patterns with
//! typed placeholders and an options table; the router matches requests
//! against them by weight, converts path segments into typed arguments and
//! generates URLs back from an action and a model object.
//!
//! ## Feature Flags
//!
//! - `minimal` - Pattern compilation, matching and reverse routing
//! - `full` (default) - Everything in `minimal` plus layered settings and the
//!   request/response types
//!
//! Fine-grained flags: `routers`, `conf`, `http`.
//!
//! ## Quick Example
//!
//! ```
//! use switchyard::prelude::*;
//!
//! let mut router = Router::new(RouterSettings::default(), Services::default());
//! router
//!     .add_route("GET:users/{int id}", RouteOptions::new().with_id("user"))
//!     .unwrap();
//!
//! let matched = router.match_path("/users/5", "GET").unwrap();
//! assert_eq!(matched.raw("id"), Some("5"));
//! ```

pub use switchyard_exception::{Error, Result};

#[cfg(feature = "conf")]
pub mod conf {
	pub use switchyard_conf::*;
}

#[cfg(feature = "http")]
pub mod http {
	pub use switchyard_http::*;
}

#[cfg(feature = "routers")]
pub mod routers {
	pub use switchyard_routers::*;
}

#[cfg(feature = "routers")]
pub use switchyard_routers::{
	ArgValue, Arguments, Model, ModelRegistry, ReverseOptions, ReverseTarget, Route, RouteKind,
	RouteMatch, RouteOptions, Router, Services,
};

#[cfg(feature = "conf")]
pub use switchyard_conf::RouterSettings;

#[cfg(feature = "http")]
pub use switchyard_http::{Method, Request, Response, StatusCode};

pub mod prelude {
	pub use crate::{Error, Result};

	#[cfg(feature = "routers")]
	pub use switchyard_routers::{
		ArgValue, Argument, Arguments, Authorizer, Executor, Invocation, Model, ModelFactory,
		ModelRegistry, ReverseOptions, ReverseTarget, Route, RouteKind, RouteMatch, RouteOptions,
		Router, RouterHooks, Services,
	};

	#[cfg(feature = "conf")]
	pub use switchyard_conf::RouterSettings;

	#[cfg(feature = "http")]
	pub use switchyard_http::{Method, Request, Response, StatusCode};

	// External
	pub use async_trait::async_trait;
}
