//! Declarative URL routing with typed path arguments and reverse routing.
//!
//! ## Patterns
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `GET\|POST:path` | Accepted methods (default `OPTIONS`, `GET`, `POST`) |
//! | `{name}` | One untyped segment |
//! | `{type name}` | One typed segment: `int`, `float`, `list`, `comma_list`, `dash_list`, `option` or a model class |
//! | `(...)` | Optional group |
//! | `*` | Any text, including `/` |
//! | `\*` | A literal `*` |
//!
//! A placeholder only binds an argument when it is the whole segment.
//! `int` and `float` segments only match number-like text.
//!
//! ## Example
//!
//! ```
//! use switchyard_routers::{ReverseOptions, ReverseTarget, Router, RouteOptions};
//!
//! let mut router = Router::default();
//! router
//!     .add_route(
//!         "GET:articles/{int year}/{slug}",
//!         RouteOptions::new().with_controller("Articles").with_id("article"),
//!     )
//!     .unwrap();
//!
//! let matched = router.match_path("/articles/2024/hello", "GET").unwrap();
//! assert_eq!(matched.raw("slug"), Some("hello"));
//!
//! let url = router
//!     .get_route(
//!         "article",
//!         ReverseTarget::None,
//!         ReverseOptions::new().with_value("year", "2025").with_value("slug", "bye"),
//!     )
//!     .unwrap();
//! assert_eq!(url, "/articles/2025/bye");
//! ```

pub mod cache;
pub mod converters;
pub mod import;
pub mod model;
pub mod options;
pub mod pattern;
pub mod reverse;
pub mod route;
pub mod router;
pub mod services;
pub mod substitution;

pub use cache::{InMemoryRouterCache, RouterCache};
pub use converters::{ArgValue, ArgumentType};
pub use model::{Model, ModelRegistry, ROOT_MODEL};
pub use options::{
	AliasesOption, CacheOption, PermissionRule, RouteArgument, RouteKind, RouteOptions,
};
pub use pattern::{CompiledPattern, PatternCompiler, PatternLint, SegmentType};
pub use reverse::{ReverseOptions, ReverseTarget, ReverseValue};
pub use route::{Arguments, Route, RouteMatch};
pub use router::{Router, RouterContext};
pub use services::{
	Argument, Authorizer, Executor, Invocation, ModelFactory, RouterHooks, Services,
	ServicesBuilder,
};
pub use switchyard_exception::{Error, Result};
