// Forward matching: compilation, optional groups, wildcards, weights, methods

mod common;

use rstest::{fixture, rstest};
use switchyard_conf::RouterSettings;
use switchyard_exception::Error;
use switchyard_routers::{
	ArgValue, Router, RouteOptions, SegmentType, Services,
};

#[fixture]
fn router() -> Router {
	Router::new(RouterSettings::default().with_prefix(""), Services::default())
}

#[rstest]
fn test_compiled_integer_route(mut router: Router) {
	let route = router
		.add_route("GET:users/{int id}", RouteOptions::new())
		.unwrap();

	let methods: Vec<&str> = route.pattern().methods().iter().map(String::as_str).collect();
	assert_eq!(methods, vec!["GET"]);
	assert_eq!(
		route.pattern().segments(),
		&[
			SegmentType::Literal,
			SegmentType::Variable {
				type_name: "int".into(),
				name: "id".into()
			}
		]
	);
	assert!(route.pattern().is_match("users/42"));
	assert!(!route.pattern().is_match("users/abc"));
	assert!(!route.pattern().is_match("users/42/extra"));
}

#[rstest]
#[case("a", true)]
#[case("a/b", true)]
#[case("a/c", false)]
#[case("a/", false)]
fn test_optional_group(mut router: Router, #[case] path: &str, #[case] expected: bool) {
	router.add_route("a(/b)", RouteOptions::new()).unwrap();
	assert_eq!(router.match_path(path, "GET").is_ok(), expected);
}

#[rstest]
#[case("files/*", "files/", true)]
#[case("files/*", "files/x/y/z", true)]
#[case("files/*", "file", false)]
#[case(r"files/\*", "files/*", true)]
#[case(r"files/\*", "files/x", false)]
fn test_wildcards(
	mut router: Router,
	#[case] pattern: &str,
	#[case] path: &str,
	#[case] expected: bool,
) {
	router.add_route(pattern, RouteOptions::new()).unwrap();
	assert_eq!(router.match_path(path, "GET").is_ok(), expected);
}

#[rstest]
fn test_insertion_order_breaks_weight_ties(mut router: Router) {
	router
		.add_route("pages/{name}", RouteOptions::new().with_id("a"))
		.unwrap();
	router
		.add_route("pages/{slug}", RouteOptions::new().with_id("c"))
		.unwrap();

	let matched = router.match_path("pages/about", "GET").unwrap();
	assert_eq!(matched.route().id(), Some("a"));
}

#[rstest]
fn test_lower_weight_wins(mut router: Router) {
	router
		.add_route("pages/{name}", RouteOptions::new().with_id("a"))
		.unwrap();
	router
		.add_route("pages/{slug}", RouteOptions::new().with_id("b").with_weight(-1.0))
		.unwrap();
	router
		.add_route("pages/{page}", RouteOptions::new().with_id("c"))
		.unwrap();

	let order: Vec<Option<&str>> = router.routes().iter().map(|route| route.id()).collect();
	assert_eq!(order, vec![Some("b"), Some("a"), Some("c")]);
	assert_eq!(
		router.match_path("pages/about", "GET").unwrap().route().id(),
		Some("b")
	);
}

#[rstest]
fn test_explicit_weight_after_implicit(mut router: Router) {
	router
		.add_route("x/{a}", RouteOptions::new().with_id("a"))
		.unwrap();
	router
		.add_route("x/{b}", RouteOptions::new().with_id("b").with_weight(1.0))
		.unwrap();
	router
		.add_route("x/{c}", RouteOptions::new().with_id("c"))
		.unwrap();

	let order: Vec<Option<&str>> = router.routes().iter().map(|route| route.id()).collect();
	assert_eq!(order, vec![Some("a"), Some("c"), Some("b")]);
}

#[rstest]
fn test_method_restriction(mut router: Router) {
	router.add_route("POST:submit", RouteOptions::new()).unwrap();

	let result = router.match_path("submit", "GET");
	assert!(matches!(result, Err(Error::NotFound(_))));
	assert!(router.match_path("submit", "POST").is_ok());
}

#[rstest]
#[tokio::test]
async fn test_concrete_scenario(mut router: Router) {
	router
		.add_route("GET:/", RouteOptions::new().with_id("home"))
		.unwrap();
	router
		.add_route("GET:/users/{int id}", RouteOptions::new().with_id("userShow"))
		.unwrap();
	router
		.add_route("POST:/users", RouteOptions::new().with_id("userCreate"))
		.unwrap();

	let mut matched = router.match_path("/users/5", "GET").unwrap();
	assert_eq!(matched.route().id(), Some("userShow"));
	let arguments = matched
		.process_arguments_with(router.services())
		.await
		.unwrap();
	assert_eq!(arguments.get("id"), Some(&ArgValue::Int(5)));

	assert!(matches!(
		router.match_path("/users/5", "POST"),
		Err(Error::NotFound(_))
	));
	assert_eq!(
		router.match_path("/users", "POST").unwrap().route().id(),
		Some("userCreate")
	);
	assert_eq!(
		router.match_path("/", "GET").unwrap().route().id(),
		Some("home")
	);
}

#[rstest]
fn test_default_prefix_is_stripped() {
	let mut router = Router::default();
	router.add_route("users/{id}", RouteOptions::new()).unwrap();

	let matched = router.match_path("/users/9", "GET").unwrap();
	assert_eq!(matched.path(), "users/9");
	assert_eq!(matched.raw("id"), Some("9"));
}

#[rstest]
fn test_aliases_resolve_before_matching(mut router: Router) {
	router
		.import_toml(
			r#"
[[route]]
pattern = "about"
method = "Pages::about"
aliases = ["about-us", "company"]
"#,
		)
		.unwrap();
	router.add_alias("info", "about");

	for path in ["about", "about-us", "company", "info"] {
		let matched = router.match_path(path, "GET").unwrap();
		assert_eq!(matched.route().original_pattern(), "about");
	}
}

#[rstest]
fn test_alias_map_registers_keys(mut router: Router) {
	router.add_route("pages/{name}", RouteOptions::new()).unwrap();
	let options = RouteOptions::from_json(serde_json::json!({
		"aliases": {"about-us": "pages/about", "0": "company"},
		"aliasTarget": "pages/company",
	}))
	.unwrap();
	router.add_route("about", options).unwrap();

	assert_eq!(router.aliases()["about-us"], "pages/about");
	assert_eq!(router.aliases()["company"], "pages/company");

	let matched = router.match_path("about-us", "GET").unwrap();
	assert_eq!(matched.raw("name"), Some("about"));
	let matched = router.match_path("company", "GET").unwrap();
	assert_eq!(matched.raw("name"), Some("company"));
}

#[rstest]
fn test_non_string_alias_is_rejected(mut router: Router) {
	let options = RouteOptions::from_json(serde_json::json!({"aliases": [1]})).unwrap();
	let result = router.add_route("about", options);
	assert!(matches!(result, Err(Error::Configuration(_))));
	assert!(router.is_empty());
}

#[rstest]
fn test_lenient_patterns_still_match(mut router: Router) {
	let route = router.add_route("odd(path/{id", RouteOptions::new()).unwrap();
	assert!(!route.pattern().lints().is_empty());
	assert!(router.match_path("odd(path/{id", "GET").is_ok());
	assert!(router.match_path("oddpath/5", "GET").is_err());
}
