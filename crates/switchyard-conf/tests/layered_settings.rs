// Layered settings loading: defaults < TOML file < environment

use rstest::rstest;
use serial_test::serial;
use std::io::Write;
use switchyard_conf::{DefaultSource, EnvSource, RouterSettings, TomlFileSource};

fn write_toml(contents: &str) -> tempfile::NamedTempFile {
	let mut file = tempfile::NamedTempFile::new().expect("temp file");
	file.write_all(contents.as_bytes()).expect("write settings");
	file
}

#[rstest]
#[serial(switchyard_env)]
fn test_toml_overrides_defaults() {
	let file = write_toml("prefix = \"/site/\"\nweight_divisor = 10000\n");

	let settings = RouterSettings::builder()
		.add_source(DefaultSource::new().with_value("prefix", "/".into()))
		.add_source(TomlFileSource::new(file.path()))
		.build()
		.unwrap();

	assert_eq!(settings.prefix, "/site/");
	assert_eq!(settings.weight_divisor, 10000);
	assert!(!settings.debug);
}

#[rstest]
#[serial(switchyard_env)]
fn test_environment_overrides_toml() {
	let file = write_toml("[router]\nprefix = \"/site/\"\ndebug = false\n");

	// SAFETY: serialized with the other environment tests in this file.
	unsafe {
		std::env::set_var("SWITCHYARD_TEST_DEBUG", "on");
		std::env::set_var("SWITCHYARD_TEST_DEFAULT_METHODS", "GET|HEAD");
	}

	let settings = RouterSettings::builder()
		.add_source(EnvSource::new().with_prefix("SWITCHYARD_TEST_"))
		.add_source(TomlFileSource::new(file.path()))
		.build();

	unsafe {
		std::env::remove_var("SWITCHYARD_TEST_DEBUG");
		std::env::remove_var("SWITCHYARD_TEST_DEFAULT_METHODS");
	}

	let settings = settings.unwrap();
	assert_eq!(settings.prefix, "/site/");
	assert!(settings.debug);
	assert_eq!(settings.default_methods, vec!["GET", "HEAD"]);
}

#[rstest]
#[serial(switchyard_env)]
fn test_malformed_toml_is_reported() {
	let file = write_toml("prefix = ");

	let result = RouterSettings::builder()
		.add_source(TomlFileSource::new(file.path()))
		.build();

	assert!(result.is_err());
}
