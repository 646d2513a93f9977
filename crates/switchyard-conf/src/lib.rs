//! # Switchyard Settings
//!
//! Layered configuration for the router: built-in defaults, an optional TOML
//! file and `SWITCHYARD_*` environment variables, merged by priority.
//!
//! ```
//! use switchyard_conf::RouterSettings;
//! use switchyard_conf::sources::{EnvSource, TomlFileSource};
//!
//! let settings = RouterSettings::builder()
//!     .add_source(TomlFileSource::new("switchyard.toml"))
//!     .add_source(EnvSource::new())
//!     .build()
//!     .unwrap();
//! assert!(settings.weight_divisor > 0);
//! ```

pub mod settings;
pub mod sources;

pub use settings::{DEFAULT_METHODS, RouterSettings, SettingsBuilder};
pub use sources::{DefaultSource, EnvSource, SettingsError, SettingsSource, TomlFileSource};
