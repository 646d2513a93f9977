//! Persisting a built router so it can be restored without recompiling
//! route files.

use crate::route::Route;
use crate::router::Router;
use crate::services::Services;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use switchyard_conf::RouterSettings;
use switchyard_exception::{Error, Result};
use tracing::{debug, info};

const CACHE_KEY_PREFIX: &str = "switchyard.router.";

/// Byte storage for router snapshots.
pub trait RouterCache: Send + Sync {
	fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

	fn store(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// Process-local [`RouterCache`].
#[derive(Debug, Default)]
pub struct InMemoryRouterCache {
	entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryRouterCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	pub fn clear(&self) {
		self.entries.write().clear();
	}
}

impl RouterCache for InMemoryRouterCache {
	fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
		Ok(self.entries.read().get(key).cloned())
	}

	fn store(&self, key: &str, value: Vec<u8>) -> Result<()> {
		self.entries.write().insert(key.to_string(), value);
		Ok(())
	}
}

/// Serialized router state. Route back-references are rebuilt on restore.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RouterSnapshot {
	pub(crate) id: String,
	pub(crate) prefix: String,
	pub(crate) weight_index: u64,
	pub(crate) routes: Vec<(String, Route)>,
	pub(crate) aliases: IndexMap<String, String>,
	pub(crate) default_route: Option<String>,
}

fn cache_key(id: &str) -> String {
	format!("{}{}", CACHE_KEY_PREFIX, id)
}

impl Router {
	/// Store this router under `id`, typically a hash of the route files it
	/// was built from.
	pub fn save_to_cache(&self, cache: &dyn RouterCache, id: &str) -> Result<()> {
		let bytes = serde_json::to_vec(&self.snapshot(id))?;
		debug!(id, bytes = bytes.len(), routes = self.len(), "Caching router");
		cache.store(&cache_key(id), bytes)
	}

	/// Restore a router stored under `id`.
	///
	/// Returns [`Error::NotFound`] when nothing is cached for `id`, and
	/// [`Error::Cache`] when the stored bytes cannot be read back or belong to
	/// another id.
	pub fn from_cache(
		cache: &dyn RouterCache,
		id: &str,
		settings: RouterSettings,
		services: Services,
	) -> Result<Self> {
		let bytes = cache
			.load(&cache_key(id))?
			.ok_or_else(|| Error::NotFound(format!("router {} is not cached", id)))?;
		let snapshot: RouterSnapshot = serde_json::from_slice(&bytes)
			.map_err(|e| Error::Cache(format!("router {}: {}", id, e)))?;
		if snapshot.id != id {
			return Err(Error::Cache(format!(
				"cached router is {}, not {}",
				snapshot.id, id
			)));
		}
		let router = Router::restore(snapshot, settings, services);
		info!(id, routes = router.len(), "Router restored from cache");
		Ok(router)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::options::RouteOptions;
	use rstest::rstest;

	#[rstest]
	fn test_missing_entry_is_not_found() {
		let cache = InMemoryRouterCache::new();
		let result = Router::from_cache(&cache, "v1", RouterSettings::default(), Services::default());
		assert!(matches!(result, Err(Error::NotFound(_))));
	}

	#[rstest]
	fn test_corrupt_entry_is_cache_error() {
		let cache = InMemoryRouterCache::new();
		cache.store(&cache_key("v1"), b"not json".to_vec()).unwrap();
		let result = Router::from_cache(&cache, "v1", RouterSettings::default(), Services::default());
		assert!(matches!(result, Err(Error::Cache(_))));
	}

	#[rstest]
	fn test_mismatched_id_is_cache_error() {
		let cache = InMemoryRouterCache::new();
		let router = Router::default();
		router.save_to_cache(&cache, "v1").unwrap();
		let stored = cache.load(&cache_key("v1")).unwrap().unwrap();
		cache.store(&cache_key("v2"), stored).unwrap();

		let result = Router::from_cache(&cache, "v2", RouterSettings::default(), Services::default());
		assert!(matches!(result, Err(Error::Cache(_))));
	}

	#[rstest]
	fn test_restored_routes_are_attached() {
		let cache = InMemoryRouterCache::new();
		let mut router = Router::default();
		router
			.add_route("GET:users/{int id}", RouteOptions::new().with_id("user"))
			.unwrap();
		router.add_alias("members", "users");
		router.save_to_cache(&cache, "v1").unwrap();
		assert_eq!(cache.len(), 1);

		let restored =
			Router::from_cache(&cache, "v1", RouterSettings::default(), Services::default())
				.unwrap();
		assert_eq!(restored.len(), 1);
		assert!(restored.route("user").unwrap().is_attached());
		assert_eq!(restored.aliases().get("members").map(String::as_str), Some("users"));
		assert!(restored.match_path("/users/3", "GET").is_ok());
	}
}
