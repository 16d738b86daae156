//! Thread-safe in-memory [`StateStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{StateStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, String>>>;

/// Thread-safe storage backend that keeps correlation state in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStateStore(StoreMap);
impl MemoryStateStore {
	/// Returns the number of entries currently stored.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when the store holds no entries.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn set_now(map: StoreMap, key: String, value: String) -> Result<(), StoreError> {
		map.write().insert(key, value);

		Ok(())
	}

	fn get_now(map: StoreMap, key: String) -> Option<String> {
		map.read().get(&key).cloned()
	}

	fn remove_now(map: StoreMap, key: String) -> Option<String> {
		map.write().remove(&key)
	}

	fn keys_now(map: StoreMap) -> Vec<String> {
		map.read().keys().cloned().collect()
	}
}
impl StateStore for MemoryStateStore {
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::set_now(map, key, value) })
	}

	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::remove_now(map, key)) })
	}

	fn all_keys(&self) -> StoreFuture<'_, Vec<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::keys_now(map)) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn set_get_remove_round_trip() {
		let store = MemoryStateStore::default();

		store.set("oidc.abc", "payload".into()).await.expect("Set should succeed.");

		assert_eq!(store.get("oidc.abc").await.expect("Get should succeed.").as_deref(), Some("payload"));
		assert_eq!(
			store.remove("oidc.abc").await.expect("Remove should succeed.").as_deref(),
			Some("payload")
		);
		assert_eq!(store.get("oidc.abc").await.expect("Get should succeed."), None);
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn all_keys_enumerates_every_entry() {
		let store = MemoryStateStore::default();

		store.set("oidc.a", "1".into()).await.expect("Set should succeed.");
		store.set("oidc.b", "2".into()).await.expect("Set should succeed.");
		store.set("unrelated", "3".into()).await.expect("Set should succeed.");

		let mut keys = store.all_keys().await.expect("Key enumeration should succeed.");

		keys.sort();

		assert_eq!(keys, ["oidc.a", "oidc.b", "unrelated"]);
		assert_eq!(store.len(), 3);
	}
}
