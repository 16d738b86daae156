//! Storage contracts and built-in store implementations for correlation state.

pub mod memory;

pub use memory::MemoryStateStore;

// self
use crate::_prelude::*;

/// Future type returned by [`StateStore`] implementations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for pending correlation state.
///
/// Keys are opaque strings (a `State` id with the configured prefix). Per-key
/// operations must be atomic at the store level; the engine otherwise treats each
/// call as an opaque awaited operation and never holds locks across them.
pub trait StateStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the value stored under `key`.
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Fetches the value stored under `key`, if present.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Removes and returns the value stored under `key`, if present.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Enumerates every key currently present in the store.
	fn all_keys(&self) -> StoreFuture<'_, Vec<String>>;
}

/// Error type produced by [`StateStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_engine_error_with_source() {
		let store_error = StoreError::Backend { message: "storage unreachable".into() };
		let engine_error: Error = store_error.clone().into();

		assert!(matches!(engine_error, Error::Storage(_)));
		assert!(engine_error.to_string().contains("storage unreachable"));

		let source = StdError::source(&engine_error)
			.expect("Engine error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
