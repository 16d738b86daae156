//! OP discovery-document and signing-key resolution with in-memory caching.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{HttpFetcher, RequestOptions, map_fetch_error},
	settings::OidcClientSettings,
};

/// Well-known discovery path appended to the authority.
pub const DISCOVERY_SUFFIX: &str = ".well-known/openid-configuration";

/// Resolves and caches the OP discovery document and its signing keys.
///
/// The first caller to need the document fetches it; concurrent first calls may each
/// fetch, and last-write-wins on the cache. No lock is held across the fetch. Static
/// `metadata`/`signing_keys` in the settings pre-seed the caches so no network call
/// ever happens for them.
pub struct MetadataService<F>
where
	F: ?Sized + HttpFetcher,
{
	settings: Arc<OidcClientSettings>,
	fetcher: Arc<F>,
	metadata: RwLock<Option<Map<String, Value>>>,
	signing_keys: RwLock<Option<Vec<Value>>>,
}
impl<F> MetadataService<F>
where
	F: ?Sized + HttpFetcher,
{
	/// Creates a service, seeding the caches from any static settings values.
	pub fn new(settings: Arc<OidcClientSettings>, fetcher: Arc<F>) -> Self {
		Self {
			metadata: RwLock::new(settings.metadata.clone()),
			signing_keys: RwLock::new(settings.signing_keys.clone()),
			settings,
			fetcher,
		}
	}

	/// Returns the discovery document, fetching and caching it on first use.
	///
	/// Seed values from the settings sit beneath the fetched document; fetched
	/// properties win on conflict.
	pub async fn metadata(&self) -> Result<Map<String, Value>> {
		if let Some(metadata) = self.metadata.read().clone() {
			return Ok(metadata);
		}

		let url = self.metadata_url()?;
		let options = RequestOptions { timeout: self.settings.request_timeout, ..<_>::default() };
		let body = self
			.fetcher
			.get_json(&url, &options)
			.await
			.map_err(|e| map_fetch_error("metadata", e))?;
		let fetched = deserialize_document(body)?;
		let mut metadata = self.settings.metadata_seed.clone().unwrap_or_default();

		metadata.extend(fetched);

		*self.metadata.write() = Some(metadata.clone());

		Ok(metadata)
	}

	/// Discovery-document URL: the configured override, or the authority with the
	/// well-known suffix appended.
	pub fn metadata_url(&self) -> Result<Url> {
		if let Some(url) = &self.settings.metadata_url {
			return Ok(url.clone());
		}

		let mut base = self.settings.authority.to_string();

		if !base.ends_with('/') {
			base.push('/');
		}

		format!("{base}{DISCOVERY_SUFFIX}")
			.parse()
			.map_err(|source| ConfigError::InvalidUrl { source }.into())
	}

	/// Issuer identifier; mandatory in every discovery document.
	pub async fn issuer(&self) -> Result<String> {
		self.required_string("issuer").await
	}

	/// Authorization endpoint; mandatory for the code flow.
	pub async fn authorization_endpoint(&self) -> Result<Url> {
		self.required_url("authorization_endpoint").await
	}

	/// Userinfo endpoint; mandatory when a userinfo fetch is attempted.
	pub async fn userinfo_endpoint(&self) -> Result<Url> {
		self.required_url("userinfo_endpoint").await
	}

	/// Token endpoint, when the OP advertises one.
	pub async fn token_endpoint(&self) -> Result<Option<Url>> {
		self.optional_url("token_endpoint").await
	}

	/// Revocation endpoint, when the OP advertises one.
	pub async fn revocation_endpoint(&self) -> Result<Option<Url>> {
		self.optional_url("revocation_endpoint").await
	}

	/// End-session endpoint, when the OP advertises one.
	pub async fn end_session_endpoint(&self) -> Result<Option<Url>> {
		self.optional_url("end_session_endpoint").await
	}

	/// JWKS endpoint, when the OP advertises one.
	pub async fn keys_endpoint(&self) -> Result<Option<Url>> {
		self.optional_url("jwks_uri").await
	}

	/// Session-monitoring iframe URL, when the OP advertises one.
	pub async fn check_session_iframe(&self) -> Result<Option<Url>> {
		self.optional_url("check_session_iframe").await
	}

	/// Returns the OP signing keys, fetching the JWKS document on first use.
	pub async fn signing_keys(&self) -> Result<Vec<Value>> {
		if let Some(keys) = self.signing_keys.read().clone() {
			return Ok(keys);
		}

		let url = self
			.keys_endpoint()
			.await?
			.ok_or(ConfigError::MissingMetadataProperty { name: "jwks_uri" })?;
		let options = RequestOptions { timeout: self.settings.request_timeout, ..<_>::default() };
		let body =
			self.fetcher.get_json(&url, &options).await.map_err(|e| map_fetch_error("jwks", e))?;
		let keys = body
			.get("keys")
			.and_then(Value::as_array)
			.cloned()
			.ok_or(ConfigError::MissingSigningKeys)?;

		*self.signing_keys.write() = Some(keys.clone());

		Ok(keys)
	}

	/// Drops the cached signing keys so the next call re-fetches the JWKS document.
	pub fn reset_signing_keys(&self) {
		*self.signing_keys.write() = None;
	}

	async fn required_string(&self, name: &'static str) -> Result<String> {
		self.metadata()
			.await?
			.get(name)
			.and_then(Value::as_str)
			.map(str::to_owned)
			.ok_or_else(|| ConfigError::MissingMetadataProperty { name }.into())
	}

	async fn required_url(&self, name: &'static str) -> Result<Url> {
		self.optional_url(name)
			.await?
			.ok_or_else(|| ConfigError::MissingMetadataProperty { name }.into())
	}

	async fn optional_url(&self, name: &'static str) -> Result<Option<Url>> {
		self.metadata()
			.await?
			.get(name)
			.and_then(Value::as_str)
			.map(|raw| raw.parse().map_err(|source| ConfigError::InvalidUrl { source }.into()))
			.transpose()
	}
}
impl<F> Debug for MetadataService<F>
where
	F: ?Sized + HttpFetcher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MetadataService")
			.field("settings", &self.settings)
			.field("metadata_cached", &self.metadata.read().is_some())
			.field("signing_keys_cached", &self.signing_keys.read().is_some())
			.finish()
	}
}

fn deserialize_document(body: Value) -> Result<Map<String, Value>> {
	serde_path_to_error::deserialize(body)
		.map_err(|source| crate::error::TransportError::ResponseParse { endpoint: "metadata", source }.into())
}
