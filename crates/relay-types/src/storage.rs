//! Storage namespaces used by the relay.

use std::str::FromStr;

/// Storage keys for the relay's data collections.
///
/// Every stored entry is addressed as `"<namespace>:<id>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Authorization records keyed by record id.
	Authorizations,
	/// Consumed nonces keyed by `<chain_id>:<nonce>`, mapping to a record id.
	Nonces,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Authorizations => "authorizations",
			StorageKey::Nonces => "nonces",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Authorizations, Self::Nonces].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"authorizations" => Ok(Self::Authorizations),
			"nonces" => Ok(Self::Nonces),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
