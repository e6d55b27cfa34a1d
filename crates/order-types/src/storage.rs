//! Storage-related types for the order service.

use std::str::FromStr;

/// Key namespaces for the data collections kept in the store.
///
/// Every record key is `<namespace>:<id>`; listing scans by the
/// `<namespace>:` prefix, so namespaces must not be prefixes of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Key for storing order records
	Orders,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "order",
		}
	}

	/// Returns the prefix shared by every key of this namespace.
	pub fn prefix(&self) -> String {
		format!("{}:", self.as_str())
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Orders].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"order" => Ok(Self::Orders),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
