//! Key layout of the dispatch namespace.
//!
//! Records share one flat key-value namespace with whatever else the operator
//! keeps there, so every key the tracker owns starts with a fixed prefix.

/// Storage key families owned by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Per-order dispatch records.
	DispatchedOrder,
}

impl StorageKey {
	/// Returns the prefix every key of this family starts with.
	pub fn prefix(&self) -> &'static str {
		match self {
			StorageKey::DispatchedOrder => "dispatchedOrder_",
		}
	}

	/// Builds the full key for an order id.
	pub fn key_for(&self, id: &str) -> String {
		format!("{}{}", self.prefix(), id)
	}

	/// Returns true if `key` belongs to this family.
	pub fn matches(&self, key: &str) -> bool {
		key.starts_with(self.prefix())
	}

	/// Extracts the order id from a key of this family.
	pub fn id_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
		key.strip_prefix(self.prefix())
	}
}
