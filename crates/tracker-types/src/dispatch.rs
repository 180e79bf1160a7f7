//! Dispatch records and the order summaries they are created from.
//!
//! A dispatch record is the only persisted entity of the tracker. Its JSON
//! shape (`_id`, `fullName`, `orderDate`, `status`) is the layout already
//! present in operators' namespaces, so reads are lenient: every field may be
//! absent or null and still produce a record.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lifecycle state of a dispatched order.
///
/// The only valid transition is `Dispatched -> Completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum DispatchStatus {
	#[default]
	Dispatched,
	Completed,
}

impl DispatchStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			DispatchStatus::Dispatched => "Dispatched",
			DispatchStatus::Completed => "Completed",
		}
	}

	/// Returns true if moving from `self` to `next` is allowed.
	///
	/// Staying in the same state is allowed so that repeated completion is
	/// idempotent.
	pub fn can_transition_to(&self, next: DispatchStatus) -> bool {
		matches!(
			(self, next),
			(DispatchStatus::Dispatched, _) | (DispatchStatus::Completed, DispatchStatus::Completed)
		)
	}
}

// Anything other than "Completed", including a missing field, reads as
// dispatched. Records written at dispatch time historically carried no status.
impl From<Option<String>> for DispatchStatus {
	fn from(value: Option<String>) -> Self {
		match value.as_deref() {
			Some("Completed") => DispatchStatus::Completed,
			_ => DispatchStatus::Dispatched,
		}
	}
}

impl fmt::Display for DispatchStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Per-order dispatch record stored under `dispatchedOrder_<id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchRecord {
	/// Identifier of the originating order in the document store.
	#[serde(rename = "_id", deserialize_with = "null_as_empty")]
	pub id: String,
	/// Customer name copied from the order at dispatch time.
	#[serde(rename = "fullName", deserialize_with = "null_as_empty")]
	pub full_name: String,
	/// Order date as stored by the document store (ISO-8601).
	#[serde(rename = "orderDate", deserialize_with = "null_as_empty")]
	pub order_date: String,
	pub status: DispatchStatus,
}

impl DispatchRecord {
	/// Creates a freshly dispatched record for the given order.
	pub fn dispatched(order: &OrderSummary) -> Self {
		Self {
			id: order.id.clone(),
			full_name: order.full_name.clone(),
			order_date: order.order_date.clone(),
			status: DispatchStatus::Dispatched,
		}
	}

	pub fn is_completed(&self) -> bool {
		self.status == DispatchStatus::Completed
	}

	/// A record without an id cannot be addressed by any operation.
	pub fn is_degenerate(&self) -> bool {
		self.id.is_empty()
	}
}

/// Order fields the tracker needs, as returned by an order source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSummary {
	#[serde(rename = "_id", deserialize_with = "null_as_empty")]
	pub id: String,
	#[serde(rename = "fullName", deserialize_with = "null_as_empty")]
	pub full_name: String,
	#[serde(rename = "orderDate", deserialize_with = "null_as_empty")]
	pub order_date: String,
}

impl OrderSummary {
	pub fn new(
		id: impl Into<String>,
		full_name: impl Into<String>,
		order_date: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			full_name: full_name.into(),
			order_date: order_date.into(),
		}
	}
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
