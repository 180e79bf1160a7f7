//! Order tracker.
//!
//! Records live under `dispatchedOrder_<id>` in the record store. A record
//! moves `Dispatched -> Completed` and is never removed. Reads never fail on
//! stored content: a missing or malformed value becomes a blank record so a
//! single corrupt entry cannot hide the rest of the list.

use std::sync::Arc;
use thiserror::Error;
use tracker_storage::{StorageError, StorageService};
use tracker_types::{
	truncate_id, DispatchRecord, DispatchStatus, OrderSummary, StorageKey,
};

const FAMILY: StorageKey = StorageKey::DispatchedOrder;

/// Errors that can occur during tracker operations.
///
/// Only backend failures surface; content problems are absorbed.
#[derive(Debug, Error)]
pub enum TrackerError {
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Result of a full prefix scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchScan {
	/// Every record under the prefix, degraded ones included.
	pub records: Vec<DispatchRecord>,
	/// How many of `records` were missing, unparsable or had no id.
	pub degraded: usize,
}

/// Tracks dispatched and completed orders in a record store.
pub struct OrderTracker {
	storage: Arc<StorageService>,
}

impl OrderTracker {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Reads a stored value leniently.
	///
	/// Returns the record and whether it had to be degraded.
	fn parse_record(key: &str, value: Option<&str>) -> (DispatchRecord, bool) {
		let Some(raw) = value else {
			tracing::warn!(key = %key, "Dispatch record vanished during scan");
			return (DispatchRecord::default(), true);
		};

		match serde_json::from_str::<DispatchRecord>(raw) {
			Ok(record) if record.is_degenerate() => {
				tracing::warn!(key = %key, "Dispatch record has no order id");
				(record, true)
			},
			Ok(record) => (record, false),
			Err(e) => {
				tracing::warn!(key = %key, error = %e, "Unreadable dispatch record");
				(DispatchRecord::default(), true)
			},
		}
	}

	/// Records that an order has been dispatched.
	///
	/// Overwrites an existing dispatched record with fresh order fields, but
	/// never rewrites a completed one: that would move the record backwards.
	/// Returns the record as stored afterwards.
	pub async fn record_dispatch(
		&self,
		order: &OrderSummary,
	) -> Result<DispatchRecord, TrackerError> {
		if let Some(existing) = self.get(&order.id).await? {
			if existing.id == order.id
				&& !existing.status.can_transition_to(DispatchStatus::Dispatched)
			{
				tracing::debug!(
					order_id = %truncate_id(&order.id),
					status = %existing.status,
					"Order already completed, keeping record"
				);
				return Ok(existing);
			}
		}

		let record = DispatchRecord::dispatched(order);
		self.storage.store(FAMILY, &order.id, &record).await?;
		tracing::info!(order_id = %truncate_id(&order.id), "Order dispatched");
		Ok(record)
	}

	/// Scans the namespace for dispatch records.
	pub async fn scan(&self) -> Result<DispatchScan, TrackerError> {
		let entries = self.storage.scan(FAMILY).await?;

		let mut scan = DispatchScan::default();
		for entry in &entries {
			let (record, degraded) = Self::parse_record(&entry.key, entry.value.as_deref());
			if degraded {
				scan.degraded += 1;
			}
			scan.records.push(record);
		}
		Ok(scan)
	}

	/// Returns every dispatch record, completed ones included.
	pub async fn list_dispatched(&self) -> Result<Vec<DispatchRecord>, TrackerError> {
		Ok(self.scan().await?.records)
	}

	/// Returns the records whose status is `Completed`.
	pub async fn list_completed(&self) -> Result<Vec<DispatchRecord>, TrackerError> {
		let mut records = self.list_dispatched().await?;
		records.retain(DispatchRecord::is_completed);
		Ok(records)
	}

	/// Returns the record stored for `id`, if any.
	pub async fn get(&self, id: &str) -> Result<Option<DispatchRecord>, TrackerError> {
		let key = FAMILY.key_for(id);
		Ok(self
			.storage
			.retrieve_raw(FAMILY, id)
			.await?
			.map(|raw| Self::parse_record(&key, Some(&raw)).0))
	}

	/// Marks a dispatched order as completed.
	///
	/// A no-op when no record with this id exists; calling it again on a
	/// completed record changes nothing.
	pub async fn mark_completed(&self, id: &str) -> Result<(), TrackerError> {
		let record = match self.get(id).await? {
			Some(record) if record.id == id => record,
			_ => {
				tracing::debug!(order_id = %truncate_id(id), "No dispatch record to complete");
				return Ok(());
			},
		};

		if record.is_completed() {
			return Ok(());
		}

		let record = DispatchRecord {
			status: DispatchStatus::Completed,
			..record
		};
		self.storage.store(FAMILY, id, &record).await?;
		tracing::info!(order_id = %truncate_id(id), "Order completed");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::BTreeMap;
	use tracker_storage::implementations::{file::FileStorage, memory::MemoryStorage};

	fn tracker() -> (OrderTracker, Arc<StorageService>) {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		(OrderTracker::new(storage.clone()), storage)
	}

	fn jane() -> OrderSummary {
		OrderSummary::new("o1", "Jane Doe", "2024-01-05")
	}

	/// Raw namespace contents, for comparing before/after states.
	async fn snapshot(storage: &StorageService) -> BTreeMap<String, Option<String>> {
		storage
			.scan(FAMILY)
			.await
			.unwrap()
			.into_iter()
			.map(|e| (e.key, e.value))
			.collect()
	}

	#[tokio::test]
	async fn test_undispatched_orders_are_absent() {
		let (tracker, _) = tracker();
		assert!(tracker.list_dispatched().await.unwrap().is_empty());

		tracker.record_dispatch(&jane()).await.unwrap();
		let records = tracker.list_dispatched().await.unwrap();
		assert!(records.iter().all(|r| r.id != "o2"));
	}

	#[tokio::test]
	async fn test_dispatch_scenario() {
		let (tracker, _) = tracker();
		tracker.record_dispatch(&jane()).await.unwrap();

		assert_eq!(
			tracker.list_dispatched().await.unwrap(),
			vec![DispatchRecord {
				id: "o1".into(),
				full_name: "Jane Doe".into(),
				order_date: "2024-01-05".into(),
				status: DispatchStatus::Dispatched,
			}]
		);
		assert!(tracker.list_completed().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_complete_scenario() {
		let (tracker, _) = tracker();
		tracker.record_dispatch(&jane()).await.unwrap();
		tracker.mark_completed("o1").await.unwrap();

		let completed = tracker.list_completed().await.unwrap();
		assert_eq!(completed.len(), 1);
		assert_eq!(completed[0].id, "o1");
		assert_eq!(completed[0].full_name, "Jane Doe");
		assert_eq!(completed[0].status, DispatchStatus::Completed);

		let dispatched = tracker.list_dispatched().await.unwrap();
		assert_eq!(dispatched, completed);
	}

	#[tokio::test]
	async fn test_completed_is_subset_of_dispatched() {
		let (tracker, _) = tracker();
		for id in ["a", "b", "c"] {
			tracker
				.record_dispatch(&OrderSummary::new(id, "n", "2024-01-01"))
				.await
				.unwrap();
		}
		tracker.mark_completed("b").await.unwrap();

		let dispatched = tracker.list_dispatched().await.unwrap();
		let completed = tracker.list_completed().await.unwrap();
		assert_eq!(dispatched.len(), 3);
		assert_eq!(completed.len(), 1);
		assert!(completed.iter().all(|c| dispatched.contains(c)));
	}

	#[tokio::test]
	async fn test_mark_completed_is_idempotent() {
		let (tracker, storage) = tracker();
		tracker.record_dispatch(&jane()).await.unwrap();

		tracker.mark_completed("o1").await.unwrap();
		let once = snapshot(&storage).await;
		tracker.mark_completed("o1").await.unwrap();
		assert_eq!(snapshot(&storage).await, once);
	}

	#[tokio::test]
	async fn test_mark_completed_unknown_id_is_noop() {
		let (tracker, storage) = tracker();
		tracker.record_dispatch(&jane()).await.unwrap();
		let before = snapshot(&storage).await;

		tracker.mark_completed("missing").await.unwrap();
		assert_eq!(snapshot(&storage).await, before);
		assert!(tracker.get("missing").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_redispatch_does_not_regress_completed() {
		let (tracker, _) = tracker();
		tracker.record_dispatch(&jane()).await.unwrap();
		tracker.mark_completed("o1").await.unwrap();

		let record = tracker.record_dispatch(&jane()).await.unwrap();
		assert_eq!(record.status, DispatchStatus::Completed);
		assert_eq!(tracker.list_completed().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_redispatch_of_dispatched_overwrites() {
		let (tracker, _) = tracker();
		tracker.record_dispatch(&jane()).await.unwrap();
		tracker
			.record_dispatch(&OrderSummary::new("o1", "Jane Smith", "2024-01-05"))
			.await
			.unwrap();

		let records = tracker.list_dispatched().await.unwrap();
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].full_name, "Jane Smith");
	}

	#[tokio::test]
	async fn test_empty_object_is_included_as_degraded() {
		let (tracker, storage) = tracker();
		storage.put_raw("dispatchedOrder_o2", "{}").await.unwrap();

		let scan = tracker.scan().await.unwrap();
		assert_eq!(scan.records, vec![DispatchRecord::default()]);
		assert_eq!(scan.degraded, 1);
		assert_eq!(tracker.list_dispatched().await.unwrap().len(), 1);
		assert!(tracker.list_completed().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_unparsable_values_degrade_without_failing_scan() {
		let (tracker, storage) = tracker();
		tracker.record_dispatch(&jane()).await.unwrap();
		storage.put_raw("dispatchedOrder_bad", "not json").await.unwrap();
		storage.put_raw("dispatchedOrder_null", "null").await.unwrap();
		storage
			.put_raw("dispatchedOrder_num", r#"{"_id": 5}"#)
			.await
			.unwrap();

		let scan = tracker.scan().await.unwrap();
		assert_eq!(scan.records.len(), 4);
		assert_eq!(scan.degraded, 3);
		assert!(scan.records.iter().any(|r| r.id == "o1"));
	}

	#[tokio::test]
	async fn test_degraded_record_cannot_be_completed() {
		let (tracker, storage) = tracker();
		storage.put_raw("dispatchedOrder_o2", "{}").await.unwrap();
		let before = snapshot(&storage).await;

		tracker.mark_completed("o2").await.unwrap();
		assert_eq!(snapshot(&storage).await, before);
	}

	#[tokio::test]
	async fn test_dispatch_replaces_degraded_value_at_same_key() {
		let (tracker, storage) = tracker();
		storage.put_raw("dispatchedOrder_o1", "{}").await.unwrap();
		storage
			.put_raw("dispatchedOrder_o3", r#"{"status":"Completed"}"#)
			.await
			.unwrap();

		let o1 = tracker.record_dispatch(&jane()).await.unwrap();
		assert_eq!(o1.status, DispatchStatus::Dispatched);
		assert_eq!(o1.id, "o1");

		let o3 = OrderSummary::new("o3", "Ali", "2024-02-01");
		let record = tracker.record_dispatch(&o3).await.unwrap();
		assert_eq!(record, DispatchRecord::dispatched(&o3));

		let scan = tracker.scan().await.unwrap();
		assert_eq!(scan.degraded, 0);
		assert_eq!(scan.records.len(), 2);
		assert!(tracker.list_completed().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_foreign_keys_are_ignored() {
		let (tracker, storage) = tracker();
		storage.put_raw("theme", "dark").await.unwrap();
		storage.put_raw("dispatchedOrder", r#"{"_id":"legacy"}"#).await.unwrap();

		assert!(tracker.list_dispatched().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_status_written_as_string() {
		let (tracker, storage) = tracker();
		tracker.record_dispatch(&jane()).await.unwrap();
		tracker.mark_completed("o1").await.unwrap();

		let raw = storage
			.retrieve_raw(FAMILY, "o1")
			.await
			.unwrap()
			.unwrap();
		let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
		assert_eq!(value["_id"], "o1");
		assert_eq!(value["status"], "Completed");
	}

	#[tokio::test]
	async fn test_file_backed_tracker_persists_across_instances() {
		let dir = tempfile::TempDir::new().unwrap();
		let open = || {
			OrderTracker::new(Arc::new(StorageService::new(Box::new(FileStorage::new(
				dir.path().to_path_buf(),
			)))))
		};

		open().record_dispatch(&jane()).await.unwrap();
		open().mark_completed("o1").await.unwrap();

		let completed = open().list_completed().await.unwrap();
		assert_eq!(completed.len(), 1);
		assert_eq!(completed[0].full_name, "Jane Doe");
	}

	#[tokio::test]
	async fn test_file_backed_tracker_handles_long_ids() {
		let dir = tempfile::TempDir::new().unwrap();
		let storage = Arc::new(StorageService::new(Box::new(FileStorage::new(
			dir.path().to_path_buf(),
		))));
		let tracker = OrderTracker::new(storage.clone());
		let id = "x".repeat(128);

		tracker.mark_completed(&"y".repeat(300)).await.unwrap();
		assert!(tracker.list_dispatched().await.unwrap().is_empty());

		tracker
			.record_dispatch(&OrderSummary::new(id.as_str(), "Jane Doe", "2024-01-05"))
			.await
			.unwrap();
		tracker.mark_completed(&id).await.unwrap();

		let completed = tracker.list_completed().await.unwrap();
		assert_eq!(completed.len(), 1);
		assert_eq!(completed[0].id, id);
	}
}
