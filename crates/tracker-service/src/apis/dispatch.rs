//! Dispatch endpoints.
//!
//! Thin adapters between the HTTP layer and the tracker engine. Each function
//! returns API types and maps engine errors onto [`APIError`].

use tracker_core::{DispatchError, DispatchScan, TrackerEngine, TrackerError};
use tracker_types::{truncate_id, APIError, DispatchListResponse, DispatchView};

fn storage_error(e: TrackerError) -> APIError {
	tracing::error!(error = %e, "Dispatch store failure");
	APIError::InternalServerError {
		error_type: "STORAGE_ERROR".to_string(),
		message: e.to_string(),
	}
}

fn list_response(scan: DispatchScan) -> DispatchListResponse {
	DispatchListResponse {
		orders: scan.records.into_iter().map(DispatchView::from).collect(),
		degraded: scan.degraded,
	}
}

/// Every dispatched order, completed ones included.
pub async fn list_dispatched(engine: &TrackerEngine) -> Result<DispatchListResponse, APIError> {
	let scan = engine.tracker().scan().await.map_err(storage_error)?;
	Ok(list_response(scan))
}

/// Completed orders only.
///
/// `degraded` still counts the whole namespace, so a corrupt entry is
/// reported on both views.
pub async fn list_completed(engine: &TrackerEngine) -> Result<DispatchListResponse, APIError> {
	let mut scan = engine.tracker().scan().await.map_err(storage_error)?;
	scan.records.retain(|record| record.is_completed());
	Ok(list_response(scan))
}

pub async fn get_dispatched(engine: &TrackerEngine, id: &str) -> Result<DispatchView, APIError> {
	match engine.tracker().get(id).await.map_err(storage_error)? {
		Some(record) if record.id == id => Ok(record.into()),
		_ => Err(APIError::NotFound {
			error_type: "DISPATCH_NOT_FOUND".to_string(),
			message: format!("Order {} has not been dispatched", id),
		}),
	}
}

/// Dispatches an order.
///
/// Returns the stored view and whether this call created it.
pub async fn dispatch_order(
	engine: &TrackerEngine,
	id: &str,
) -> Result<(DispatchView, bool), APIError> {
	match engine.dispatcher().dispatch(id).await {
		Ok(outcome) => Ok((outcome.record.into(), outcome.newly_dispatched)),
		Err(DispatchError::OrderNotFound(_)) => Err(APIError::NotFound {
			error_type: "ORDER_NOT_FOUND".to_string(),
			message: format!("Order {} not found", id),
		}),
		Err(DispatchError::Source(e)) => {
			tracing::warn!(order_id = %truncate_id(id), error = %e, "Order lookup failed");
			Err(APIError::BadGateway {
				error_type: "ORDER_SOURCE_ERROR".to_string(),
				message: e.to_string(),
			})
		},
		Err(e @ DispatchError::IdMismatch { .. }) => Err(APIError::BadGateway {
			error_type: "ORDER_SOURCE_ERROR".to_string(),
			message: e.to_string(),
		}),
		Err(DispatchError::Tracker(e)) => Err(storage_error(e)),
	}
}

pub async fn complete_order(engine: &TrackerEngine, id: &str) -> Result<(), APIError> {
	engine
		.tracker()
		.mark_completed(id)
		.await
		.map_err(storage_error)
}
