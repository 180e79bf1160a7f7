//! API types for the tracker's HTTP endpoints.

use crate::{format_order_date, DispatchRecord, DispatchStatus};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dispatch record as presented to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchView {
	#[serde(rename = "_id")]
	pub id: String,
	#[serde(rename = "fullName")]
	pub full_name: String,
	#[serde(rename = "orderDate")]
	pub order_date: String,
	/// `orderDate` rendered as `YYYY-MM-DD`, blank when unparsable.
	#[serde(rename = "orderDateDisplay")]
	pub order_date_display: String,
	pub status: DispatchStatus,
}

impl From<DispatchRecord> for DispatchView {
	fn from(record: DispatchRecord) -> Self {
		Self {
			order_date_display: format_order_date(&record.order_date),
			id: record.id,
			full_name: record.full_name,
			order_date: record.order_date,
			status: record.status,
		}
	}
}

/// Response body of the list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchListResponse {
	pub orders: Vec<DispatchView>,
	/// Number of stored entries that could not be read cleanly.
	pub degraded: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
}

/// Error payload returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error code.
	pub error: String,
	/// Human-readable description.
	pub message: String,
}

/// API error with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// 404
	NotFound { error_type: String, message: String },
	/// 502, the document store failed or answered with garbage.
	BadGateway { error_type: String, message: String },
	/// 500
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			APIError::NotFound { .. } => StatusCode::NOT_FOUND,
			APIError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
			APIError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			APIError::NotFound {
				error_type,
				message,
			}
			| APIError::BadGateway {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::BadGateway { message, .. } => write!(f, "Bad Gateway: {}", message),
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		(self.status_code(), Json(self.to_error_response())).into_response()
	}
}
