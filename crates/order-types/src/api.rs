//! API types for the order HTTP API.
//!
//! This module defines the request and response bodies of the `/orders`
//! endpoints and the structured error type rendered for failed requests.

use crate::{LineItem, Order, OrderStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
	/// Customer placing the order
	pub customer_id: Uuid,
	/// Items of the order, in display order
	pub line_items: Vec<LineItem>,
}

/// Request body for `PUT /orders/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
	/// Requested target status token ("shipped" or "completed")
	pub status: String,
}

/// Query string for `GET /orders`.
///
/// The cursor is kept as a raw string so a malformed value can be reported
/// with the API error body instead of the framework's default rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListOrdersQuery {
	pub cursor: Option<String>,
}

/// Order representation returned by the API.
///
/// This is the stored record plus its derived status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
	#[serde(flatten)]
	pub order: Order,
	/// Status derived from the lifecycle timestamps
	pub status: OrderStatus,
}

impl From<Order> for OrderResponse {
	fn from(order: Order) -> Self {
		let status = order.status();
		Self { order, status }
	}
}

/// Response body for `GET /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOrdersResponse {
	/// Orders of the current page
	pub items: Vec<OrderResponse>,
	/// Cursor of the next page; omitted on the last page
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub next: Option<u64>,
}

/// API error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// HTTP status code
	pub code: u16,
	/// Human-readable description
	pub message: String,
}

/// Structured API error type with appropriate HTTP status mapping.
///
/// Messages end up in the response body verbatim, so they must never
/// carry backend error text.
#[derive(Debug)]
pub enum APIError {
	/// Bad request: malformed input or an invalid transition (400)
	BadRequest { message: String },
	/// The requested order does not exist (404)
	NotFound { message: String },
	/// Internal server error (500)
	InternalServerError { message: String },
}

impl APIError {
	pub fn bad_request(message: impl Into<String>) -> Self {
		APIError::BadRequest {
			message: message.into(),
		}
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		APIError::NotFound {
			message: message.into(),
		}
	}

	pub fn internal() -> Self {
		APIError::InternalServerError {
			message: "internal server error".to_string(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::NotFound { .. } => 404,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let message = match self {
			APIError::BadRequest { message }
			| APIError::NotFound { message }
			| APIError::InternalServerError { message } => message.clone(),
		};
		ErrorResponse {
			code: self.status_code(),
			message,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message } => write!(f, "Bad Request: {}", message),
			APIError::NotFound { message } => write!(f, "Not Found: {}", message),
			APIError::InternalServerError { message } => {
				write!(f, "Internal Server Error: {}", message)
			}
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		let error_response = self.to_error_response();
		(status, Json(error_response)).into_response()
	}
}
