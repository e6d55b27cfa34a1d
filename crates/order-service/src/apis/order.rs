//! Order endpoints.
//!
//! Thin adapters between HTTP and the lifecycle handler: they parse path,
//! query and body, call the handler and render the result. Extractor
//! rejections are rendered with the API error body rather than axum's
//! plain-text default.

use crate::server::AppState;
use axum::{
	extract::{
		rejection::{JsonRejection, QueryRejection},
		Path, Query, State,
	},
	http::StatusCode,
	response::Json,
};
use order_types::{
	APIError, CreateOrderRequest, ListOrdersQuery, ListOrdersResponse, OrderResponse,
	UpdateOrderRequest,
};

/// Parses the `{id}` path segment.
fn parse_order_id(raw: &str) -> Result<u64, APIError> {
	raw.parse::<u64>()
		.map_err(|_| APIError::bad_request(format!("invalid order id: {:?}", raw)))
}

/// Parses the `cursor` query parameter; absent or empty means the first page.
fn parse_cursor(raw: Option<&str>) -> Result<u64, APIError> {
	match raw {
		None | Some("") => Ok(0),
		Some(value) => value
			.parse::<u64>()
			.map_err(|_| APIError::bad_request(format!("invalid cursor: {:?}", value))),
	}
}

fn payload_error(rejection: JsonRejection) -> APIError {
	tracing::debug!(error = %rejection.body_text(), "Rejected request body");
	APIError::bad_request(format!("payload incorrect: {}", rejection.body_text()))
}

/// Handles POST /orders requests.
pub async fn create_order(
	State(state): State<AppState>,
	payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), APIError> {
	let Json(request) = payload.map_err(payload_error)?;

	let order = state
		.handler
		.create(request.customer_id, request.line_items)
		.await?;
	Ok((StatusCode::CREATED, Json(order.into())))
}

/// Handles GET /orders requests.
pub async fn list_orders(
	State(state): State<AppState>,
	query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<ListOrdersResponse>, APIError> {
	let Query(query) =
		query.map_err(|e| APIError::bad_request(format!("invalid query: {}", e.body_text())))?;
	let cursor = parse_cursor(query.cursor.as_deref())?;

	let page = state.handler.list(cursor).await?;
	Ok(Json(ListOrdersResponse {
		items: page.orders.into_iter().map(OrderResponse::from).collect(),
		next: (page.cursor != 0).then_some(page.cursor),
	}))
}

/// Handles GET /orders/{id} requests.
pub async fn get_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<OrderResponse>, APIError> {
	let order_id = parse_order_id(&id)?;
	let order = state.handler.get_by_id(order_id).await?;
	Ok(Json(order.into()))
}

/// Handles PUT /orders/{id} requests.
pub async fn update_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
	payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, APIError> {
	let order_id = parse_order_id(&id)?;
	let Json(request) = payload.map_err(payload_error)?;

	let order = state
		.handler
		.update_status(order_id, &request.status)
		.await?;
	Ok(Json(order.into()))
}

/// Handles DELETE /orders/{id} requests.
pub async fn delete_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<StatusCode, APIError> {
	let order_id = parse_order_id(&id)?;
	state.handler.delete_by_id(order_id).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::server::build_router;
	use axum::body::{to_bytes, Body};
	use axum::http::{Method, Request};
	use axum::Router;
	use order_config::ApiConfig;
	use order_core::{OrderHandler, StorageOrderRepository};
	use order_storage::implementations::memory::MemoryStorage;
	use order_storage::StorageService;
	use serde_json::{json, Value};
	use std::sync::Arc;
	use tower::ServiceExt;
	use uuid::Uuid;

	fn app(page_size: usize) -> Router {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let repository = Arc::new(StorageOrderRepository::new(storage));
		let handler = Arc::new(OrderHandler::new(repository, page_size));
		build_router(handler, &ApiConfig::default())
	}

	async fn send(
		app: &Router,
		method: Method,
		uri: &str,
		body: Option<Value>,
	) -> (StatusCode, Value) {
		let mut request = Request::builder().method(method).uri(uri);
		let body = match body {
			Some(json) => {
				request = request.header("content-type", "application/json");
				Body::from(json.to_string())
			}
			None => Body::empty(),
		};

		let response = app
			.clone()
			.oneshot(request.body(body).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, value)
	}

	fn new_order_body() -> Value {
		json!({
			"customer_id": Uuid::new_v4(),
			"line_items": [
				{ "item_id": Uuid::new_v4(), "quantity": 2, "price": 1999 },
				{ "item_id": Uuid::new_v4(), "quantity": 1, "price": 500 }
			]
		})
	}

	async fn create(app: &Router) -> Value {
		let (status, body) = send(app, Method::POST, "/orders", Some(new_order_body())).await;
		assert_eq!(status, StatusCode::CREATED);
		body
	}

	#[tokio::test]
	async fn test_create_and_get() {
		let app = app(50);
		let request = new_order_body();
		let (status, created) =
			send(&app, Method::POST, "/orders", Some(request.clone())).await;

		assert_eq!(status, StatusCode::CREATED);
		assert_eq!(created["status"], "created");
		assert_eq!(created["line_items"], request["line_items"]);
		assert!(created["created_at"].is_string());
		assert!(created["shipped_at"].is_null());
		assert!(created["completed_at"].is_null());

		let id = created["order_id"].as_u64().unwrap();
		let (status, fetched) = send(&app, Method::GET, &format!("/orders/{}", id), None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(fetched, created);
	}

	#[tokio::test]
	async fn test_malformed_body_is_bad_request() {
		let app = app(50);
		let malformed = json!({ "customer_id": 5 });
		let (status, body) = send(&app, Method::POST, "/orders", Some(malformed)).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["code"], 400);
		assert!(body["message"].as_str().unwrap().starts_with("payload incorrect"));

		let (status, body) = send(
			&app,
			Method::POST,
			"/orders",
			Some(json!({ "customer_id": Uuid::new_v4(), "line_items": [] })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["code"], 400);
	}

	#[tokio::test]
	async fn test_get_missing_and_malformed_id() {
		let app = app(50);
		let (status, body) = send(&app, Method::GET, "/orders/123", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body, json!({ "code": 404, "message": "order 123 not found" }));

		let (status, body) = send(&app, Method::GET, "/orders/abc", None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["code"], 400);

		let (status, _) = send(&app, Method::DELETE, "/orders/-1", None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
	}

	async fn put_status(app: &Router, uri: &str, status: &str) -> (StatusCode, Value) {
		send(app, Method::PUT, uri, Some(json!({ "status": status }))).await
	}

	#[tokio::test]
	async fn test_status_transitions() {
		let app = app(50);
		let id = create(&app).await["order_id"].as_u64().unwrap();
		let uri = format!("/orders/{}", id);

		let (status, body) = put_status(&app, &uri, "completed").await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["code"], 400);

		let (status, body) = put_status(&app, &uri, "shipped").await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "shipped");
		assert!(body["shipped_at"].is_string());

		let (status, _) = put_status(&app, &uri, "shipped").await;
		assert_eq!(status, StatusCode::BAD_REQUEST);

		let (status, body) = put_status(&app, &uri, "completed").await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "completed");

		let (status, _) = put_status(&app, &uri, "returned").await;
		assert_eq!(status, StatusCode::BAD_REQUEST);

		let (status, _) = put_status(&app, "/orders/77", "shipped").await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		let (status, _) = put_status(&app, "/orders/77", "returned").await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_delete() {
		let app = app(50);
		let id = create(&app).await["order_id"].as_u64().unwrap();
		let uri = format!("/orders/{}", id);

		let (status, body) = send(&app, Method::DELETE, &uri, None).await;
		assert_eq!(status, StatusCode::NO_CONTENT);
		assert_eq!(body, Value::Null);

		let (status, _) = send(&app, Method::GET, &uri, None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		let (status, _) = send(&app, Method::DELETE, &uri, None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_list_pagination() {
		let app = app(2);

		let (status, body) = send(&app, Method::GET, "/orders", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, json!({ "items": [] }));

		let mut created = Vec::new();
		for _ in 0..3 {
			created.push(create(&app).await["order_id"].as_u64().unwrap());
		}

		let (status, first) = send(&app, Method::GET, "/orders", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(first["items"].as_array().unwrap().len(), 2);
		let next = first["next"].as_u64().unwrap();

		let uri = format!("/orders?cursor={}", next);
		let (_, second) = send(&app, Method::GET, &uri, None).await;
		assert_eq!(second["items"].as_array().unwrap().len(), 1);
		assert!(second.get("next").is_none());

		let mut listed: Vec<u64> = first["items"]
			.as_array()
			.unwrap()
			.iter()
			.chain(second["items"].as_array().unwrap())
			.map(|item| item["order_id"].as_u64().unwrap())
			.collect();
		listed.sort();
		created.sort();
		assert_eq!(listed, created);
	}

	#[tokio::test]
	async fn test_malformed_cursor() {
		let app = app(2);
		let (status, body) = send(&app, Method::GET, "/orders?cursor=abc", None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["code"], 400);

		let (status, _) = send(&app, Method::GET, "/orders?cursor=", None).await;
		assert_eq!(status, StatusCode::OK);
	}

	#[test]
	fn test_parse_helpers() {
		assert_eq!(parse_order_id("42").unwrap(), 42);
		assert!(parse_order_id("4.2").is_err());
		assert_eq!(parse_cursor(None).unwrap(), 0);
		assert_eq!(parse_cursor(Some("17")).unwrap(), 17);
		assert!(parse_cursor(Some("-3")).is_err());
	}
}
