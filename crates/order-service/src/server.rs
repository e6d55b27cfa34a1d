//! HTTP server for the order API.
//!
//! Serves the `/orders` routes until a shutdown signal arrives, then gives
//! in-flight requests a bounded grace period before aborting them.

use crate::apis::order;
use axum::{
	error_handling::HandleErrorLayer,
	extract::DefaultBodyLimit,
	http::HeaderValue,
	routing::get,
	Router,
};
use order_config::{ApiConfig, CorsConfig};
use order_core::{OrderEngine, OrderHandler};
use order_types::APIError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower::timeout::error::Elapsed;
use tower::{BoxError, ServiceBuilder};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Lifecycle handler serving every order route.
	pub handler: Arc<OrderHandler>,
}

/// Builds the CORS layer; permissive unless origins are configured.
fn cors_layer(cors: Option<&CorsConfig>) -> CorsLayer {
	let Some(cors) = cors else {
		return CorsLayer::permissive();
	};

	let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
	if cors.allowed_origins.iter().any(|origin| origin == "*") {
		return base.allow_origin(Any);
	}

	let origins: Vec<HeaderValue> = cors
		.allowed_origins
		.iter()
		.filter_map(|origin| match HeaderValue::from_str(origin) {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
				None
			}
		})
		.collect();
	base.allow_origin(AllowOrigin::list(origins))
}

/// Renders middleware failures with the API error body.
///
/// A request outliving `api.timeout_seconds` is stuck on the store, so it is
/// reported as a server failure rather than a client timeout.
async fn handle_middleware_error(err: BoxError) -> APIError {
	if err.is::<Elapsed>() {
		tracing::error!("Request timed out");
	} else {
		tracing::error!(error = %err, "Unhandled middleware error");
	}
	APIError::internal()
}

/// Builds the router with all order routes and middleware.
pub fn build_router(handler: Arc<OrderHandler>, api_config: &ApiConfig) -> Router {
	let app_state = AppState { handler };

	Router::new()
		.route("/orders", get(order::list_orders).post(order::create_order))
		.route(
			"/orders/{id}",
			get(order::get_order)
				.put(order::update_order)
				.delete(order::delete_order),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(HandleErrorLayer::new(handle_middleware_error))
				.timeout(Duration::from_secs(api_config.timeout_seconds))
				.layer(cors_layer(api_config.cors.as_ref()))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(app_state)
}

/// Starts the HTTP server and runs it until `shutdown` completes.
///
/// Once `shutdown` resolves the listener stops accepting connections and
/// in-flight requests get `shutdown_grace_seconds` to finish. Requests still
/// running after that are dropped, which cancels their storage calls.
pub async fn start_server<F>(
	engine: &OrderEngine,
	shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
	F: Future<Output = ()>,
{
	let config = engine.config();
	let app = build_router(engine.handler().clone(), &config.api);

	let bind_address = format!("{}:{}", config.api.host, config.api.port);
	let listener = TcpListener::bind(&bind_address).await?;
	tracing::info!("Order API server starting on {}", bind_address);

	let drain = Arc::new(Notify::new());
	let server = axum::serve(listener, app).with_graceful_shutdown({
		let drain = drain.clone();
		async move { drain.notified().await }
	});
	let mut server_task = tokio::spawn(async move { server.await });

	tokio::select! {
		result = &mut server_task => {
			tracing::info!("API server finished");
			return Ok(result??);
		}
		_ = shutdown => {}
	}

	let grace = Duration::from_secs(config.service.shutdown_grace_seconds);
	tracing::info!(grace_seconds = grace.as_secs(), "Shutdown requested, draining requests");
	drain.notify_one();

	match tokio::time::timeout(grace, &mut server_task).await {
		Ok(result) => result??,
		Err(_) => {
			tracing::warn!(
				grace_seconds = grace.as_secs(),
				"Grace period elapsed, aborting in-flight requests"
			);
			server_task.abort();
		}
	}

	Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "Failed to listen for Ctrl-C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!(error = %e, "Failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => tracing::info!("Received Ctrl-C"),
		_ = terminate => tracing::info!("Received SIGTERM"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::{to_bytes, Body};
	use axum::http::{Method, Request, StatusCode};
	use order_config::builders::ConfigBuilder;
	use order_core::{
		FindAllPage, FindResult, OrderEngineBuilder, OrderFactories, OrderRepository,
		RepositoryError,
	};
	use order_types::Order;
	use tower::ServiceExt;

	async fn engine(port: u16, grace: u64) -> OrderEngine {
		let mut api = ApiConfig::default();
		api.port = port;
		let config = ConfigBuilder::new()
			.api(api)
			.shutdown_grace_seconds(grace)
			.build();
		OrderEngineBuilder::new(config)
			.build(OrderFactories {
				storage_factories: order_storage::get_all_implementations()
					.into_iter()
					.map(|(name, f)| (name.to_string(), f))
					.collect(),
			})
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn test_cors_headers_for_configured_origin() {
		let engine = engine(0, 1).await;
		let mut api = ApiConfig::default();
		api.cors = Some(CorsConfig {
			allowed_origins: vec!["https://shop.example".to_string()],
		});
		let app = build_router(engine.handler().clone(), &api);

		let response = app
			.oneshot(
				Request::builder()
					.method(Method::GET)
					.uri("/orders")
					.header("origin", "https://shop.example")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(
			response.headers().get("access-control-allow-origin").unwrap(),
			"https://shop.example"
		);
	}

	/// Repository whose reads never finish in time.
	struct StalledRepository;

	#[async_trait::async_trait]
	impl OrderRepository for StalledRepository {
		async fn insert(&self, _order: &Order) -> Result<(), RepositoryError> {
			Ok(())
		}

		async fn find_by_id(&self, order_id: u64) -> Result<Order, RepositoryError> {
			tokio::time::sleep(Duration::from_secs(5)).await;
			Err(RepositoryError::NotExist(order_id))
		}

		async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
			Err(RepositoryError::NotExist(order.order_id))
		}

		async fn delete_by_id(&self, order_id: u64) -> Result<(), RepositoryError> {
			Err(RepositoryError::NotExist(order_id))
		}

		async fn find_all(&self, _page: FindAllPage) -> Result<FindResult, RepositoryError> {
			Ok(FindResult {
				orders: Vec::new(),
				cursor: 0,
			})
		}
	}

	#[tokio::test]
	async fn test_timeout_renders_internal_error() {
		let handler = Arc::new(OrderHandler::new(Arc::new(StalledRepository), 10));
		let mut api = ApiConfig::default();
		api.timeout_seconds = 1;
		let app = build_router(handler, &api);

		let response = app
			.oneshot(
				Request::builder()
					.method(Method::GET)
					.uri("/orders/1")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(
			body,
			serde_json::json!({ "code": 500, "message": "internal server error" })
		);
	}

	#[tokio::test]
	async fn test_server_stops_on_shutdown() {
		let engine = engine(0, 1).await;

		// Port 0 binds an ephemeral port; shutdown resolves immediately
		let result = tokio::time::timeout(
			Duration::from_secs(5),
			start_server(&engine, async {}),
		)
		.await
		.expect("server did not stop within the grace period");
		assert!(result.is_ok());
	}
}
