//! Document-store order source.
//!
//! Looks orders up through the hosted CMS's HTTP query API with a GROQ query
//! projecting only the fields a dispatch record needs.

use crate::{OrderSourceError, OrderSourceFactory, OrderSourceInterface, OrderSourceRegistry};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracker_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, OrderSummary, Schema, SecretString,
	ValidationError,
};

const ORDER_QUERY: &str =
	r#"*[_type == "order" && _id == $orderId][0] { _id, fullName, orderDate }"#;
const DEFAULT_API_VERSION: &str = "2021-10-21";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Envelope of every query response.
#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
	result: Option<T>,
}

/// Connection settings for the document store.
#[derive(Debug, Clone)]
pub struct SanityConfig {
	pub project_id: String,
	pub dataset: String,
	pub api_version: String,
	pub use_cdn: bool,
	pub token: Option<SecretString>,
	/// Overrides the project host, mainly for tests and proxies.
	pub base_url: Option<String>,
	pub timeout: Duration,
}

impl SanityConfig {
	fn from_toml(config: &toml::Value) -> Self {
		let str_field = |name: &str| config.get(name).and_then(|v| v.as_str());

		Self {
			project_id: str_field("project_id").unwrap_or_default().to_string(),
			dataset: str_field("dataset").unwrap_or_default().to_string(),
			api_version: str_field("api_version")
				.unwrap_or(DEFAULT_API_VERSION)
				.trim_start_matches('v')
				.to_string(),
			use_cdn: config
				.get("use_cdn")
				.and_then(|v| v.as_bool())
				.unwrap_or(false),
			// An empty token (e.g. `${SANITY_TOKEN:-}`) means anonymous access.
			token: str_field("token")
				.filter(|t| !t.is_empty())
				.map(SecretString::from),
			base_url: str_field("base_url").map(|s| s.trim_end_matches('/').to_string()),
			timeout: Duration::from_secs(
				config
					.get("timeout_seconds")
					.and_then(|v| v.as_integer())
					.map(|v| v as u64)
					.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
			),
		}
	}

	/// URL of the query endpoint for the configured dataset.
	pub fn query_url(&self) -> String {
		let base = match &self.base_url {
			Some(url) => url.clone(),
			None => {
				let host = if self.use_cdn {
					"apicdn.sanity.io"
				} else {
					"api.sanity.io"
				};
				format!("https://{}.{}", self.project_id, host)
			},
		};
		format!(
			"{}/v{}/data/query/{}",
			base, self.api_version, self.dataset
		)
	}
}

/// Order source backed by the document store's query API.
pub struct SanityOrderSource {
	config: SanityConfig,
	client: reqwest::Client,
}

impl SanityOrderSource {
	pub fn new(config: SanityConfig) -> Result<Self, OrderSourceError> {
		let client = reqwest::Client::builder()
			.timeout(config.timeout)
			.build()
			.map_err(|e| OrderSourceError::Configuration(e.to_string()))?;
		Ok(Self { config, client })
	}
}

#[async_trait]
impl OrderSourceInterface for SanityOrderSource {
	async fn fetch_order(&self, order_id: &str) -> Result<Option<OrderSummary>, OrderSourceError> {
		// GROQ parameters are passed as JSON literals.
		let order_param = serde_json::to_string(order_id)
			.map_err(|e| OrderSourceError::InvalidResponse(e.to_string()))?;

		let mut request = self
			.client
			.get(self.config.query_url())
			.query(&[("query", ORDER_QUERY), ("$orderId", order_param.as_str())]);
		if let Some(token) = &self.config.token {
			request = request.bearer_auth(token.expose_secret());
		}

		let response = request
			.send()
			.await
			.map_err(|e| OrderSourceError::Network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(OrderSourceError::Status {
				status: status.as_u16(),
				body,
			});
		}

		let body: QueryResponse<OrderSummary> = response
			.json()
			.await
			.map_err(|e| OrderSourceError::InvalidResponse(e.to_string()))?;

		Ok(body.result)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SanityOrderSourceSchema)
	}
}

/// Configuration schema for SanityOrderSource.
pub struct SanityOrderSourceSchema;

fn non_empty(v: &toml::Value) -> Result<(), String> {
	match v.as_str() {
		Some(s) if !s.trim().is_empty() => Ok(()),
		_ => Err("value cannot be empty".to_string()),
	}
}

impl ConfigSchema for SanityOrderSourceSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("project_id", FieldType::String).with_validator(non_empty),
				Field::new("dataset", FieldType::String).with_validator(non_empty),
			],
			vec![
				Field::new("api_version", FieldType::String).with_validator(non_empty),
				Field::new("use_cdn", FieldType::Boolean),
				Field::new("token", FieldType::String),
				Field::new("base_url", FieldType::String).with_validator(|v| {
					match v.as_str() {
						Some(s) if s.starts_with("http://") || s.starts_with("https://") => Ok(()),
						_ => Err("base_url must start with http:// or https://".to_string()),
					}
				}),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create the document-store source from configuration.
///
/// Configuration parameters:
/// - `project_id`: CMS project id (required)
/// - `dataset`: dataset name, e.g. "production" (required)
/// - `api_version`: dated API version (default: "2021-10-21")
/// - `use_cdn`: query the CDN host instead of the live API (default: false)
/// - `token`: read token; empty or absent means anonymous
/// - `timeout_seconds`: request timeout (default: 30)
pub fn create_source(
	config: &toml::Value,
) -> Result<Box<dyn OrderSourceInterface>, OrderSourceError> {
	SanityOrderSourceSchema
		.validate(config)
		.map_err(|e| OrderSourceError::Configuration(e.to_string()))?;

	let config = SanityConfig::from_toml(config);
	tracing::debug!(
		project_id = %config.project_id,
		dataset = %config.dataset,
		authenticated = config.token.is_some(),
		"Configured document store source"
	);
	Ok(Box::new(SanityOrderSource::new(config)?))
}

/// Registry for the document-store source.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "sanity";
	type Factory = OrderSourceFactory;

	fn factory() -> Self::Factory {
		create_source
	}
}

impl OrderSourceRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		extract::Query,
		http::{HeaderMap, StatusCode},
		response::IntoResponse,
		routing::get,
		Json, Router,
	};
	use std::collections::HashMap;
	use tokio::net::TcpListener;

	/// Serves a fake query endpoint and returns its base URL.
	async fn spawn_document_store() -> String {
		async fn query(
			headers: HeaderMap,
			Query(params): Query<HashMap<String, String>>,
		) -> axum::response::Response {
			if headers.get("authorization").and_then(|v| v.to_str().ok())
				== Some("Bearer wrong")
			{
				return (StatusCode::UNAUTHORIZED, "bad token").into_response();
			}
			assert_eq!(params.get("query").map(String::as_str), Some(ORDER_QUERY));
			let result = match params.get("$orderId").map(String::as_str) {
				Some("\"o1\"") => serde_json::json!({
					"_id": "o1",
					"fullName": "Jane Doe",
					"orderDate": "2024-01-05T10:00:00.000Z"
				}),
				Some("\"garbage\"") => return "not json".into_response(),
				_ => serde_json::Value::Null,
			};
			Json(serde_json::json!({ "ms": 3, "query": "", "result": result })).into_response()
		}

		let app = Router::new().route("/v2021-10-21/data/query/production", get(query));
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}", addr)
	}

	fn source_config(base_url: &str, token: Option<&str>) -> toml::Value {
		let mut table = toml::map::Map::new();
		table.insert("project_id".into(), "abc123".into());
		table.insert("dataset".into(), "production".into());
		table.insert("base_url".into(), base_url.into());
		if let Some(token) = token {
			table.insert("token".into(), token.into());
		}
		toml::Value::Table(table)
	}

	#[tokio::test]
	async fn test_fetch_existing_order() {
		let base = spawn_document_store().await;
		let source = create_source(&source_config(&base, None)).unwrap();

		let order = source.fetch_order("o1").await.unwrap().unwrap();
		assert_eq!(order.id, "o1");
		assert_eq!(order.full_name, "Jane Doe");
		assert_eq!(order.order_date, "2024-01-05T10:00:00.000Z");
	}

	#[tokio::test]
	async fn test_null_result_is_not_found() {
		let base = spawn_document_store().await;
		let source = create_source(&source_config(&base, Some("good"))).unwrap();

		assert!(source.fetch_order("o9").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_error_status_and_bad_body() {
		let base = spawn_document_store().await;

		let source = create_source(&source_config(&base, Some("wrong"))).unwrap();
		let err = source.fetch_order("o1").await.unwrap_err();
		assert!(matches!(err, OrderSourceError::Status { status: 401, .. }));

		let source = create_source(&source_config(&base, None)).unwrap();
		let err = source.fetch_order("garbage").await.unwrap_err();
		assert!(matches!(err, OrderSourceError::InvalidResponse(_)));
	}

	#[test]
	fn test_query_url() {
		let config: toml::Value = toml::from_str(
			"project_id = \"abc123\"\ndataset = \"production\"\napi_version = \"v2023-05-03\"",
		)
		.unwrap();
		let parsed = SanityConfig::from_toml(&config);
		assert_eq!(
			parsed.query_url(),
			"https://abc123.api.sanity.io/v2023-05-03/data/query/production"
		);

		let cdn = SanityConfig {
			use_cdn: true,
			..parsed
		};
		assert_eq!(
			cdn.query_url(),
			"https://abc123.apicdn.sanity.io/v2023-05-03/data/query/production"
		);
	}

	#[test]
	fn test_empty_token_is_anonymous() {
		let config: toml::Value =
			toml::from_str("project_id = \"p\"\ndataset = \"d\"\ntoken = \"\"").unwrap();
		assert!(SanityConfig::from_toml(&config).token.is_none());
	}

	#[test]
	fn test_schema_rejects_missing_dataset() {
		let config: toml::Value = toml::from_str("project_id = \"p\"").unwrap();
		assert!(matches!(
			create_source(&config),
			Err(OrderSourceError::Configuration(msg)) if msg.contains("dataset")
		));
	}
}
