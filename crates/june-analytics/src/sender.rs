// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP delivery of batches to the June ingestion API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use june_analytics_core::{BatchPayload, Message};
use june_common_http::{
	header, retry, HeaderMap, HeaderValue, HttpClient, HttpRequest, HttpResponse, Method, Retried,
	RetryConfig, StatusCode,
};
use june_common_secret::SecretString;
use tracing::debug;

use crate::emitter::{Emitter, EmitterEvent};
use crate::error::AnalyticsError;
use crate::publisher::BatchSender;

pub(crate) struct HttpBatchSender {
	http_client: Arc<dyn HttpClient>,
	endpoint: String,
	headers: HeaderMap,
	request_timeout: Duration,
	retry_config: RetryConfig,
	emitter: Emitter,
}

impl HttpBatchSender {
	pub fn new(
		http_client: Arc<dyn HttpClient>,
		write_key: &SecretString,
		endpoint: String,
		request_timeout: Duration,
		retry_config: RetryConfig,
		emitter: Emitter,
	) -> Self {
		let mut headers = HeaderMap::new();
		headers.insert(
			header::CONTENT_TYPE,
			HeaderValue::from_static("application/json"),
		);
		headers.insert(header::AUTHORIZATION, basic_auth(write_key));
		if let Ok(user_agent) = HeaderValue::from_str(&june_common_http::user_agent()) {
			headers.insert(header::USER_AGENT, user_agent);
		}

		Self {
			http_client,
			endpoint,
			headers,
			request_timeout,
			retry_config,
			emitter,
		}
	}
}

/// `Basic base64("<write_key>:")`, marked sensitive so it stays out of debug
/// output.
fn basic_auth(write_key: &SecretString) -> HeaderValue {
	let encoded = STANDARD.encode(format!("{}:", write_key.expose()));
	// Base64 output is always a valid header value.
	let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
		.unwrap_or_else(|_| HeaderValue::from_static("Basic"));
	value.set_sensitive(true);
	value
}

fn check_status(response: HttpResponse) -> Result<(), AnalyticsError> {
	let status = response.status;
	if status.is_success() {
		return Ok(());
	}

	if status == StatusCode::TOO_MANY_REQUESTS {
		let retry_after_secs = response
			.headers
			.get(header::RETRY_AFTER)
			.and_then(|v| v.to_str().ok())
			.and_then(|s| s.trim().parse().ok());
		return Err(AnalyticsError::RateLimited { retry_after_secs });
	}

	Err(AnalyticsError::ServerError {
		status: status.as_u16(),
	})
}

#[async_trait]
impl BatchSender for HttpBatchSender {
	async fn send_batch(&self, messages: &[&Message]) -> Retried<(), AnalyticsError> {
		let body = match BatchPayload::new(messages.to_vec()).to_json() {
			Ok(body) => body,
			Err(e) => {
				return Retried {
					result: Err(e.into()),
					attempts: 0,
				}
			}
		};

		debug!(
			url = %self.endpoint,
			count = messages.len(),
			bytes = body.len(),
			"Posting analytics batch"
		);

		retry(&self.retry_config, |attempt| {
			let request = HttpRequest {
				method: Method::POST,
				url: self.endpoint.clone(),
				headers: self.headers.clone(),
				body: body.clone(),
				timeout: self.request_timeout,
			};
			self.emitter.emit(EmitterEvent::HttpRequest {
				url: self.endpoint.clone(),
				body_len: request.body.len(),
				attempt,
			});

			async move {
				let response = self.http_client.send(request).await?;
				check_status(response)
			}
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use june_analytics_core::TrackParams;
	use june_common_http::TransportError;
	use std::collections::VecDeque;
	use std::sync::Mutex;

	#[derive(Debug, Default)]
	struct ScriptedClient {
		responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
		requests: Mutex<Vec<HttpRequest>>,
	}

	impl ScriptedClient {
		fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
			Self {
				responses: Mutex::new(responses.into()),
				requests: Mutex::default(),
			}
		}
	}

	#[async_trait]
	impl HttpClient for ScriptedClient {
		async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
			self.requests.lock().unwrap().push(request);
			self
				.responses
				.lock()
				.unwrap()
				.pop_front()
				.unwrap_or_else(|| Ok(HttpResponse::from_status(200)))
		}
	}

	fn sender(client: Arc<ScriptedClient>, max_retries: u32) -> HttpBatchSender {
		HttpBatchSender::new(
			client,
			&SecretString::from("writeKey"),
			"https://api.june.so/sdk/batch".to_string(),
			Duration::from_secs(1),
			RetryConfig {
				base_delay: Duration::from_millis(1),
				max_delay: Duration::from_millis(2),
				jitter: false,
				..RetryConfig::with_max_retries(max_retries)
			},
			Emitter::new(),
		)
	}

	fn message() -> Message {
		Message::track(TrackParams::new("event").user_id("userId"))
	}

	#[test]
	fn basic_auth_encodes_key_with_trailing_colon() {
		let value = basic_auth(&SecretString::from("writeKey"));
		// base64("writeKey:")
		assert_eq!(value.to_str().unwrap(), "Basic d3JpdGVLZXk6");
		assert!(value.is_sensitive());
	}

	#[test]
	fn rate_limit_reads_retry_after() {
		let mut headers = HeaderMap::new();
		headers.insert(header::RETRY_AFTER, HeaderValue::from_static("2"));
		let response = HttpResponse::from_status(429).with_headers(headers);

		assert!(matches!(
			check_status(response),
			Err(AnalyticsError::RateLimited {
				retry_after_secs: Some(2)
			})
		));
	}

	#[tokio::test]
	async fn posts_json_batch_with_headers() {
		let client = Arc::new(ScriptedClient::default());
		let msg = message();

		let outcome = sender(client.clone(), 3).send_batch(&[&msg]).await;

		assert!(outcome.result.is_ok());
		assert_eq!(outcome.attempts, 1);

		let requests = client.requests.lock().unwrap();
		let request = &requests[0];
		assert_eq!(request.method, Method::POST);
		assert_eq!(request.url, "https://api.june.so/sdk/batch");
		assert_eq!(request.headers[header::CONTENT_TYPE], "application/json");
		assert!(request.headers[header::USER_AGENT]
			.to_str()
			.unwrap()
			.starts_with("june-analytics-rust/"));

		let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
		assert_eq!(body["batch"][0]["type"], "track");
		assert_eq!(body["batch"][0]["userId"], "userId");
	}

	#[tokio::test]
	async fn bad_request_is_not_retried() {
		let client = Arc::new(ScriptedClient::new(vec![Ok(HttpResponse::from_status(400))]));
		let msg = message();

		let outcome = sender(client.clone(), 3).send_batch(&[&msg]).await;

		assert!(matches!(
			outcome.result,
			Err(AnalyticsError::ServerError { status: 400 })
		));
		assert_eq!(client.requests.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn transport_errors_are_retried_then_reported() {
		let client = Arc::new(ScriptedClient::new(vec![
			Err(TransportError::other("reset")),
			Err(TransportError::other("reset again")),
		]));
		let msg = message();

		let outcome = sender(client.clone(), 1).send_batch(&[&msg]).await;

		match outcome.result {
			Err(AnalyticsError::Transport(TransportError::Other(message))) => {
				assert_eq!(message, "reset again")
			}
			other => panic!("unexpected outcome: {other:?}"),
		}
		assert_eq!(outcome.attempts, 2);
	}

	#[tokio::test]
	async fn emits_one_http_request_event_per_attempt() {
		let client = Arc::new(ScriptedClient::new(vec![Ok(HttpResponse::from_status(503))]));
		let sender = sender(client, 2);
		let mut events = sender.emitter.subscribe();
		let msg = message();

		sender.send_batch(&[&msg]).await;

		let mut attempts = Vec::new();
		while let Ok(EmitterEvent::HttpRequest { attempt, .. }) = events.try_recv() {
			attempts.push(attempt);
		}
		assert_eq!(attempts, vec![1, 2]);
	}
}
