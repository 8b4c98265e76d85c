// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The transport seam between the batch publisher and the network.

use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use reqwest::Client;
use thiserror::Error;

use crate::retry::RetryableError;

/// A fully prepared outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
	pub method: Method,
	pub url: String,
	pub headers: HeaderMap,
	pub body: String,
	pub timeout: Duration,
}

/// What the SDK needs back from a transport: the status, and the headers so
/// `Retry-After` can be honoured.
#[derive(Debug, Clone)]
pub struct HttpResponse {
	pub status: StatusCode,
	pub headers: HeaderMap,
}

impl HttpResponse {
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
		}
	}

	/// Shorthand for mocks, e.g. `HttpResponse::from_status(500)`.
	///
	/// Out-of-range codes become `500 Internal Server Error`.
	pub fn from_status(status: u16) -> Self {
		Self::new(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
	}

	pub fn with_headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}
}

/// A request that never produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("HTTP request failed: {0}")]
	Request(#[from] reqwest::Error),

	/// Raised by custom transports.
	#[error("{0}")]
	Other(String),
}

impl TransportError {
	pub fn other(message: impl Into<String>) -> Self {
		Self::Other(message.into())
	}
}

impl RetryableError for TransportError {
	/// The request may never have reached the server, so every transport
	/// failure is worth another attempt.
	fn is_retryable(&self) -> bool {
		true
	}
}

/// Sends a single HTTP request.
///
/// Implementations only move bytes; status interpretation and retries live
/// in the caller.
#[async_trait]
pub trait HttpClient: Send + Sync + std::fmt::Debug {
	async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default transport backed by a shared reqwest [`Client`].
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
	client: Client,
}

impl ReqwestHttpClient {
	/// Builds a client carrying the SDK User-Agent.
	pub fn new() -> Result<Self, TransportError> {
		Ok(Self {
			client: crate::client::builder().build()?,
		})
	}

	/// Wraps an existing reqwest client, e.g. one with a proxy configured.
	pub fn from_client(client: Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
	async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
		let response = self
			.client
			.request(request.method, &request.url)
			.headers(request.headers)
			.timeout(request.timeout)
			.body(request.body)
			.send()
			.await?;

		Ok(HttpResponse {
			status: response.status(),
			headers: response.headers().clone(),
		})
	}
}
