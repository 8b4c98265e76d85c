// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics SDK.

use std::time::Duration;

use june_analytics_core::CoreError;
use june_common_config::SecretEnvError;
use june_common_http::{RetryableError, TransportError};
use thiserror::Error;

/// Analytics SDK errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// Write key is absent or empty.
	#[error("You must pass your June workspace's write key.")]
	MissingWriteKey,

	#[error("invalid host {host:?}: {reason}")]
	InvalidHost { host: String, reason: String },

	/// The client spawns its publisher onto the current Tokio runtime.
	#[error("no Tokio runtime available to run the analytics publisher")]
	NoRuntime,

	#[error("failed to load configuration: {0}")]
	Config(#[from] SecretEnvError),

	/// The request never produced a response.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The ingestion API answered with a non-success status.
	#[error("server responded with HTTP {status}")]
	ServerError { status: u16 },

	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	#[error("invalid message: {0}")]
	Validation(#[from] CoreError),

	/// Too many events are waiting for delivery.
	#[error("analytics queue is full ({max} events pending), dropping event")]
	QueueFull { max: usize },

	#[error("analytics client has been closed")]
	ClientClosed,

	#[error("timed out after {0:?} waiting for pending events to flush")]
	FlushTimeout(Duration),

	#[error("analytics publisher stopped unexpectedly: {0}")]
	PublisherFailed(String),
}

impl RetryableError for AnalyticsError {
	fn is_retryable(&self) -> bool {
		match self {
			AnalyticsError::Transport(e) => e.is_retryable(),
			// A malformed batch will not get better by resending it.
			AnalyticsError::ServerError { status } => *status != 400,
			AnalyticsError::RateLimited { .. } => true,
			_ => false,
		}
	}

	fn retry_after(&self) -> Option<Duration> {
		match self {
			AnalyticsError::RateLimited {
				retry_after_secs: Some(secs),
			} => Some(Duration::from_secs(*secs)),
			_ => None,
		}
	}
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_write_key_names_the_requirement() {
		assert_eq!(
			AnalyticsError::MissingWriteKey.to_string(),
			"You must pass your June workspace's write key."
		);
	}

	#[test]
	fn server_errors_are_retryable_except_bad_request() {
		for status in [408, 429, 500, 502, 503, 504, 404, 401] {
			assert!(
				AnalyticsError::ServerError { status }.is_retryable(),
				"status {status} should be retryable"
			);
		}
		assert!(!AnalyticsError::ServerError { status: 400 }.is_retryable());
	}

	#[test]
	fn transport_errors_are_retryable() {
		let err = AnalyticsError::from(TransportError::other("connection reset"));
		assert!(err.is_retryable());
		assert_eq!(err.to_string(), "connection reset");
	}

	#[test]
	fn rate_limit_exposes_retry_after() {
		let err = AnalyticsError::RateLimited {
			retry_after_secs: Some(3),
		};
		assert!(err.is_retryable());
		assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));

		let without = AnalyticsError::RateLimited {
			retry_after_secs: None,
		};
		assert_eq!(without.retry_after(), None);
	}

	#[test]
	fn local_errors_are_not_retryable() {
		assert!(!AnalyticsError::MissingWriteKey.is_retryable());
		assert!(!AnalyticsError::ClientClosed.is_retryable());
		assert!(!AnalyticsError::QueueFull { max: 1000 }.is_retryable());
		assert!(!AnalyticsError::Validation(CoreError::MissingEventName).is_retryable());
	}
}
