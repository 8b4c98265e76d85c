// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client settings and the fixed June endpoint.

use std::sync::Arc;
use std::time::Duration;

use june_common_http::HttpClient;

use crate::error::{AnalyticsError, Result};

/// Ingestion host used unless explicitly overridden.
pub const DEFAULT_HOST: &str = "https://api.june.so";

/// Submission path; not configurable.
pub const BATCH_PATH: &str = "/sdk/batch";

/// Everything a caller may tune. The write key and the submission path are
/// deliberately absent: the former is passed separately, the latter is fixed.
#[derive(Debug, Clone)]
pub struct Settings {
	/// Overrides [`DEFAULT_HOST`].
	pub host: Option<String>,
	/// Retries after the first attempt of a batch. Defaults to 3, so a batch
	/// gets up to four attempts; set it to 1 for a single retry.
	pub max_retries: u32,
	/// Flush as soon as this many events are queued.
	pub max_events_in_batch: usize,
	/// Flush a non-empty batch at most this long after its first event.
	pub flush_interval: Duration,
	/// Accepted events not yet delivered or failed. Further events are
	/// rejected with `QueueFull` until the publisher catches up.
	pub max_queue_size: usize,
	pub http_request_timeout: Duration,
	/// Accept events but never send them; callbacks still succeed.
	pub disable: bool,
	/// Transport override, mainly for tests. Defaults to reqwest.
	pub http_client: Option<Arc<dyn HttpClient>>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			host: None,
			max_retries: 3,
			max_events_in_batch: 15,
			flush_interval: Duration::from_secs(10),
			max_queue_size: 1000,
			http_request_timeout: Duration::from_secs(10),
			disable: false,
			http_client: None,
		}
	}
}

impl Settings {
	/// How long `close_and_flush` waits when no timeout is given.
	pub fn default_close_timeout(&self) -> Duration {
		self.flush_interval.mul_f64(1.25)
	}
}

/// Builds `{host}/sdk/batch`, defaulting the host and trimming trailing
/// slashes.
pub fn resolve_endpoint(host: Option<&str>) -> Result<String> {
	let host = host
		.map(str::trim)
		.filter(|h| !h.is_empty())
		.unwrap_or(DEFAULT_HOST)
		.trim_end_matches('/');

	let endpoint = format!("{host}{BATCH_PATH}");
	reqwest::Url::parse(&endpoint).map_err(|e| AnalyticsError::InvalidHost {
		host: host.to_string(),
		reason: e.to_string(),
	})?;

	Ok(endpoint)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn defaults() {
		let settings = Settings::default();
		assert_eq!(settings.host, None);
		assert_eq!(settings.max_retries, 3);
		assert_eq!(settings.max_events_in_batch, 15);
		assert_eq!(settings.flush_interval, Duration::from_secs(10));
		assert_eq!(settings.max_queue_size, 1000);
		assert_eq!(settings.http_request_timeout, Duration::from_secs(10));
		assert!(!settings.disable);
		assert!(settings.http_client.is_none());
		assert_eq!(settings.default_close_timeout(), Duration::from_millis(12_500));
	}

	#[test]
	fn endpoint_defaults_to_june() {
		assert_eq!(resolve_endpoint(None).unwrap(), "https://api.june.so/sdk/batch");
		assert_eq!(resolve_endpoint(Some("")).unwrap(), "https://api.june.so/sdk/batch");
	}

	#[test]
	fn endpoint_honours_host_override() {
		assert_eq!(
			resolve_endpoint(Some("http://localhost:8080/")).unwrap(),
			"http://localhost:8080/sdk/batch"
		);
	}

	#[test]
	fn endpoint_rejects_garbage_host() {
		assert!(matches!(
			resolve_endpoint(Some("not a url")),
			Err(AnalyticsError::InvalidHost { .. })
		));
	}

	proptest! {
		#[test]
		fn endpoint_never_doubles_slashes(
			scheme in prop_oneof![Just("http"), Just("https")],
			domain in "[a-z]{3,10}\\.[a-z]{2,4}",
			slashes in 0..3usize,
		) {
			let host = format!("{scheme}://{domain}{}", "/".repeat(slashes));
			let endpoint = resolve_endpoint(Some(&host)).unwrap();
			prop_assert_eq!(endpoint, format!("{scheme}://{domain}/sdk/batch"));
		}
	}
}
