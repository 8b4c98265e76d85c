// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use reqwest::{Client, ClientBuilder};

/// Library name reported in the User-Agent and in `context.library`.
pub const SDK_NAME: &str = "june-analytics-rust";

/// Creates a reqwest client builder preloaded with the SDK User-Agent.
///
/// ```ignore
/// let client = june_common_http::builder()
///     .pool_idle_timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Format: `june-analytics-rust/{version}`
pub fn user_agent() -> String {
	format!("{SDK_NAME}/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_name_and_version() {
		let ua = user_agent();
		let (name, version) = ua.split_once('/').unwrap();
		assert_eq!(name, SDK_NAME);
		assert!(!version.is_empty());
	}

	#[test]
	fn builder_builds() {
		assert!(builder().build().is_ok());
	}
}
