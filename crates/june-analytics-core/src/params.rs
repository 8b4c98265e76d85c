// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller-facing parameters for each call type.
//!
//! Every params type carries the same identity and envelope fields
//! (`user_id`, `anonymous_id`, `timestamp`, `context`, `integrations`,
//! `message_id`) plus the fields specific to its call.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::properties::Properties;

macro_rules! envelope_setters {
	($ty:ident) => {
		impl $ty {
			/// Sets the identified user's id.
			pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
				self.user_id = Some(user_id.into());
				self
			}

			/// Sets the anonymous (pre-login) id.
			pub fn anonymous_id(mut self, anonymous_id: impl Into<String>) -> Self {
				self.anonymous_id = Some(anonymous_id.into());
				self
			}

			/// Overrides the time the action happened; defaults to now.
			pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
				self.timestamp = Some(timestamp);
				self
			}

			pub fn context(mut self, context: Properties) -> Self {
				self.context = context;
				self
			}

			pub fn integrations(mut self, integrations: Value) -> Self {
				self.integrations = Some(integrations);
				self
			}

			/// Overrides the generated message id, e.g. for idempotent replays.
			pub fn message_id(mut self, message_id: impl Into<String>) -> Self {
				self.message_id = Some(message_id.into());
				self
			}
		}
	};
}

/// Parameters for `identify`: who the user is and their traits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifyParams {
	pub user_id: Option<String>,
	pub anonymous_id: Option<String>,
	pub traits: Properties,
	pub timestamp: Option<DateTime<Utc>>,
	pub context: Properties,
	pub integrations: Option<Value>,
	pub message_id: Option<String>,
}

impl IdentifyParams {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn traits(mut self, traits: Properties) -> Self {
		self.traits = traits;
		self
	}
}

envelope_setters!(IdentifyParams);

/// Parameters for `track`: an action the user performed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackParams {
	pub event: String,
	pub user_id: Option<String>,
	pub anonymous_id: Option<String>,
	pub properties: Properties,
	pub timestamp: Option<DateTime<Utc>>,
	pub context: Properties,
	pub integrations: Option<Value>,
	pub message_id: Option<String>,
}

impl TrackParams {
	pub fn new(event: impl Into<String>) -> Self {
		Self {
			event: event.into(),
			..Self::default()
		}
	}

	pub fn properties(mut self, properties: Properties) -> Self {
		self.properties = properties;
		self
	}
}

envelope_setters!(TrackParams);

/// Parameters for `page` and `screen` views.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageParams {
	pub name: Option<String>,
	pub category: Option<String>,
	pub user_id: Option<String>,
	pub anonymous_id: Option<String>,
	pub properties: Properties,
	pub timestamp: Option<DateTime<Utc>>,
	pub context: Properties,
	pub integrations: Option<Value>,
	pub message_id: Option<String>,
}

impl PageParams {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());
		self
	}

	pub fn properties(mut self, properties: Properties) -> Self {
		self.properties = properties;
		self
	}
}

envelope_setters!(PageParams);

/// Parameters for `group`: associates a user with a company or team.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupParams {
	pub group_id: String,
	pub user_id: Option<String>,
	pub anonymous_id: Option<String>,
	pub traits: Properties,
	pub timestamp: Option<DateTime<Utc>>,
	pub context: Properties,
	pub integrations: Option<Value>,
	pub message_id: Option<String>,
}

impl GroupParams {
	pub fn new(group_id: impl Into<String>) -> Self {
		Self {
			group_id: group_id.into(),
			..Self::default()
		}
	}

	pub fn traits(mut self, traits: Properties) -> Self {
		self.traits = traits;
		self
	}
}

envelope_setters!(GroupParams);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn track_builder_sets_fields() {
		let params = TrackParams::new("signed_up")
			.user_id("user_1")
			.properties(Properties::new().insert("plan", "pro"))
			.message_id("msg-1");

		assert_eq!(params.event, "signed_up");
		assert_eq!(params.user_id.as_deref(), Some("user_1"));
		assert_eq!(params.properties.get("plan").unwrap(), "pro");
		assert_eq!(params.message_id.as_deref(), Some("msg-1"));
		assert!(params.anonymous_id.is_none());
	}

	#[test]
	fn group_builder_sets_group_and_traits() {
		let params = GroupParams::new("acme")
			.anonymous_id("anon_1")
			.traits(Properties::new().insert("employees", 40));

		assert_eq!(params.group_id, "acme");
		assert_eq!(params.anonymous_id.as_deref(), Some("anon_1"));
		assert_eq!(params.traits.len(), 1);
	}

	#[test]
	fn page_builder_sets_name_and_category() {
		let params = PageParams::new().name("Pricing").category("Marketing");
		assert_eq!(params.name.as_deref(), Some("Pricing"));
		assert_eq!(params.category.as_deref(), Some("Marketing"));
	}
}
