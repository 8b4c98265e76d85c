// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The wire format: messages and the batch envelope they travel in.
//!
//! A batch is posted as
//!
//! ```json
//! { "batch": [ { "type": "track", "userId": "...", "event": "...", ... } ],
//!   "sentAt": "2025-01-01T00:00:00Z" }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::params::{GroupParams, IdentifyParams, PageParams, TrackParams};

/// Largest accepted serialized message (32 KiB).
pub const MAX_MESSAGE_SIZE: usize = 32 * 1024;

/// Largest serialized batch the publisher will build (480 KiB).
pub const MAX_BATCH_SIZE: usize = 480 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
	Identify,
	Track,
	Page,
	Screen,
	Group,
}

impl MessageType {
	pub fn as_str(&self) -> &'static str {
		match self {
			MessageType::Identify => "identify",
			MessageType::Track => "track",
			MessageType::Page => "page",
			MessageType::Screen => "screen",
			MessageType::Group => "group",
		}
	}
}

impl fmt::Display for MessageType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One event as it appears in the `batch` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
	#[serde(rename = "type")]
	pub kind: MessageType,
	pub message_id: String,
	pub timestamp: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub anonymous_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub event: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub group_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub properties: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub traits: Option<Value>,
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub context: Map<String, Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub integrations: Option<Value>,
}

/// Time-ordered (UUIDv7) message id.
pub fn new_message_id() -> String {
	Uuid::from_bytes(*uuid7::uuid7().as_bytes()).to_string()
}

impl Message {
	fn empty(
		kind: MessageType,
		message_id: Option<String>,
		timestamp: Option<DateTime<Utc>>,
	) -> Self {
		Self {
			kind,
			message_id: message_id.unwrap_or_else(new_message_id),
			timestamp: timestamp.unwrap_or_else(Utc::now),
			user_id: None,
			anonymous_id: None,
			event: None,
			name: None,
			category: None,
			group_id: None,
			properties: None,
			traits: None,
			context: Map::new(),
			integrations: None,
		}
	}

	pub fn identify(params: IdentifyParams) -> Self {
		Self {
			user_id: params.user_id,
			anonymous_id: params.anonymous_id,
			traits: Some(params.traits.into_value()),
			context: params.context.into_map(),
			integrations: params.integrations,
			..Self::empty(MessageType::Identify, params.message_id, params.timestamp)
		}
	}

	pub fn track(params: TrackParams) -> Self {
		Self {
			user_id: params.user_id,
			anonymous_id: params.anonymous_id,
			event: Some(params.event),
			properties: Some(params.properties.into_value()),
			context: params.context.into_map(),
			integrations: params.integrations,
			..Self::empty(MessageType::Track, params.message_id, params.timestamp)
		}
	}

	pub fn page(params: PageParams) -> Self {
		Self::view(MessageType::Page, params)
	}

	pub fn screen(params: PageParams) -> Self {
		Self::view(MessageType::Screen, params)
	}

	fn view(kind: MessageType, params: PageParams) -> Self {
		Self {
			user_id: params.user_id,
			anonymous_id: params.anonymous_id,
			name: params.name,
			category: params.category,
			properties: Some(params.properties.into_value()),
			context: params.context.into_map(),
			integrations: params.integrations,
			..Self::empty(kind, params.message_id, params.timestamp)
		}
	}

	pub fn group(params: GroupParams) -> Self {
		Self {
			user_id: params.user_id,
			anonymous_id: params.anonymous_id,
			group_id: Some(params.group_id),
			traits: Some(params.traits.into_value()),
			context: params.context.into_map(),
			integrations: params.integrations,
			..Self::empty(MessageType::Group, params.message_id, params.timestamp)
		}
	}

	/// Records the sending library under `context.library` unless the caller
	/// already set one.
	pub fn with_library(mut self, name: &str, version: &str) -> Self {
		self.context.entry("library").or_insert_with(|| {
			serde_json::json!({
				"name": name,
				"version": version,
			})
		});
		self
	}

	/// Serialized size in bytes.
	pub fn encoded_len(&self) -> Result<usize> {
		Ok(serde_json::to_vec(self)?.len())
	}

	/// Checks the message can be accepted by the ingestion API and returns
	/// its serialized size.
	pub fn validate(&self) -> Result<usize> {
		if !has_text(&self.user_id) && !has_text(&self.anonymous_id) {
			return Err(CoreError::MissingIdentity {
				kind: self.kind.as_str(),
			});
		}

		match self.kind {
			MessageType::Track if !has_text(&self.event) => return Err(CoreError::MissingEventName),
			MessageType::Group if !has_text(&self.group_id) => return Err(CoreError::MissingGroupId),
			_ => {}
		}

		let size = self.encoded_len()?;
		if size > MAX_MESSAGE_SIZE {
			return Err(CoreError::MessageTooLarge {
				size,
				max: MAX_MESSAGE_SIZE,
			});
		}

		Ok(size)
	}
}

fn has_text(value: &Option<String>) -> bool {
	value.as_deref().is_some_and(|v| !v.is_empty())
}

/// The JSON body of one batch request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload<'a> {
	pub batch: Vec<&'a Message>,
	pub sent_at: DateTime<Utc>,
}

impl<'a> BatchPayload<'a> {
	pub fn new(batch: Vec<&'a Message>) -> Self {
		Self {
			batch,
			sent_at: Utc::now(),
		}
	}

	pub fn to_json(&self) -> Result<String> {
		Ok(serde_json::to_string(self)?)
	}
}
