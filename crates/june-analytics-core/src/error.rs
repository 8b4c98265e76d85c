// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Reasons a message is rejected before it is queued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
	#[error("{kind} message must have a userId or an anonymousId")]
	MissingIdentity { kind: &'static str },

	#[error("track message must have a non-empty event name")]
	MissingEventName,

	#[error("group message must have a non-empty groupId")]
	MissingGroupId,

	#[error("message is {size} bytes, larger than the {max} byte limit")]
	MessageTooLarge { size: usize, max: usize },

	#[error("serialization error: {0}")]
	Serialization(String),
}

impl From<serde_json::Error> for CoreError {
	fn from(err: serde_json::Error) -> Self {
		CoreError::Serialization(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, CoreError>;
