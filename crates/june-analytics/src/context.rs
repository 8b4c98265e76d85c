// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-event completion callbacks.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use june_analytics_core::Message;
use thiserror::Error;
use tracing::error;

use crate::error::AnalyticsError;

/// What a callback learns about its event.
#[derive(Debug, Clone)]
pub struct Context {
	/// HTTP attempts made for the batch carrying this event. Zero when the
	/// event never reached the network (validation failure, `disable`).
	pub attempts: u32,
	/// The message as it was queued.
	pub event: Message,
}

/// Delivery failed for good.
///
/// All events of a failed batch share one error, hence the `Arc`.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct DeliveryError {
	pub error: Arc<AnalyticsError>,
	pub context: Context,
}

/// Invoked exactly once per accepted event.
pub type Callback = Box<dyn FnOnce(Result<Context, DeliveryError>) + Send + 'static>;

/// Runs a callback, keeping a panicking callback from taking the publisher
/// down with it.
pub(crate) fn invoke(callback: Option<Callback>, outcome: Result<Context, DeliveryError>) {
	let Some(callback) = callback else {
		return;
	};

	let message_id = match &outcome {
		Ok(ctx) => ctx.event.message_id.clone(),
		Err(err) => err.context.event.message_id.clone(),
	};

	if catch_unwind(AssertUnwindSafe(move || callback(outcome))).is_err() {
		error!(message_id = %message_id, "analytics callback panicked");
	}
}
