// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lifecycle notifications for observers of the client.

use june_analytics_core::MessageType;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitterEvent {
	/// A batch request is about to be sent.
	HttpRequest {
		url: String,
		body_len: usize,
		attempt: u32,
	},
	/// A batch was accepted by the server.
	Delivered { count: usize, attempts: u32 },
	/// An event or batch failed for good.
	Error { message: String },
	/// A call arrived after `close_and_flush` and was dropped.
	CallAfterClose { kind: MessageType },
	/// The publisher flushed everything and stopped.
	Drained,
}

/// Fan-out of [`EmitterEvent`]s. Emitting never blocks; slow subscribers
/// see `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct Emitter {
	tx: broadcast::Sender<EmitterEvent>,
}

impl Emitter {
	pub fn new() -> Self {
		let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
		Self { tx }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<EmitterEvent> {
		self.tx.subscribe()
	}

	pub fn emit(&self, event: EmitterEvent) {
		// No subscribers is the normal case.
		let _ = self.tx.send(event);
	}
}

impl Default for Emitter {
	fn default() -> Self {
		Self::new()
	}
}
