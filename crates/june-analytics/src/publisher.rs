// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event batching and background delivery.
//!
//! A single task owns the pending batch. The client talks to it over an
//! unbounded channel, so submitting an event never waits on the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use june_analytics_core::{Message, MAX_BATCH_SIZE};
use june_common_http::Retried;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::context::{invoke, Callback, Context, DeliveryError};
use crate::emitter::{Emitter, EmitterEvent};
use crate::error::AnalyticsError;

/// Room reserved for `{"batch":[...],"sentAt":"..."}` around the messages.
const BATCH_ENVELOPE_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub(crate) struct BatchConfig {
	pub max_events_in_batch: usize,
	pub flush_interval: Duration,
	pub disable: bool,
}

/// An accepted event waiting for its batch to go out.
pub(crate) struct PendingEvent {
	pub message: Message,
	pub callback: Option<Callback>,
	/// Serialized size of `message`.
	pub size: usize,
}

/// Summary of one `flush()` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
	pub delivered: usize,
	pub failed: usize,
}

pub(crate) enum BatchCommand {
	Enqueue(PendingEvent),
	/// Send whatever is pending, then report back.
	Flush(oneshot::Sender<FlushReport>),
	/// Drain the channel, send the final batch and stop.
	Shutdown,
}

/// Delivers one batch, retrying as it sees fit.
#[async_trait]
pub(crate) trait BatchSender: Send + Sync {
	async fn send_batch(&self, messages: &[&Message]) -> Retried<(), AnalyticsError>;
}

pub(crate) struct Publisher {
	config: BatchConfig,
	sender: Arc<dyn BatchSender>,
	emitter: Emitter,
	batch: Vec<PendingEvent>,
	batch_bytes: usize,
	deadline: Option<Instant>,
	/// Events accepted by the client and not yet resolved. The client
	/// increments it, the publisher releases it once callbacks have run.
	queued: Arc<AtomicUsize>,
}

impl Publisher {
	pub fn new(config: BatchConfig, sender: Arc<dyn BatchSender>, emitter: Emitter) -> Self {
		Self {
			config,
			sender,
			emitter,
			batch: Vec::new(),
			batch_bytes: BATCH_ENVELOPE_BYTES,
			deadline: None,
			queued: Arc::new(AtomicUsize::new(0)),
		}
	}

	/// Shared count of unresolved events, for bounding the client queue.
	pub fn queued(&self) -> Arc<AtomicUsize> {
		Arc::clone(&self.queued)
	}

	/// Runs until a `Shutdown` command arrives or every sender is dropped.
	pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<BatchCommand>) {
		info!(
			flush_interval_ms = self.config.flush_interval.as_millis() as u64,
			max_events_in_batch = self.config.max_events_in_batch,
			disable = self.config.disable,
			"Starting analytics publisher"
		);

		loop {
			tokio::select! {
				command = rx.recv() => match command {
					Some(BatchCommand::Shutdown) | None => break,
					Some(command) => self.handle(command).await,
				},
				_ = wait_for(self.deadline) => {
					debug!("flush interval elapsed");
					self.flush().await;
				}
			}
		}

		// Calls that raced with shutdown are still delivered.
		rx.close();
		while let Some(command) = rx.recv().await {
			self.handle(command).await;
		}
		self.flush().await;

		self.emitter.emit(EmitterEvent::Drained);
		info!("Analytics publisher stopped");
	}

	async fn handle(&mut self, command: BatchCommand) {
		match command {
			BatchCommand::Enqueue(event) => self.enqueue(event).await,
			BatchCommand::Flush(ack) => {
				let report = self.flush().await;
				let _ = ack.send(report);
			}
			BatchCommand::Shutdown => {}
		}
	}

	async fn enqueue(&mut self, event: PendingEvent) {
		// +1 for the separating comma.
		if !self.batch.is_empty() && self.batch_bytes + event.size + 1 > MAX_BATCH_SIZE {
			debug!(
				batch_bytes = self.batch_bytes,
				"batch byte limit reached, flushing early"
			);
			self.flush().await;
		}

		if self.batch.is_empty() {
			self.deadline = Some(Instant::now() + self.config.flush_interval);
		}

		self.batch_bytes += event.size + 1;
		self.batch.push(event);

		if self.batch.len() >= self.config.max_events_in_batch.max(1) {
			self.flush().await;
		}
	}

	/// Sends the pending batch, if any, and resolves every callback in it.
	async fn flush(&mut self) -> FlushReport {
		self.deadline = None;
		self.batch_bytes = BATCH_ENVELOPE_BYTES;
		let events = std::mem::take(&mut self.batch);

		if events.is_empty() {
			return FlushReport::default();
		}

		self.send(events).await
	}

	async fn send(&mut self, events: Vec<PendingEvent>) -> FlushReport {
		let count = events.len();
		let report = self.deliver(events).await;
		let _ = self
			.queued
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
				Some(n.saturating_sub(count))
			});
		report
	}

	async fn deliver(&mut self, events: Vec<PendingEvent>) -> FlushReport {
		let count = events.len();

		let outcome = if self.config.disable {
			debug!(count, "analytics disabled, resolving batch locally");
			Retried {
				result: Ok(()),
				attempts: 0,
			}
		} else {
			let messages: Vec<&Message> = events.iter().map(|e| &e.message).collect();
			debug!(count, "Sending analytics batch");
			self.sender.send_batch(&messages).await
		};

		let attempts = outcome.attempts;
		match outcome.result {
			Ok(()) => {
				self.emitter.emit(EmitterEvent::Delivered { count, attempts });
				for event in events {
					invoke(
						event.callback,
						Ok(Context {
							attempts,
							event: event.message,
						}),
					);
				}
				FlushReport {
					delivered: count,
					failed: 0,
				}
			}
			Err(err) => {
				error!(error = %err, count, attempts, "Failed to deliver analytics batch");
				self.emitter.emit(EmitterEvent::Error {
					message: err.to_string(),
				});

				let err = Arc::new(err);
				for event in events {
					invoke(
						event.callback,
						Err(DeliveryError {
							error: Arc::clone(&err),
							context: Context {
								attempts,
								event: event.message,
							},
						}),
					);
				}
				FlushReport {
					delivered: 0,
					failed: count,
				}
			}
		}
	}
}

async fn wait_for(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}
