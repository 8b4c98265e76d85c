// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `Analytics` client and its builder.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use june_analytics_core::{GroupParams, IdentifyParams, Message, PageParams, TrackParams};
use june_common_config::{
	load_env, require_secret_env, RequiredSecretError, SecretString, HOST_ENV, WRITE_KEY_ENV,
};
use june_common_http::{HttpClient, ReqwestHttpClient, RetryConfig, SDK_NAME};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::{invoke, Callback, Context, DeliveryError};
use crate::emitter::{Emitter, EmitterEvent};
use crate::error::{AnalyticsError, Result};
use crate::publisher::{BatchCommand, BatchConfig, FlushReport, PendingEvent, Publisher};
use crate::sender::HttpBatchSender;
use crate::settings::{resolve_endpoint, Settings};

const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builder for constructing an [`Analytics`] client.
#[derive(Debug, Default)]
pub struct AnalyticsBuilder {
	write_key: Option<SecretString>,
	settings: Settings,
}

impl AnalyticsBuilder {
	/// Creates a builder with default settings and no write key.
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads `JUNE_WRITE_KEY` (or `JUNE_WRITE_KEY_FILE`) and, when set,
	/// `JUNE_HOST`.
	pub fn from_env() -> Result<Self> {
		let write_key = match require_secret_env(WRITE_KEY_ENV) {
			Ok(key) => key,
			Err(RequiredSecretError::Missing { .. }) => return Err(AnalyticsError::MissingWriteKey),
			Err(RequiredSecretError::Load(e)) => return Err(e.into()),
		};

		let mut builder = Self::new().write_key(write_key);
		if let Some(host) = load_env(HOST_ENV) {
			builder = builder.host(host);
		}
		Ok(builder)
	}

	/// Sets the workspace write key. Required.
	pub fn write_key(mut self, write_key: impl Into<SecretString>) -> Self {
		self.write_key = Some(write_key.into());
		self
	}

	/// Overrides the ingestion host. The `/sdk/batch` path is always appended.
	pub fn host(mut self, host: impl Into<String>) -> Self {
		self.settings.host = Some(host.into());
		self
	}

	/// Sets how often a failed batch is retried. Defaults to 3.
	pub fn max_retries(mut self, max_retries: u32) -> Self {
		self.settings.max_retries = max_retries;
		self
	}

	/// Sets the event count that triggers a flush.
	pub fn max_events_in_batch(mut self, max_events_in_batch: usize) -> Self {
		self.settings.max_events_in_batch = max_events_in_batch;
		self
	}

	/// Sets the longest time an event waits in a partial batch.
	pub fn flush_interval(mut self, flush_interval: Duration) -> Self {
		self.settings.flush_interval = flush_interval;
		self
	}

	/// Sets how many undelivered events may be pending before new ones are
	/// rejected.
	pub fn max_queue_size(mut self, max_queue_size: usize) -> Self {
		self.settings.max_queue_size = max_queue_size;
		self
	}

	/// Sets the timeout of a single HTTP attempt.
	pub fn http_request_timeout(mut self, timeout: Duration) -> Self {
		self.settings.http_request_timeout = timeout;
		self
	}

	/// Accepts events without sending them.
	pub fn disable(mut self, disable: bool) -> Self {
		self.settings.disable = disable;
		self
	}

	/// Replaces the reqwest transport.
	pub fn http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
		self.settings.http_client = Some(http_client);
		self
	}

	/// Replaces every setting at once.
	pub fn settings(mut self, settings: Settings) -> Self {
		self.settings = settings;
		self
	}

	/// Validates the configuration and spawns the publisher onto the current
	/// Tokio runtime.
	pub fn build(self) -> Result<Analytics> {
		let write_key = self
			.write_key
			.filter(|key| !key.is_empty())
			.ok_or(AnalyticsError::MissingWriteKey)?;
		let settings = self.settings;
		let endpoint = resolve_endpoint(settings.host.as_deref())?;
		let runtime = Handle::try_current().map_err(|_| AnalyticsError::NoRuntime)?;

		let http_client: Arc<dyn HttpClient> = match settings.http_client.clone() {
			Some(client) => client,
			None => Arc::new(ReqwestHttpClient::new()?),
		};

		let emitter = Emitter::new();
		let sender = HttpBatchSender::new(
			http_client,
			&write_key,
			endpoint.clone(),
			settings.http_request_timeout,
			RetryConfig::with_max_retries(settings.max_retries),
			emitter.clone(),
		);
		let publisher = Publisher::new(
			BatchConfig {
				max_events_in_batch: settings.max_events_in_batch,
				flush_interval: settings.flush_interval,
				disable: settings.disable,
			},
			Arc::new(sender),
			emitter.clone(),
		);

		let queued = publisher.queued();
		let (tx, rx) = mpsc::unbounded_channel();
		let handle = runtime.spawn(publisher.run(rx));

		info!(
			endpoint = %endpoint,
			max_retries = settings.max_retries,
			disable = settings.disable,
			"Analytics client initialized"
		);

		Ok(Analytics {
			inner: Arc::new(AnalyticsInner {
				tx,
				publisher: Mutex::new(Some(handle)),
				closed: AtomicBool::new(false),
				emitter,
				endpoint,
				close_timeout: settings.default_close_timeout(),
				queued,
				max_queue_size: settings.max_queue_size,
			}),
		})
	}
}

struct AnalyticsInner {
	tx: mpsc::UnboundedSender<BatchCommand>,
	publisher: Mutex<Option<JoinHandle<()>>>,
	closed: AtomicBool,
	emitter: Emitter,
	endpoint: String,
	close_timeout: Duration,
	queued: Arc<AtomicUsize>,
	max_queue_size: usize,
}

/// Client for sending events to June.
///
/// Event calls never block: messages are validated and handed to a
/// background publisher that batches and delivers them. Cloning is cheap
/// and every clone feeds the same publisher. When the last clone is
/// dropped the publisher sends what it holds and stops; call
/// [`close_and_flush`](Self::close_and_flush) to wait for that.
///
/// # Example
///
/// ```ignore
/// let analytics = Analytics::builder().write_key("wk_123").build()?;
///
/// analytics.track(
///     TrackParams::new("Signed Up")
///         .user_id("user_1")
///         .properties(Properties::new().insert("plan", "pro")),
/// );
///
/// analytics.close_and_flush(None).await?;
/// ```
#[derive(Clone)]
pub struct Analytics {
	inner: Arc<AnalyticsInner>,
}

impl std::fmt::Debug for Analytics {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Analytics")
			.field("endpoint", &self.inner.endpoint)
			.field("closed", &self.is_closed())
			.finish_non_exhaustive()
	}
}

impl Analytics {
	/// Creates a new builder for constructing an `Analytics` client.
	pub fn builder() -> AnalyticsBuilder {
		AnalyticsBuilder::new()
	}

	/// Builds a client from a write key and explicit settings.
	pub fn new(write_key: impl Into<SecretString>, settings: Settings) -> Result<Self> {
		AnalyticsBuilder::new()
			.write_key(write_key)
			.settings(settings)
			.build()
	}

	/// See [`AnalyticsBuilder::from_env`].
	pub fn from_env() -> Result<Self> {
		AnalyticsBuilder::from_env()?.build()
	}

	/// Records who a user is and their traits.
	pub fn identify(&self, params: IdentifyParams) {
		self.dispatch(Message::identify(params), None);
	}

	/// Like [`identify`](Self::identify), calling `callback` once the event is
	/// delivered or has failed.
	pub fn identify_with<F>(&self, params: IdentifyParams, callback: F)
	where
		F: FnOnce(std::result::Result<Context, DeliveryError>) + Send + 'static,
	{
		self.dispatch(Message::identify(params), Some(Box::new(callback)));
	}

	/// Records an action a user performed.
	pub fn track(&self, params: TrackParams) {
		self.dispatch(Message::track(params), None);
	}

	/// Like [`track`](Self::track), calling `callback` once the event is
	/// delivered or has failed.
	pub fn track_with<F>(&self, params: TrackParams, callback: F)
	where
		F: FnOnce(std::result::Result<Context, DeliveryError>) + Send + 'static,
	{
		self.dispatch(Message::track(params), Some(Box::new(callback)));
	}

	/// Records a page view.
	pub fn page(&self, params: PageParams) {
		self.dispatch(Message::page(params), None);
	}

	/// Like [`page`](Self::page), calling `callback` once the event is
	/// delivered or has failed.
	pub fn page_with<F>(&self, params: PageParams, callback: F)
	where
		F: FnOnce(std::result::Result<Context, DeliveryError>) + Send + 'static,
	{
		self.dispatch(Message::page(params), Some(Box::new(callback)));
	}

	/// Records a mobile screen view.
	pub fn screen(&self, params: PageParams) {
		self.dispatch(Message::screen(params), None);
	}

	/// Like [`screen`](Self::screen), calling `callback` once the event is
	/// delivered or has failed.
	pub fn screen_with<F>(&self, params: PageParams, callback: F)
	where
		F: FnOnce(std::result::Result<Context, DeliveryError>) + Send + 'static,
	{
		self.dispatch(Message::screen(params), Some(Box::new(callback)));
	}

	/// Associates a user with a group, e.g. a company.
	pub fn group(&self, params: GroupParams) {
		self.dispatch(Message::group(params), None);
	}

	/// Like [`group`](Self::group), calling `callback` once the event is
	/// delivered or has failed.
	pub fn group_with<F>(&self, params: GroupParams, callback: F)
	where
		F: FnOnce(std::result::Result<Context, DeliveryError>) + Send + 'static,
	{
		self.dispatch(Message::group(params), Some(Box::new(callback)));
	}

	/// Sends everything queued so far and waits for the outcome.
	pub async fn flush(&self) -> Result<FlushReport> {
		if self.is_closed() {
			return Err(AnalyticsError::ClientClosed);
		}

		let (ack, done) = oneshot::channel();
		self
			.inner
			.tx
			.send(BatchCommand::Flush(ack))
			.map_err(|_| AnalyticsError::ClientClosed)?;

		done
			.await
			.map_err(|_| AnalyticsError::PublisherFailed("flush was not acknowledged".to_string()))
	}

	/// Stops accepting events, delivers what is queued and waits for the
	/// publisher to finish.
	///
	/// Waits at most `timeout`, defaulting to 1.25 times the flush interval.
	/// On timeout the publisher is aborted and `FlushTimeout` is returned;
	/// undelivered events are lost. Calling this again is a no-op.
	pub async fn close_and_flush(&self, timeout: Option<Duration>) -> Result<()> {
		self.inner.closed.store(true, Ordering::SeqCst);

		let mut publisher = self.inner.publisher.lock().await;
		let Some(mut handle) = publisher.take() else {
			return Ok(());
		};

		let timeout = timeout.unwrap_or(self.inner.close_timeout);
		info!(timeout_ms = timeout.as_millis() as u64, "Closing analytics client");

		// The publisher may already be gone if it panicked.
		let _ = self.inner.tx.send(BatchCommand::Shutdown);

		match tokio::time::timeout(timeout, &mut handle).await {
			Ok(Ok(())) => {
				info!("Analytics client closed");
				Ok(())
			}
			Ok(Err(e)) => Err(AnalyticsError::PublisherFailed(e.to_string())),
			Err(_) => {
				warn!(
					timeout_ms = timeout.as_millis() as u64,
					"Analytics publisher did not drain in time, aborting"
				);
				handle.abort();
				let _ = handle.await;
				Err(AnalyticsError::FlushTimeout(timeout))
			}
		}
	}

	/// Lifecycle events for this client and all its clones.
	pub fn subscribe(&self) -> broadcast::Receiver<EmitterEvent> {
		self.inner.emitter.subscribe()
	}

	/// The resolved `{host}/sdk/batch` URL.
	pub fn endpoint(&self) -> &str {
		&self.inner.endpoint
	}

	/// Returns true once `close_and_flush` has been called on any clone.
	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	fn dispatch(&self, message: Message, callback: Option<Callback>) {
		let kind = message.kind;

		if self.is_closed() {
			warn!(kind = %kind, "analytics call after close_and_flush, dropping event");
			self.inner.emitter.emit(EmitterEvent::CallAfterClose { kind });
			return;
		}

		let message = message.with_library(SDK_NAME, SDK_VERSION);
		let size = match message.validate() {
			Ok(size) => size,
			Err(e) => {
				warn!(kind = %kind, error = %e, "rejected analytics event");
				self.inner.emitter.emit(EmitterEvent::Error {
					message: e.to_string(),
				});
				invoke(
					callback,
					Err(DeliveryError {
						error: Arc::new(e.into()),
						context: Context {
							attempts: 0,
							event: message,
						},
					}),
				);
				return;
			}
		};

		let max = self.inner.max_queue_size;
		if self.inner.queued.fetch_add(1, Ordering::SeqCst) >= max {
			self.release_slot();
			let err = AnalyticsError::QueueFull { max };
			warn!(kind = %kind, max, "analytics queue full, dropping event");
			self.inner.emitter.emit(EmitterEvent::Error {
				message: err.to_string(),
			});
			invoke(
				callback,
				Err(DeliveryError {
					error: Arc::new(err),
					context: Context {
						attempts: 0,
						event: message,
					},
				}),
			);
			return;
		}

		debug!(kind = %kind, message_id = %message.message_id, size, "queueing analytics event");

		let event = PendingEvent {
			message,
			callback,
			size,
		};
		if self.inner.tx.send(BatchCommand::Enqueue(event)).is_err() {
			// Lost a race with close_and_flush on another clone.
			self.release_slot();
			warn!(kind = %kind, "analytics call after close_and_flush, dropping event");
			self.inner.emitter.emit(EmitterEvent::CallAfterClose { kind });
		}
	}

	fn release_slot(&self) {
		self.inner.queued.fetch_sub(1, Ordering::SeqCst);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use june_analytics_core::MessageType;

	#[test]
	fn build_without_write_key_fails() {
		let err = Analytics::builder().build().unwrap_err();
		assert!(matches!(err, AnalyticsError::MissingWriteKey));
		assert_eq!(err.to_string(), "You must pass your June workspace's write key.");
	}

	#[test]
	fn build_with_empty_write_key_fails() {
		let err = Analytics::new("", Settings::default()).unwrap_err();
		assert!(matches!(err, AnalyticsError::MissingWriteKey));
	}

	#[test]
	fn build_outside_runtime_fails() {
		let err = Analytics::new("writeKey", Settings::default()).unwrap_err();
		assert!(matches!(err, AnalyticsError::NoRuntime));
	}

	#[tokio::test]
	async fn endpoint_defaults_to_june() {
		let analytics = Analytics::new("writeKey", Settings::default()).unwrap();
		assert_eq!(analytics.endpoint(), "https://api.june.so/sdk/batch");
	}

	#[tokio::test]
	async fn endpoint_uses_host_override() {
		let analytics = Analytics::builder()
			.write_key("writeKey")
			.host("http://localhost:9000/")
			.build()
			.unwrap();
		assert_eq!(analytics.endpoint(), "http://localhost:9000/sdk/batch");
	}

	#[tokio::test]
	async fn debug_output_hides_write_key() {
		let analytics = Analytics::new("super-secret-key", Settings::default()).unwrap();
		let builder = Analytics::builder().write_key("super-secret-key");

		assert!(!format!("{analytics:?}").contains("super-secret-key"));
		assert!(!format!("{builder:?}").contains("super-secret-key"));
	}

	#[tokio::test]
	async fn calls_after_close_are_dropped() {
		let analytics = Analytics::builder()
			.write_key("writeKey")
			.disable(true)
			.build()
			.unwrap();
		let mut events = analytics.subscribe();

		analytics.close_and_flush(None).await.unwrap();
		assert!(analytics.is_closed());

		let called = Arc::new(AtomicBool::new(false));
		let flag = Arc::clone(&called);
		analytics.track_with(
			TrackParams::new("late").user_id("userId"),
			move |_| flag.store(true, Ordering::SeqCst),
		);

		assert!(!called.load(Ordering::SeqCst));
		assert_eq!(events.recv().await.unwrap(), EmitterEvent::Drained);
		assert_eq!(
			events.recv().await.unwrap(),
			EmitterEvent::CallAfterClose {
				kind: MessageType::Track
			}
		);
		assert!(matches!(
			analytics.flush().await,
			Err(AnalyticsError::ClientClosed)
		));
	}

	#[tokio::test]
	async fn call_racing_a_finished_publisher_is_dropped() {
		let analytics = Analytics::builder()
			.write_key("writeKey")
			.disable(true)
			.build()
			.unwrap();
		let mut events = analytics.subscribe();

		// Stop the publisher without marking the client closed, as another
		// clone's close_and_flush would just before this clone's call.
		let handle = analytics.inner.publisher.lock().await.take().unwrap();
		handle.abort();
		let _ = handle.await;

		let called = Arc::new(AtomicBool::new(false));
		let flag = Arc::clone(&called);
		analytics.track_with(
			TrackParams::new("raced").user_id("userId"),
			move |_| flag.store(true, Ordering::SeqCst),
		);

		assert!(!called.load(Ordering::SeqCst));
		assert_eq!(
			events.recv().await.unwrap(),
			EmitterEvent::CallAfterClose {
				kind: MessageType::Track
			}
		);
		assert_eq!(analytics.inner.queued.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn close_twice_is_a_noop() {
		let analytics = Analytics::builder()
			.write_key("writeKey")
			.disable(true)
			.build()
			.unwrap();

		analytics.close_and_flush(None).await.unwrap();
		analytics.close_and_flush(None).await.unwrap();
	}

	#[tokio::test]
	async fn invalid_events_fail_through_the_callback() {
		let analytics = Analytics::builder()
			.write_key("writeKey")
			.disable(true)
			.build()
			.unwrap();
		let (tx, rx) = oneshot::channel();

		analytics.track_with(TrackParams::new("no identity"), move |outcome| {
			let _ = tx.send(outcome);
		});

		let err = rx.await.unwrap().unwrap_err();
		assert!(matches!(*err.error, AnalyticsError::Validation(_)));
		assert_eq!(err.context.attempts, 0);
	}

	// Both cases share one test: they mutate the same process-wide variables.
	#[tokio::test]
	async fn from_env_reads_key_and_host() {
		std::env::set_var(WRITE_KEY_ENV, "envKey");
		std::env::set_var(HOST_ENV, "http://127.0.0.1:4000");
		let configured = Analytics::from_env();

		std::env::set_var(WRITE_KEY_ENV, "");
		std::env::remove_var(HOST_ENV);
		let empty = Analytics::from_env();

		std::env::remove_var(WRITE_KEY_ENV);
		let unset = Analytics::from_env();

		let analytics = configured.unwrap();
		assert_eq!(analytics.endpoint(), "http://127.0.0.1:4000/sdk/batch");
		assert!(matches!(empty, Err(AnalyticsError::MissingWriteKey)));
		assert!(matches!(unset, Err(AnalyticsError::MissingWriteKey)));
	}
}
