// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rust SDK for [June](https://june.so) product analytics.
//!
//! Events are validated on the calling thread, queued, and delivered in
//! batches to `https://api.june.so/sdk/batch` by a background Tokio task.
//!
//! # Quick start
//!
//! ```ignore
//! use june_analytics::{Analytics, IdentifyParams, Properties, TrackParams};
//!
//! #[tokio::main]
//! async fn main() -> june_analytics::Result<()> {
//!     let analytics = Analytics::builder().write_key("wk_123").build()?;
//!
//!     analytics.identify(
//!         IdentifyParams::new()
//!             .user_id("user_1")
//!             .traits(Properties::new().insert("email", "ada@example.com")),
//!     );
//!
//!     analytics.track_with(
//!         TrackParams::new("Report Exported").user_id("user_1"),
//!         |outcome| match outcome {
//!             Ok(ctx) => println!("delivered after {} attempt(s)", ctx.attempts),
//!             Err(err) => eprintln!("delivery failed: {err}"),
//!         },
//!     );
//!
//!     analytics.close_and_flush(None).await
//! }
//! ```
//!
//! # Configuration
//!
//! Every [`Settings`] field has a builder method. [`Analytics::from_env`]
//! reads the write key from `JUNE_WRITE_KEY` (or a file named by
//! `JUNE_WRITE_KEY_FILE`) and an optional host override from `JUNE_HOST`.

mod client;
mod context;
mod emitter;
mod error;
mod publisher;
mod sender;
mod settings;

pub use client::{Analytics, AnalyticsBuilder};
pub use context::{Callback, Context, DeliveryError};
pub use emitter::EmitterEvent;
pub use error::{AnalyticsError, Result};
pub use publisher::FlushReport;
pub use settings::{Settings, BATCH_PATH, DEFAULT_HOST};

pub use june_analytics_core::{
	CoreError, GroupParams, IdentifyParams, Message, MessageType, PageParams, Properties,
	TrackParams,
};
pub use june_common_http::{
	header, HeaderMap, HeaderValue, HttpClient, HttpRequest, HttpResponse, Method,
	ReqwestHttpClient, StatusCode, TransportError,
};
pub use june_common_secret::SecretString;
