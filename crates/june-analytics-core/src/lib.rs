// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for June product analytics.
//!
//! This crate holds the shapes shared by the SDK (`june-analytics`) and its
//! tests: the per-call parameter types, the [`Message`] wire format, the
//! [`BatchPayload`] envelope, and message validation.
//!
//! # Example
//!
//! ```
//! use june_analytics_core::{Message, MessageType, Properties, TrackParams};
//!
//! let message = Message::track(
//!     TrackParams::new("signed_up")
//!         .user_id("user_123")
//!         .properties(Properties::new().insert("plan", "pro")),
//! );
//!
//! assert_eq!(message.kind, MessageType::Track);
//! assert!(message.validate().is_ok());
//! ```

pub mod error;
pub mod message;
pub mod params;
pub mod properties;

pub use error::{CoreError, Result};
pub use message::{
	new_message_id, BatchPayload, Message, MessageType, MAX_BATCH_SIZE, MAX_MESSAGE_SIZE,
};
pub use params::{GroupParams, IdentifyParams, PageParams, TrackParams};
pub use properties::Properties;
