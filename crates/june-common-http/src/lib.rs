// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP plumbing for the June analytics SDK.
//!
//! This crate provides:
//! - The [`HttpClient`] transport trait, so tests and embedders can swap the
//!   network layer out, and a reqwest-backed default
//! - A shared User-Agent for every request the SDK makes
//! - Retry with exponential backoff that reports how many attempts ran

mod client;
mod retry;
mod transport;

pub use client::{builder, user_agent, SDK_NAME};
pub use retry::{retry, Retried, RetryConfig, RetryableError};
pub use transport::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient, TransportError};

pub use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
