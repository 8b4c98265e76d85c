// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Total attempts, including the first one.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
	/// Upper bound on a server-requested delay (`Retry-After`).
	pub max_retry_after: Duration,
}

impl RetryConfig {
	/// A config that allows `max_retries` retries after the first attempt.
	pub fn with_max_retries(max_retries: u32) -> Self {
		Self {
			max_attempts: max_retries.saturating_add(1),
			..Self::default()
		}
	}
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 4,
			base_delay: Duration::from_millis(25),
			max_delay: Duration::from_secs(1),
			backoff_factor: 2.0,
			jitter: true,
			max_retry_after: Duration::from_secs(30),
		}
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;

	/// A delay requested by the remote side, e.g. from `Retry-After`.
	/// Overrides the computed backoff for the next attempt.
	fn retry_after(&self) -> Option<Duration> {
		None
	}
}

/// Outcome of [`retry`]: the final result and how many attempts produced it.
#[derive(Debug)]
pub struct Retried<T, E> {
	pub result: Result<T, E>,
	pub attempts: u32,
}

fn calculate_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential_delay = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let capped_delay = exponential_delay.min(cfg.max_delay.as_secs_f64());

	let final_delay = if cfg.jitter {
		let jitter_factor = 0.5 + fastrand::f64();
		capped_delay * jitter_factor
	} else {
		capped_delay
	};

	Duration::from_secs_f64(final_delay)
}

/// Runs `f` until it succeeds, fails with a non-retryable error, or
/// `cfg.max_attempts` attempts have been made. At least one attempt always
/// runs.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Retried<T, E>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let max_attempts = cfg.max_attempts.max(1);
	let mut attempt = 0;

	loop {
		attempt += 1;
		let err = match f(attempt).await {
			Ok(value) => {
				return Retried {
					result: Ok(value),
					attempts: attempt,
				}
			}
			Err(err) => err,
		};

		if !err.is_retryable() {
			warn!(error = %err, attempt, "non-retryable error encountered");
			return Retried {
				result: Err(err),
				attempts: attempt,
			};
		}

		if attempt >= max_attempts {
			warn!(
				error = %err,
				attempt,
				max_attempts,
				"max retry attempts exhausted"
			);
			return Retried {
				result: Err(err),
				attempts: attempt,
			};
		}

		let delay = err
			.retry_after()
			.map(|requested| requested.min(cfg.max_retry_after))
			.unwrap_or_else(|| calculate_delay(cfg, attempt - 1));
		warn!(
			error = %err,
			attempt,
			max_attempts,
			delay_ms = delay.as_millis() as u64,
			"retrying after error"
		);

		tokio::time::sleep(delay).await;
	}
}
