// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: identify a user and track an event with the June SDK.
//!
//! Run with:
//!   JUNE_WRITE_KEY=... cargo run --example track -p june-analytics
//!
//! Set `RUST_LOG=june_analytics=debug` to watch batches go out.

use std::time::Duration;

use june_analytics::{Analytics, EmitterEvent, IdentifyParams, Properties, TrackParams};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let analytics = Analytics::from_env()?;
	println!("Sending to {}", analytics.endpoint());

	let mut events = analytics.subscribe();
	tokio::spawn(async move {
		while let Ok(event) = events.recv().await {
			if let EmitterEvent::Delivered { count, attempts } = event {
				println!("  delivered {count} event(s) in {attempts} attempt(s)");
			}
		}
	});

	analytics.identify(
		IdentifyParams::new().user_id("user_example_123").traits(
			Properties::new()
				.insert("email", "example@example.com")
				.insert("plan", "pro"),
		),
	);

	analytics.track_with(
		TrackParams::new("Example Run")
			.user_id("user_example_123")
			.properties(Properties::new().insert("source", "examples/track.rs")),
		|outcome| match outcome {
			Ok(ctx) => println!("  track ok (message {})", ctx.event.message_id),
			Err(err) => eprintln!("  track failed: {err}"),
		},
	);

	analytics.close_and_flush(Some(Duration::from_secs(15))).await?;
	println!("Done");

	Ok(())
}
