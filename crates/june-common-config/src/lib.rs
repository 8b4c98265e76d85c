// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration primitives shared by the June analytics crates.
//!
//! - [`load_secret_env`] / [`require_secret_env`]: read a credential from
//!   `VAR` or from the file named by `VAR_FILE`
//! - [`load_env`]: read a plain, non-empty setting

pub mod env;

pub use june_common_secret::{Secret, SecretString, REDACTED};

pub use env::{load_env, load_secret_env, require_secret_env, RequiredSecretError, SecretEnvError};

/// Environment variable holding the workspace write key.
pub const WRITE_KEY_ENV: &str = "JUNE_WRITE_KEY";

/// Environment variable overriding the ingestion host.
pub const HOST_ENV: &str = "JUNE_HOST";
