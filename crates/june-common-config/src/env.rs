// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Environment variable loading with `*_FILE` support.
//!
//! Credentials may be handed over directly (`JUNE_WRITE_KEY=...`) or as a
//! mounted file (`JUNE_WRITE_KEY_FILE=/run/secrets/june`), which is how
//! Docker and Kubernetes secrets usually arrive.

use std::path::PathBuf;
use std::{env, fs};

use june_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load a secret from `VAR_FILE` (preferred) or `VAR`.
///
/// A single trailing newline is stripped from file contents. Returns
/// `Ok(None)` when neither variable is set.
///
/// ```no_run
/// use june_common_config::load_secret_env;
///
/// if let Some(key) = load_secret_env("JUNE_WRITE_KEY")? {
///     println!("write key configured: {key}"); // prints "[REDACTED]"
/// }
/// # Ok::<(), june_common_config::SecretEnvError>(())
/// ```
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(secret)));
	}

	Ok(env::var(var).ok().map(SecretString::new))
}

/// Like [`load_secret_env`] but fails when neither variable is set.
pub fn require_secret_env(var: &str) -> Result<SecretString, RequiredSecretError> {
	load_secret_env(var)?.ok_or_else(|| RequiredSecretError::Missing {
		var: var.to_string(),
		file_var: format!("{var}_FILE"),
	})
}

#[derive(Debug, Error)]
pub enum RequiredSecretError {
	#[error("required secret not found: set either {var} or {file_var}")]
	Missing { var: String, file_var: String },

	#[error(transparent)]
	Load(#[from] SecretEnvError),
}

/// Read a non-secret setting. Unset and empty values both yield `None`.
pub fn load_env(var: &str) -> Option<String> {
	env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn returns_none_when_not_set() {
		let var = "JUNE_TEST_UNSET_KEY_4821";
		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));

		assert!(load_secret_env(var).unwrap().is_none());
	}

	#[test]
	fn reads_direct_value() {
		let var = "JUNE_TEST_DIRECT_KEY_4821";
		env::set_var(var, "wk_direct");
		env::remove_var(format!("{var}_FILE"));

		let key = load_secret_env(var).unwrap().unwrap();
		assert_eq!(key.expose(), "wk_direct");

		env::remove_var(var);
	}

	#[test]
	fn file_takes_precedence_and_strips_newline() {
		let var = "JUNE_TEST_FILE_KEY_4821";
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "wk_from_file").unwrap();

		env::set_var(var, "wk_direct");
		env::set_var(format!("{var}_FILE"), file.path().to_str().unwrap());

		let key = load_secret_env(var).unwrap().unwrap();
		assert_eq!(key.expose(), "wk_from_file");

		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn keeps_content_without_newline() {
		let var = "JUNE_TEST_NO_NEWLINE_KEY_4821";
		let mut file = NamedTempFile::new().unwrap();
		write!(file, "wk_exact").unwrap();
		env::set_var(format!("{var}_FILE"), file.path().to_str().unwrap());

		assert_eq!(load_secret_env(var).unwrap().unwrap().expose(), "wk_exact");

		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn missing_file_is_io_error() {
		let var = "JUNE_TEST_MISSING_FILE_KEY_4821";
		env::set_var(format!("{var}_FILE"), "/nonexistent/june/write_key");

		assert!(matches!(load_secret_env(var), Err(SecretEnvError::Io { .. })));

		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn empty_file_path_is_rejected() {
		let var = "JUNE_TEST_EMPTY_PATH_KEY_4821";
		env::set_var(format!("{var}_FILE"), "");

		assert!(matches!(
			load_secret_env(var),
			Err(SecretEnvError::EmptyPath { .. })
		));

		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn require_reports_both_variable_names() {
		let var = "JUNE_TEST_REQUIRED_KEY_4821";
		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));

		let err = require_secret_env(var).unwrap_err();
		let message = err.to_string();
		assert!(message.contains(var));
		assert!(message.contains(&format!("{var}_FILE")));
	}

	#[test]
	fn load_env_ignores_blank_values() {
		let var = "JUNE_TEST_HOST_4821";
		env::set_var(var, "  ");
		assert_eq!(load_env(var), None);

		env::set_var(var, "https://eu.api.june.so");
		assert_eq!(load_env(var).as_deref(), Some("https://eu.api.june.so"));

		env::remove_var(var);
	}
}
