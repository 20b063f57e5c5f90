// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the telemetry SDK.

use thiserror::Error;

/// Telemetry SDK errors.
#[derive(Debug, Error)]
pub enum ClientError {
	/// Endpoint URL is missing or invalid.
	#[error("invalid ingestion endpoint: {0}")]
	InvalidEndpoint(String),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Server returned an error response.
	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	/// Client has been shut down.
	#[error("client has been shut down")]
	ClientShutdown,

	/// Identity storage could not be read or written.
	#[error("identity storage error: {0}")]
	Storage(String),
}

/// Result type alias for telemetry operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_server_error_display_includes_status() {
		let err = ClientError::ServerError {
			status: 500,
			message: "boom".to_string(),
		};
		let text = err.to_string();
		assert!(text.contains("500"));
		assert!(text.contains("boom"));
	}

	#[test]
	fn test_shutdown_display() {
		assert_eq!(
			ClientError::ClientShutdown.to_string(),
			"client has been shut down"
		);
	}
}
