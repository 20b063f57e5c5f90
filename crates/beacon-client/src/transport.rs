// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch delivery to the ingestion endpoint.

use std::time::Duration;

use beacon_core::Event;
use tracing::{debug, error};

use crate::error::{ClientError, Result};

/// Default request timeout for reliable sends.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivery mode for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
	/// Awaits the request and surfaces failures to the caller.
	/// Failures are logged and the batch is dropped, never retried.
	Reliable,
	/// Returns immediately; delivery happens on a detached task.
	/// Used on page-exit paths that must not block teardown.
	FireAndForget,
}

/// Handler for delivering batched events to the server.
#[async_trait::async_trait]
pub trait TransportSender: Send + Sync {
	/// Delivers a batch of events in the given mode.
	async fn send(&self, batch: Vec<Event>, mode: SendMode) -> Result<()>;
}

/// HTTP transport posting JSON batches to `/api/track`.
pub struct HttpTransport {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpTransport {
	/// Creates a transport for the given ingestion endpoint URL.
	pub fn new(endpoint: impl Into<String>) -> Result<Self> {
		let client = reqwest::Client::builder()
			.user_agent(user_agent())
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(ClientError::RequestFailed)?;
		Ok(Self::with_client(client, endpoint))
	}

	/// Creates a transport over a caller-supplied `reqwest` client.
	pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
		Self {
			client,
			endpoint: endpoint.into(),
		}
	}
}

#[async_trait::async_trait]
impl TransportSender for HttpTransport {
	async fn send(&self, batch: Vec<Event>, mode: SendMode) -> Result<()> {
		match mode {
			SendMode::Reliable => {
				match post_batch(&self.client, &self.endpoint, &batch).await {
					Ok(()) => Ok(()),
					Err(e) => {
						error!(error = %e, count = batch.len(), "failed to deliver event batch");
						Err(e)
					}
				}
			}
			SendMode::FireAndForget => {
				let client = self.client.clone();
				let endpoint = self.endpoint.clone();
				tokio::spawn(async move {
					if let Err(e) = post_batch(&client, &endpoint, &batch).await {
						debug!(error = %e, count = batch.len(), "best-effort batch delivery failed");
					}
				});
				Ok(())
			}
		}
	}
}

async fn post_batch(client: &reqwest::Client, endpoint: &str, batch: &[Event]) -> Result<()> {
	let response = client.post(endpoint).json(batch).send().await?;
	let status = response.status();
	if !status.is_success() {
		let message = response.text().await.unwrap_or_default();
		return Err(ClientError::ServerError {
			status: status.as_u16(),
			message,
		});
	}
	debug!(count = batch.len(), "delivered event batch");
	Ok(())
}

/// Returns the standard Beacon User-Agent string.
///
/// Format: `beacon/{version}`
#[must_use]
pub fn user_agent() -> String {
	format!("beacon/{}", env!("CARGO_PKG_VERSION"))
}
