// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request and response payloads for the `/api/track` endpoint.

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Body of a track request: a single event or an ordered batch.
///
/// Producers that batch client-side post an array; the degenerate
/// single-object form is accepted for compatibility. Either way the
/// server normalizes to a sequence and records in array order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackPayload {
	Batch(Vec<Event>),
	Single(Box<Event>),
}

impl TrackPayload {
	/// Normalizes the payload into an ordered sequence of events.
	#[must_use]
	pub fn into_events(self) -> Vec<Event> {
		match self {
			TrackPayload::Batch(events) => events,
			TrackPayload::Single(event) => vec![*event],
		}
	}

	/// Number of events carried by this payload.
	#[must_use]
	pub fn len(&self) -> usize {
		match self {
			TrackPayload::Batch(events) => events.len(),
			TrackPayload::Single(_) => 1,
		}
	}

	/// Returns true if the payload carries no events.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Success acknowledgment for a recorded batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackResponse {
	pub success: bool,
	pub message: String,
}

impl TrackResponse {
	/// Acknowledgment returned once all events in a batch are recorded.
	#[must_use]
	pub fn ok(message: impl Into<String>) -> Self {
		Self {
			success: true,
			message: message.into(),
		}
	}
}

/// Error body returned for malformed requests or internal failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub success: bool,
	pub error: String,
}

impl ErrorResponse {
	#[must_use]
	pub fn new(error: impl Into<String>) -> Self {
		Self {
			success: false,
			error: error.into(),
		}
	}
}
