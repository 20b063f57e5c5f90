// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tracked event record and its type discriminant.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a tracked event.
///
/// The well-known kinds drive category aggregation on the server;
/// anything else round-trips as a free-form string and is kept in the
/// master event log only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
	Pageview,
	Click,
	Scroll,
	SessionEnd,
	Heartbeat,
	#[serde(untagged)]
	Other(String),
}

impl EventType {
	/// Returns the wire name of this event type.
	#[must_use]
	pub fn as_str(&self) -> &str {
		match self {
			EventType::Pageview => "pageview",
			EventType::Click => "click",
			EventType::Scroll => "scroll",
			EventType::SessionEnd => "session_end",
			EventType::Heartbeat => "heartbeat",
			EventType::Other(name) => name,
		}
	}
}

impl Default for EventType {
	fn default() -> Self {
		EventType::Other(String::new())
	}
}

impl std::fmt::Display for EventType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl From<&str> for EventType {
	fn from(s: &str) -> Self {
		match s {
			"pageview" => EventType::Pageview,
			"click" => EventType::Click,
			"scroll" => EventType::Scroll,
			"session_end" => EventType::SessionEnd,
			"heartbeat" => EventType::Heartbeat,
			other => EventType::Other(other.to_string()),
		}
	}
}

/// One recorded user/client occurrence.
///
/// Events are created once at the tracking call site and never
/// mutated afterwards; ownership moves from the producer through the
/// batch queue into the aggregation store.
///
/// Every field carries a serde default: ingestion is structurally
/// lenient, and an event with a missing `sessionId` or `userId`
/// aggregates under the empty-string key rather than being rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
	#[serde(rename = "type", default)]
	pub event_type: EventType,
	/// Wall-clock milliseconds since the Unix epoch.
	#[serde(default)]
	pub timestamp: i64,
	#[serde(default)]
	pub session_id: String,
	#[serde(default)]
	pub user_id: String,
	#[serde(default)]
	pub url: String,
	#[serde(default)]
	pub path: String,
	#[serde(default)]
	pub referrer: String,
	#[serde(default)]
	pub user_agent: String,
	#[serde(default)]
	pub screen_resolution: String,
	#[serde(default)]
	pub viewport: String,
	/// Open event-specific fields, passed through opaquely.
	#[serde(default)]
	pub data: Map<String, Value>,
}

impl Event {
	/// Creates an event of the given type stamped with a timestamp.
	///
	/// Identity and page context are left empty; the client SDK fills
	/// them in at the tracking call site.
	#[must_use]
	pub fn new(event_type: EventType, timestamp: i64) -> Self {
		Self {
			event_type,
			timestamp,
			..Self::default()
		}
	}

	/// Reads a value from the open `data` bag.
	#[must_use]
	pub fn data_field(&self, key: &str) -> Option<&Value> {
		self.data.get(key)
	}
}
