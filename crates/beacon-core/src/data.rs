// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builder for the open `data` bag attached to events.

use serde_json::{Map, Value};

/// A builder for constructing event-specific data fields.
///
/// Producers may attach arbitrary fields; aggregation only reads the
/// keys it needs (e.g. `depth` on scroll events) and passes the rest
/// through opaquely.
///
/// # Example
///
/// ```
/// use beacon_core::EventData;
///
/// let data = EventData::new()
///     .insert("title", "Checkout")
///     .insert("loadTime", 120)
///     .insert("depth", 50);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventData {
	inner: Map<String, Value>,
}

impl EventData {
	/// Creates a new empty data bag.
	#[must_use]
	pub fn new() -> Self {
		Self { inner: Map::new() }
	}

	/// Inserts a key-value pair.
	///
	/// The value can be any type that converts into a
	/// `serde_json::Value`: strings, numbers, booleans, arrays, or
	/// nested objects.
	#[must_use]
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	/// Gets a value by key.
	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.inner.get(key)
	}

	/// Returns true if no fields have been set.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Returns the number of fields.
	#[must_use]
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Converts into the raw map carried by an event.
	#[must_use]
	pub fn into_map(self) -> Map<String, Value> {
		self.inner
	}
}

impl From<EventData> for Map<String, Value> {
	fn from(data: EventData) -> Self {
		data.into_map()
	}
}

impl From<Map<String, Value>> for EventData {
	fn from(inner: Map<String, Value>) -> Self {
		Self { inner }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_new_is_empty() {
		let data = EventData::new();
		assert!(data.is_empty());
		assert_eq!(data.len(), 0);
	}

	#[test]
	fn test_insert_mixed_types() {
		let data = EventData::new()
			.insert("title", "Home")
			.insert("depth", 75)
			.insert("visible", true);

		assert_eq!(data.len(), 3);
		assert_eq!(data.get("title"), Some(&Value::String("Home".to_string())));
		assert_eq!(data.get("depth"), Some(&Value::Number(75.into())));
		assert_eq!(data.get("visible"), Some(&Value::Bool(true)));
	}

	#[test]
	fn test_into_map_preserves_fields() {
		let map = EventData::new().insert("duration", 42).into_map();
		assert_eq!(map.get("duration"), Some(&Value::Number(42.into())));
	}

	proptest! {
		#[test]
		fn data_len_matches_distinct_insertions(keys in proptest::collection::vec("[a-z]{1,10}", 0..20)) {
			let unique: std::collections::HashSet<_> = keys.iter().cloned().collect();
			let mut data = EventData::new();
			for key in &keys {
				data = data.insert(key.clone(), "value");
			}
			prop_assert_eq!(data.len(), unique.len());
		}
	}
}
