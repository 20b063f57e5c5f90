// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session and user identity resolution.
//!
//! A session id lives in session-scoped storage and is renewed once
//! the inactivity timeout has elapsed since the session started. A
//! user id lives in durable storage and persists until that storage
//! is cleared externally.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

/// Session-scoped storage key for the current session id.
pub const SESSION_ID_KEY: &str = "beacon_session_id";
/// Session-scoped storage key for the session start time (ms).
pub const SESSION_START_KEY: &str = "beacon_session_start";
/// Durable storage key for the user id.
pub const USER_ID_KEY: &str = "beacon_user_id";

/// Default inactivity timeout after which a session id is renewed.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Scope of a stored identity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
	/// Cleared when the hosting process or page ends.
	Session,
	/// Survives restarts; cleared only by external action.
	Durable,
}

/// Key-value storage backing the identity resolver.
///
/// Mirrors the two-tier storage of browser producers: a session scope
/// and a durable scope. Implementations must tolerate concurrent
/// access from tracking call sites.
pub trait IdentityStorage: Send + Sync {
	fn get(&self, scope: StorageScope, key: &str) -> Option<String>;
	fn set(&self, scope: StorageScope, key: &str, value: &str);
}

/// In-process storage.
///
/// The durable scope only lives as long as the process; embedders
/// that need the user id to survive restarts use [`FileStorage`] or
/// supply their own backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	session: Mutex<HashMap<String, String>>,
	durable: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn map(&self, scope: StorageScope) -> &Mutex<HashMap<String, String>> {
		match scope {
			StorageScope::Session => &self.session,
			StorageScope::Durable => &self.durable,
		}
	}
}

impl IdentityStorage for MemoryStorage {
	fn get(&self, scope: StorageScope, key: &str) -> Option<String> {
		self
			.map(scope)
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(key)
			.cloned()
	}

	fn set(&self, scope: StorageScope, key: &str, value: &str) {
		self
			.map(scope)
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(key.to_string(), value.to_string());
	}
}

/// Storage that persists the durable scope to a JSON file.
///
/// The session scope stays in memory, so session ids die with the
/// process while user ids survive restarts. Write failures degrade to
/// in-memory behavior with a warning; identity resolution itself never
/// fails.
#[derive(Debug)]
pub struct FileStorage {
	path: PathBuf,
	session: Mutex<HashMap<String, String>>,
	durable: Mutex<HashMap<String, String>>,
}

impl FileStorage {
	/// Opens storage at the given path, loading any persisted values.
	#[must_use]
	pub fn open(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		let durable = match std::fs::read_to_string(&path) {
			Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
				warn!(path = %path.display(), error = %e, "ignoring unreadable identity file");
				HashMap::new()
			}),
			Err(_) => HashMap::new(),
		};
		Self {
			path,
			session: Mutex::new(HashMap::new()),
			durable: Mutex::new(durable),
		}
	}

	fn persist(&self, durable: &HashMap<String, String>) {
		let serialized = match serde_json::to_string(durable) {
			Ok(s) => s,
			Err(e) => {
				warn!(error = %e, "failed to serialize identity state");
				return;
			}
		};
		if let Some(parent) = self.path.parent() {
			if let Err(e) = std::fs::create_dir_all(parent) {
				warn!(path = %self.path.display(), error = %e, "failed to create identity directory");
				return;
			}
		}
		if let Err(e) = std::fs::write(&self.path, serialized) {
			warn!(path = %self.path.display(), error = %e, "failed to persist identity state");
		}
	}
}

impl IdentityStorage for FileStorage {
	fn get(&self, scope: StorageScope, key: &str) -> Option<String> {
		let map = match scope {
			StorageScope::Session => &self.session,
			StorageScope::Durable => &self.durable,
		};
		map
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(key)
			.cloned()
	}

	fn set(&self, scope: StorageScope, key: &str, value: &str) {
		match scope {
			StorageScope::Session => {
				self
					.session
					.lock()
					.unwrap_or_else(PoisonError::into_inner)
					.insert(key.to_string(), value.to_string());
			}
			StorageScope::Durable => {
				let mut durable = self.durable.lock().unwrap_or_else(PoisonError::into_inner);
				durable.insert(key.to_string(), value.to_string());
				self.persist(&durable);
			}
		}
	}
}

/// Derives and persists session and user identifiers.
pub struct IdentityResolver {
	storage: Arc<dyn IdentityStorage>,
	session_timeout: Duration,
}

impl IdentityResolver {
	pub fn new(storage: Arc<dyn IdentityStorage>, session_timeout: Duration) -> Self {
		Self {
			storage,
			session_timeout,
		}
	}

	/// Returns the current session id, renewing it when the timeout
	/// since session start has elapsed.
	///
	/// `now_ms` is wall-clock milliseconds since the Unix epoch.
	pub fn resolve_session(&self, now_ms: i64) -> String {
		let stored_id = self.storage.get(StorageScope::Session, SESSION_ID_KEY);
		let stored_start = self
			.storage
			.get(StorageScope::Session, SESSION_START_KEY)
			.and_then(|s| s.parse::<i64>().ok());
		let timeout_ms = self.session_timeout.as_millis() as i64;

		if let (Some(id), Some(start)) = (stored_id, stored_start) {
			if now_ms - start <= timeout_ms {
				return id;
			}
		}

		let id = Uuid::new_v4().to_string();
		self.storage.set(StorageScope::Session, SESSION_ID_KEY, &id);
		self
			.storage
			.set(StorageScope::Session, SESSION_START_KEY, &now_ms.to_string());
		debug!(session_id = %id, "started new session");
		id
	}

	/// Returns the durable user id, generating and persisting one on
	/// first use.
	pub fn resolve_user(&self) -> String {
		if let Some(id) = self.storage.get(StorageScope::Durable, USER_ID_KEY) {
			return id;
		}
		let id = Uuid::new_v4().to_string();
		self.storage.set(StorageScope::Durable, USER_ID_KEY, &id);
		debug!(user_id = %id, "assigned new user id");
		id
	}
}
