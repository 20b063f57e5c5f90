// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered server configuration.
//!
//! Precedence (highest to lowest):
//! 1. Environment variables (`BEACON_SERVER_*`)
//! 2. Config file (`BEACON_SERVER_CONFIG` path, default `/etc/beacon/server.toml`)
//! 3. Built-in defaults

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

const DEFAULT_CONFIG_PATH: &str = "/etc/beacon/server.toml";

/// HTTP listener configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct HttpConfig {
	pub host: String,
	pub port: u16,
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: 3000,
		}
	}
}

/// Bounds on the aggregation store and reporter output.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
	/// Cap on each per-category event log.
	pub max_log_entries: usize,
	/// Number of master-log entries in the recent-events rollup.
	pub recent_events: usize,
	/// Number of sessions in the recent-sessions rollup.
	pub recent_sessions: usize,
	/// Number of entries in the top-pages rollup.
	pub top_pages: usize,
}

impl Default for RetentionConfig {
	fn default() -> Self {
		Self {
			max_log_entries: 10_000,
			recent_events: 50,
			recent_sessions: 20,
			top_pages: 10,
		}
	}
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
	/// Default tracing filter when `RUST_LOG` is unset.
	pub level: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
		}
	}
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub retention: RetentionConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	#[must_use]
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// HTTP configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfigLayer {
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
}

impl HttpConfigLayer {
	fn merge(&mut self, other: HttpConfigLayer) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
	}

	fn finalize(self) -> HttpConfig {
		let defaults = HttpConfig::default();
		HttpConfig {
			host: self.host.unwrap_or(defaults.host),
			port: self.port.unwrap_or(defaults.port),
		}
	}
}

/// Retention configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetentionConfigLayer {
	#[serde(default)]
	pub max_log_entries: Option<usize>,
	#[serde(default)]
	pub recent_events: Option<usize>,
	#[serde(default)]
	pub recent_sessions: Option<usize>,
	#[serde(default)]
	pub top_pages: Option<usize>,
}

impl RetentionConfigLayer {
	fn merge(&mut self, other: RetentionConfigLayer) {
		if other.max_log_entries.is_some() {
			self.max_log_entries = other.max_log_entries;
		}
		if other.recent_events.is_some() {
			self.recent_events = other.recent_events;
		}
		if other.recent_sessions.is_some() {
			self.recent_sessions = other.recent_sessions;
		}
		if other.top_pages.is_some() {
			self.top_pages = other.top_pages;
		}
	}

	fn finalize(self) -> RetentionConfig {
		let defaults = RetentionConfig::default();
		RetentionConfig {
			max_log_entries: self.max_log_entries.unwrap_or(defaults.max_log_entries),
			recent_events: self.recent_events.unwrap_or(defaults.recent_events),
			recent_sessions: self.recent_sessions.unwrap_or(defaults.recent_sessions),
			top_pages: self.top_pages.unwrap_or(defaults.top_pages),
		}
	}
}

/// Logging configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfigLayer {
	#[serde(default)]
	pub level: Option<String>,
}

impl LoggingConfigLayer {
	fn merge(&mut self, other: LoggingConfigLayer) {
		if other.level.is_some() {
			self.level = other.level;
		}
	}

	fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(|| LoggingConfig::default().level),
		}
	}
}

/// Top-level configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub retention: Option<RetentionConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: ServerConfigLayer) {
		match (&mut self.http, other.http) {
			(Some(mine), Some(theirs)) => mine.merge(theirs),
			(mine @ None, theirs @ Some(_)) => *mine = theirs,
			_ => {}
		}
		match (&mut self.retention, other.retention) {
			(Some(mine), Some(theirs)) => mine.merge(theirs),
			(mine @ None, theirs @ Some(_)) => *mine = theirs,
			_ => {}
		}
		match (&mut self.logging, other.logging) {
			(Some(mine), Some(theirs)) => mine.merge(theirs),
			(mine @ None, theirs @ Some(_)) => *mine = theirs,
			_ => {}
		}
	}

	pub fn finalize(self) -> Result<ServerConfig, ConfigError> {
		let http = self.http.unwrap_or_default().finalize();
		let retention = self.retention.unwrap_or_default().finalize();
		let logging = self.logging.unwrap_or_default().finalize();

		if retention.max_log_entries == 0 {
			return Err(ConfigError::Validation(
				"retention.max_log_entries must be non-zero".to_string(),
			));
		}

		Ok(ServerConfig {
			http,
			retention,
			logging,
		})
	}
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(file_layer()?);
	merged.merge(env_layer(|key| std::env::var(key).ok())?);
	merged.finalize()
}

fn file_layer() -> Result<ServerConfigLayer, ConfigError> {
	let (path, explicit) = match std::env::var("BEACON_SERVER_CONFIG") {
		Ok(path) => (path, true),
		Err(_) => (DEFAULT_CONFIG_PATH.to_string(), false),
	};

	match std::fs::read_to_string(&path) {
		Ok(contents) => {
			debug!(path = %path, "loading config file");
			Ok(toml::from_str(&contents)?)
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
			Ok(ServerConfigLayer::default())
		}
		Err(source) => Err(ConfigError::Io { path, source }),
	}
}

/// Build a layer from `BEACON_SERVER_*` variables via the given
/// lookup, so the parsing is testable without touching process
/// environment.
fn env_layer(get: impl Fn(&str) -> Option<String>) -> Result<ServerConfigLayer, ConfigError> {
	let http = HttpConfigLayer {
		host: get("BEACON_SERVER_HOST"),
		port: parse_env(&get, "BEACON_SERVER_PORT")?,
	};
	let retention = RetentionConfigLayer {
		max_log_entries: parse_env(&get, "BEACON_SERVER_MAX_LOG_ENTRIES")?,
		..RetentionConfigLayer::default()
	};
	let logging = LoggingConfigLayer {
		level: get("BEACON_SERVER_LOG_LEVEL"),
	};

	Ok(ServerConfigLayer {
		http: (http.host.is_some() || http.port.is_some()).then_some(http),
		retention: retention.max_log_entries.is_some().then_some(retention),
		logging: logging.level.is_some().then_some(logging),
	})
}

fn parse_env<T: std::str::FromStr>(
	get: impl Fn(&str) -> Option<String>,
	key: &str,
) -> Result<Option<T>, ConfigError> {
	match get(key) {
		Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
			ConfigError::Validation(format!("{key} has invalid value {raw:?}"))
		}),
		None => Ok(None),
	}
}
