// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP ingestion and aggregation server for Beacon telemetry.
//!
//! Receives event batches on `POST /api/track`, aggregates them into
//! bounded in-memory logs with derived session and user summaries,
//! and serves queryable rollups on `GET /api/stats`.
//!
//! # Architecture
//!
//! - `store` - the aggregation store: bounded category logs plus
//!   per-session and per-user summaries, updated atomically per event
//! - `stats` - the statistics reporter computing rollups on demand
//! - `handlers` - axum handlers wiring HTTP onto the store
//! - `config` - layered configuration (defaults, TOML file, env)

pub mod config;
pub mod error;
pub mod handlers;
pub mod stats;
pub mod store;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use config::{load_config, RetentionConfig, ServerConfig};
pub use error::ConfigError;
pub use handlers::AppState;
pub use stats::Stats;
pub use store::{AggregationStore, SessionRecord, UserRecord};

/// Builds the application router.
///
/// All origins are permitted: the tracking script runs on arbitrary
/// pages, so the CORS layer answers preflight for any origin, method,
/// and header.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/", get(handlers::index))
		.route("/api/track", post(handlers::track))
		.route("/api/stats", get(handlers::stats))
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		)
		.with_state(state)
}
