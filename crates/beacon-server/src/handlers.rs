// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP handlers for event ingestion and statistics.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use tracing::{instrument, warn};

use beacon_core::{ErrorResponse, TrackPayload, TrackResponse};

use crate::stats::Stats;
use crate::store::AggregationStore;

/// Shared handler state: the one owned store instance.
#[derive(Clone)]
pub struct AppState {
	pub store: Arc<AggregationStore>,
}

/// `POST /api/track` — records a single event or an ordered batch.
///
/// A body that fails to parse is rejected with no partial
/// aggregation; otherwise every event is recorded, in array order,
/// before the acknowledgment is returned.
#[instrument(skip(state, payload))]
pub async fn track(
	State(state): State<AppState>,
	payload: Result<Json<TrackPayload>, JsonRejection>,
) -> impl IntoResponse {
	let Json(payload) = match payload {
		Ok(payload) => payload,
		Err(rejection) => {
			warn!(error = %rejection, "rejected malformed track payload");
			return (
				StatusCode::BAD_REQUEST,
				Json(ErrorResponse::new(rejection.body_text())),
			)
				.into_response();
		}
	};

	state.store.record_batch(payload.into_events()).await;

	(
		StatusCode::OK,
		Json(TrackResponse::ok("Events tracked")),
	)
		.into_response()
}

/// `GET /api/stats` — returns the current rollup. No side effects.
#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> Json<Stats> {
	let now = Utc::now().timestamp_millis();
	Json(state.store.stats(now).await)
}

/// `GET /` — plain-text index of the available endpoints.
pub async fn index() -> &'static str {
	"Beacon telemetry server\n\n\
	 Endpoints:\n\
	 - POST /api/track - Track events\n\
	 - GET /api/stats - Get statistics\n"
}
