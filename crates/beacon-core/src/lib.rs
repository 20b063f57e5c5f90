// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core event types for Beacon behavioral telemetry.
//!
//! This crate defines the wire format shared by the client SDK
//! (`beacon-client`) and the ingestion server (`beacon-server`):
//! the [`Event`] record, its [`EventType`], the schema-less
//! [`EventData`] bag, and the request/response payloads of the
//! `/api/track` endpoint.
//!
//! Field names serialize in camelCase to stay compatible with
//! browser-side producers.

pub mod data;
pub mod event;
pub mod payload;

pub use data::EventData;
pub use event::{Event, EventType};
pub use payload::{ErrorResponse, TrackPayload, TrackResponse};
