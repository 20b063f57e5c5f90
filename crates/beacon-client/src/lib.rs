// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rust SDK client for Beacon behavioral telemetry.
//!
//! The client stamps tracked occurrences with a durable user id and a
//! rolling session id, batches them, and ships batches to the
//! ingestion endpoint — reliably during normal operation, best-effort
//! fire-and-forget on page exit.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use beacon_client::{ClientConfig, MemoryStorage, PageContext, TelemetryClient};
//!
//! let client = TelemetryClient::with_http_transport(
//!     ClientConfig::default(),
//!     Arc::new(MemoryStorage::new()),
//! )?;
//! client.set_context(PageContext {
//!     url: "https://example.com/docs".into(),
//!     path: "/docs".into(),
//!     ..PageContext::default()
//! });
//! client.track_page_view("Docs").await?;
//! client.track_scroll(50).await?;
//! client.end_session().await?;
//! ```

pub mod batch;
pub mod client;
pub mod error;
pub mod identity;
pub mod transport;

pub use batch::{BatchConfig, EventQueue};
pub use client::{ClientConfig, PageContext, SessionInfo, TelemetryClient};
pub use error::{ClientError, Result};
pub use identity::{
	FileStorage, IdentityResolver, IdentityStorage, MemoryStorage, StorageScope,
	DEFAULT_SESSION_TIMEOUT,
};
pub use transport::{HttpTransport, SendMode, TransportSender};
