// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! High-level tracking client.
//!
//! Stamps identity and page context onto tracked occurrences and
//! feeds them into the batch queue. Mirrors the public surface of the
//! browser tracking library: page views, clicks, scroll-depth
//! milestones, heartbeats, and the page-exit session end.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use beacon_core::{Event, EventData, EventType};
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::batch::{BatchConfig, EventQueue};
use crate::error::Result;
use crate::identity::{IdentityResolver, IdentityStorage, DEFAULT_SESSION_TIMEOUT};
use crate::transport::{HttpTransport, TransportSender};

/// Scroll percentages that emit a milestone event, each at most once.
const SCROLL_MILESTONES: [u8; 5] = [25, 50, 75, 90, 100];

/// Maximum length of click text carried on a click event.
const CLICK_TEXT_LIMIT: usize = 100;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Ingestion endpoint URL.
	pub endpoint: String,
	/// Batching thresholds.
	pub batch: BatchConfig,
	/// Inactivity timeout after which the session id renews.
	pub session_timeout: Duration,
	/// Interval between heartbeat events.
	pub heartbeat_interval: Duration,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			endpoint: "http://localhost:3000/api/track".to_string(),
			batch: BatchConfig::default(),
			session_timeout: DEFAULT_SESSION_TIMEOUT,
			heartbeat_interval: Duration::from_secs(60),
		}
	}
}

/// Environment context stamped onto every event.
///
/// Supplied by the embedder and updated on navigation; the client
/// copies the current values onto each tracked event.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
	pub url: String,
	pub path: String,
	pub referrer: String,
	pub user_agent: String,
	pub screen_resolution: String,
	pub viewport: String,
}

/// Current identity snapshot, for embedders that display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
	pub session_id: String,
	pub user_id: String,
	pub events_tracked: u64,
}

/// The tracking client.
pub struct TelemetryClient {
	config: ClientConfig,
	identity: IdentityResolver,
	queue: EventQueue,
	context: RwLock<PageContext>,
	started_at: Instant,
	events_tracked: AtomicU64,
	scroll_milestones: Mutex<HashSet<u8>>,
}

impl TelemetryClient {
	/// Creates a client over explicit storage and transport seams.
	pub fn new(
		config: ClientConfig,
		storage: Arc<dyn IdentityStorage>,
		sender: Arc<dyn TransportSender>,
	) -> Arc<Self> {
		let identity = IdentityResolver::new(storage, config.session_timeout);
		let queue = EventQueue::new(config.batch.clone(), sender);
		Arc::new(Self {
			config,
			identity,
			queue,
			context: RwLock::new(PageContext::default()),
			started_at: Instant::now(),
			events_tracked: AtomicU64::new(0),
			scroll_milestones: Mutex::new(HashSet::new()),
		})
	}

	/// Creates a client delivering over HTTP to the configured
	/// endpoint.
	pub fn with_http_transport(
		config: ClientConfig,
		storage: Arc<dyn IdentityStorage>,
	) -> Result<Arc<Self>> {
		let transport = HttpTransport::new(config.endpoint.clone())?;
		Ok(Self::new(config, storage, Arc::new(transport)))
	}

	/// Replaces the page context stamped onto subsequent events.
	pub fn set_context(&self, context: PageContext) {
		*self
			.context
			.write()
			.unwrap_or_else(PoisonError::into_inner) = context;
	}

	/// Tracks an occurrence of the given type.
	///
	/// Builds the event by stamping the current identity, timestamp,
	/// and page context, then enqueues it for batched delivery.
	pub async fn track(&self, event_type: EventType, data: EventData) -> Result<()> {
		let now = Utc::now().timestamp_millis();
		let session_id = self.identity.resolve_session(now);
		let user_id = self.identity.resolve_user();
		let context = self
			.context
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone();

		let event = Event {
			event_type,
			timestamp: now,
			session_id,
			user_id,
			url: context.url,
			path: context.path,
			referrer: context.referrer,
			user_agent: context.user_agent,
			screen_resolution: context.screen_resolution,
			viewport: context.viewport,
			data: data.into_map(),
		};

		self.events_tracked.fetch_add(1, Ordering::SeqCst);
		self.queue.enqueue(event).await
	}

	/// Tracks a page view with its title and load time.
	pub async fn track_page_view(&self, title: &str) -> Result<()> {
		let data = EventData::new()
			.insert("title", title)
			.insert("loadTime", self.elapsed_ms());
		self.track(EventType::Pageview, data).await
	}

	/// Tracks a click on an interactive element.
	pub async fn track_click(
		&self,
		element: &str,
		text: Option<&str>,
		id: Option<&str>,
		class_name: Option<&str>,
	) -> Result<()> {
		let mut data = EventData::new().insert("element", element);
		if let Some(text) = text {
			let truncated: String = text.chars().take(CLICK_TEXT_LIMIT).collect();
			data = data.insert("text", truncated);
		}
		if let Some(id) = id {
			data = data.insert("id", id);
		}
		if let Some(class_name) = class_name {
			data = data.insert("className", class_name);
		}
		self.track(EventType::Click, data).await
	}

	/// Tracks scroll depth, emitting one event per milestone crossed.
	///
	/// Each milestone (25/50/75/90/100) fires at most once per client
	/// lifetime.
	pub async fn track_scroll(&self, percent: u8) -> Result<()> {
		let newly_crossed: Vec<u8> = {
			let mut tracked = self
				.scroll_milestones
				.lock()
				.unwrap_or_else(PoisonError::into_inner);
			SCROLL_MILESTONES
				.iter()
				.copied()
				.filter(|m| percent >= *m && tracked.insert(*m))
				.collect()
		};

		for milestone in newly_crossed {
			self
				.track(
					EventType::Scroll,
					EventData::new().insert("depth", milestone),
				)
				.await?;
		}
		Ok(())
	}

	/// Spawns the periodic heartbeat task.
	///
	/// Each tick tracks a heartbeat carrying the elapsed duration
	/// since the client started. Abort the returned handle to stop.
	pub fn spawn_heartbeat(self: &Arc<Self>) -> JoinHandle<()> {
		let client = Arc::clone(self);
		let interval = self.config.heartbeat_interval;
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.tick().await; // first tick completes immediately
			loop {
				ticker.tick().await;
				let data = EventData::new().insert("duration", client.elapsed_ms());
				if let Err(e) = client.track(EventType::Heartbeat, data).await {
					error!(error = %e, "heartbeat tracking failed");
					break;
				}
			}
		})
	}

	/// Ends the session: tracks a `session_end` event carrying the
	/// session duration and event count, then force-flushes the queue
	/// through the fire-and-forget path.
	///
	/// Intended for page-exit signals; does not block on delivery.
	pub async fn end_session(&self) -> Result<()> {
		let data = EventData::new()
			.insert("duration", self.elapsed_ms())
			.insert("eventsCount", self.events_tracked.load(Ordering::SeqCst));
		self.track(EventType::SessionEnd, data).await?;
		self.queue.force_flush().await?;
		info!("session ended");
		Ok(())
	}

	/// Flushes any queued events through the reliable path.
	pub async fn flush(&self) -> Result<()> {
		self.queue.flush().await
	}

	/// Returns the current identity and tracking counters.
	pub fn session_info(&self) -> SessionInfo {
		let now = Utc::now().timestamp_millis();
		SessionInfo {
			session_id: self.identity.resolve_session(now),
			user_id: self.identity.resolve_user(),
			events_tracked: self.events_tracked.load(Ordering::SeqCst),
		}
	}

	fn elapsed_ms(&self) -> u64 {
		self.started_at.elapsed().as_millis() as u64
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::Result;
	use crate::identity::MemoryStorage;
	use crate::transport::SendMode;
	use tokio::sync::Mutex as AsyncMutex;

	struct CapturingSender {
		sent: AsyncMutex<Vec<(Vec<Event>, SendMode)>>,
	}

	impl CapturingSender {
		fn new() -> Self {
			Self {
				sent: AsyncMutex::new(Vec::new()),
			}
		}

		async fn events(&self) -> Vec<Event> {
			self
				.sent
				.lock()
				.await
				.iter()
				.flat_map(|(batch, _)| batch.clone())
				.collect()
		}

		async fn modes(&self) -> Vec<SendMode> {
			self.sent.lock().await.iter().map(|(_, mode)| *mode).collect()
		}
	}

	#[async_trait::async_trait]
	impl crate::transport::TransportSender for CapturingSender {
		async fn send(&self, batch: Vec<Event>, mode: SendMode) -> Result<()> {
			self.sent.lock().await.push((batch, mode));
			Ok(())
		}
	}

	fn test_client() -> (Arc<TelemetryClient>, Arc<CapturingSender>) {
		let sender = Arc::new(CapturingSender::new());
		let client = TelemetryClient::new(
			ClientConfig::default(),
			Arc::new(MemoryStorage::new()),
			sender.clone(),
		);
		client.set_context(PageContext {
			url: "http://example.com/home".to_string(),
			path: "/home".to_string(),
			referrer: String::new(),
			user_agent: "test-agent".to_string(),
			screen_resolution: "1920x1080".to_string(),
			viewport: "1200x800".to_string(),
		});
		(client, sender)
	}

	#[tokio::test]
	async fn test_track_stamps_identity_and_context() {
		let (client, sender) = test_client();

		client
			.track(EventType::Click, EventData::new().insert("element", "A"))
			.await
			.unwrap();
		client.flush().await.unwrap();

		let events = sender.events().await;
		assert_eq!(events.len(), 1);
		let event = &events[0];
		assert!(!event.session_id.is_empty());
		assert!(!event.user_id.is_empty());
		assert!(event.timestamp > 0);
		assert_eq!(event.path, "/home");
		assert_eq!(event.user_agent, "test-agent");
		assert_eq!(event.data.get("element"), Some(&serde_json::json!("A")));
	}

	#[tokio::test]
	async fn test_events_share_session_and_user() {
		let (client, sender) = test_client();

		client.track_page_view("Home").await.unwrap();
		client.track_click("BUTTON", None, None, None).await.unwrap();
		client.flush().await.unwrap();

		let events = sender.events().await;
		assert_eq!(events.len(), 2);
		assert_eq!(events[0].session_id, events[1].session_id);
		assert_eq!(events[0].user_id, events[1].user_id);
	}

	#[tokio::test]
	async fn test_page_view_carries_title_and_load_time() {
		let (client, sender) = test_client();

		client.track_page_view("Landing").await.unwrap();
		client.flush().await.unwrap();

		let events = sender.events().await;
		assert_eq!(events[0].event_type, EventType::Pageview);
		assert_eq!(events[0].data.get("title"), Some(&serde_json::json!("Landing")));
		assert!(events[0].data.contains_key("loadTime"));
	}

	#[tokio::test]
	async fn test_click_text_is_truncated() {
		let (client, sender) = test_client();
		let long_text = "x".repeat(500);

		client
			.track_click("A", Some(&long_text), Some("cta"), None)
			.await
			.unwrap();
		client.flush().await.unwrap();

		let events = sender.events().await;
		let text = events[0].data.get("text").and_then(|v| v.as_str());
		assert_eq!(text.map(str::len), Some(CLICK_TEXT_LIMIT));
		assert_eq!(events[0].data.get("id"), Some(&serde_json::json!("cta")));
	}

	#[tokio::test]
	async fn test_scroll_milestones_fire_once() {
		let (client, sender) = test_client();

		client.track_scroll(55).await.unwrap();
		client.track_scroll(55).await.unwrap();
		client.track_scroll(100).await.unwrap();
		client.flush().await.unwrap();

		let depths: Vec<i64> = sender
			.events()
			.await
			.iter()
			.filter(|e| e.event_type == EventType::Scroll)
			.filter_map(|e| e.data.get("depth").and_then(|v| v.as_i64()))
			.collect();
		assert_eq!(depths, vec![25, 50, 75, 90, 100]);
	}

	#[tokio::test]
	async fn test_end_session_flushes_fire_and_forget() {
		let (client, sender) = test_client();

		client.track_page_view("Home").await.unwrap();
		client.end_session().await.unwrap();

		let events = sender.events().await;
		let last = events.last().unwrap();
		assert_eq!(last.event_type, EventType::SessionEnd);
		assert!(last.data.contains_key("duration"));
		// The pageview was tracked before session_end was built.
		assert_eq!(last.data.get("eventsCount"), Some(&serde_json::json!(1)));
		assert_eq!(sender.modes().await, vec![SendMode::FireAndForget]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_heartbeat_ticks_track_events() {
		let (client, sender) = test_client();

		let handle = client.spawn_heartbeat();
		tokio::time::sleep(Duration::from_secs(121)).await;
		handle.abort();
		client.flush().await.unwrap();

		let heartbeats = sender
			.events()
			.await
			.iter()
			.filter(|e| e.event_type == EventType::Heartbeat)
			.count();
		assert_eq!(heartbeats, 2);
	}

	#[tokio::test]
	async fn test_session_info_reflects_tracking() {
		let (client, _sender) = test_client();

		client.track_page_view("Home").await.unwrap();
		let info = client.session_info();
		assert!(!info.session_id.is_empty());
		assert!(!info.user_id.is_empty());
		assert_eq!(info.events_tracked, 1);
	}
}
