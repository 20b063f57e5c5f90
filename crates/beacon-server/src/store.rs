// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory aggregation store.
//!
//! Owns the bounded per-category event logs and the derived session
//! and user summaries. Every mutation for one event is applied as a
//! single atomic unit under the write lock; statistics reads take the
//! read lock and therefore observe a consistent snapshot.

use std::collections::{HashMap, HashSet, VecDeque};

use beacon_core::{Event, EventType};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::RetentionConfig;
use crate::stats::{self, Stats};

/// Derived summary of one session: a bounded interval of activity
/// from one client.
///
/// Created on the first event carrying an unseen session id; updated
/// by every subsequent event with that id. The embedded event list is
/// deliberately unbounded, unlike the category logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
	pub session_id: String,
	pub user_id: String,
	pub first_seen: i64,
	pub last_seen: i64,
	pub events: Vec<Event>,
	pub page_views: u64,
	pub clicks: u64,
}

impl SessionRecord {
	fn open(event: &Event) -> Self {
		Self {
			session_id: event.session_id.clone(),
			user_id: event.user_id.clone(),
			first_seen: event.timestamp,
			last_seen: event.timestamp,
			events: Vec::new(),
			page_views: 0,
			clicks: 0,
		}
	}
}

/// Derived summary of one durable user identity across sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
	pub user_id: String,
	pub first_seen: i64,
	pub last_seen: i64,
	pub sessions: HashSet<String>,
	pub total_page_views: u64,
	pub total_clicks: u64,
}

impl UserRecord {
	fn open(event: &Event) -> Self {
		Self {
			user_id: event.user_id.clone(),
			first_seen: event.timestamp,
			last_seen: event.timestamp,
			sessions: HashSet::new(),
			total_page_views: 0,
			total_clicks: 0,
		}
	}
}

/// All aggregation state, guarded by the store's lock.
#[derive(Debug, Default)]
pub(crate) struct StoreInner {
	pub(crate) events: VecDeque<Event>,
	pub(crate) page_views: VecDeque<Event>,
	pub(crate) clicks: VecDeque<Event>,
	pub(crate) scrolls: VecDeque<Event>,
	pub(crate) heartbeats: VecDeque<Event>,
	pub(crate) sessions: HashMap<String, SessionRecord>,
	/// Session ids in creation order, for the recent-sessions rollup.
	pub(crate) session_order: Vec<String>,
	pub(crate) users: HashMap<String, UserRecord>,
}

impl StoreInner {
	pub(crate) fn record(&mut self, event: Event, retention: &RetentionConfig) {
		let cap = retention.max_log_entries;

		self.events.push_back(event.clone());
		trim_log(&mut self.events, cap);

		if !self.sessions.contains_key(&event.session_id) {
			self.session_order.push(event.session_id.clone());
			self
				.sessions
				.insert(event.session_id.clone(), SessionRecord::open(&event));
		}
		if let Some(session) = self.sessions.get_mut(&event.session_id) {
			session.last_seen = event.timestamp;
			session.events.push(event.clone());
		}

		if !self.users.contains_key(&event.user_id) {
			self
				.users
				.insert(event.user_id.clone(), UserRecord::open(&event));
		}
		if let Some(user) = self.users.get_mut(&event.user_id) {
			user.last_seen = event.timestamp;
			user.sessions.insert(event.session_id.clone());
		}

		match &event.event_type {
			EventType::Pageview => {
				if let Some(session) = self.sessions.get_mut(&event.session_id) {
					session.page_views += 1;
				}
				if let Some(user) = self.users.get_mut(&event.user_id) {
					user.total_page_views += 1;
				}
				self.page_views.push_back(event);
				trim_log(&mut self.page_views, cap);
			}
			EventType::Click => {
				if let Some(session) = self.sessions.get_mut(&event.session_id) {
					session.clicks += 1;
				}
				if let Some(user) = self.users.get_mut(&event.user_id) {
					user.total_clicks += 1;
				}
				self.clicks.push_back(event);
				trim_log(&mut self.clicks, cap);
			}
			EventType::Scroll => {
				self.scrolls.push_back(event);
				trim_log(&mut self.scrolls, cap);
			}
			EventType::Heartbeat => {
				self.heartbeats.push_back(event);
				trim_log(&mut self.heartbeats, cap);
			}
			// Session ends and unrecognized types live in the master
			// log only.
			EventType::SessionEnd | EventType::Other(_) => {}
		}
	}
}

fn trim_log(log: &mut VecDeque<Event>, cap: usize) {
	while log.len() > cap {
		log.pop_front();
	}
}

/// The aggregation store.
///
/// One owned instance is passed to the ingestion endpoint and the
/// statistics reporter; there is no process-wide singleton.
#[derive(Debug)]
pub struct AggregationStore {
	retention: RetentionConfig,
	inner: RwLock<StoreInner>,
}

impl AggregationStore {
	#[must_use]
	pub fn new(retention: RetentionConfig) -> Self {
		Self {
			retention,
			inner: RwLock::new(StoreInner::default()),
		}
	}

	/// Records one event: master log, session and user summaries, and
	/// category dispatch, all under a single write-lock acquisition.
	pub async fn record(&self, event: Event) {
		let mut inner = self.inner.write().await;
		inner.record(event, &self.retention);
	}

	/// Records a batch in array order under one write-lock
	/// acquisition.
	pub async fn record_batch(&self, events: Vec<Event>) {
		if events.is_empty() {
			return;
		}
		let count = events.len();
		let mut inner = self.inner.write().await;
		for event in events {
			inner.record(event, &self.retention);
		}
		debug!(count, "recorded event batch");
	}

	/// Computes the statistics rollup from a consistent snapshot of
	/// the current state. Does not mutate the store.
	pub async fn stats(&self, now_ms: i64) -> Stats {
		let inner = self.inner.read().await;
		stats::compute(&inner, now_ms, &self.retention)
	}
}
