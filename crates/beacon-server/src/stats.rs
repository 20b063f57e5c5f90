// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! On-demand statistics rollups over the aggregation store.

use std::collections::{BTreeMap, HashMap};

use beacon_core::Event;
use serde::Serialize;

use crate::config::RetentionConfig;
use crate::store::{SessionRecord, StoreInner};

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Totals over the retained state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
	pub total_events: usize,
	pub total_page_views: usize,
	pub total_clicks: usize,
	pub total_sessions: usize,
	pub total_users: usize,
}

/// Trailing-24h window counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayWindow {
	pub events: usize,
	pub page_views: usize,
	pub clicks: usize,
	pub sessions: usize,
	pub users: usize,
}

/// Trailing-hour window counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourWindow {
	pub events: usize,
	pub page_views: usize,
	pub clicks: usize,
}

/// One entry of the top-pages ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageCount {
	pub page: String,
	pub count: u64,
}

/// One bucket of the scroll-depth histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthCount {
	pub depth: i64,
	pub count: u64,
}

/// The full rollup served by `GET /api/stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
	pub overview: Overview,
	pub last24h: DayWindow,
	pub last_hour: HourWindow,
	pub recent_events: Vec<Event>,
	pub top_pages: Vec<PageCount>,
	pub scroll_depths: Vec<DepthCount>,
	pub sessions: Vec<SessionRecord>,
}

/// Computes the rollup from current store state without mutating it.
pub(crate) fn compute(inner: &StoreInner, now_ms: i64, retention: &RetentionConfig) -> Stats {
	let day_cutoff = now_ms - DAY_MS;
	let hour_cutoff = now_ms - HOUR_MS;

	let after = |log: &std::collections::VecDeque<Event>, cutoff: i64| {
		log.iter().filter(|e| e.timestamp > cutoff).count()
	};

	Stats {
		overview: Overview {
			total_events: inner.events.len(),
			total_page_views: inner.page_views.len(),
			total_clicks: inner.clicks.len(),
			total_sessions: inner.sessions.len(),
			total_users: inner.users.len(),
		},
		last24h: DayWindow {
			events: after(&inner.events, day_cutoff),
			page_views: after(&inner.page_views, day_cutoff),
			clicks: after(&inner.clicks, day_cutoff),
			sessions: inner
				.sessions
				.values()
				.filter(|s| s.last_seen > day_cutoff)
				.count(),
			users: inner
				.users
				.values()
				.filter(|u| u.last_seen > day_cutoff)
				.count(),
		},
		last_hour: HourWindow {
			events: after(&inner.events, hour_cutoff),
			page_views: after(&inner.page_views, hour_cutoff),
			clicks: after(&inner.clicks, hour_cutoff),
		},
		recent_events: inner
			.events
			.iter()
			.rev()
			.take(retention.recent_events)
			.cloned()
			.collect(),
		top_pages: top_pages(inner, retention.top_pages),
		scroll_depths: scroll_depths(inner),
		sessions: inner
			.session_order
			.iter()
			.rev()
			.take(retention.recent_sessions)
			.filter_map(|id| inner.sessions.get(id).cloned())
			.collect(),
	}
}

/// Pages ranked by pageview count, descending; ties keep
/// first-encountered order. A pageview with an empty path counts
/// under its full URL.
fn top_pages(inner: &StoreInner, limit: usize) -> Vec<PageCount> {
	let mut index: HashMap<&str, usize> = HashMap::new();
	let mut counts: Vec<PageCount> = Vec::new();

	for event in &inner.page_views {
		let page = if event.path.is_empty() {
			event.url.as_str()
		} else {
			event.path.as_str()
		};
		match index.get(page) {
			Some(&i) => counts[i].count += 1,
			None => {
				index.insert(page, counts.len());
				counts.push(PageCount {
					page: page.to_string(),
					count: 1,
				});
			}
		}
	}

	counts.sort_by(|a, b| b.count.cmp(&a.count));
	counts.truncate(limit);
	counts
}

/// Histogram of recorded scroll depths, ascending by depth.
fn scroll_depths(inner: &StoreInner) -> Vec<DepthCount> {
	let mut histogram: BTreeMap<i64, u64> = BTreeMap::new();
	for event in &inner.scrolls {
		*histogram.entry(event_depth(event)).or_insert(0) += 1;
	}
	histogram
		.into_iter()
		.map(|(depth, count)| DepthCount { depth, count })
		.collect()
}

/// Reads `data.depth`, defaulting to 0 when absent or non-numeric.
fn event_depth(event: &Event) -> i64 {
	match event.data.get("depth") {
		Some(value) => value
			.as_i64()
			.or_else(|| value.as_f64().map(|f| f as i64))
			.unwrap_or(0),
		None => 0,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use beacon_core::EventType;

	fn pageview(session: &str, user: &str, path: &str, ts: i64) -> Event {
		let mut e = Event::new(EventType::Pageview, ts);
		e.session_id = session.to_string();
		e.user_id = user.to_string();
		e.path = path.to_string();
		e
	}

	fn scroll(depth: i64, ts: i64) -> Event {
		let mut e = Event::new(EventType::Scroll, ts);
		e.session_id = "s1".to_string();
		e.user_id = "u1".to_string();
		e.data = beacon_core::EventData::new().insert("depth", depth).into_map();
		e
	}

	fn populated(events: Vec<Event>) -> StoreInner {
		let retention = RetentionConfig::default();
		let mut inner = StoreInner::default();
		for e in events {
			inner.record(e, &retention);
		}
		inner
	}

	#[test]
	fn test_empty_store_yields_zeroes_and_empty_lists() {
		let inner = StoreInner::default();
		let stats = compute(&inner, 1_000_000, &RetentionConfig::default());

		assert_eq!(stats.overview.total_events, 0);
		assert_eq!(stats.overview.total_sessions, 0);
		assert_eq!(stats.overview.total_users, 0);
		assert!(stats.recent_events.is_empty());
		assert!(stats.top_pages.is_empty());
		assert!(stats.scroll_depths.is_empty());
		assert!(stats.sessions.is_empty());
	}

	#[test]
	fn test_top_pages_ranking_and_session_counter() {
		let inner = populated(vec![
			pageview("s1", "u1", "/a", 1),
			pageview("s1", "u1", "/b", 2),
			pageview("s1", "u1", "/a", 3),
		]);
		let stats = compute(&inner, 10, &RetentionConfig::default());

		assert_eq!(stats.top_pages.len(), 2);
		assert_eq!(stats.top_pages[0].page, "/a");
		assert_eq!(stats.top_pages[0].count, 2);
		assert_eq!(stats.top_pages[1].page, "/b");
		assert_eq!(stats.top_pages[1].count, 1);
		assert_eq!(stats.sessions[0].page_views, 3);
	}

	#[test]
	fn test_top_pages_ties_keep_first_encounter_order() {
		let inner = populated(vec![
			pageview("s1", "u1", "/x", 1),
			pageview("s1", "u1", "/y", 2),
			pageview("s1", "u1", "/z", 3),
			pageview("s1", "u1", "/z", 4),
		]);
		let stats = compute(&inner, 10, &RetentionConfig::default());

		let pages: Vec<&str> = stats.top_pages.iter().map(|p| p.page.as_str()).collect();
		assert_eq!(pages, vec!["/z", "/x", "/y"]);
	}

	#[test]
	fn test_top_pages_truncates_to_limit() {
		let events = (0..15).map(|i| pageview("s1", "u1", &format!("/p{i}"), i)).collect();
		let inner = populated(events);
		let stats = compute(&inner, 100, &RetentionConfig::default());
		assert_eq!(stats.top_pages.len(), 10);
	}

	#[test]
	fn test_top_pages_falls_back_to_url_for_empty_path() {
		let mut event = pageview("s1", "u1", "", 1);
		event.url = "http://example.com/full".to_string();
		let inner = populated(vec![event]);
		let stats = compute(&inner, 10, &RetentionConfig::default());
		assert_eq!(stats.top_pages[0].page, "http://example.com/full");
	}

	#[test]
	fn test_scroll_depths_sorted_ascending() {
		let inner = populated(vec![scroll(50, 1), scroll(25, 2)]);
		let stats = compute(&inner, 10, &RetentionConfig::default());

		assert_eq!(
			stats.scroll_depths,
			vec![
				DepthCount { depth: 25, count: 1 },
				DepthCount { depth: 50, count: 1 },
			]
		);
	}

	#[test]
	fn test_scroll_depth_defaults_to_zero() {
		let mut event = Event::new(EventType::Scroll, 1);
		event.session_id = "s1".to_string();
		let inner = populated(vec![event]);
		let stats = compute(&inner, 10, &RetentionConfig::default());
		assert_eq!(stats.scroll_depths, vec![DepthCount { depth: 0, count: 1 }]);
	}

	#[test]
	fn test_windows_partition_by_timestamp_and_last_seen() {
		let now = 100 * DAY_MS;
		let inner = populated(vec![
			pageview("old", "u-old", "/a", now - 2 * DAY_MS),
			pageview("day", "u-day", "/b", now - 2 * HOUR_MS),
			pageview("hour", "u-hour", "/c", now - HOUR_MS / 2),
		]);
		let stats = compute(&inner, now, &RetentionConfig::default());

		assert_eq!(stats.overview.total_events, 3);
		assert_eq!(stats.last24h.events, 2);
		assert_eq!(stats.last24h.page_views, 2);
		assert_eq!(stats.last24h.sessions, 2);
		assert_eq!(stats.last24h.users, 2);
		assert_eq!(stats.last_hour.events, 1);
		assert_eq!(stats.last_hour.page_views, 1);
		assert_eq!(stats.last_hour.clicks, 0);
	}

	#[test]
	fn test_recent_events_newest_first_and_capped() {
		let retention = RetentionConfig {
			recent_events: 3,
			..RetentionConfig::default()
		};
		let inner = populated((0..5).map(|i| pageview("s1", "u1", "/a", i)).collect());
		let stats = compute(&inner, 100, &retention);

		let timestamps: Vec<i64> = stats.recent_events.iter().map(|e| e.timestamp).collect();
		assert_eq!(timestamps, vec![4, 3, 2]);
	}

	#[test]
	fn test_sessions_most_recently_created_first() {
		let retention = RetentionConfig {
			recent_sessions: 2,
			..RetentionConfig::default()
		};
		let inner = populated(vec![
			pageview("s1", "u1", "/a", 1),
			pageview("s2", "u1", "/a", 2),
			pageview("s3", "u1", "/a", 3),
			// Touch s1 again: creation order is what ranks, not
			// recency of activity.
			pageview("s1", "u1", "/b", 4),
		]);
		let stats = compute(&inner, 100, &retention);

		let ids: Vec<&str> = stats.sessions.iter().map(|s| s.session_id.as_str()).collect();
		assert_eq!(ids, vec!["s3", "s2"]);
	}

	#[test]
	fn test_compute_is_idempotent() {
		let inner = populated(vec![
			pageview("s1", "u1", "/a", 1),
			scroll(50, 2),
			pageview("s2", "u2", "/b", 3),
		]);
		let retention = RetentionConfig::default();
		let first = compute(&inner, 1_000, &retention);
		let second = compute(&inner, 1_000, &retention);
		assert_eq!(first, second);
	}

	#[test]
	fn test_stats_serialize_camel_case() {
		let inner = StoreInner::default();
		let stats = compute(&inner, 0, &RetentionConfig::default());
		let value = serde_json::to_value(&stats).unwrap();

		assert_eq!(value["overview"]["totalEvents"], 0);
		assert!(value["last24h"].is_object());
		assert!(value["lastHour"].is_object());
		assert!(value["recentEvents"].is_array());
		assert!(value["topPages"].is_array());
		assert!(value["scrollDepths"].is_array());
		assert!(value["sessions"].is_array());
	}
}
