// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event batching with size- and time-triggered flushing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beacon_core::Event;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{ClientError, Result};
use crate::transport::{SendMode, TransportSender};

/// Configuration for the event batch queue.
#[derive(Debug, Clone)]
pub struct BatchConfig {
	/// Number of queued events that triggers an immediate flush.
	pub max_batch_size: usize,
	/// How long a non-empty queue may wait before a timed flush.
	pub batch_window: Duration,
	/// Maximum number of events to queue before dropping oldest.
	pub max_queue_size: usize,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			max_batch_size: 10,
			batch_window: Duration::from_millis(5000),
			max_queue_size: 1000,
		}
	}
}

/// The outbound event queue.
///
/// Events accumulate until either the size threshold is reached or the
/// batch window expires, whichever comes first. At most one flush
/// timer is outstanding at any time: the timer slot is checked under
/// its lock before arming, and a size-triggered flush aborts the
/// pending timer so the same batch is never flushed twice.
#[derive(Clone)]
pub struct EventQueue {
	inner: Arc<QueueInner>,
}

struct QueueInner {
	config: BatchConfig,
	sender: Arc<dyn TransportSender>,
	queue: Mutex<Vec<Event>>,
	flush_timer: Mutex<Option<JoinHandle<()>>>,
	shutdown: AtomicBool,
}

impl EventQueue {
	/// Creates a new queue flushing through the given sender.
	pub fn new(config: BatchConfig, sender: Arc<dyn TransportSender>) -> Self {
		Self {
			inner: Arc::new(QueueInner {
				config,
				sender,
				queue: Mutex::new(Vec::new()),
				flush_timer: Mutex::new(None),
				shutdown: AtomicBool::new(false),
			}),
		}
	}

	/// Appends an event to the queue.
	///
	/// Flushes immediately once the size threshold is reached,
	/// cancelling any pending timer; otherwise arms the flush timer if
	/// none is pending.
	pub async fn enqueue(&self, event: Event) -> Result<()> {
		if self.inner.shutdown.load(Ordering::SeqCst) {
			return Err(ClientError::ClientShutdown);
		}

		let should_flush = {
			let mut queue = self.inner.queue.lock().await;

			// If the queue is at capacity, drop oldest events.
			while queue.len() >= self.inner.config.max_queue_size {
				let dropped = queue.remove(0);
				warn!(
					event_type = %dropped.event_type,
					"dropped event due to queue overflow"
				);
			}

			queue.push(event);
			queue.len() >= self.inner.config.max_batch_size
		};

		if should_flush {
			self.inner.cancel_timer().await;
			self.inner.flush(SendMode::Reliable).await
		} else {
			self.arm_timer().await;
			Ok(())
		}
	}

	/// Flushes all queued events through the reliable delivery mode.
	///
	/// No-op on an empty queue. The queue is emptied synchronously
	/// before handoff, so events arriving during transport belong to
	/// the next batch.
	pub async fn flush(&self) -> Result<()> {
		self.inner.flush(SendMode::Reliable).await
	}

	/// Page-exit flush: cancels any pending timer and hands the batch
	/// to the best-effort fire-and-forget delivery mode.
	pub async fn force_flush(&self) -> Result<()> {
		self.inner.cancel_timer().await;
		self.inner.flush(SendMode::FireAndForget).await
	}

	/// Returns the number of events currently queued.
	pub async fn queue_len(&self) -> usize {
		self.inner.queue.lock().await.len()
	}

	/// Returns true if a flush timer is currently pending.
	pub async fn has_pending_timer(&self) -> bool {
		self.inner.flush_timer.lock().await.is_some()
	}

	/// Rejects further enqueues and cancels any pending timer.
	pub async fn shutdown(&self) {
		self.inner.shutdown.store(true, Ordering::SeqCst);
		self.inner.cancel_timer().await;
	}

	/// Returns true if shutdown has been requested.
	pub fn is_shutdown(&self) -> bool {
		self.inner.shutdown.load(Ordering::SeqCst)
	}

	async fn arm_timer(&self) {
		let mut slot = self.inner.flush_timer.lock().await;
		if slot.is_some() {
			return;
		}
		let inner = Arc::clone(&self.inner);
		let window = self.inner.config.batch_window;
		*slot = Some(tokio::spawn(async move {
			tokio::time::sleep(window).await;
			// Clear the slot before flushing so a new timer can be
			// armed for events that arrive mid-flush.
			inner.flush_timer.lock().await.take();
			if let Err(e) = inner.flush(SendMode::Reliable).await {
				error!(error = %e, "timed flush failed");
			}
		}));
	}
}

impl QueueInner {
	async fn flush(&self, mode: SendMode) -> Result<()> {
		let batch = {
			let mut queue = self.queue.lock().await;
			std::mem::take(&mut *queue)
		};

		if batch.is_empty() {
			return Ok(());
		}

		debug!(count = batch.len(), ?mode, "flushing event batch");
		self.sender.send(batch, mode).await
	}

	async fn cancel_timer(&self) {
		if let Some(handle) = self.flush_timer.lock().await.take() {
			handle.abort();
		}
	}
}
