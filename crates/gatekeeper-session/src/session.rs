//! A single bridge session: one upstream `Client`, its SSE fan-out, and
//! idle-tracking for the TTL reaper (spec §3 Bridge session, §4.9).

use crate::id::SessionId;
use crate::sse::SseEvent;
use gatekeeper_rpc::Client;
use parking_lot::Mutex as SyncMutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

const REPLAY_BUFFER_CAPACITY: usize = 256;

pub struct Session {
    pub id: SessionId,
    pub client: Arc<Client>,
    created_at: Instant,
    last_activity: SyncMutex<Instant>,
    closed: AtomicBool,
    next_event_id: AtomicU64,
    event_tx: broadcast::Sender<SseEvent>,
    replay_buffer: SyncMutex<VecDeque<SseEvent>>,
}

impl Session {
    pub(crate) fn new(id: SessionId, client: Arc<Client>) -> Arc<Session> {
        let (event_tx, _rx) = broadcast::channel(128);
        let now = Instant::now();
        Arc::new(Session {
            id,
            client,
            created_at: now,
            last_activity: SyncMutex::new(now),
            closed: AtomicBool::new(false),
            next_event_id: AtomicU64::new(1),
            event_tx,
            replay_buffer: SyncMutex::new(VecDeque::with_capacity(REPLAY_BUFFER_CAPACITY)),
        })
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        Instant::now().duration_since(*self.last_activity.lock()) > ttl
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SseEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcasts `data` to every open SSE channel and records it in the
    /// replay buffer for `replay_from`. Errors (no subscribers) are not
    /// failures - a session can exist with no open GET stream.
    pub fn broadcast(&self, data: String) {
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        let event = SseEvent::message(data).with_id(id);
        {
            let mut buffer = self.replay_buffer.lock();
            if buffer.len() == REPLAY_BUFFER_CAPACITY {
                buffer.pop_front();
            }
            buffer.push_back(event.clone());
        }
        let _ = self.event_tx.send(event);
    }

    /// Returns buffered events with id strictly greater than `last_event_id`,
    /// for resuming an SSE stream via the `Last-Event-ID` header.
    pub fn replay_from(&self, last_event_id: u64) -> Vec<SseEvent> {
        self.replay_buffer
            .lock()
            .iter()
            .filter(|e| e.id.is_some_and(|id| id > last_event_id))
            .cloned()
            .collect()
    }

    /// Idempotent: terminates the owned client. Safe to call more than
    /// once (e.g. from both an explicit DELETE and the reaper racing).
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.client.close().await;
    }
}
