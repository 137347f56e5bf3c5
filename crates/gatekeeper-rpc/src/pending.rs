//! The pending-RPC table: raw JSON-RPC id bytes -> a one-shot reply
//! channel. Keying on the raw bytes (rather than a normalized `RequestId`)
//! is what keeps `1`, `"1"`, and `1.0` from colliding (spec §9).

use gatekeeper_protocol::jsonrpc::JsonRpcError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum PendingOutcome {
    Reply(Value),
    Error(JsonRpcError),
}

pub type PendingSender = oneshot::Sender<PendingOutcome>;

/// Short-lived-lock, non-await-crossing map guarded by `std::sync::Mutex`:
/// every critical section is an insert or a remove, never spanning an
/// `.await`.
#[derive(Default)]
pub struct PendingTable {
    inner: Mutex<HashMap<Vec<u8>, PendingSender>>,
}

impl PendingTable {
    pub fn insert(&self, raw_id: Vec<u8>, sender: PendingSender) {
        self.inner.lock().unwrap().insert(raw_id, sender);
    }

    /// Removes and returns the sender for `raw_id`, if still pending. A
    /// reply with no matching entry (already timed out, cancelled, or
    /// delivered) is silently dropped by the caller.
    pub fn remove(&self, raw_id: &[u8]) -> Option<PendingSender> {
        self.inner.lock().unwrap().remove(raw_id)
    }

    /// Drains every pending sender, e.g. on client close; dropping each
    /// sender causes its `call()`'s `oneshot::Receiver` to resolve to an
    /// error, which the caller maps to `RpcError::ClientClosed`.
    pub fn drain(&self) -> Vec<PendingSender> {
        self.inner.lock().unwrap().drain().map(|(_, v)| v).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
