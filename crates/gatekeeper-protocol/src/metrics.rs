//! In-process counters for the tool-execution path (spec §0 ambient
//! stack). No exporter lives here - just atomics a handler bumps and a
//! caller reads back, the same altitude as `turbomcp_transport_traits`'s
//! `AtomicMetrics`.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct GatewayMetrics {
    tools_called_total: AtomicU64,
    policy_denied_total: AtomicU64,
    sandbox_timeouts_total: AtomicU64,
}

impl GatewayMetrics {
    pub fn record_tool_call(&self) {
        self.tools_called_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_policy_denied(&self) {
        self.policy_denied_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sandbox_timeout(&self) {
        self.sandbox_timeouts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tools_called_total(&self) -> u64 {
        self.tools_called_total.load(Ordering::Relaxed)
    }

    pub fn policy_denied_total(&self) -> u64 {
        self.policy_denied_total.load(Ordering::Relaxed)
    }

    pub fn sandbox_timeouts_total(&self) -> u64 {
        self.sandbox_timeouts_total.load(Ordering::Relaxed)
    }
}
