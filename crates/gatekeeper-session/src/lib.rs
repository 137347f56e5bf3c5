//! Bridge session manager (spec §3 Bridge session, §4.9): per-caller
//! sessions each owning an upstream `Client` and SSE fan-out, with TTL
//! reaping.

pub mod error;
pub mod id;
pub mod manager;
pub mod session;
pub mod sse;

pub use error::SessionError;
pub use id::SessionId;
pub use manager::{SessionManager, SessionManagerConfig};
pub use session::Session;
pub use sse::SseEvent;
