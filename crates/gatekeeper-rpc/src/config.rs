use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Frozen template a bridge session clones into a fresh `Client`. Kept by
/// value so sessions never reach back into shared server configuration
/// (spec §9, "cyclic / back-reference shapes").
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub startup_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub call_timeout: Duration,
    pub max_message_bytes: usize,
    pub client_info: ClientInfo,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            command: String::new(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            startup_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
            max_message_bytes: 10 * 1024 * 1024,
            client_info: ClientInfo {
                name: "gatekeeper".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}
