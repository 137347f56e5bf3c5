//! JSON-RPC client over a child process's stdio (spec §4.5), grounded on
//! `turbomcp_transport::child_process::ChildProcessTransport`'s spawn and
//! background-task shape, extended with a raw-ID-byte pending table and
//! bidirectional request dispatch the teacher's sequential version lacks.

use crate::config::{ClientConfig, ClientInfo};
use crate::error::RpcError;
use crate::pending::{PendingOutcome, PendingTable};
use gatekeeper_protocol::jsonrpc::{
    InboundMessage, JsonRpcError, JsonRpcErrorCode, JsonRpcNotification, JsonRpcRequest,
    RequestId,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A JSON-RPC client multiplexed over one child process's stdin/stdout,
/// with stderr forwarded line-by-line to the diagnostic log.
pub struct Client {
    config: ClientConfig,
    child: Arc<TokioMutex<Option<Child>>>,
    stdin_tx: Arc<TokioMutex<Option<mpsc::Sender<String>>>>,
    pending: Arc<PendingTable>,
    request_id: AtomicI64,
    initialized: AtomicBool,
    closed: AtomicBool,
    cancellation: CancellationToken,
    reader_task: TokioMutex<Option<JoinHandle<()>>>,
    stderr_task: TokioMutex<Option<JoinHandle<()>>>,
    writer_task: TokioMutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Spawns the child and starts its stdin-writer, stdout-reader, and
    /// stderr-forwarder tasks. On spawn failure no pipes are leaked since
    /// nothing has been created yet.
    pub async fn start(config: ClientConfig) -> Result<Arc<Client>, RpcError> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .envs(&config.env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(RpcError::Spawn)?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(64);
        let writer_task = tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(line) = stdin_rx.recv().await {
                if let Err(e) = stdin.write_all(line.as_bytes()).await {
                    warn!(error = %e, "failed writing to child stdin");
                    break;
                }
                if let Err(e) = stdin.write_all(b"\n").await {
                    warn!(error = %e, "failed writing newline to child stdin");
                    break;
                }
                if let Err(e) = stdin.flush().await {
                    warn!(error = %e, "failed flushing child stdin");
                    break;
                }
            }
        });

        let client = Arc::new(Client {
            config: config.clone(),
            child: Arc::new(TokioMutex::new(Some(child))),
            stdin_tx: Arc::new(TokioMutex::new(Some(stdin_tx.clone()))),
            pending: Arc::new(PendingTable::default()),
            request_id: AtomicI64::new(1),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            cancellation: CancellationToken::new(),
            reader_task: TokioMutex::new(None),
            stderr_task: TokioMutex::new(None),
            writer_task: TokioMutex::new(Some(writer_task)),
        });

        let reader_task = tokio::spawn(spawn_stdout_reader(
            Arc::clone(&client),
            stdout,
            stdin_tx.clone(),
            config.max_message_bytes,
        ));
        let stderr_task = tokio::spawn(spawn_stderr_reader(stderr));

        *client.reader_task.lock().await = Some(reader_task);
        *client.stderr_task.lock().await = Some(stderr_task);

        Ok(client)
    }

    /// Sends `initialize`, and on success marks the client initialized and
    /// fires `notifications/initialized`. Returns the raw `initialize`
    /// result.
    pub async fn initialize(&self, protocol_version: &str) -> Result<Value, RpcError> {
        let params = serde_json::json!({
            "protocolVersion": protocol_version,
            "capabilities": { "roots": { "listChanged": false } },
            "clientInfo": client_info_json(&self.config.client_info),
        });
        let result = self.call("initialize", Some(params)).await?;
        self.initialized.store(true, Ordering::SeqCst);
        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sends a request and awaits its reply, keyed on the raw JSON bytes
    /// of its freshly allocated numeric ID. Completion is the earliest of:
    /// reply delivered, cancellation, per-call timeout, or client closed.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        if self.is_closed() {
            return Err(RpcError::ClientClosed);
        }
        let id = RequestId::Number(self.request_id.fetch_add(1, Ordering::SeqCst));
        let raw_id = serde_json::to_vec(&id).expect("RequestId always serializes");

        let (tx, rx) = oneshot::channel();
        self.pending.insert(raw_id.clone(), tx);

        let request = JsonRpcRequest::new(id, method, params);
        let line = serde_json::to_string(&request)?;
        if let Err(e) = self.write_line(line).await {
            self.pending.remove(&raw_id);
            return Err(e);
        }

        tokio::select! {
            biased;
            outcome = rx => match outcome {
                Ok(PendingOutcome::Reply(value)) => Ok(value),
                Ok(PendingOutcome::Error(err)) => Err(RpcError::Remote(err)),
                Err(_) => Err(RpcError::ClientClosed),
            },
            _ = tokio::time::sleep(self.config.call_timeout) => {
                self.pending.remove(&raw_id);
                Err(RpcError::Timeout)
            }
            _ = self.cancellation.cancelled() => {
                self.pending.remove(&raw_id);
                Err(RpcError::Cancelled)
            }
        }
    }

    /// Sends a request with no ID; there is no reply to correlate.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), RpcError> {
        let notification = JsonRpcNotification::new(method, params);
        let line = serde_json::to_string(&notification)?;
        self.write_line(line).await
    }

    /// Forwards a raw JSON-RPC message (as received over HTTP) to the
    /// child: notifications (absent or `null` id) fire-and-forget via
    /// `notify`, everything else round-trips through `call`.
    pub async fn forward(&self, raw: &[u8]) -> Result<Option<Value>, RpcError> {
        let probe: ForwardProbe = serde_json::from_slice(raw)
            .map_err(|e| RpcError::InvalidMessage(e.to_string()))?;
        let method = probe
            .method
            .ok_or_else(|| RpcError::InvalidMessage("missing method".to_string()))?;

        let has_real_id = !matches!(probe.id, None | Some(Value::Null));
        if !has_real_id {
            self.notify(&method, probe.params).await?;
            Ok(None)
        } else {
            let result = self.call(&method, probe.params).await?;
            Ok(Some(result))
        }
    }

    /// Idempotent shutdown: close stdin, wait up to `shutdown_timeout` for
    /// exit, SIGKILL on timeout, and release every pending reply channel
    /// (each in-flight `call` then observes `ClientClosed`).
    pub async fn close(&self) -> Result<(), RpcError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.cancellation.cancel();
        *self.stdin_tx.lock().await = None;
        drop(self.pending.drain());

        if let Some(handle) = self.writer_task.lock().await.take() {
            let _ = handle.await;
        }

        let mut child_guard = self.child.lock().await;
        if let Some(mut child) = child_guard.take() {
            match tokio::time::timeout(self.config.shutdown_timeout, child.wait()).await {
                Ok(Ok(_status)) => {}
                Ok(Err(e)) => warn!(error = %e, "error waiting for child exit"),
                Err(_elapsed) => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
            }
        }
        drop(child_guard);

        if let Some(handle) = self.reader_task.lock().await.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.stderr_task.lock().await.take() {
            let _ = handle.await;
        }
        Ok(())
    }

    async fn write_line(&self, line: String) -> Result<(), RpcError> {
        let guard = self.stdin_tx.lock().await;
        match guard.as_ref() {
            Some(tx) => tx
                .send(line)
                .await
                .map_err(|_| RpcError::ClientClosed),
            None => Err(RpcError::ClientClosed),
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancellation.cancel();
        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(child) = guard.as_mut() {
                let _ = child.start_kill();
            }
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ForwardProbe {
    method: Option<String>,
    params: Option<Value>,
    id: Option<Value>,
}

fn client_info_json(info: &ClientInfo) -> Value {
    serde_json::json!({ "name": info.name, "version": info.version })
}

/// The stdout reader task: classifies every inbound line as an
/// upstream-initiated request/notification or a response, and routes
/// accordingly. Never unwinds - a malformed line is logged and skipped.
async fn spawn_stdout_reader(
    client: Arc<Client>,
    stdout: tokio::process::ChildStdout,
    stdin_tx: mpsc::Sender<String>,
    max_message_bytes: usize,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "error reading child stdout");
                break;
            }
        };
        if line.len() > max_message_bytes {
            warn!(len = line.len(), "dropping oversized message from child");
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        handle_inbound_line(&client, &line, &stdin_tx).await;
    }
}

async fn handle_inbound_line(client: &Arc<Client>, line: &str, stdin_tx: &mpsc::Sender<String>) {
    let message: InboundMessage = match serde_json::from_str(line) {
        Ok(m) => m,
        Err(e) => {
            debug!(error = %e, "unparsable line from child, skipping");
            return;
        }
    };

    if message.is_request_or_notification() {
        let method = message.method.clone().expect("checked above");
        if let Some(id_value) = &message.id {
            // Child-initiated request: must be answered on the same stream.
            let response = build_bidirectional_reply(&method, id_value);
            if let Ok(line) = serde_json::to_string(&response) {
                let _ = stdin_tx.send(line).await;
            }
        } else {
            debug!(method = %method, "notification from child, ignoring");
        }
        return;
    }

    if message.is_response() {
        route_response(client, line, message);
    }
}

/// Handles server->client requests the child initiates: `roots/list`
/// always succeeds with an empty list (the gateway exposes no filesystem
/// roots), `sampling/createMessage` is explicitly unsupported, anything
/// else is a plain method-not-found.
fn build_bidirectional_reply(method: &str, id: &Value) -> Value {
    match method {
        "roots/list" => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "roots": [] },
        }),
        "sampling/createMessage" => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": JsonRpcErrorCode::MethodNotFound.code(), "message": "not supported" },
        }),
        other => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {
                "code": JsonRpcErrorCode::MethodNotFound.code(),
                "message": format!("Method not found: {other}"),
            },
        }),
    }
}

fn route_response(client: &Arc<Client>, raw_line: &str, message: InboundMessage) {
    let Some(id_value) = message.id.as_ref() else {
        debug!("response from child with no id, dropping");
        return;
    };
    let Some(raw_id) = extract_raw_id_bytes(raw_line) else {
        debug!("could not extract raw id bytes, dropping response");
        return;
    };
    let Some(sender) = client.pending.remove(&raw_id) else {
        // Already timed out, cancelled, or delivered - silently dropped.
        debug!(id = %id_value, "no pending entry for response id");
        return;
    };
    let outcome = match message.error {
        Some(err) => PendingOutcome::Error(err),
        None => PendingOutcome::Reply(message.result.unwrap_or(Value::Null)),
    };
    let _ = sender.send(outcome);
}

/// Re-parses `raw_line` to recover the exact byte span of the `"id"`
/// field, so `1`, `"1"`, and `1.0` key the pending table distinctly
/// instead of collapsing through a normalized `RequestId`.
fn extract_raw_id_bytes(raw_line: &str) -> Option<Vec<u8>> {
    #[derive(serde::Deserialize)]
    struct RawIdProbe<'a> {
        #[serde(borrow, default)]
        id: Option<&'a serde_json::value::RawValue>,
    }
    let probe: RawIdProbe = serde_json::from_str(raw_line).ok()?;
    probe.id.map(|raw| raw.get().as_bytes().to_vec())
}

async fn spawn_stderr_reader(stderr: tokio::process::ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!("[upstream] {line}"),
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "error reading child stderr");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn echo_server_config() -> ClientConfig {
        // Reads one JSON-RPC request per line, extracts its trailing
        // numeric id, and replies with {"ok": true}. Good enough to drive
        // the call()/reply path without depending on any scripting runtime
        // beyond a POSIX shell.
        ClientConfig {
            command: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"while IFS= read -r line; do id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\)}.*/\1/p'); printf '{"jsonrpc":"2.0","id":%s,"result":{"ok":true}}\n' "$id"; done"#
                    .to_string(),
            ],
            call_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        }
    }

    fn never_replies_config() -> ClientConfig {
        ClientConfig {
            command: "cat".to_string(),
            args: vec![],
            call_timeout: Duration::from_millis(200),
            shutdown_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn call_round_trips_through_raw_id_bytes() {
        let Ok(client) = Client::start(echo_server_config()).await else {
            eprintln!("skipping: sh not spawnable in this environment");
            return;
        };
        let result = client.call("ping", None).await.unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn notify_does_not_wait_for_a_reply() {
        let Ok(client) = Client::start(ClientConfig {
            command: "cat".to_string(),
            ..ClientConfig::default()
        })
        .await
        else {
            eprintln!("skipping: cat not spawnable in this environment");
            return;
        };
        client.notify("notifications/initialized", None).await.unwrap();
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let Ok(client) = Client::start(ClientConfig {
            command: "cat".to_string(),
            ..ClientConfig::default()
        })
        .await
        else {
            eprintln!("skipping: cat not spawnable in this environment");
            return;
        };
        client.close().await.unwrap();
        client.close().await.unwrap();
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn call_times_out_when_child_never_replies() {
        let Ok(client) = Client::start(never_replies_config()).await else {
            eprintln!("skipping: cat not spawnable in this environment");
            return;
        };
        let result = client.call("ping", None).await;
        assert!(matches!(result, Err(RpcError::Timeout)));
        assert_eq!(client.pending.len(), 0, "pending entry must be removed on timeout");
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn pending_calls_observe_client_closed_on_close() {
        let Ok(client) = Client::start(never_replies_config()).await else {
            eprintln!("skipping: cat not spawnable in this environment");
            return;
        };
        let client_for_call = Arc::clone(&client);
        let call_handle = tokio::spawn(async move { client_for_call.call("ping", None).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.close().await.unwrap();
        let result = call_handle.await.unwrap();
        assert!(matches!(result, Err(RpcError::ClientClosed) | Err(RpcError::Timeout)));
    }

    #[test]
    fn bidirectional_roots_list_replies_with_empty_list() {
        let reply = build_bidirectional_reply("roots/list", &Value::from(1));
        assert_eq!(reply["result"]["roots"], serde_json::json!([]));
    }

    #[test]
    fn bidirectional_sampling_create_message_is_unsupported() {
        let reply = build_bidirectional_reply("sampling/createMessage", &Value::from(1));
        assert_eq!(reply["error"]["message"], "not supported");
    }

    #[test]
    fn bidirectional_unknown_method_is_method_not_found() {
        let reply = build_bidirectional_reply("totally/unknown", &Value::from(1));
        assert_eq!(
            reply["error"]["code"],
            serde_json::json!(JsonRpcErrorCode::MethodNotFound.code())
        );
    }

    #[test]
    fn raw_id_bytes_distinguish_numeric_and_string_forms() {
        let numeric = extract_raw_id_bytes(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#).unwrap();
        let stringy = extract_raw_id_bytes(r#"{"jsonrpc":"2.0","id":"1","result":{}}"#).unwrap();
        assert_ne!(numeric, stringy);
        assert_eq!(numeric, b"1".to_vec());
        assert_eq!(stringy, b"\"1\"".to_vec());
    }
}
