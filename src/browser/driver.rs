//! The browser driver subprocess and its command loop.
//!
//! `DriverPage` spawns the configured driver executable and speaks the
//! line protocol from [`protocol`](crate::browser::protocol) over its
//! stdio. A single loop task owns both pipe ends: it writes commands,
//! routes replies back to their callers over oneshot channels, and
//! answers the driver's `request` events with the gate's verdicts. The
//! driver holds every page request until its verdict line arrives, so if
//! this loop dies the page goes dark rather than open.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::browser::gate::{GateDecision, RequestGate};
use crate::browser::page::{ElementInfo, EngineError, Page};
use crate::browser::protocol::{
    DriverCommand, DriverEvent, DriverMessage, DriverReply, RequestVerdict,
};
use crate::config::{Viewport, WaitUntil};
use crate::session::Session;

/// Deadline for commands that should come back quickly.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Screenshots encode and write a file driver-side.
const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(30);

/// Headroom past a command's own deadline before giving up on its reply.
const REPLY_MARGIN: Duration = Duration::from_secs(5);

struct ControlMessage {
    command: DriverCommand,
    responder: oneshot::Sender<Result<Value, EngineError>>,
}

/// A page hosted by the driver subprocess.
pub struct DriverPage {
    command_tx: mpsc::Sender<ControlMessage>,
    loop_task: JoinHandle<()>,
    stderr_task: Option<JoinHandle<()>>,
    child: StdMutex<Option<Child>>,
    alive: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl DriverPage {
    /// Spawn the session's configured driver and wire the request gate in
    /// before anything can navigate.
    pub async fn launch(session: Arc<Session>) -> Result<Self, EngineError> {
        let argv = session.config().driver_command();
        let nav_timeout_ms = session.config().browser_timeout().as_millis() as u64;
        let display = argv.join(" ");
        let (program, args) = argv.split_first().ok_or_else(|| EngineError::Launch {
            command: display.clone(),
            cause: "empty driver command".to_string(),
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Launch {
                command: display.clone(),
                cause: e.to_string(),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| EngineError::Launch {
            command: display.clone(),
            cause: "driver stdin unavailable".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| EngineError::Launch {
            command: display,
            cause: "driver stdout unavailable".to_string(),
        })?;
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "pagewarden::driver", "{line}");
                }
            })
        });

        let gate = Arc::new(RequestGate::new(session));
        let alive = Arc::new(AtomicBool::new(true));
        let (command_tx, command_rx) = mpsc::channel(32);
        let loop_task = tokio::spawn(run_loop(
            gate,
            stdin,
            stdout,
            command_rx,
            nav_timeout_ms,
            alive.clone(),
        ));

        Ok(Self {
            command_tx,
            loop_task,
            stderr_task,
            child: StdMutex::new(Some(child)),
            alive,
            next_id: AtomicU64::new(1),
        })
    }

    async fn send(
        &self,
        cmd: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, EngineError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(EngineError::Driver("driver is not running".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(ControlMessage {
                command: DriverCommand::new(id, cmd, params),
                responder: tx,
            })
            .await
            .map_err(|_| EngineError::Driver("driver command channel closed".to_string()))?;

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(EngineError::Driver(
                "driver went away mid-command".to_string(),
            )),
            Err(_) => Err(EngineError::CommandTimeout {
                after_ms: deadline.as_millis() as u64,
            }),
        }
    }

    fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Ok(mut guard) = self.child.lock() {
            if let Some(child) = guard.as_mut() {
                let _ = child.start_kill();
            }
        }
    }
}

#[async_trait]
impl Page for DriverPage {
    async fn set_viewport(&self, viewport: Viewport) -> Result<(), EngineError> {
        self.send(
            "set_viewport",
            json!({
                "width": viewport.width,
                "height": viewport.height,
                "scale": viewport.scale,
            }),
            COMMAND_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    async fn navigate(
        &self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        self.send(
            "navigate",
            json!({
                "url": url,
                "wait": wait.as_str(),
                "timeout_ms": timeout.as_millis() as u64,
            }),
            timeout + REPLY_MARGIN,
        )
        .await
        .map(|_| ())
    }

    async fn current_url(&self) -> Result<String, EngineError> {
        let data = self.send("current_url", Value::Null, COMMAND_TIMEOUT).await?;
        data.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EngineError::Protocol("current_url reply missing url".to_string()))
    }

    async fn title(&self) -> Result<String, EngineError> {
        let data = self.send("title", Value::Null, COMMAND_TIMEOUT).await?;
        data.get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EngineError::Protocol("title reply missing title".to_string()))
    }

    async fn eval(&self, js: &str) -> Result<Value, EngineError> {
        let data = self
            .send("eval", json!({ "js": js }), COMMAND_TIMEOUT)
            .await?;
        Ok(data.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementInfo>, EngineError> {
        let data = self
            .send("query", json!({ "selector": selector }), COMMAND_TIMEOUT)
            .await?;
        serde_json::from_value(data.get("element").cloned().unwrap_or(Value::Null))
            .map_err(|e| EngineError::Protocol(format!("bad query reply: {e}")))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementInfo>, EngineError> {
        let data = self
            .send("query_all", json!({ "selector": selector }), COMMAND_TIMEOUT)
            .await?;
        serde_json::from_value(data.get("elements").cloned().unwrap_or_default())
            .map_err(|e| EngineError::Protocol(format!("bad query_all reply: {e}")))
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), EngineError> {
        self.send(
            "screenshot",
            json!({
                "path": path.to_string_lossy(),
                "full_page": full_page,
            }),
            SCREENSHOT_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    async fn settle(&self, duration: Duration) -> Result<(), EngineError> {
        self.send(
            "wait",
            json!({ "ms": duration.as_millis() as u64 }),
            duration + REPLY_MARGIN,
        )
        .await
        .map(|_| ())
    }

    async fn close(&self) -> Result<(), EngineError> {
        if self.alive.load(Ordering::SeqCst) {
            // Give the driver a chance to shut the browser down cleanly.
            let _ = self
                .send("close", Value::Null, Duration::from_secs(2))
                .await;
        }
        self.kill();
        Ok(())
    }
}

impl Drop for DriverPage {
    fn drop(&mut self) {
        self.kill();
        self.loop_task.abort();
        if let Some(task) = &self.stderr_task {
            task.abort();
        }
    }
}

/// What one driver line asks of the loop.
enum Dispatch {
    /// Settle the in-flight command with this result.
    Reply {
        id: u64,
        result: Result<Value, EngineError>,
    },
    /// Write this verdict back to the driver.
    Verdict(RequestVerdict),
    /// The driver is going away.
    Closed { reason: Option<String> },
    /// Line was noise; note it and move on.
    Skip,
}

async fn run_loop(
    gate: Arc<RequestGate>,
    mut stdin: ChildStdin,
    stdout: ChildStdout,
    mut command_rx: mpsc::Receiver<ControlMessage>,
    nav_timeout_ms: u64,
    alive: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(stdout).lines();
    let mut inflight: HashMap<u64, oneshot::Sender<Result<Value, EngineError>>> = HashMap::new();

    loop {
        tokio::select! {
            command = command_rx.recv() => {
                let Some(ControlMessage { command, responder }) = command else {
                    // DriverPage dropped; nothing more will be asked.
                    break;
                };
                let mut line = match serde_json::to_string(&command) {
                    Ok(line) => line,
                    Err(e) => {
                        let _ = responder.send(Err(EngineError::Protocol(format!(
                            "command did not encode: {e}"
                        ))));
                        continue;
                    }
                };
                trace!(line = %line, "driver command");
                line.push('\n');
                if let Err(e) = stdin.write_all(line.as_bytes()).await {
                    let _ = responder.send(Err(EngineError::Driver(format!(
                        "driver stdin closed: {e}"
                    ))));
                    break;
                }
                inflight.insert(command.id, responder);
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) => {
                        trace!(line = %text, "driver line");
                        match dispatch_line(&gate, &text, nav_timeout_ms).await {
                            Dispatch::Reply { id, result } => match inflight.remove(&id) {
                                Some(responder) => {
                                    let _ = responder.send(result);
                                }
                                None => warn!(id, "driver reply for unknown command id"),
                            },
                            Dispatch::Verdict(verdict) => {
                                debug!(
                                    request_id = %verdict.request_id,
                                    allow = verdict.allow,
                                    "request verdict"
                                );
                                let mut line = match serde_json::to_string(&verdict) {
                                    Ok(line) => line,
                                    Err(_) => break,
                                };
                                line.push('\n');
                                // If the verdict cannot be delivered the driver
                                // keeps holding the request, which fails closed.
                                if stdin.write_all(line.as_bytes()).await.is_err() {
                                    break;
                                }
                            }
                            Dispatch::Closed { reason } => {
                                info!(
                                    reason = reason.as_deref().unwrap_or("none"),
                                    "driver closed"
                                );
                                break;
                            }
                            Dispatch::Skip => {}
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(%e, "driver stdout read failed");
                        break;
                    }
                }
            }
        }
    }

    alive.store(false, Ordering::SeqCst);
    for (_, responder) in inflight.drain() {
        let _ = responder.send(Err(EngineError::Driver("driver closed".to_string())));
    }
}

/// Decode one driver line and decide what to do with it. Request events
/// consult the gate here, so a blocked host turns into a block verdict
/// before the line loop moves on.
async fn dispatch_line(gate: &RequestGate, line: &str, nav_timeout_ms: u64) -> Dispatch {
    let message: DriverMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            warn!(%e, line, "undecodable driver line");
            return Dispatch::Skip;
        }
    };

    match message {
        DriverMessage::Reply(reply) => Dispatch::Reply {
            id: reply.id,
            result: reply_result(reply, nav_timeout_ms),
        },
        DriverMessage::Event(DriverEvent::Request { request_id, url }) => {
            let verdict = match gate.on_request(&url).await {
                GateDecision::Allow => RequestVerdict::allow(request_id),
                GateDecision::Block(reason) => RequestVerdict::block(request_id, reason.to_string()),
            };
            Dispatch::Verdict(verdict)
        }
        DriverMessage::Event(DriverEvent::Closed { reason }) => Dispatch::Closed { reason },
    }
}

fn reply_result(reply: DriverReply, nav_timeout_ms: u64) -> Result<Value, EngineError> {
    if reply.ok {
        return Ok(reply.data.unwrap_or(Value::Null));
    }
    let detail = reply
        .error
        .unwrap_or_else(|| "driver reported failure without detail".to_string());
    match reply.code.as_deref() {
        Some("timeout") => Err(EngineError::NavigationTimeout {
            after_ms: nav_timeout_ms,
        }),
        _ => Err(EngineError::Driver(detail)),
    }
}
