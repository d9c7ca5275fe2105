//! Chrome DevTools Protocol backend for [`Renderer`].
//!
//! A single WebSocket connection to the browser is shared by every capture
//! task. Requests are matched to responses by id; events are routed to the
//! page that owns their session id. Each [`CdpPage`] lives in its own browser
//! context, so cookies and storage never leak between captures.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use gallery_logging::{gallery_debug, gallery_info, gallery_trace, gallery_warn};
use serde::Deserialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::renderer::{RenderContext, Renderer, Viewport};
use crate::types::{CaptureError, FailureKind};

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
const DEVTOOLS_BANNER: &str = "DevTools listening on ";
const MAX_DIAGNOSTICS: usize = 200;

type Reply = Result<Value, CaptureError>;

#[derive(Debug, Clone)]
struct CdpEvent {
    method: String,
    params: Value,
}

struct Connection {
    outgoing: mpsc::UnboundedSender<Message>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    sessions: Mutex<HashMap<String, mpsc::UnboundedSender<CdpEvent>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn connection_closed() -> CaptureError {
    CaptureError::new(FailureKind::Connection, "devtools connection closed")
}

impl Connection {
    async fn open(ws_url: &str) -> Result<Arc<Self>, CaptureError> {
        let (socket, _) = connect_async(ws_url)
            .await
            .map_err(|err| CaptureError::new(FailureKind::Connection, err.to_string()))?;
        let (mut write, mut read) = socket.split();
        let (outgoing, mut queue) = mpsc::unbounded_channel::<Message>();

        let connection = Arc::new(Self {
            outgoing,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
        });

        // Writer ends once every sender is gone, i.e. when the connection drops.
        tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                if write.send(message).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let weak: Weak<Self> = Arc::downgrade(&connection);
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                let Some(connection) = weak.upgrade() else {
                    break;
                };
                connection.dispatch(text.as_str());
            }
            if let Some(connection) = weak.upgrade() {
                connection.shutdown();
            }
        });

        Ok(connection)
    }

    fn dispatch(&self, text: &str) {
        let message: Value = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(err) => {
                gallery_debug!("Ignoring malformed devtools frame: {}", err);
                return;
            }
        };

        if let Some(id) = message.get("id").and_then(Value::as_u64) {
            let waiter = lock(&self.pending).remove(&id);
            if let Some(waiter) = waiter {
                let _ = waiter.send(reply_from(&message));
            }
            return;
        }

        let method = message.get("method").and_then(Value::as_str);
        let session = message.get("sessionId").and_then(Value::as_str);
        if let (Some(method), Some(session)) = (method, session) {
            if let Some(events) = lock(&self.sessions).get(session) {
                let _ = events.send(CdpEvent {
                    method: method.to_string(),
                    params: message.get("params").cloned().unwrap_or(Value::Null),
                });
            }
        }
    }

    fn shutdown(&self) {
        for (_, waiter) in lock(&self.pending).drain() {
            let _ = waiter.send(Err(connection_closed()));
        }
        lock(&self.sessions).clear();
    }

    fn send(
        &self,
        id: u64,
        method: &str,
        params: Value,
        session: Option<&str>,
    ) -> Result<(), CaptureError> {
        let mut frame = json!({ "id": id, "method": method, "params": params });
        if let Some(session) = session {
            frame["sessionId"] = Value::String(session.to_string());
        }
        self.outgoing
            .send(Message::Text(frame.to_string().into()))
            .map_err(|_| connection_closed())
    }

    async fn call(&self, method: &str, params: Value, session: Option<&str>) -> Reply {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);
        // Also covers a caller that stops polling before the reply arrives.
        let _waiting = PendingReply {
            pending: &self.pending,
            id,
        };
        self.send(id, method, params, session)?;
        rx.await.map_err(|_| connection_closed())?
    }

    /// Sends a command without waiting for its reply.
    fn notify(&self, method: &str, params: Value) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _ = self.send(id, method, params, None);
    }
}

/// Unregisters a request's reply slot when the request finishes or is dropped.
struct PendingReply<'a> {
    pending: &'a Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    id: u64,
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.id);
    }
}

fn reply_from(message: &Value) -> Reply {
    match message.get("error") {
        Some(error) => Err(CaptureError::new(
            FailureKind::Protocol,
            error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown protocol error"),
        )),
        None => Ok(message.get("result").cloned().unwrap_or(Value::Null)),
    }
}

fn string_field(value: &Value, field: &str) -> Result<String, CaptureError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| CaptureError::new(FailureKind::Protocol, format!("reply lacks {field}")))
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
}

/// A browser reachable over the DevTools protocol.
pub struct CdpBrowser {
    connection: Arc<Connection>,
    viewport: Viewport,
    _process: Option<Child>,
    _profile: Option<TempDir>,
}

impl CdpBrowser {
    /// Connects to a browser-level DevTools WebSocket URL.
    pub async fn connect(ws_url: &str, viewport: Viewport) -> Result<Self, CaptureError> {
        let connection = Connection::open(ws_url).await?;
        gallery_info!("Connected to browser at {}", ws_url);
        Ok(Self {
            connection,
            viewport,
            _process: None,
            _profile: None,
        })
    }

    /// Looks up the WebSocket URL through a running browser's
    /// `/json/version` endpoint, e.g. `http://localhost:9222`.
    pub async fn discover(debug_url: &str, viewport: Viewport) -> Result<Self, CaptureError> {
        let endpoint = format!("{}/json/version", debug_url.trim_end_matches('/'));
        let info: VersionInfo = reqwest::get(&endpoint)
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CaptureError::new(FailureKind::Connection, err.to_string()))?
            .json()
            .await
            .map_err(|err| CaptureError::new(FailureKind::Protocol, err.to_string()))?;
        Self::connect(&info.web_socket_debugger_url, viewport).await
    }

    /// Starts a headless browser with a throwaway profile. The process is
    /// killed when the returned value is dropped.
    pub async fn launch(binary: &str, viewport: Viewport) -> Result<Self, CaptureError> {
        let launch_error = |message: String| CaptureError::new(FailureKind::Launch, message);
        let profile = TempDir::new().map_err(|err| launch_error(err.to_string()))?;
        let mut child = Command::new(binary)
            .arg("--headless=new")
            .arg("--remote-debugging-port=0")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg("--mute-audio")
            .arg(format!("--user-data-dir={}", profile.path().display()))
            .arg("about:blank")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| launch_error(format!("{binary}: {err}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| launch_error("browser stderr unavailable".to_string()))?;
        let mut lines = BufReader::new(stderr).lines();

        let announced = tokio::time::timeout(LAUNCH_TIMEOUT, async {
            while let Some(line) = lines.next_line().await? {
                if let Some(url) = line.trim().strip_prefix(DEVTOOLS_BANNER) {
                    return Ok(Some(url.to_string()));
                }
                gallery_trace!("browser: {}", line);
            }
            Ok::<_, std::io::Error>(None)
        })
        .await;
        let ws_url = match announced {
            Ok(Ok(Some(url))) => url,
            Ok(Ok(None)) => {
                return Err(launch_error(
                    "browser exited before announcing its DevTools endpoint".to_string(),
                ))
            }
            Ok(Err(err)) => return Err(launch_error(err.to_string())),
            Err(_) => {
                return Err(CaptureError::new(
                    FailureKind::Timeout,
                    "browser did not start in time",
                ))
            }
        };

        // Keep draining stderr so the browser never blocks on a full pipe.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                gallery_trace!("browser: {}", line);
            }
        });

        let connection = Connection::open(&ws_url).await?;
        gallery_info!("Launched {} (devtools at {})", binary, ws_url);
        Ok(Self {
            connection,
            viewport,
            _process: Some(child),
            _profile: Some(profile),
        })
    }

    /// Asks the browser to exit.
    pub async fn close(&self) {
        let closing = self.connection.call("Browser.close", json!({}), None);
        if let Ok(Err(err)) = tokio::time::timeout(CLOSE_TIMEOUT, closing).await {
            gallery_debug!("Browser.close: {}", err);
        }
    }
}

#[async_trait::async_trait]
impl Renderer for CdpBrowser {
    async fn open_context(&self) -> Result<Box<dyn RenderContext>, CaptureError> {
        let created = self
            .connection
            .call(
                "Target.createBrowserContext",
                json!({ "disposeOnDetach": true }),
                None,
            )
            .await
            .map_err(|err| CaptureError::new(FailureKind::Context, err.to_string()))?;
        let context_id = string_field(&created, "browserContextId")?;

        let (events_tx, events) = mpsc::unbounded_channel();
        let mut page = CdpPage {
            connection: self.connection.clone(),
            context_id,
            session_id: None,
            events,
            loader_id: None,
            diagnostics: DiagnosticLog::new(MAX_DIAGNOSTICS),
            closed: false,
        };
        // On error `page` drops here, which disposes the context.
        page.attach(events_tx, self.viewport).await?;
        Ok(Box::new(page))
    }
}

/// One page target inside its own browser context.
pub struct CdpPage {
    connection: Arc<Connection>,
    context_id: String,
    session_id: Option<String>,
    events: mpsc::UnboundedReceiver<CdpEvent>,
    loader_id: Option<String>,
    diagnostics: DiagnosticLog,
    closed: bool,
}

/// Page console lines, keeping only the first `cap`.
#[derive(Debug)]
struct DiagnosticLog {
    lines: Vec<String>,
    omitted: usize,
    cap: usize,
}

impl DiagnosticLog {
    fn new(cap: usize) -> Self {
        Self {
            lines: Vec::new(),
            omitted: 0,
            cap,
        }
    }

    fn push(&mut self, line: String) {
        if self.lines.len() < self.cap {
            self.lines.push(line);
        } else {
            self.omitted += 1;
        }
    }

    fn take(&mut self) -> Vec<String> {
        let mut lines = std::mem::take(&mut self.lines);
        if self.omitted > 0 {
            lines.push(format!("... {} more messages omitted", self.omitted));
            self.omitted = 0;
        }
        lines
    }
}

impl CdpPage {
    async fn attach(
        &mut self,
        events_tx: mpsc::UnboundedSender<CdpEvent>,
        viewport: Viewport,
    ) -> Result<(), CaptureError> {
        let target = self
            .connection
            .call(
                "Target.createTarget",
                json!({ "url": "about:blank", "browserContextId": self.context_id }),
                None,
            )
            .await?;
        let target_id = string_field(&target, "targetId")?;
        let attached = self
            .connection
            .call(
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
                None,
            )
            .await?;
        let session_id = string_field(&attached, "sessionId")?;
        lock(&self.connection.sessions).insert(session_id.clone(), events_tx);
        self.session_id = Some(session_id);

        self.command("Page.enable", json!({})).await?;
        self.command("Page.setLifecycleEventsEnabled", json!({ "enabled": true }))
            .await?;
        self.command("Runtime.enable", json!({})).await?;
        self.command(
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": viewport.width,
                "height": viewport.height,
                "deviceScaleFactor": 1,
                "mobile": false,
            }),
        )
        .await?;
        Ok(())
    }

    async fn command(&self, method: &str, params: Value) -> Reply {
        self.connection
            .call(method, params, self.session_id.as_deref())
            .await
    }

    /// Records console and exception events. Returns whether the event was one.
    fn absorb(&mut self, event: &CdpEvent) -> bool {
        match event.method.as_str() {
            "Runtime.consoleAPICalled" => {
                self.diagnostics.push(console_line(&event.params));
                true
            }
            "Runtime.exceptionThrown" => {
                self.diagnostics.push(exception_line(&event.params));
                true
            }
            _ => false,
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.absorb(&event);
        }
    }

    fn is_network_idle(&self, event: &CdpEvent) -> bool {
        if event.method != "Page.lifecycleEvent" {
            return false;
        }
        if event.params.get("name").and_then(Value::as_str) != Some("networkIdle") {
            return false;
        }
        match &self.loader_id {
            Some(loader) => event.params.get("loaderId").and_then(Value::as_str) == Some(loader),
            None => true,
        }
    }

    fn forget_session(&mut self) {
        if let Some(session) = self.session_id.take() {
            lock(&self.connection.sessions).remove(&session);
        }
    }
}

#[async_trait::async_trait]
impl RenderContext for CdpPage {
    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError> {
        let navigated = self
            .command("Page.navigate", json!({ "url": url }))
            .await
            .map_err(|err| CaptureError::new(FailureKind::Navigation, err.message))?;
        if let Some(error) = navigated
            .get("errorText")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        {
            return Err(CaptureError::new(FailureKind::Navigation, error));
        }
        self.loader_id = navigated
            .get("loaderId")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);

        loop {
            let Some(event) = self.events.recv().await else {
                return Err(connection_closed());
            };
            if self.absorb(&event) {
                continue;
            }
            if self.is_network_idle(&event) {
                return Ok(());
            }
        }
    }

    async fn settle(&mut self, delay: Duration) {
        let deadline = tokio::time::sleep(delay);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = self.events.recv() => match event {
                    Some(event) => {
                        self.absorb(&event);
                    }
                    None => break,
                },
            }
        }
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, CaptureError> {
        self.drain_events();
        let shot = self
            .command("Page.captureScreenshot", json!({ "format": "png" }))
            .await
            .map_err(|err| CaptureError::new(FailureKind::Screenshot, err.message))?;
        let data = string_field(&shot, "data")?;
        STANDARD
            .decode(data.as_bytes())
            .map_err(|err| CaptureError::new(FailureKind::Screenshot, err.to_string()))
    }

    fn take_diagnostics(&mut self) -> Vec<String> {
        self.drain_events();
        self.diagnostics.take()
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.forget_session();
        let disposing = self.connection.call(
            "Target.disposeBrowserContext",
            json!({ "browserContextId": self.context_id }),
            None,
        );
        match tokio::time::timeout(CLOSE_TIMEOUT, disposing).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => gallery_warn!("Could not dispose context {}: {}", self.context_id, err),
            Err(_) => gallery_warn!("Disposing context {} timed out", self.context_id),
        }
    }
}

impl Drop for CdpPage {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.forget_session();
        self.connection.notify(
            "Target.disposeBrowserContext",
            json!({ "browserContextId": self.context_id }),
        );
    }
}

fn console_line(params: &Value) -> String {
    let kind = params.get("type").and_then(Value::as_str).unwrap_or("log");
    let text = params
        .get("args")
        .and_then(Value::as_array)
        .map(|args| {
            args.iter()
                .map(remote_object_text)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    format!("[{kind}] {text}")
}

fn exception_line(params: &Value) -> String {
    let details = params.get("exceptionDetails");
    let description = details
        .and_then(|d| d.get("exception"))
        .and_then(|e| e.get("description"))
        .and_then(Value::as_str)
        .or_else(|| details.and_then(|d| d.get("text")).and_then(Value::as_str))
        .unwrap_or("unknown error");
    format!("Page error: {description}")
}

fn remote_object_text(object: &Value) -> String {
    match object.get("value") {
        Some(Value::String(text)) => text.clone(),
        Some(value) if !value.is_null() => value.to_string(),
        _ => object
            .get("description")
            .or_else(|| object.get("type"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}
