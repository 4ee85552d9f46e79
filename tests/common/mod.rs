#![allow(dead_code)]
//! In-memory host and socket fakes shared by the integration tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use workflow_courier::conflict::{Arbiter, ConflictContext, ConflictDecision};
use workflow_courier::coordinator::hostpath::{basename, dirname, join};
use workflow_courier::transport::wire::RESPONSE_TYPE;
use workflow_courier::transport::{
    ChannelKind, ConnectionAvailabilityCache, MessageHandler, ParamValue, PersistentChannel,
    ReadyState, Request, StatelessChannel, TransportDispatcher, TransportError, TransportStrategy, op,
};
use workflow_courier::{FileOperationCoordinator, OperationTimeouts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    Socket,
    Http,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub op: String,
    pub params: BTreeMap<String, String>,
    pub via: Via,
}

#[derive(Default)]
struct HostState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, String>,
    calls: Vec<Call>,
    unreachable: bool,
    transport_failures: usize,
    rejections: HashMap<String, String>,
}

impl HostState {
    fn exists(&self, path: &str) -> bool {
        self.dirs.contains(path) || self.files.contains_key(path)
    }

    fn add_dir_all(&mut self, path: &str) {
        let mut current = Some(path.to_string());
        while let Some(p) = current {
            current = dirname(&p).filter(|parent| *parent != p).map(str::to_string);
            self.dirs.insert(p);
        }
    }

    fn children(&self, dir: &str) -> (Vec<String>, Vec<String>) {
        let is_child = |p: &&String| dirname(p) == Some(dir) && p.as_str() != dir;
        let dirs = self.dirs.iter().filter(is_child).map(|p| basename(p).to_string()).collect();
        let files = self
            .files
            .keys()
            .filter(is_child)
            .map(|p| basename(p).to_string())
            .collect();
        (dirs, files)
    }

    fn under(path: &str, root: &str) -> bool {
        path == root || path.starts_with(&format!("{root}/"))
    }

    fn remove_tree(&mut self, root: &str) {
        self.dirs.retain(|p| !Self::under(p, root));
        self.files.retain(|p, _| !Self::under(p, root));
    }

    fn copy_tree(&mut self, from: &str, to: &str) {
        let rebase = |p: &str| format!("{to}{}", &p[from.len()..]);
        let dirs: Vec<String> = self.dirs.iter().filter(|p| Self::under(p, from)).cloned().collect();
        let files: Vec<(String, String)> = self
            .files
            .iter()
            .filter(|(p, _)| Self::under(p, from))
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect();
        for d in dirs {
            self.dirs.insert(rebase(&d));
        }
        for (f, c) in files {
            self.files.insert(rebase(&f), c);
        }
    }
}

fn ok() -> Value {
    json!({"success": true})
}

fn refuse(msg: &str) -> Value {
    json!({"success": false, "error": msg})
}

/// In-memory host filesystem answering the stateless protocol.
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<HostState>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        let host = Self::default();
        host.state.lock().unwrap().dirs.insert("/".into());
        Arc::new(host)
    }

    pub fn with_dir(self: &Arc<Self>, path: &str) -> Arc<Self> {
        self.state.lock().unwrap().add_dir_all(path);
        Arc::clone(self)
    }

    pub fn with_file(self: &Arc<Self>, path: &str, content: &str) -> Arc<Self> {
        let mut s = self.state.lock().unwrap();
        if let Some(parent) = dirname(path) {
            s.add_dir_all(parent);
        }
        s.files.insert(path.to_string(), content.to_string());
        drop(s);
        Arc::clone(self)
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state.lock().unwrap().exists(path)
    }

    pub fn set_unreachable(&self, down: bool) {
        self.state.lock().unwrap().unreachable = down;
    }

    /// The next `n` requests fail at the transport level.
    pub fn fail_transport_next(&self, n: usize) {
        self.state.lock().unwrap().transport_failures = n;
    }

    /// Every `operation` is refused with `message`.
    pub fn reject(&self, operation: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .rejections
            .insert(operation.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| c.op == operation).count()
    }

    pub fn mutating_calls(&self) -> usize {
        self.calls().iter().filter(|c| op::is_mutating(&c.op)).count()
    }

    pub fn handle(&self, request: &Request, via: Via) -> Result<Value, TransportError> {
        let mut s = self.state.lock().unwrap();
        let params: BTreeMap<String, String> = request
            .params()
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();
        s.calls.push(Call {
            op: request.op().to_string(),
            params: params.clone(),
            via,
        });

        if s.unreachable || s.transport_failures > 0 {
            s.transport_failures = s.transport_failures.saturating_sub(1);
            return Err(TransportError::Unreachable {
                endpoint: "fake://host".into(),
                message: "connection refused".into(),
            });
        }
        if let Some(msg) = s.rejections.get(request.op()) {
            return Ok(refuse(msg));
        }

        let p = |k: &str| params.get(k).cloned().unwrap_or_default();
        let flag = |k: &str| params.get(k).is_some_and(|v| v == "true");

        let reply = match request.op() {
            op::PATH_EXISTS => {
                let path = p("path");
                json!({
                    "success": true,
                    "exists": s.exists(&path),
                    "is_directory": s.dirs.contains(&path),
                    "is_file": s.files.contains_key(&path),
                    "path": path,
                })
            }
            op::LIST_DIRECTORY => {
                let path = p("path");
                if !s.dirs.contains(&path) {
                    json!({"type": "error", "error": "Path does not exist"})
                } else {
                    let (dirs, files) = s.children(&path);
                    let dirs: Vec<Value> = dirs
                        .iter()
                        .map(|n| json!({"name": n, "date": "01/01/25", "type": "directory"}))
                        .collect();
                    let files: Vec<Value> = files
                        .iter()
                        .map(|n| {
                            let size = s.files[&join(&path, n)].len();
                            json!({"name": n, "date": "01/01/25", "size": size, "type": "file"})
                        })
                        .collect();
                    json!({"path": path, "directories": dirs, "files": files, "type": "directory_listing"})
                }
            }
            op::CREATE_DIRECTORY => {
                let path = join(&p("parent_path"), &p("directory_name"));
                if s.exists(&path) {
                    refuse("Directory already exists")
                } else {
                    s.add_dir_all(&path);
                    json!({"success": true, "path": path})
                }
            }
            op::DELETE_DIRECTORY => {
                let path = p("directory_path");
                if !s.dirs.contains(&path) {
                    refuse("Directory not found")
                } else {
                    s.remove_tree(&path);
                    ok()
                }
            }
            op::DELETE_FILE => {
                if s.files.remove(&p("file_path")).is_some() {
                    ok()
                } else {
                    refuse("File not found")
                }
            }
            op::RENAME => {
                let old = p("old_path");
                let new = join(dirname(&old).unwrap_or("/"), &p("new_name"));
                if !s.exists(&old) {
                    refuse("Source not found")
                } else if s.exists(&new) {
                    refuse("Target already exists")
                } else {
                    s.copy_tree(&old, &new);
                    s.remove_tree(&old);
                    json!({"success": true, "source": old, "target_path": new})
                }
            }
            op::MOVE_FILE | op::COPY_FILE | op::MOVE_DIRECTORY | op::COPY_DIRECTORY => {
                let source = p("source_path");
                let target_dir = p("target_path");
                let rename_key = if request.op() == op::MOVE_FILE { "new_filename" } else { "new_name" };
                let name = params
                    .get(rename_key)
                    .cloned()
                    .unwrap_or_else(|| basename(&source).to_string());
                let dest = join(&target_dir, &name);
                let is_move = matches!(request.op(), op::MOVE_FILE | op::MOVE_DIRECTORY);

                if !s.exists(&source) {
                    refuse("Source not found")
                } else if s.exists(&dest) && !flag("overwrite") {
                    refuse("Target already exists")
                } else {
                    s.remove_tree(&dest);
                    s.add_dir_all(&target_dir);
                    s.copy_tree(&source, &dest);
                    if is_move {
                        s.remove_tree(&source);
                    }
                    json!({"success": true, "source": source, "target": dest})
                }
            }
            op::LOAD_WORKFLOW => {
                let path = p("path");
                match s.files.get(&path) {
                    Some(text) => json!({"type": "workflow_loaded", "data": text}),
                    None if s.dirs.contains(&path) => json!({"type": "directory_listing", "files": []}),
                    None => json!({"type": "error", "error": "File not found"}),
                }
            }
            op::SAVE_WORKFLOW => {
                let path = p("file_path");
                if let Some(parent) = dirname(&path) {
                    s.add_dir_all(parent);
                }
                s.files.insert(path, p("workflow_data"));
                ok()
            }
            other => json!({"error": format!("unknown action {other}")}),
        };
        Ok(reply)
    }
}

#[async_trait]
impl StatelessChannel for FakeHost {
    async fn request(&self, request: &Request, _timeout: Duration) -> Result<Value, TransportError> {
        self.handle(request, Via::Http)
    }

    async fn probe(&self, _timeout: Duration) -> Result<(), TransportError> {
        if self.state.lock().unwrap().unreachable {
            return Err(TransportError::Unreachable {
                endpoint: "fake://host".into(),
                message: "connection refused".into(),
            });
        }
        Ok(())
    }

    fn endpoint(&self) -> String {
        "fake://host".into()
    }
}

#[derive(Clone)]
pub enum SocketMode {
    /// Answer through the host, synchronously.
    Respond(Arc<FakeHost>),
    /// Emit an unrelated frame first, then answer.
    NoisyRespond(Arc<FakeHost>),
    /// Swallow every frame.
    Silent,
}

/// Persistent channel with a settable ready state.
pub struct FakeSocket {
    state: Mutex<ReadyState>,
    mode: Mutex<SocketMode>,
    handler: Mutex<Option<MessageHandler>>,
    sent: Mutex<Vec<String>>,
}

impl FakeSocket {
    pub fn new(state: ReadyState, mode: SocketMode) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            mode: Mutex::new(mode),
            handler: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn set_state(&self, state: ReadyState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn deliver(&self, text: &str) {
        let handler = self.handler.lock().unwrap().clone();
        if let Some(h) = handler {
            h(text);
        }
    }

    fn answer(&self, host: &FakeHost, frame: &Value) {
        let action = frame["action"].as_str().unwrap_or_default().to_string();
        let mut request = Request::new(action.clone());
        if let Some(obj) = frame.as_object() {
            for (k, v) in obj {
                if matches!(k.as_str(), "type" | "action" | "request_id") {
                    continue;
                }
                let value = match v {
                    Value::Bool(b) => ParamValue::from(*b),
                    Value::Number(n) => ParamValue::from(n.as_i64().unwrap_or_default()),
                    Value::String(s) => ParamValue::from(s.as_str()),
                    other => ParamValue::from(other.to_string()),
                };
                request = request.param(k.as_str(), value);
            }
        }
        if let Ok(result) = host.handle(&request, Via::Socket) {
            let reply = json!({
                "type": RESPONSE_TYPE,
                "action": action,
                "request_id": frame["request_id"],
                "result": result,
            });
            self.deliver(&reply.to_string());
        }
    }
}

impl PersistentChannel for FakeSocket {
    fn ready_state(&self) -> ReadyState {
        *self.state.lock().unwrap()
    }

    fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(text.clone());
        let frame: Value = serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?;
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            SocketMode::Respond(host) => self.answer(&host, &frame),
            SocketMode::NoisyRespond(host) => {
                self.deliver(r#"{"type":"status","data":{"queue_remaining":0}}"#);
                self.answer(&host, &frame);
            }
            SocketMode::Silent => {}
        }
        Ok(())
    }

    fn message_handler(&self) -> Option<MessageHandler> {
        self.handler.lock().unwrap().clone()
    }

    fn replace_message_handler(&self, handler: Option<MessageHandler>) -> Option<MessageHandler> {
        std::mem::replace(&mut *self.handler.lock().unwrap(), handler)
    }
}

/// Arbiter that always answers the same and counts how often it was asked.
pub struct CountingArbiter {
    decision: ConflictDecision,
    calls: AtomicUsize,
}

impl CountingArbiter {
    pub fn new(decision: ConflictDecision) -> Arc<Self> {
        Arc::new(Self {
            decision,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Arbiter for CountingArbiter {
    async fn resolve(&self, _context: &ConflictContext) -> ConflictDecision {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.decision.clone()
    }
}

/// Timeouts handed to each op, shared with the strategy that records them.
#[derive(Clone, Default)]
pub struct TimeoutLog(Arc<Mutex<Vec<(String, Duration)>>>);

impl TimeoutLog {
    pub fn timeout_for(&self, operation: &str) -> Option<Duration> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|(o, _)| o == operation)
            .map(|(_, t)| *t)
    }
}

/// Primary strategy that answers through the host and logs the timeout each op got.
pub struct RecordingStrategy {
    host: Arc<FakeHost>,
    log: TimeoutLog,
}

impl RecordingStrategy {
    pub fn new(host: &Arc<FakeHost>, log: &TimeoutLog) -> Self {
        Self {
            host: Arc::clone(host),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl TransportStrategy for RecordingStrategy {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Primary
    }

    async fn attempt(&self, request: &Request, timeout: Duration) -> Result<Value, TransportError> {
        self.log
            .0
            .lock()
            .unwrap()
            .push((request.op().to_string(), timeout));
        self.host.handle(request, Via::Socket)
    }

    async fn probe(&self, _timeout: Duration) -> Result<(), TransportError> {
        Ok(())
    }
}

pub fn fast_timeouts() -> OperationTimeouts {
    let t = Duration::from_millis(200);
    OperationTimeouts {
        default: t,
        move_op: t,
        copy_file: t,
        copy_directory: t,
        load: t,
    }
}

pub fn dispatcher(host: &Arc<FakeHost>, socket: Option<Arc<FakeSocket>>) -> Arc<TransportDispatcher> {
    let availability = Arc::new(ConnectionAvailabilityCache::default());
    let primary = socket.map(|s| s as Arc<dyn PersistentChannel>);
    let fallback: Arc<dyn StatelessChannel> = Arc::clone(host) as Arc<dyn StatelessChannel>;
    Arc::new(
        TransportDispatcher::with_channels(availability, primary, fallback)
            .with_primary_timeout(Duration::from_millis(200))
            .with_fallback_timeout(Duration::from_millis(500)),
    )
}

pub fn coordinator(host: &Arc<FakeHost>, arbiter: Arc<dyn Arbiter>) -> FileOperationCoordinator {
    FileOperationCoordinator::new(dispatcher(host, None), arbiter, fast_timeouts())
}
