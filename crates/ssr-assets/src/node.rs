//! Render entry modules executed by Node.js.
//!
//! Build tools emit `entry-server.js` as an ES module exporting
//! `render(url, manifest)`. Loading the module starts one long-lived `node`
//! worker that imports it exactly once. Renders are then sent to that worker
//! as JSON lines on stdin and answered on stdout, matched up by request id.
//!
//! Inside the worker `console.log`, `console.info` and `console.debug` are
//! pointed at stderr, and stdout lines that are not protocol messages are
//! passed through, so application logging never corrupts a reply. The worker
//! is restarted only when it dies.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{AssetLoadError, RenderFailure, RenderModuleLoader, RenderOutput, Renderer, SsrManifest};

/// Name of the export the entry module must provide.
pub const RENDER_EXPORT: &str = "render";

/// Worker exit code signalling the module loaded but lacks the export.
const MISSING_EXPORT_EXIT: i32 = 3;

/// Stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 50;

const WORKER_SCRIPT: &str = r#"
import { pathToFileURL } from 'node:url';
import { createInterface } from 'node:readline';
const out = process.stdout.write.bind(process.stdout);
const send = (msg) => out(JSON.stringify(msg) + '\n');
console.log = console.info = console.debug = console.error;
const mod = await import(pathToFileURL(process.argv[1]).href);
if (typeof mod.render !== 'function') process.exit(3);
const failure = (e) => ({
  message: e && e.message !== undefined ? String(e.message) : String(e),
  stack: (e && e.stack) || null,
});
send({ type: 'ready' });
for await (const line of createInterface({ input: process.stdin, crlfDelay: Infinity })) {
  if (!line.trim()) continue;
  const { id, url, manifest } = JSON.parse(line);
  Promise.resolve()
    .then(() => mod.render(url, manifest))
    .then(
      (r) => send({ type: 'result', id, output: { head: r?.head ?? null, html: r?.html ?? null } }),
      (e) => send({ type: 'error', id, error: failure(e) }),
    );
}
"#;

/// Loads render entry modules into a `node` worker process.
#[derive(Debug, Clone)]
pub struct NodeModuleLoader {
    node_binary: PathBuf,
}

impl Default for NodeModuleLoader {
    fn default() -> Self {
        Self::new("node")
    }
}

impl NodeModuleLoader {
    pub fn new(node_binary: impl Into<PathBuf>) -> Self {
        Self {
            node_binary: node_binary.into(),
        }
    }

    pub fn node_binary(&self) -> &Path {
        &self.node_binary
    }
}

#[async_trait]
impl RenderModuleLoader for NodeModuleLoader {
    async fn load(&self, entry: &Path) -> Result<Arc<dyn Renderer>, AssetLoadError> {
        if tokio::fs::metadata(entry).await.is_err() {
            return Err(AssetLoadError::RenderModuleMissing {
                path: entry.to_path_buf(),
            });
        }

        let worker = NodeWorker::start(&self.node_binary, entry)
            .await
            .map_err(|e| e.into_load_error(entry))?;

        tracing::debug!(entry = %entry.display(), "render entry imported");
        Ok(Arc::new(NodeRenderer {
            node_binary: self.node_binary.clone(),
            entry: entry.to_path_buf(),
            worker: tokio::sync::Mutex::new(Arc::new(worker)),
            next_id: AtomicU64::new(1),
        }))
    }
}

/// Renders through the entry module held by a `node` worker.
pub struct NodeRenderer {
    node_binary: PathBuf,
    entry: PathBuf,
    worker: tokio::sync::Mutex<Arc<NodeWorker>>,
    next_id: AtomicU64,
}

impl fmt::Debug for NodeRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRenderer")
            .field("node_binary", &self.node_binary)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

impl NodeRenderer {
    pub fn entry(&self) -> &Path {
        &self.entry
    }

    /// The live worker, restarting it if it has died.
    async fn worker(&self) -> Result<Arc<NodeWorker>, RenderFailure> {
        let mut slot = self.worker.lock().await;
        if slot.is_alive() {
            return Ok(slot.clone());
        }

        tracing::warn!(entry = %self.entry.display(), "render worker exited, restarting");
        let worker = NodeWorker::start(&self.node_binary, &self.entry)
            .await
            .map_err(WorkerStartError::into_render_failure)?;
        *slot = Arc::new(worker);
        Ok(slot.clone())
    }
}

#[async_trait]
impl Renderer for NodeRenderer {
    async fn render(
        &self,
        path: &str,
        manifest: &SsrManifest,
    ) -> Result<RenderOutput, RenderFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_vec(&RenderRequest { id, url: path, manifest })
            .map_err(|e| RenderFailure::new(format!("failed to encode render input: {e}")))?;
        line.push(b'\n');

        let worker = self.worker().await?;
        worker.call(id, &line).await
    }
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    id: u64,
    url: &'a str,
    manifest: &'a SsrManifest,
}

/// A line the worker writes on stdout.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WorkerMessage {
    Ready,
    Result { id: u64, output: RenderOutput },
    Error { id: u64, error: RenderFailure },
}

/// `None` for anything that is not a protocol message.
fn parse_worker_line(line: &str) -> Option<WorkerMessage> {
    serde_json::from_str(line).ok()
}

type Reply = Result<RenderOutput, RenderFailure>;
type Pending = HashMap<u64, oneshot::Sender<Reply>>;

/// Pending calls plus the liveness flag, under one lock so no call can be
/// registered after the reader has drained the table.
#[derive(Default)]
struct CallTable {
    alive: bool,
    pending: Pending,
}

#[derive(Default)]
struct StderrTail(VecDeque<String>);

impl StderrTail {
    fn push(&mut self, line: String) {
        if self.0.len() == STDERR_TAIL_LINES {
            self.0.pop_front();
        }
        self.0.push_back(line);
    }

    fn text(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running `node` process that has imported the entry module.
struct NodeWorker {
    stdin: tokio::sync::Mutex<ChildStdin>,
    calls: Arc<Mutex<CallTable>>,
    exited: Arc<AtomicBool>,
    _child: Mutex<Child>,
}

enum WorkerStartError {
    Spawn { binary: PathBuf, source: std::io::Error },
    MissingExport,
    Exited { status: Option<ExitStatus>, stderr: String },
}

impl WorkerStartError {
    fn reason(&self) -> String {
        match self {
            Self::Spawn { binary, source } => {
                format!("failed to start {}: {source}", binary.display())
            }
            Self::MissingExport => format!("module does not export `{RENDER_EXPORT}`"),
            Self::Exited { status, stderr } => match (stderr.trim(), status) {
                ("", Some(status)) => format!("render worker exited with {status}"),
                ("", None) => "render worker exited".to_string(),
                (text, _) => text.to_string(),
            },
        }
    }

    fn into_load_error(self, entry: &Path) -> AssetLoadError {
        match self {
            Self::MissingExport => AssetLoadError::MissingExport {
                path: entry.to_path_buf(),
                export: RENDER_EXPORT.to_string(),
            },
            other => AssetLoadError::ModuleLoad {
                path: entry.to_path_buf(),
                reason: other.reason(),
            },
        }
    }

    fn into_render_failure(self) -> RenderFailure {
        RenderFailure::new(format!("render worker failed to restart: {}", self.reason()))
    }
}

impl NodeWorker {
    async fn start(node_binary: &Path, entry: &Path) -> Result<Self, WorkerStartError> {
        let mut child = Command::new(node_binary)
            .arg("--input-type=module")
            .arg("-e")
            .arg(WORKER_SCRIPT)
            .arg(entry)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WorkerStartError::Spawn {
                binary: node_binary.to_path_buf(),
                source,
            })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(WorkerStartError::Exited {
                status: None,
                stderr: "worker stdio unavailable".to_string(),
            });
        };

        let tail = Arc::new(Mutex::new(StderrTail::default()));
        let stderr_task = tokio::spawn(forward_stderr(stderr, tail.clone()));

        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_worker_line(&line) {
                    Some(WorkerMessage::Ready) => break,
                    _ => eprintln!("{line}"),
                },
                Ok(None) | Err(_) => {
                    let status = child.wait().await.ok();
                    // Let the stderr reader drain so the report is complete.
                    let _ = stderr_task.await;
                    if status.and_then(|s| s.code()) == Some(MISSING_EXPORT_EXIT) {
                        return Err(WorkerStartError::MissingExport);
                    }
                    return Err(WorkerStartError::Exited {
                        status,
                        stderr: lock(&tail).text(),
                    });
                }
            }
        }

        let calls = Arc::new(Mutex::new(CallTable {
            alive: true,
            pending: HashMap::new(),
        }));
        let exited = Arc::new(AtomicBool::new(false));
        tokio::spawn(read_replies(lines, calls.clone(), exited.clone(), tail, stderr_task));

        Ok(Self {
            stdin: tokio::sync::Mutex::new(stdin),
            calls,
            exited,
            _child: Mutex::new(child),
        })
    }

    fn is_alive(&self) -> bool {
        !self.exited.load(Ordering::Acquire)
    }

    async fn call(&self, id: u64, line: &[u8]) -> Reply {
        let (tx, rx) = oneshot::channel();
        {
            let mut calls = lock(&self.calls);
            if !calls.alive {
                return Err(RenderFailure::new("render worker is not running"));
            }
            calls.pending.insert(id, tx);
        }

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.write_all(line).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            lock(&self.calls).pending.remove(&id);
            return Err(RenderFailure::new(format!("failed to send render request: {e}")));
        }

        rx.await
            .unwrap_or_else(|_| Err(RenderFailure::new("render worker dropped the request")))
    }
}

async fn forward_stderr(stderr: tokio::process::ChildStderr, tail: Arc<Mutex<StderrTail>>) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        eprintln!("{line}");
        lock(&tail).push(line);
    }
}

async fn read_replies(
    mut lines: Lines<BufReader<ChildStdout>>,
    calls: Arc<Mutex<CallTable>>,
    exited: Arc<AtomicBool>,
    tail: Arc<Mutex<StderrTail>>,
    stderr_task: JoinHandle<()>,
) {
    while let Ok(Some(line)) = lines.next_line().await {
        let (id, reply) = match parse_worker_line(&line) {
            Some(WorkerMessage::Result { id, output }) => (id, Ok(output)),
            Some(WorkerMessage::Error { id, error }) => (id, Err(error)),
            _ => {
                eprintln!("{line}");
                continue;
            }
        };
        if let Some(tx) = lock(&calls).pending.remove(&id) {
            let _ = tx.send(reply);
        }
    }

    let _ = stderr_task.await;
    let stack = lock(&tail).text();
    let pending = {
        let mut calls = lock(&calls);
        calls.alive = false;
        std::mem::take(&mut calls.pending)
    };
    exited.store(true, Ordering::Release);

    for (_, tx) in pending {
        let failure = RenderFailure::new("render worker exited during render");
        let failure = match stack.trim() {
            "" => failure,
            text => failure.with_stack(text),
        };
        let _ = tx.send(Err(failure));
    }
}
