//! Scripted in-memory backend for engine tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use engine::{Engine, EngineConfig, Invocation};
use sandbox::{
    ImageStore, ProcessExit, Sandbox, SandboxConfig, SandboxError, SandboxFactory,
};
use serde_json::{Value, json};

/// What a fake sandbox does once started. Chosen per function name.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Exit with fixed status and streams.
    Respond {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    /// Exit 0 with `{"event": <stdin>, "code": <staged code>, "request_id": ..}`.
    Echo,
    /// Exit 0 with `null` after the delay, honoring the wait timeout.
    Sleep(Duration),
    /// Never exit and ignore the wait timeout.
    Hang,
    FailCreate,
    FailStart,
    /// Register the sandbox as live, then never return from create.
    HangCreate,
    /// Never return from start.
    HangStart,
    /// Panic while waiting.
    Panic,
}

/// Everything the fake backend observed.
#[derive(Default)]
pub struct Observed {
    pub live: Mutex<HashSet<String>>,
    pub created: Mutex<Vec<SandboxConfig>>,
    pub removed: Mutex<Vec<String>>,
    pub payloads: Mutex<HashMap<String, Vec<u8>>>,
}

impl Observed {
    pub fn live(&self) -> HashSet<String> {
        self.live.lock().unwrap().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn created(&self, name: &str) -> SandboxConfig {
        self.created
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .unwrap()
    }

    /// Wait until no fake sandbox is left, for cleanup that runs detached.
    pub async fn wait_until_empty(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.live().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    /// Wait until at least `count` sandboxes are live.
    pub async fn wait_for_live(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.live().len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }
}

pub struct FakeFactory {
    default: Behavior,
    scripted: HashMap<String, Behavior>,
    pub observed: Arc<Observed>,
}

impl FakeFactory {
    pub fn new(default: Behavior) -> Self {
        Self {
            default,
            scripted: HashMap::new(),
            observed: Arc::new(Observed::default()),
        }
    }

    /// Use `behavior` for invocations whose function name is `function_name`.
    pub fn script(mut self, function_name: &str, behavior: Behavior) -> Self {
        self.scripted.insert(function_name.to_string(), behavior);
        self
    }

    fn behavior_for(&self, config: &SandboxConfig) -> Behavior {
        config
            .env
            .iter()
            .find(|(k, _)| k == "FUNCTION_NAME")
            .and_then(|(_, name)| self.scripted.get(name))
            .unwrap_or(&self.default)
            .clone()
    }
}

#[async_trait]
impl SandboxFactory for FakeFactory {
    fn name(&self) -> &str {
        "fake"
    }

    async fn startup(&mut self) -> sandbox::Result<()> {
        Ok(())
    }

    async fn create(&self, config: SandboxConfig) -> sandbox::Result<Box<dyn Sandbox>> {
        let behavior = self.behavior_for(&config);
        if matches!(behavior, Behavior::FailCreate) {
            return Err(SandboxError::CreationFailed("scripted create failure".into()));
        }
        self.observed
            .live
            .lock()
            .unwrap()
            .insert(config.name.clone());
        if matches!(behavior, Behavior::HangCreate) {
            std::future::pending::<()>().await;
        }
        self.observed.created.lock().unwrap().push(config.clone());
        Ok(Box::new(FakeSandbox {
            name: config.name.clone(),
            request_id: config
                .env
                .iter()
                .find(|(k, _)| k == "REQUEST_ID")
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
            code_dir: config.mounts.first().map(|m| m.host_path.clone()),
            behavior,
            observed: Arc::clone(&self.observed),
            started: false,
            code: String::new(),
            stdin: None,
        }))
    }

    async fn destroy(&self, mut sandbox: Box<dyn Sandbox>) {
        let _ = sandbox.kill().await;
        let _ = self.remove(sandbox.id()).await;
    }

    async fn remove(&self, id: &str) -> sandbox::Result<()> {
        self.observed.live.lock().unwrap().remove(id);
        self.observed.removed.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn list(&self) -> sandbox::Result<Vec<String>> {
        Ok(self.observed.live().into_iter().collect())
    }

    async fn shutdown(&mut self) {}
}

pub struct FakeSandbox {
    name: String,
    request_id: String,
    code_dir: Option<PathBuf>,
    behavior: Behavior,
    observed: Arc<Observed>,
    started: bool,
    code: String,
    stdin: Option<Vec<u8>>,
}

fn read_staged_code(dir: &Path) -> String {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| std::fs::read_to_string(entry.path()).ok())
        .next()
        .unwrap_or_default()
}

#[async_trait]
impl Sandbox for FakeSandbox {
    fn id(&self) -> &str {
        &self.name
    }

    async fn start(&mut self) -> sandbox::Result<()> {
        if matches!(self.behavior, Behavior::FailStart) {
            return Err(SandboxError::StartFailed("scripted start failure".into()));
        }
        if matches!(self.behavior, Behavior::HangStart) {
            std::future::pending::<()>().await;
        }
        self.code = self.code_dir.as_deref().map(read_staged_code).unwrap_or_default();
        self.started = true;
        Ok(())
    }

    async fn kill(&mut self) -> sandbox::Result<()> {
        self.started = false;
        Ok(())
    }

    async fn write_stdin(&mut self, payload: &[u8]) -> sandbox::Result<()> {
        self.observed
            .payloads
            .lock()
            .unwrap()
            .insert(self.name.clone(), payload.to_vec());
        self.stdin = Some(payload.to_vec());
        Ok(())
    }

    async fn wait_exit(&mut self, timeout: Duration) -> sandbox::Result<ProcessExit> {
        assert!(self.started, "wait_exit before start");
        match &self.behavior {
            Behavior::Respond {
                exit_code,
                stdout,
                stderr,
            } => Ok(ProcessExit {
                exit_code: *exit_code,
                stdout: stdout.clone().into_bytes(),
                stderr: stderr.clone().into_bytes(),
            }),
            Behavior::Echo => {
                let event: Value = serde_json::from_slice(self.stdin.as_deref().unwrap_or(b"null"))
                    .unwrap();
                let body = json!({"event": event, "code": self.code, "request_id": self.request_id});
                Ok(ProcessExit {
                    exit_code: 0,
                    stdout: serde_json::to_vec(&body).unwrap(),
                    stderr: Vec::new(),
                })
            }
            Behavior::Sleep(delay) => {
                if *delay > timeout {
                    tokio::time::sleep(timeout).await;
                    return Err(SandboxError::WaitTimeout(timeout));
                }
                tokio::time::sleep(*delay).await;
                Ok(ProcessExit {
                    exit_code: 0,
                    stdout: b"null".to_vec(),
                    stderr: Vec::new(),
                })
            }
            Behavior::Hang => std::future::pending().await,
            Behavior::Panic => panic!("scripted sandbox panic"),
            Behavior::FailCreate
            | Behavior::FailStart
            | Behavior::HangCreate
            | Behavior::HangStart => panic!("unprovisioned sandboxes never run"),
        }
    }
}

/// Image store whose images exist once built (or when pre-seeded).
#[derive(Default)]
pub struct FakeImages {
    pub existing: Mutex<HashSet<String>>,
    pub builds: AtomicUsize,
    pub build_delay: Mutex<Duration>,
    pub fail_builds: AtomicBool,
}

impl FakeImages {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn image_exists(&self, image: &str) -> sandbox::Result<bool> {
        Ok(self.existing.lock().unwrap().contains(image))
    }

    async fn build_image(&self, image: &str, context_dir: &Path) -> sandbox::Result<()> {
        assert!(context_dir.join("Dockerfile").is_file(), "build context not written");
        let delay = *self.build_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_builds.load(Ordering::SeqCst) {
            return Err(SandboxError::ImageFailed("scripted build failure".into()));
        }
        self.existing.lock().unwrap().insert(image.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub engine: Engine,
    pub observed: Arc<Observed>,
    pub images: Arc<FakeImages>,
    pub staging: tempfile::TempDir,
}

pub fn harness(factory: FakeFactory) -> Harness {
    harness_with(factory, EngineConfig::default())
}

/// Like [`harness`], with `config`'s staging dir replaced by a temp dir.
pub fn harness_with(factory: FakeFactory, config: EngineConfig) -> Harness {
    let observed = Arc::clone(&factory.observed);
    let images = Arc::new(FakeImages::default());
    let staging = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        staging_dir: Some(staging.path().to_path_buf()),
        ..config
    };
    let engine = Engine::new(Arc::new(factory), images.clone(), config);
    Harness {
        engine,
        observed,
        images,
        staging,
    }
}

pub fn invocation(function_name: &str, language: &str, event: Value, timeout_ms: u64) -> Invocation {
    Invocation {
        function_id: format!("id-{function_name}"),
        function_name: function_name.to_string(),
        language: language.to_string(),
        code: format!("# handler for {function_name}"),
        event,
        timeout_ms,
    }
}
