use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use runtime_contract::{InvocationContext, Language, encode_event};
use sandbox::{ImageStore, Sandbox, SandboxConfig, SandboxError, SandboxFactory};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::classify::classify;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::guard::{GuardError, TimeoutGuard};
use crate::invocation::{Invocation, sandbox_name};
use crate::outcome::{InvocationReport, Outcome};
use crate::registry::{ImageRef, ImageRegistry};
use crate::staging::StagingArea;
use crate::table::{SandboxEntry, SandboxLease, SandboxTable};

/// Runs invocations in single-use sandboxes. Cheap to clone; clones share
/// the image registry, the live-sandbox table and the shutdown state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    factory: Arc<dyn SandboxFactory>,
    registry: ImageRegistry,
    table: SandboxTable,
    config: EngineConfig,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl Engine {
    /// `factory` must already be started.
    pub fn new(
        factory: Arc<dyn SandboxFactory>,
        images: Arc<dyn ImageStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory,
                registry: ImageRegistry::new(images),
                table: SandboxTable::default(),
                config,
                shutdown: CancellationToken::new(),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Ensure runtime images for every supported language.
    pub async fn startup(&self) -> Result<Vec<ImageRef>> {
        let images = self.inner.registry.ensure_all().await?;
        info!(
            factory = self.inner.factory.name(),
            images = images.len(),
            "engine ready"
        );
        Ok(images)
    }

    pub fn registry(&self) -> &ImageRegistry {
        &self.inner.registry
    }

    /// Sandboxes currently provisioned by in-flight invocations.
    pub fn live_sandboxes(&self) -> Vec<SandboxEntry> {
        self.inner.table.snapshot()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Run one invocation to completion.
    ///
    /// Never fails: every error is folded into the report's outcome. The
    /// work runs on its own task, so dropping this future does not skip
    /// sandbox removal.
    pub async fn execute(&self, invocation: Invocation) -> InvocationReport {
        let invocation_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let function_id = invocation.function_id.clone();

        let (sandbox, outcome): (Option<String>, Outcome) = match invocation.language.parse::<Language>() {
            Err(e) => (None, EngineError::from(e).into()),
            Ok(_) if self.is_shutting_down() => (None, EngineError::ShuttingDown.into()),
            Ok(language) => {
                let name = sandbox_name(&invocation.function_id, invocation_id);
                let outcome = self
                    .spawn_invocation(invocation_id, name.clone(), language, invocation)
                    .await;
                (Some(name), outcome)
            }
        };

        let duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            invocation_id = %invocation_id,
            function_id = %function_id,
            sandbox = sandbox.as_deref().unwrap_or("-"),
            outcome = outcome.kind(),
            duration_ms,
            "invocation finished"
        );

        InvocationReport {
            invocation_id,
            function_id,
            sandbox_name: sandbox,
            started_at,
            duration_ms,
            outcome,
        }
    }

    async fn spawn_invocation(
        &self,
        invocation_id: Uuid,
        name: String,
        language: Language,
        invocation: Invocation,
    ) -> Outcome {
        let span = info_span!(
            "invocation",
            invocation_id = %invocation_id,
            function_id = %invocation.function_id,
            sandbox = %name,
        );
        let inner = Arc::clone(&self.inner);
        let task = self.inner.tasks.spawn(
            async move { inner.run(invocation_id, name, language, invocation).await }
                .instrument(span),
        );
        match task.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(invocation_id = %invocation_id, error = %e, "invocation failed");
                e.into()
            }
            Err(e) => {
                error!(invocation_id = %invocation_id, error = %e, "invocation task failed");
                EngineError::Internal(format!("invocation task failed: {e}")).into()
            }
        }
    }

    /// Stop accepting invocations, cancel in-flight ones and force-remove
    /// every live sandbox. Removal failures are logged, not returned.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let entries = self.inner.table.drain();
        info!(count = entries.len(), "engine shutting down");

        let mut removals = JoinSet::new();
        for entry in entries {
            let factory = Arc::clone(&self.inner.factory);
            removals.spawn(async move {
                match factory.remove(&entry.sandbox_name).await {
                    Ok(()) => debug!(sandbox = %entry.sandbox_name, "sandbox removed"),
                    Err(e) => warn!(
                        sandbox = %entry.sandbox_name,
                        error = %e,
                        "failed to remove sandbox during shutdown"
                    ),
                }
            });
        }
        while let Some(result) = removals.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "sandbox removal task failed");
            }
        }

        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        info!("engine shutdown complete");
    }
}

impl Inner {
    fn provisioning_guard(&self) -> TimeoutGuard {
        TimeoutGuard::new(self.config.provision_timeout, self.shutdown.child_token())
    }

    fn provisioning_interrupted(
        &self,
        err: GuardError,
        step: &str,
        failure: fn(String) -> SandboxError,
    ) -> EngineError {
        match err {
            GuardError::Cancelled => EngineError::ShuttingDown,
            GuardError::DeadlineExceeded => EngineError::Provisioning(failure(format!(
                "sandbox {step} did not finish within {}ms",
                self.config.provision_timeout.as_millis()
            ))),
        }
    }

    async fn run(
        &self,
        invocation_id: Uuid,
        name: String,
        language: Language,
        invocation: Invocation,
    ) -> Result<Outcome> {
        let image = self.registry.ensure_image(language).await?;
        let staging = StagingArea::create(
            self.config.staging_dir.as_deref(),
            language,
            &invocation.code,
        )
        .await?;
        debug!(path = %staging.path().display(), "code staged");

        let config = SandboxConfig {
            id: invocation_id,
            name: name.clone(),
            image: image.image_name,
            env: InvocationContext::env_pairs(
                &invocation.function_name,
                &invocation_id.to_string(),
            ),
            mounts: vec![staging.mount()],
            resources: self.config.resources.clone(),
        };

        let mut sandbox = match self.provisioning_guard().run(self.factory.create(config)).await {
            Ok(created) => created.map_err(EngineError::Provisioning)?,
            Err(e) => {
                // The create call was abandoned mid-flight and may still
                // have produced a container.
                if let Err(remove) = self.factory.remove(&name).await {
                    warn!(error = %remove, "failed to remove abandoned sandbox");
                }
                return Err(self.provisioning_interrupted(e, "create", SandboxError::CreationFailed));
            }
        };
        let lease = SandboxLease::acquire(
            &self.table,
            Arc::clone(&self.factory),
            SandboxEntry {
                invocation_id,
                function_id: invocation.function_id.clone(),
                sandbox_name: name,
                created_at: Utc::now(),
            },
        );

        // Teardown below runs on every result of drive(); only a panic or a
        // dropped task skips it, and the lease covers that.
        let result = self.drive(sandbox.as_mut(), &invocation).await;

        self.factory.destroy(sandbox).await;
        lease.release();
        drop(staging);

        result
    }

    async fn drive(&self, sandbox: &mut dyn Sandbox, invocation: &Invocation) -> Result<Outcome> {
        self.provisioning_guard()
            .run(sandbox.start())
            .await
            .map_err(|e| self.provisioning_interrupted(e, "start", SandboxError::StartFailed))?
            .map_err(EngineError::Provisioning)?;

        let payload = encode_event(&invocation.event)?;
        let timeout = invocation.timeout();
        let guard = TimeoutGuard::new(timeout, self.shutdown.child_token());

        let exchange = async {
            // A sandbox that exits before reading stdin still reports its
            // exit status, so a failed write is not fatal on its own.
            if let Err(e) = sandbox.write_stdin(&payload).await {
                warn!(error = %e, "failed to deliver event");
            }
            sandbox.wait_exit(timeout).await
        };

        match guard.run(exchange).await {
            Ok(Ok(exit)) => Ok(classify(exit.exit_code, &exit.stdout, &exit.stderr)),
            Ok(Err(SandboxError::WaitTimeout(_))) | Err(GuardError::DeadlineExceeded) => {
                Ok(Outcome::Timeout)
            }
            Ok(Err(e)) => Err(EngineError::Sandbox(e)),
            Err(GuardError::Cancelled) => Err(EngineError::ShuttingDown),
        }
    }
}
