use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::config::{ProcessorConfig, ResumePolicy};
use crate::dispatch::{self, Batch, SignalHandler};
use crate::error::SignalError;
use crate::gate::DispatchGate;
use crate::kind::SignalKind;
use crate::source::SignalSource;

/// Lifecycle of the processor loop. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Running,
    ShuttingDown,
    Stopped,
}

/// Handle to a running signal processor.
///
/// Signals from the source are appended to a pending batch. While dispatch is
/// accepting, every signal flushes the batch to the handler; while holding,
/// signals keep accumulating. Dropping the handle requests shutdown without
/// waiting for it.
pub struct SignalProcessor {
    gate: Arc<DispatchGate>,
    pending: Arc<AtomicUsize>,
    resume: ResumePolicy,
    resume_tx: mpsc::Sender<()>,
    shutdown_tx: mpsc::Sender<()>,
    state_rx: watch::Receiver<LifecycleState>,
}

impl SignalProcessor {
    /// Subscribe to every catchable signal and start the processor loop.
    pub fn start<H: SignalHandler>(handler: H) -> Result<Self, SignalError> {
        Self::start_with_config(handler, ProcessorConfig::default())
    }

    /// Subscribe to `config.signals` and start the processor loop.
    pub fn start_with_config<H: SignalHandler>(
        handler: H,
        config: ProcessorConfig,
    ) -> Result<Self, SignalError> {
        let source = SignalSource::subscribe(config.signals.clone())?;
        Self::start_with_source(handler, source, config)
    }

    /// Start the processor loop over an existing source.
    ///
    /// The source's own allow-list applies; `config.signals` is not consulted.
    pub fn start_with_source<H: SignalHandler>(
        handler: H,
        source: SignalSource,
        config: ProcessorConfig,
    ) -> Result<Self, SignalError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SignalError::NoRuntime)?;

        let gate = Arc::new(DispatchGate::default());
        let pending = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let (resume_tx, resume_rx) = mpsc::channel::<()>(1);
        let (state_tx, state_rx) = watch::channel(LifecycleState::Running);

        tracing::info!(
            signals = source.kinds().len(),
            resume = ?config.resume,
            drain_on_shutdown = config.drain_on_shutdown,
            "signal processor started",
        );

        let aggregator = Aggregator {
            source,
            handler: Arc::new(handler),
            gate: gate.clone(),
            pending: pending.clone(),
            batch: Batch::new(),
            dispatches: JoinSet::new(),
            drain_timeout: config.drain_on_shutdown.then(|| config.drain_timeout()),
            state_tx,
        };
        runtime.spawn(aggregator.run(shutdown_rx, resume_rx));

        Ok(Self {
            gate,
            pending,
            resume: config.resume,
            resume_tx,
            shutdown_tx,
            state_rx,
        })
    }

    /// Stop dispatching. Incoming signals keep accumulating.
    pub fn hold_signals(&self) {
        if self.gate.hold() {
            tracing::debug!("holding signal dispatch");
        }
    }

    /// Resume dispatching.
    ///
    /// Under [`ResumePolicy::Lazy`] the held batch is dispatched together with
    /// the next incoming signal; under [`ResumePolicy::Eager`] it is dispatched
    /// as soon as the loop observes the resume.
    pub fn stop_holding_signals(&self) {
        if !self.gate.release() {
            return;
        }
        tracing::debug!(resume = ?self.resume, "resumed signal dispatch");
        if self.resume == ResumePolicy::Eager {
            // A full queue already has a flush pending.
            let _ = self.resume_tx.try_send(());
        }
    }

    pub fn is_holding(&self) -> bool {
        self.gate.is_holding()
    }

    /// Signals recorded but not yet handed to the handler.
    pub fn pending_signals(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LifecycleState {
        *self.state_rx.borrow()
    }

    /// Stop the processor loop and cancel the subscription.
    ///
    /// Resolves once the loop has stopped; resolves immediately if it already
    /// has. Safe to call repeatedly and concurrently. Handler calls that are
    /// still running are not awaited unless `drain_on_shutdown` is set.
    pub async fn shut_down(&self) {
        match self.shutdown_tx.try_send(()) {
            Ok(()) => tracing::debug!("shutdown requested"),
            Err(TrySendError::Full(())) => tracing::debug!("shutdown already requested"),
            Err(TrySendError::Closed(())) => return,
        }

        let mut state = self.state_rx.clone();
        // Err means the loop is gone without reporting, which is just as final.
        let _ = state
            .wait_for(|state| *state == LifecycleState::Stopped)
            .await;
    }
}

impl Drop for SignalProcessor {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
    }
}

/// The processor loop. Sole owner of the pending batch.
struct Aggregator {
    source: SignalSource,
    handler: Arc<dyn SignalHandler>,
    gate: Arc<DispatchGate>,
    pending: Arc<AtomicUsize>,
    batch: Batch,
    dispatches: JoinSet<()>,
    drain_timeout: Option<Duration>,
    state_tx: watch::Sender<LifecycleState>,
}

impl Aggregator {
    async fn run(
        mut self,
        mut shutdown_rx: mpsc::Receiver<()>,
        mut resume_rx: mpsc::Receiver<()>,
    ) {
        let mut source_open = true;

        loop {
            tokio::select! {
                request = shutdown_rx.recv() => {
                    if request.is_none() {
                        tracing::debug!("processor handle dropped");
                    }
                    break;
                }
                event = self.source.next(), if source_open => match event {
                    Some(kind) => self.record(kind),
                    None => {
                        tracing::debug!("signal source closed; waiting for shutdown");
                        source_open = false;
                    }
                },
                Some(()) = resume_rx.recv() => self.flush_after_resume(),
                Some(result) = self.dispatches.join_next(), if !self.dispatches.is_empty() => {
                    dispatch::reap(result);
                }
            }
        }

        self.finish().await;
    }

    fn record(&mut self, kind: SignalKind) {
        self.batch.push(kind);
        self.pending.store(self.batch.len(), Ordering::Release);

        if self.gate.is_holding() {
            tracing::debug!(signal = %kind, held = self.batch.len(), "signal held");
            return;
        }
        tracing::debug!(signal = %kind, "signal received");
        self.flush();
    }

    fn flush_after_resume(&mut self) {
        if !self.gate.is_holding() && !self.batch.is_empty() {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let batch = std::mem::take(&mut self.batch);
        self.pending.store(0, Ordering::Release);
        dispatch::spawn(&mut self.dispatches, &self.handler, batch);
    }

    async fn finish(mut self) {
        self.source.unsubscribe();
        self.state_tx.send_replace(LifecycleState::ShuttingDown);

        if !self.batch.is_empty() {
            tracing::debug!(
                held = self.batch.len(),
                "discarding undispatched signals at shutdown"
            );
        }

        match self.drain_timeout {
            Some(timeout) => self.drain(timeout).await,
            None => self.dispatches.detach_all(),
        }

        self.state_tx.send_replace(LifecycleState::Stopped);
        tracing::info!("signal processor stopped");
    }

    async fn drain(&mut self, timeout: Duration) {
        let dispatches = &mut self.dispatches;
        let drained = tokio::time::timeout(timeout, async {
            while let Some(result) = dispatches.join_next().await {
                dispatch::reap(result);
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                in_flight = self.dispatches.len(),
                timeout_ms = timeout.as_millis() as u64,
                "timed out waiting for signal handlers",
            );
            self.dispatches.detach_all();
        }
    }
}
