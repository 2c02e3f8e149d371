//! Handing batches to the pluggable handler.

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};

use crate::kind::SignalKind;

/// Signals in the order the processor observed them. Duplicates are kept.
pub type Batch = Vec<SignalKind>;

/// Consumer of dispatched batches.
///
/// Calls may overlap: a burst of signals while dispatch is accepting produces one
/// call per flush, each on its own blocking-pool thread, in no guaranteed order.
/// Handlers run on the blocking pool, so they may block.
pub trait SignalHandler: Send + Sync + 'static {
    fn handle_signals(&self, signals: Batch);
}

impl<F> SignalHandler for F
where
    F: Fn(Batch) + Send + Sync + 'static,
{
    fn handle_signals(&self, signals: Batch) {
        self(signals)
    }
}

/// Move `batch` into a new handler call tracked by `tasks`.
pub(crate) fn spawn(tasks: &mut JoinSet<()>, handler: &Arc<dyn SignalHandler>, batch: Batch) {
    let handler = Arc::clone(handler);
    let batch_len = batch.len();
    tasks.spawn_blocking(move || handler.handle_signals(batch));
    tracing::debug!(batch_len, in_flight = tasks.len(), "dispatched signal batch");
}

/// Log the outcome of a finished handler call.
pub(crate) fn reap(result: Result<(), JoinError>) {
    match result {
        Ok(()) => {}
        Err(err) if err.is_panic() => {
            tracing::warn!(error = %err, "signal handler panicked");
        }
        Err(err) => {
            tracing::debug!(error = %err, "signal handler task cancelled");
        }
    }
}
