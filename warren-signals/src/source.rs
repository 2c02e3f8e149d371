//! Subscription to Unix signals, delivered as a single event stream.

use tokio::signal::unix::{signal, SignalKind as UnixSignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::disposition;
use crate::error::SignalError;
use crate::kind::{SignalKind, SignalSet};

/// Owns a subscription to an allow-list of signals.
///
/// Events come out of [`SignalSource::next`] in the order they were forwarded.
/// Dropping the source unsubscribes it.
pub struct SignalSource {
    events: mpsc::UnboundedReceiver<SignalKind>,
    forwarders: Vec<JoinHandle<()>>,
    /// Kinds holding an OS disposition through this source.
    registered: Vec<SignalKind>,
    kinds: SignalSet,
}

/// Delivers synthetic signals into a source created with [`SignalSource::manual`].
#[derive(Debug, Clone)]
pub struct SignalInjector {
    tx: mpsc::UnboundedSender<SignalKind>,
    kinds: SignalSet,
}

impl SignalInjector {
    /// Returns `false` if `kind` is outside the allow-list or the source has
    /// been unsubscribed.
    pub fn deliver(&self, kind: SignalKind) -> bool {
        self.kinds.contains(kind) && self.tx.send(kind).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl SignalSource {
    /// Register OS handlers for every kind in `kinds`.
    ///
    /// Must run inside a Tokio runtime. Either every subscription succeeds or
    /// the kinds registered so far are released again before the error returns.
    pub fn subscribe(kinds: SignalSet) -> Result<Self, SignalError> {
        if kinds.is_empty() {
            return Err(SignalError::EmptySignalSet);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SignalError::NoRuntime)?;

        let (tx, events) = mpsc::unbounded_channel();
        let wanted: Vec<SignalKind> = kinds.iter().collect();
        let mut subscription = Self {
            events,
            forwarders: Vec::with_capacity(wanted.len()),
            registered: Vec::with_capacity(wanted.len()),
            kinds,
        };
        for kind in wanted {
            // On error, dropping `subscription` releases what was registered.
            let mut stream =
                disposition::acquire(kind, || signal(UnixSignalKind::from_raw(kind.raw())))
                    .map_err(|source| SignalError::Subscribe { kind, source })?;
            subscription.registered.push(kind);

            let tx = tx.clone();
            subscription.forwarders.push(runtime.spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(kind).is_err() {
                        break;
                    }
                }
            }));
        }

        tracing::debug!(signals = subscription.registered.len(), "subscribed to OS signals");
        Ok(subscription)
    }

    /// A source fed only through the returned injector.
    pub fn manual(kinds: SignalSet) -> (Self, SignalInjector) {
        let (tx, events) = mpsc::unbounded_channel();
        let injector = SignalInjector {
            tx,
            kinds: kinds.clone(),
        };
        let source = Self {
            events,
            forwarders: Vec::new(),
            registered: Vec::new(),
            kinds,
        };
        (source, injector)
    }

    pub fn kinds(&self) -> &SignalSet {
        &self.kinds
    }

    /// Next delivered signal; `None` once every producer is gone or after
    /// [`SignalSource::unsubscribe`].
    pub async fn next(&mut self) -> Option<SignalKind> {
        self.events.recv().await
    }

    /// Stop future deliveries and hand the subscribed kinds back to the
    /// process. A signal already in flight may or may not be returned by a
    /// later `next`.
    pub fn unsubscribe(&mut self) {
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }
        if !self.registered.is_empty() {
            tracing::debug!(signals = self.registered.len(), "released OS signals");
        }
        for kind in self.registered.drain(..) {
            disposition::release(kind);
        }
        self.events.close();
    }
}

impl Drop for SignalSource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(kinds: &[SignalKind]) -> SignalSet {
        kinds.iter().copied().collect()
    }

    #[tokio::test]
    async fn manual_source_preserves_order_and_duplicates() {
        let (mut source, injector) =
            SignalSource::manual(set(&[SignalKind::Hangup, SignalKind::UserDefined1]));

        assert!(injector.deliver(SignalKind::UserDefined1));
        assert!(injector.deliver(SignalKind::Hangup));
        assert!(injector.deliver(SignalKind::UserDefined1));

        assert_eq!(source.next().await, Some(SignalKind::UserDefined1));
        assert_eq!(source.next().await, Some(SignalKind::Hangup));
        assert_eq!(source.next().await, Some(SignalKind::UserDefined1));
    }

    #[tokio::test]
    async fn manual_source_ignores_kinds_outside_allow_list() {
        let (mut source, injector) = SignalSource::manual(set(&[SignalKind::Hangup]));

        assert!(!injector.deliver(SignalKind::TerminateRequest));
        assert!(injector.deliver(SignalKind::Hangup));
        drop(injector);

        assert_eq!(source.next().await, Some(SignalKind::Hangup));
        assert_eq!(source.next().await, None);
    }

    #[tokio::test]
    async fn unsubscribe_rejects_further_deliveries() {
        let (mut source, injector) = SignalSource::manual(SignalSet::catchable());
        source.unsubscribe();

        assert!(injector.is_closed());
        assert!(!injector.deliver(SignalKind::Interrupt));
        assert_eq!(source.next().await, None);
    }

    #[test]
    fn subscribe_requires_a_runtime() {
        let err = SignalSource::subscribe(set(&[SignalKind::UserDefined2]))
            .err()
            .expect("no runtime");
        assert!(matches!(err, SignalError::NoRuntime), "got: {err}");
    }

    #[test]
    fn subscribe_rejects_an_empty_set() {
        let err = SignalSource::subscribe(SignalSet::empty())
            .err()
            .expect("empty set");
        assert!(matches!(err, SignalError::EmptySignalSet), "got: {err}");
    }
}
