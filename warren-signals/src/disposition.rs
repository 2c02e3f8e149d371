//! Process-wide signal dispositions.
//!
//! Tokio installs its OS handler the first time a signal is listened for and
//! leaves it in place for the life of the process. Sources register through
//! this table instead, so when the last source holding a kind lets go, the
//! disposition the process had before the first subscription comes back. The
//! runtime's handler is parked and reinstated by the next subscription.

use std::collections::BTreeMap;
use std::io;
use std::mem::MaybeUninit;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::kind::SignalKind;

struct Entry {
    holders: usize,
    original: libc::sigaction,
    parked: Option<libc::sigaction>,
}

static DISPOSITIONS: Mutex<BTreeMap<SignalKind, Entry>> = Mutex::new(BTreeMap::new());

fn table() -> MutexGuard<'static, BTreeMap<SignalKind, Entry>> {
    DISPOSITIONS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `install` to start intercepting `kind`, remembering what it replaces.
///
/// `install` runs under the table lock and must not call back into it.
pub(crate) fn acquire<T>(
    kind: SignalKind,
    install: impl FnOnce() -> io::Result<T>,
) -> io::Result<T> {
    let mut table = table();
    match table.get_mut(&kind) {
        Some(entry) => {
            if let Some(handler) = entry.parked.take() {
                if let Err(err) = swap(kind, &handler) {
                    entry.parked = Some(handler);
                    return Err(err);
                }
                tracing::debug!(signal = %kind, "reinstated signal handler");
            }
            match install() {
                Ok(value) => {
                    entry.holders += 1;
                    Ok(value)
                }
                Err(err) => {
                    if entry.holders == 0 {
                        park(kind, entry);
                    }
                    Err(err)
                }
            }
        }
        None => {
            let original = current(kind)?;
            let value = install()?;
            table.insert(
                kind,
                Entry {
                    holders: 1,
                    original,
                    parked: None,
                },
            );
            Ok(value)
        }
    }
}

/// Drop one hold on `kind`; the last one restores the original disposition.
pub(crate) fn release(kind: SignalKind) {
    let mut table = table();
    let Some(entry) = table.get_mut(&kind) else {
        return;
    };
    entry.holders = entry.holders.saturating_sub(1);
    if entry.holders == 0 {
        park(kind, entry);
    }
}

fn park(kind: SignalKind, entry: &mut Entry) {
    match swap(kind, &entry.original) {
        Ok(handler) => {
            entry.parked = Some(handler);
            tracing::debug!(signal = %kind, "restored signal disposition");
        }
        Err(err) => {
            tracing::warn!(signal = %kind, error = %err, "failed to restore signal disposition");
        }
    }
}

fn current(kind: SignalKind) -> io::Result<libc::sigaction> {
    let mut action = MaybeUninit::<libc::sigaction>::uninit();
    // SAFETY: a null new action only reads the current disposition.
    let rc = unsafe { libc::sigaction(kind.raw(), std::ptr::null(), action.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: sigaction succeeded and filled `action`.
    Ok(unsafe { action.assume_init() })
}

fn swap(kind: SignalKind, action: &libc::sigaction) -> io::Result<libc::sigaction> {
    let mut previous = MaybeUninit::<libc::sigaction>::uninit();
    // SAFETY: `action` was read back from the kernel for this signal, so its
    // handler is a disposition constant or a function that is still mapped.
    let rc = unsafe { libc::sigaction(kind.raw(), action, previous.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: sigaction succeeded and filled `previous`.
    Ok(unsafe { previous.assume_init() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler_of(kind: SignalKind) -> libc::sighandler_t {
        current(kind).expect("query disposition").sa_sigaction
    }

    #[test]
    fn last_release_restores_and_next_acquire_reinstates() {
        let kind = SignalKind::WindowChange;
        let before = handler_of(kind);
        let mut replacement = current(kind).expect("query disposition");
        replacement.sa_sigaction = if before == libc::SIG_IGN {
            libc::SIG_DFL
        } else {
            libc::SIG_IGN
        };
        let installed = replacement.sa_sigaction;

        acquire(kind, || swap(kind, &replacement).map(drop)).expect("first hold");
        acquire(kind, || Ok(())).expect("second hold");
        assert_eq!(handler_of(kind), installed);

        release(kind);
        assert_eq!(handler_of(kind), installed, "one holder left");
        release(kind);
        assert_eq!(handler_of(kind), before, "original disposition back");

        acquire(kind, || Ok(())).expect("hold again");
        assert_eq!(handler_of(kind), installed, "parked handler reinstated");
        release(kind);
        assert_eq!(handler_of(kind), before);
    }

    #[test]
    fn failed_install_leaves_disposition_untouched() {
        let kind = SignalKind::UrgentData;
        let before = handler_of(kind);

        let err = acquire(kind, || -> io::Result<()> { Err(io::Error::other("refused")) })
            .unwrap_err();
        assert_eq!(err.to_string(), "refused");
        assert_eq!(handler_of(kind), before);

        release(kind);
        assert_eq!(handler_of(kind), before, "release without a hold is a no-op");
    }
}
