//! Signal kinds the processor can subscribe to.
//!
//! The set is closed: only signals a process can safely intercept are listed.
//! SIGKILL and SIGSTOP cannot be caught at all, and the synchronous fault signals
//! (SIGILL, SIGFPE, SIGSEGV, SIGBUS) would re-fault forever if a handler just
//! recorded them and returned. Aliases that share a signal number (SIGCLD,
//! SIGIOT, SIGPOLL, SIGUNUSED) parse to their canonical kind.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::SignalError;

// ---------------------------------------------------------------------------
// SignalKind
// ---------------------------------------------------------------------------

/// One catchable Unix signal, identified by a stable kebab-case label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum SignalKind {
    Abort,
    Alarm,
    ChildStatus,
    Continue,
    Hangup,
    Interrupt,
    IoReady,
    BrokenPipe,
    ProfilingTimer,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    PowerFailure,
    Quit,
    #[cfg(all(
        any(target_os = "linux", target_os = "android"),
        not(any(
            target_arch = "mips",
            target_arch = "mips32r6",
            target_arch = "mips64",
            target_arch = "mips64r6",
            target_arch = "sparc64"
        ))
    ))]
    StackFault,
    BadSyscall,
    TerminateRequest,
    Trap,
    TerminalStop,
    TtyInput,
    TtyOutput,
    UrgentData,
    UserDefined1,
    UserDefined2,
    VirtualAlarm,
    WindowChange,
    CpuLimit,
    FileSizeLimit,
}

impl SignalKind {
    /// Every kind this platform can subscribe to, in declaration order.
    pub const ALL: &'static [SignalKind] = &[
        SignalKind::Abort,
        SignalKind::Alarm,
        SignalKind::ChildStatus,
        SignalKind::Continue,
        SignalKind::Hangup,
        SignalKind::Interrupt,
        SignalKind::IoReady,
        SignalKind::BrokenPipe,
        SignalKind::ProfilingTimer,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        SignalKind::PowerFailure,
        SignalKind::Quit,
        #[cfg(all(
            any(target_os = "linux", target_os = "android"),
            not(any(
                target_arch = "mips",
                target_arch = "mips32r6",
                target_arch = "mips64",
                target_arch = "mips64r6",
                target_arch = "sparc64"
            ))
        ))]
        SignalKind::StackFault,
        SignalKind::BadSyscall,
        SignalKind::TerminateRequest,
        SignalKind::Trap,
        SignalKind::TerminalStop,
        SignalKind::TtyInput,
        SignalKind::TtyOutput,
        SignalKind::UrgentData,
        SignalKind::UserDefined1,
        SignalKind::UserDefined2,
        SignalKind::VirtualAlarm,
        SignalKind::WindowChange,
        SignalKind::CpuLimit,
        SignalKind::FileSizeLimit,
    ];

    /// Stable label used in config files, logs, and CLI output.
    pub fn label(self) -> &'static str {
        match self {
            SignalKind::Abort => "abort",
            SignalKind::Alarm => "alarm",
            SignalKind::ChildStatus => "child-status",
            SignalKind::Continue => "continue",
            SignalKind::Hangup => "hangup",
            SignalKind::Interrupt => "interrupt",
            SignalKind::IoReady => "io-ready",
            SignalKind::BrokenPipe => "broken-pipe",
            SignalKind::ProfilingTimer => "profiling-timer",
            #[cfg(any(target_os = "linux", target_os = "android"))]
            SignalKind::PowerFailure => "power-failure",
            SignalKind::Quit => "quit",
            #[cfg(all(
                any(target_os = "linux", target_os = "android"),
                not(any(
                    target_arch = "mips",
                    target_arch = "mips32r6",
                    target_arch = "mips64",
                    target_arch = "mips64r6",
                    target_arch = "sparc64"
                ))
            ))]
            SignalKind::StackFault => "stack-fault",
            SignalKind::BadSyscall => "bad-syscall",
            SignalKind::TerminateRequest => "terminate-request",
            SignalKind::Trap => "trap",
            SignalKind::TerminalStop => "terminal-stop",
            SignalKind::TtyInput => "tty-input",
            SignalKind::TtyOutput => "tty-output",
            SignalKind::UrgentData => "urgent-data",
            SignalKind::UserDefined1 => "user-defined-1",
            SignalKind::UserDefined2 => "user-defined-2",
            SignalKind::VirtualAlarm => "virtual-alarm",
            SignalKind::WindowChange => "window-change",
            SignalKind::CpuLimit => "cpu-limit",
            SignalKind::FileSizeLimit => "file-size-limit",
        }
    }

    pub fn as_signal(self) -> Signal {
        match self {
            SignalKind::Abort => Signal::SIGABRT,
            SignalKind::Alarm => Signal::SIGALRM,
            SignalKind::ChildStatus => Signal::SIGCHLD,
            SignalKind::Continue => Signal::SIGCONT,
            SignalKind::Hangup => Signal::SIGHUP,
            SignalKind::Interrupt => Signal::SIGINT,
            SignalKind::IoReady => Signal::SIGIO,
            SignalKind::BrokenPipe => Signal::SIGPIPE,
            SignalKind::ProfilingTimer => Signal::SIGPROF,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            SignalKind::PowerFailure => Signal::SIGPWR,
            SignalKind::Quit => Signal::SIGQUIT,
            #[cfg(all(
                any(target_os = "linux", target_os = "android"),
                not(any(
                    target_arch = "mips",
                    target_arch = "mips32r6",
                    target_arch = "mips64",
                    target_arch = "mips64r6",
                    target_arch = "sparc64"
                ))
            ))]
            SignalKind::StackFault => Signal::SIGSTKFLT,
            SignalKind::BadSyscall => Signal::SIGSYS,
            SignalKind::TerminateRequest => Signal::SIGTERM,
            SignalKind::Trap => Signal::SIGTRAP,
            SignalKind::TerminalStop => Signal::SIGTSTP,
            SignalKind::TtyInput => Signal::SIGTTIN,
            SignalKind::TtyOutput => Signal::SIGTTOU,
            SignalKind::UrgentData => Signal::SIGURG,
            SignalKind::UserDefined1 => Signal::SIGUSR1,
            SignalKind::UserDefined2 => Signal::SIGUSR2,
            SignalKind::VirtualAlarm => Signal::SIGVTALRM,
            SignalKind::WindowChange => Signal::SIGWINCH,
            SignalKind::CpuLimit => Signal::SIGXCPU,
            SignalKind::FileSizeLimit => Signal::SIGXFSZ,
        }
    }

    /// Conventional OS name, e.g. `SIGTERM`.
    pub fn os_name(self) -> &'static str {
        self.as_signal().as_str()
    }

    /// Raw signal number on this platform.
    pub fn raw(self) -> i32 {
        self.as_signal() as i32
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SignalKind {
    type Err = SignalError;

    /// Accepts a label (`terminate-request`), an OS name (`SIGTERM`), or an OS
    /// name without its prefix (`term`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        if let Some(kind) = SignalKind::ALL.iter().find(|kind| kind.label() == lower) {
            return Ok(*kind);
        }

        let upper = trimmed.to_ascii_uppercase();
        let name = if upper.starts_with("SIG") {
            upper
        } else {
            format!("SIG{upper}")
        };
        match name.as_str() {
            "SIGCLD" => return Ok(SignalKind::ChildStatus),
            "SIGIOT" => return Ok(SignalKind::Abort),
            "SIGPOLL" => return Ok(SignalKind::IoReady),
            "SIGUNUSED" => return Ok(SignalKind::BadSyscall),
            "SIGKILL" | "SIGSTOP" | "SIGILL" | "SIGFPE" | "SIGSEGV" | "SIGBUS" => {
                return Err(SignalError::NotCatchable(name));
            }
            _ => {}
        }

        SignalKind::ALL
            .iter()
            .find(|kind| kind.os_name() == name)
            .copied()
            .ok_or_else(|| SignalError::UnknownSignal(trimmed.to_string()))
    }
}

impl TryFrom<String> for SignalKind {
    type Error = SignalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for SignalKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// SignalSet
// ---------------------------------------------------------------------------

/// The allow-list of signal kinds a source subscribes to.
///
/// Defaults to every catchable kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalSet(BTreeSet<SignalKind>);

impl SignalSet {
    pub fn catchable() -> Self {
        Self(SignalKind::ALL.iter().copied().collect())
    }

    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, kind: SignalKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SignalKind> + '_ {
        self.0.iter().copied()
    }
}

impl Default for SignalSet {
    fn default() -> Self {
        Self::catchable()
    }
}

impl FromIterator<SignalKind> for SignalSet {
    fn from_iter<I: IntoIterator<Item = SignalKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
