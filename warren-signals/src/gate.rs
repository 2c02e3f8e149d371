use std::sync::atomic::{AtomicBool, Ordering};

/// Accepting/holding switch written by processor callers and read by the loop.
#[derive(Debug, Default)]
pub(crate) struct DispatchGate {
    holding: AtomicBool,
}

impl DispatchGate {
    /// Returns `true` if the gate was accepting before the call.
    pub(crate) fn hold(&self) -> bool {
        !self.holding.swap(true, Ordering::AcqRel)
    }

    /// Returns `true` if the gate was holding before the call.
    pub(crate) fn release(&self) -> bool {
        self.holding.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn is_holding(&self) -> bool {
        self.holding.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_accepting_and_reports_transitions() {
        let gate = DispatchGate::default();
        assert!(!gate.is_holding());

        assert!(gate.hold(), "first hold flips the gate");
        assert!(!gate.hold(), "second hold is a no-op");
        assert!(gate.is_holding());

        assert!(gate.release(), "release after hold flips the gate");
        assert!(!gate.release(), "second release is a no-op");
        assert!(!gate.is_holding());
    }
}
