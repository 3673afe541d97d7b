//! Stale-pid liveness probe (§5 "Stale-worker recovery"): every claim
//! operation reads the holder's pid and probes liveness before deciding
//! whether to steal the claim.

/// Thin wrapper around a zero-signal `kill(pid, 0)` probe.
pub struct PidLiveness;

impl PidLiveness {
    /// The current process's pid, stamped into every claim row this process writes.
    pub fn current_pid() -> u32 {
        std::process::id()
    }

    /// Probes whether `pid` names a live process. A dead holder's row is
    /// deleted and the claim retried by the caller (§5).
    #[cfg(unix)]
    pub fn is_alive(pid: u32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        // Signal 0 performs no actual signal delivery; it only validates that
        // the pid exists and is reachable from this process.
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    #[cfg(not(unix))]
    pub fn is_alive(pid: u32) -> bool {
        // No portable zero-signal probe off Unix; treat our own pid as the
        // only one we can vouch for and anything else as stale so crash
        // recovery stays safe (steals rather than deadlocks).
        pid == Self::current_pid()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(PidLiveness::is_alive(PidLiveness::current_pid()));
    }

    #[test]
    fn an_implausible_pid_is_not_alive() {
        // PID_MAX on Linux defaults to 4194304; anything far beyond it will
        // never be a live process.
        assert!(!PidLiveness::is_alive(u32::MAX - 1));
    }
}
