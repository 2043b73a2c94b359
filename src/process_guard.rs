//! Keeps install commands from outliving the installer
//!
//! A commit can run package managers and compilers for minutes. When the
//! installer goes away (Ctrl+C, SIGTERM, closed terminal) those commands go
//! with it:
//!
//! - every spawned command is tracked in a global registry while it runs
//! - on SIGINT/SIGTERM/SIGHUP tracked commands get SIGTERM, then SIGKILL
//! - unprivileged commands also get `PR_SET_PDEATHSIG`, so the kernel stops
//!   them if we crash
//!
//! The kernel clears the parent-death signal when it executes a setuid
//! program, so a `sudo` command is only covered by the registry. `sudo`
//! relays the SIGTERM it receives to the command it runs. A crash that skips
//! the signal handler leaves elevated commands running.
//!
//! Commands stay in the terminal's foreground process group so `sudo` can
//! still prompt for a password.

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

static REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Set while the checklist has the terminal in raw mode on the alternate screen
static SCREEN_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Grace period for commands still running when a commit is abandoned
const DROP_GRACE: Duration = Duration::from_secs(5);
/// Grace period after a termination signal
const SIGNAL_GRACE: Duration = Duration::from_secs(3);

/// PIDs of install commands that are currently running
#[derive(Debug, Default)]
pub struct ChildRegistry {
    running: HashSet<u32>,
    /// Set once a shutdown started; later shutdowns are no-ops
    stopping: bool,
}

impl ChildRegistry {
    /// The process-wide registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        debug!("Tracking install command PID {}", pid);
        self.running.insert(pid);
    }

    /// Called once the command has been reaped
    pub fn unregister(&mut self, pid: u32) {
        if self.running.remove(&pid) {
            debug!("PID {} finished", pid);
        }
    }

    pub fn count(&self) -> usize {
        self.running.len()
    }

    /// SIGTERM every tracked command, SIGKILL whatever survives `grace`.
    pub fn terminate_all(&mut self, grace: Duration) {
        if std::mem::replace(&mut self.stopping, true) {
            return;
        }
        let pids: Vec<u32> = self.running.drain().collect();
        if pids.is_empty() {
            return;
        }

        info!("Stopping {} running install command(s)", pids.len());
        signal_each(&pids, Signal::SIGTERM);

        let deadline = Instant::now() + grace;
        let mut survivors = pids;
        loop {
            survivors.retain(|&pid| is_running(pid));
            if survivors.is_empty() {
                info!("All install commands stopped");
                return;
            }
            if Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        warn!("{} command(s) ignored SIGTERM, killing", survivors.len());
        signal_each(&survivors, Signal::SIGKILL);
    }
}

fn signal_each(pids: &[u32], sig: Signal) {
    for &pid in pids {
        if let Err(e) = signal::kill(Pid::from_raw(pid as i32), sig) {
            error!("Could not send {} to PID {}: {}", sig, pid, e);
        }
    }
}

/// Alive and not a zombie
fn is_running(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }
    // The state is the field after the parenthesised command name
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_none_or(|state| !matches!(state, "Z" | "X")),
        Err(_) => true,
    }
}

/// Held for the duration of a commit; stops any command still running
/// when dropped.
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
}

impl ProcessGuard {
    pub fn new() -> Self {
        Self {
            registry: ChildRegistry::global(),
        }
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.lock() {
            if registry.count() > 0 {
                debug!("Commit ended with commands still running");
                registry.terminate_all(DROP_GRACE);
            }
        }
    }
}

/// Record that the checklist took over the terminal (or gave it back).
pub fn set_screen_active(active: bool) {
    SCREEN_ACTIVE.store(active, Ordering::SeqCst);
}

/// Leave raw mode and the alternate screen if the checklist still holds them.
///
/// Only the first call after `set_screen_active(true)` touches the terminal;
/// returns whether it did.
pub fn restore_screen() -> bool {
    if !SCREEN_ACTIVE.swap(false, Ordering::SeqCst) {
        return false;
    }
    if let Err(e) = crossterm::terminal::disable_raw_mode() {
        warn!("Could not leave raw mode: {}", e);
    }
    if let Err(e) = crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    ) {
        warn!("Could not leave the alternate screen: {}", e);
    }
    true
}

/// Stop tracked commands, restore the terminal and exit on SIGINT, SIGTERM
/// or SIGHUP.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let name = Signal::try_from(sig).map_or("signal", Signal::as_str);
            info!("Received {}, stopping install commands", name);
            restore_screen();
            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(SIGNAL_GRACE);
            }
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for `std::process::Command`: the child dies with the installer.
///
/// Has no effect on setuid programs such as `sudo`; those are stopped through
/// [`ChildRegistry::terminate_all`].
pub trait CommandDeathPact {
    fn with_death_pact(&mut self) -> &mut Self;
}

impl CommandDeathPact for std::process::Command {
    fn with_death_pact(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: prctl is async-signal-safe and touches no parent state
        unsafe {
            self.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_register_and_unregister() {
        let mut registry = ChildRegistry::default();
        registry.register(41);
        registry.register(42);
        registry.unregister(41);
        registry.unregister(7);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_terminate_stops_running_command() {
        let mut child = Command::new("sleep")
            .arg("60")
            .with_death_pact()
            .spawn()
            .expect("spawn sleep");

        let mut registry = ChildRegistry::default();
        registry.register(child.id());
        assert!(is_running(child.id()));

        registry.terminate_all(Duration::from_millis(500));

        assert!(!child.wait().expect("wait").success());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_second_terminate_is_a_no_op() {
        let mut registry = ChildRegistry::default();
        registry.terminate_all(Duration::from_millis(10));
        assert!(registry.stopping);

        registry.register(999_999);
        registry.terminate_all(Duration::from_millis(10));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_unknown_pid_is_not_running() {
        assert!(!is_running(999_999));
    }

    #[test]
    fn test_screen_restored_only_while_active() {
        assert!(!restore_screen());

        set_screen_active(true);
        assert!(restore_screen());
        assert!(!restore_screen(), "a second restore leaves the terminal alone");

        set_screen_active(true);
        set_screen_active(false);
        assert!(!restore_screen());
    }

    #[test]
    fn test_terminate_stops_command_behind_wrapper() {
        // `sudo` is not available in tests; an `sh` parent that relays
        // SIGTERM to its child stands in for it, with the pact on the wrapper
        let mut wrapper = Command::new("sh")
            .args(["-c", "sleep 60 & child=$!; trap 'kill $child; exit 143' TERM; wait $child"])
            .with_death_pact()
            .spawn()
            .expect("spawn wrapper");

        let mut registry = ChildRegistry::default();
        registry.register(wrapper.id());
        std::thread::sleep(Duration::from_millis(100));

        registry.terminate_all(Duration::from_secs(2));

        assert!(!wrapper.wait().expect("wait").success());
    }

    #[test]
    fn test_death_pact_command_runs() {
        let status = Command::new("true")
            .with_death_pact()
            .status()
            .expect("run true");
        assert!(status.success());
    }
}
