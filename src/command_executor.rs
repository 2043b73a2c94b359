//! command_executor.rs - Runs the shell commands that install modules are made of.
//!
//! Every side effect of an install goes through the `CommandExecutor` trait:
//! spawning a program and checking whether a path exists. Three
//! implementations exist:
//!
//! - `SystemExecutor` spawns real processes, streams their output into the
//!   log and registers each child with the process guard.
//! - `DryRunExecutor` lets read-only probes through and records everything else.
//! - `RecordingExecutor` is an in-memory fake with scripted exit codes and
//!   simulated effects, used by tests and by the dry-run plan.

use crate::error::{InstallError, Result};
use crate::process_guard::{ChildRegistry, CommandDeathPact};
use std::collections::HashSet;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread;
use tracing::{debug, info, warn};

/// A single external command: program, arguments, working directory, environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; `None` inherits the process working directory
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Probe commands (`which`) have no side effects and still run in dry-run mode
    pub read_only: bool,
}

impl CommandSpec {
    /// Create a command with no working directory and no extra environment
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
            read_only: false,
        }
    }

    /// Create a read-only probe command
    pub fn probe<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            read_only: true,
            ..Self::new(program, args)
        }
    }

    /// Run the command inside `dir`
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add environment variables
    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env.extend(env);
        self
    }

    /// Prefix the command with `sudo` when `elevate` is set
    pub fn elevated(self, elevate: bool) -> Self {
        if !elevate {
            return self;
        }
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            ..self
        }
    }

    /// The program followed by its arguments, as one line
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())?;
        if let Some(ref cwd) = self.cwd {
            write!(f, " (in {})", cwd.display())?;
        }
        Ok(())
    }
}

/// Output from a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
}

impl CommandOutput {
    /// Successful output with no captured text
    pub fn ok() -> Self {
        Self::with_exit_code(0)
    }

    /// Output for the given exit code with no captured text
    pub fn with_exit_code(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            success: code == 0,
            ..Self::default()
        }
    }

    /// Turn a non-zero exit into `InstallError::CommandFailed`
    pub fn ensure_success(self, spec: &CommandSpec) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(InstallError::CommandFailed {
                command: spec.command_line(),
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Side-effect surface of the installer.
pub trait CommandExecutor {
    /// Run a command to completion and return its output.
    ///
    /// A non-zero exit is *not* an error here; callers decide via
    /// `CommandOutput::ensure_success`. `Err` means the command could not run.
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Whether `path` exists on the target system
    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Run a command and fail unless it exits with status 0
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.execute(spec)?.ensure_success(spec)
    }
}

// ============================================================================
// System executor
// ============================================================================

/// Executes commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        Self
    }
}

/// Drain a child pipe on a helper thread, logging each line as it arrives.
///
/// Output of install commands is logged at info so it reaches the console
/// at the default level. Output of read-only checks stays at debug.
fn drain_pipe<R>(pipe: R, program: String, is_stderr: bool, echo: bool) -> thread::JoinHandle<String>
where
    R: Read + Send + 'static,
{
    // A scoped subscriber does not follow the reader onto its thread
    let dispatch = tracing::dispatcher::get_default(|current| current.clone());
    let marker = if is_stderr { " !" } else { "" };

    thread::spawn(move || {
        tracing::dispatcher::with_default(&dispatch, || {
            let mut captured = String::new();
            for line in BufReader::new(pipe).lines().map_while(std::result::Result::ok) {
                if echo {
                    info!(target: "flyingmonkeys::command", "[{}]{} {}", program, marker, line);
                } else {
                    debug!(target: "flyingmonkeys::command", "[{}]{} {}", program, marker, line);
                }
                captured.push_str(&line);
                captured.push('\n');
            }
            captured
        })
    })
}

impl CommandExecutor for SystemExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        info!(cwd = ?spec.cwd, "running: {}", spec.command_line());

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .with_death_pact();
        if let Some(ref cwd) = spec.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|source| InstallError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        let pid = child.id();
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }

        let stdout_reader = child
            .stdout
            .take()
            .map(|pipe| drain_pipe(pipe, spec.program.clone(), false, !spec.read_only));
        let stderr_reader = child
            .stderr
            .take()
            .map(|pipe| drain_pipe(pipe, spec.program.clone(), true, !spec.read_only));

        let status = child.wait();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }
        let status = status?;

        let join = |reader: Option<thread::JoinHandle<String>>| {
            reader
                .and_then(|handle| handle.join().ok())
                .unwrap_or_default()
        };
        let output = CommandOutput {
            stdout: join(stdout_reader),
            stderr: join(stderr_reader),
            exit_code: status.code(),
            success: status.success(),
        };

        if !output.success && !spec.read_only {
            warn!(
                "{} exited with {}",
                spec.command_line(),
                output
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string())
            );
        }
        Ok(output)
    }
}

// ============================================================================
// Dry-run executor
// ============================================================================

/// Runs probes for real, records everything else without executing it.
///
/// In this mode the installed/not-installed checks stay accurate so the
/// printed plan is realistic, while nothing on the system changes.
pub struct DryRunExecutor<E> {
    inner: E,
    planned: Mutex<Vec<CommandSpec>>,
}

impl<E: CommandExecutor> DryRunExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            planned: Mutex::new(Vec::new()),
        }
    }

    /// Mutating commands that would have run, in order
    pub fn planned(&self) -> Vec<CommandSpec> {
        self.planned
            .lock()
            .map(|planned| planned.clone())
            .unwrap_or_default()
    }
}

impl<E: CommandExecutor> CommandExecutor for DryRunExecutor<E> {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        if spec.read_only {
            return self.inner.execute(spec);
        }
        info!("[DRY RUN] would run: {}", spec);
        if let Ok(mut planned) = self.planned.lock() {
            planned.push(spec.clone());
        }
        Ok(CommandOutput::ok())
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.inner.path_exists(path)
    }
}

// ============================================================================
// Recording executor
// ============================================================================

/// Simulated consequence of a scripted command
#[derive(Debug, Clone, PartialEq, Eq)]
enum Effect {
    ExitCode(i32),
    CreatePath(PathBuf),
    ProvideCommand(String),
}

/// Matches a command by program and, optionally, one of its arguments
#[derive(Debug, Clone)]
struct Rule {
    program: String,
    arg: Option<String>,
    effect: Effect,
}

impl Rule {
    fn matches(&self, spec: &CommandSpec) -> bool {
        let program_matches = spec.program == self.program
            || (spec.program == "sudo" && spec.args.first() == Some(&self.program));
        program_matches
            && self
                .arg
                .as_ref()
                .is_none_or(|arg| spec.args.iter().any(|a| a == arg))
    }
}

/// In-memory executor that records commands instead of running them.
///
/// Every command succeeds unless a rule says otherwise. `which <name>`
/// succeeds only for names marked available, and `path_exists` answers from
/// a set of simulated paths, so installs can flip `is_installed` the way a
/// real install would.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    rules: Vec<Rule>,
    calls: Mutex<Vec<CommandSpec>>,
    probed_paths: Mutex<Vec<PathBuf>>,
    paths: Mutex<HashSet<PathBuf>>,
    commands: Mutex<HashSet<String>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `path` as already present
    pub fn with_existing_path(self, path: impl Into<PathBuf>) -> Self {
        if let Ok(mut paths) = self.paths.lock() {
            paths.insert(path.into());
        }
        self
    }

    /// Make `which <name>` succeed from the start
    pub fn with_available_command(self, name: impl Into<String>) -> Self {
        if let Ok(mut commands) = self.commands.lock() {
            commands.insert(name.into());
        }
        self
    }

    /// Commands for `program` (containing `arg`, if given) exit with `code`
    pub fn with_exit_code(mut self, program: &str, arg: Option<&str>, code: i32) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            arg: arg.map(str::to_string),
            effect: Effect::ExitCode(code),
        });
        self
    }

    /// After a matching command runs, `path` exists
    pub fn creates_path(mut self, program: &str, arg: Option<&str>, path: impl Into<PathBuf>) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            arg: arg.map(str::to_string),
            effect: Effect::CreatePath(path.into()),
        });
        self
    }

    /// After a matching command runs, `which <name>` succeeds
    pub fn provides_command(mut self, program: &str, arg: Option<&str>, name: &str) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            arg: arg.map(str::to_string),
            effect: Effect::ProvideCommand(name.to_string()),
        });
        self
    }

    /// Every command executed so far, probes included
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Executed commands that are not read-only probes
    pub fn mutating_calls(&self) -> Vec<CommandSpec> {
        self.calls().into_iter().filter(|c| !c.read_only).collect()
    }

    /// Command lines of the mutating calls, for compact assertions
    pub fn command_lines(&self) -> Vec<String> {
        self.mutating_calls()
            .iter()
            .map(CommandSpec::command_line)
            .collect()
    }

    /// Paths passed to `path_exists`, in order
    pub fn probed_paths(&self) -> Vec<PathBuf> {
        self.probed_paths.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Forget recorded calls and probes, keeping rules and simulated state
    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
        if let Ok(mut probes) = self.probed_paths.lock() {
            probes.clear();
        }
    }

    fn command_available(&self, name: &str) -> bool {
        self.commands
            .lock()
            .map(|commands| commands.contains(name))
            .unwrap_or(false)
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(spec.clone());
        }

        if spec.program == "which" {
            let found = spec
                .args
                .first()
                .is_some_and(|name| self.command_available(name));
            return Ok(CommandOutput::with_exit_code(if found { 0 } else { 1 }));
        }

        let mut exit_code = 0;
        for rule in self.rules.iter().filter(|rule| rule.matches(spec)) {
            match &rule.effect {
                Effect::ExitCode(code) => exit_code = *code,
                Effect::CreatePath(path) => {
                    if let Ok(mut paths) = self.paths.lock() {
                        paths.insert(path.clone());
                    }
                }
                Effect::ProvideCommand(name) => {
                    if let Ok(mut commands) = self.commands.lock() {
                        commands.insert(name.clone());
                    }
                }
            }
        }

        let mut output = CommandOutput::with_exit_code(exit_code);
        if exit_code != 0 {
            output.stderr = format!("{}: simulated failure", spec.program);
        }
        Ok(output)
    }

    fn path_exists(&self, path: &Path) -> bool {
        if let Ok(mut probes) = self.probed_paths.lock() {
            probes.push(path.to_path_buf());
        }
        self.paths
            .lock()
            .map(|paths| paths.contains(path))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;

    /// Log sink the test can read back
    #[derive(Clone, Default)]
    struct SharedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedLog {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    /// Run `spec` under an info-level console subscriber and return what it printed
    fn console_output(spec: &CommandSpec) -> String {
        let log = SharedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            SystemExecutor::new().execute(spec).unwrap();
        });
        log.contents()
    }

    #[test]
    fn test_elevated_prefixes_sudo() {
        let spec = CommandSpec::new("make", ["install"]).elevated(true);
        assert_eq!(spec.program, "sudo");
        assert_eq!(spec.args, vec!["make", "install"]);

        let spec = CommandSpec::new("make", ["install"]).elevated(false);
        assert_eq!(spec.command_line(), "make install");
    }

    #[test]
    fn test_display_includes_cwd() {
        let spec = CommandSpec::new("make", Vec::<String>::new()).in_dir("/tmp/build");
        assert_eq!(spec.to_string(), "make (in /tmp/build)");
    }

    #[test]
    fn test_ensure_success_maps_failure() {
        let spec = CommandSpec::new("wget", ["http://example.com/x"]);
        let mut output = CommandOutput::with_exit_code(8);
        output.stderr = "404 Not Found".to_string();
        let err = output.ensure_success(&spec).unwrap_err();
        match err {
            InstallError::CommandFailed { command, exit_code, stderr } => {
                assert_eq!(command, "wget http://example.com/x");
                assert_eq!(exit_code, Some(8));
                assert_eq!(stderr, "404 Not Found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_recording_executor_rules() {
        let exec = RecordingExecutor::new()
            .with_exit_code("make", None, 2)
            .provides_command("apt-get", Some("cmake"), "cmake");

        assert!(!exec.execute(&CommandSpec::probe("which", ["cmake"])).unwrap().success);
        let install = CommandSpec::new("apt-get", ["install", "-y", "cmake"]).elevated(true);
        assert!(exec.execute(&install).unwrap().success);
        assert!(exec.execute(&CommandSpec::probe("which", ["cmake"])).unwrap().success);

        let make = exec.execute(&CommandSpec::new("make", Vec::<String>::new())).unwrap();
        assert_eq!(make.exit_code, Some(2));

        assert_eq!(exec.calls().len(), 4);
        assert_eq!(exec.command_lines(), vec!["sudo apt-get install -y cmake", "make"]);
    }

    #[test]
    fn test_recording_executor_paths() {
        let exec = RecordingExecutor::new()
            .with_existing_path("/opt/present")
            .creates_path("mv", None, "/usr/local/bin/tool");

        assert!(exec.path_exists(Path::new("/opt/present")));
        assert!(!exec.path_exists(Path::new("/usr/local/bin/tool")));
        exec.execute(&CommandSpec::new("mv", ["tool", "/usr/local/bin/tool"]))
            .unwrap();
        assert!(exec.path_exists(Path::new("/usr/local/bin/tool")));
        assert_eq!(exec.probed_paths().len(), 3);

        exec.clear_calls();
        assert!(exec.calls().is_empty());
        assert!(exec.probed_paths().is_empty());
    }

    #[test]
    fn test_dry_run_records_mutations_and_forwards_probes() {
        let inner = RecordingExecutor::new().with_available_command("git");
        let dry = DryRunExecutor::new(inner);

        assert!(dry.execute(&CommandSpec::probe("which", ["git"])).unwrap().success);
        let out = dry
            .execute(&CommandSpec::new("rm", ["-rf", "/tmp/x"]))
            .unwrap();
        assert!(out.success);

        assert_eq!(dry.planned().len(), 1);
        assert_eq!(dry.planned()[0].command_line(), "rm -rf /tmp/x");
        assert_eq!(dry.inner.calls().len(), 1);
    }

    #[test]
    fn test_system_executor_captures_output() {
        let exec = SystemExecutor::new();
        let out = exec
            .execute(&CommandSpec::new("sh", ["-c", "echo hello; echo oops >&2; exit 3"]))
            .unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "oops\n");
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success);
    }

    #[test]
    fn test_system_executor_honors_cwd() {
        let dir = std::env::temp_dir();
        let exec = SystemExecutor::new();
        let out = exec
            .execute(&CommandSpec::new("pwd", Vec::<String>::new()).in_dir(&dir))
            .unwrap();
        let reported = PathBuf::from(out.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.canonicalize().unwrap()
        );
    }

    #[test]
    fn test_system_executor_spawn_failure() {
        let exec = SystemExecutor::new();
        let err = exec
            .execute(&CommandSpec::new("definitely-not-a-real-program-12345", Vec::<String>::new()))
            .unwrap_err();
        assert!(matches!(err, InstallError::Spawn { .. }));
    }

    #[test]
    fn test_install_output_reaches_console_at_default_level() {
        let printed = console_output(&CommandSpec::new(
            "sh",
            ["-c", "echo unpacking monkeys; echo warning: wings >&2"],
        ));
        assert!(printed.contains("running: sh -c"), "{printed}");
        assert!(printed.contains("[sh] unpacking monkeys"), "{printed}");
        assert!(printed.contains("[sh] ! warning: wings"), "{printed}");
    }

    #[test]
    fn test_read_only_check_output_stays_out_of_console() {
        let printed = console_output(&CommandSpec::probe("echo", ["/usr/bin/quiet-check"]));
        assert!(!printed.contains("[echo]"), "{printed}");
    }
}
