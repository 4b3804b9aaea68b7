use crate::config::TransactorSettings;
use crate::store::{DirStateStore, StateStore};
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of applying one recorded state to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionOutcome {
    /// The snapshot was committed and compare-config reports no differences.
    Success,
    /// The snapshot was committed but the device still differs from it.
    OutOfSync,
    /// The transaction could not be applied.
    TransactionFailed,
}

impl TransitionOutcome {
    pub fn is_success(self) -> bool {
        self == TransitionOutcome::Success
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransitionOutcome::Success => "success",
            TransitionOutcome::OutOfSync => "out-of-sync",
            TransitionOutcome::TransactionFailed => "transaction-failed",
        }
    }
}

impl fmt::Display for TransitionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moves a device's live configuration to a recorded state.
///
/// This is the only way the exploration engine touches a device. One call
/// replaces the whole configuration with the snapshot, commits it and checks
/// that the device agrees with it afterwards.
///
/// Implementations must never panic or return errors for transaction
/// problems; every failure is reported as [`TransitionOutcome::TransactionFailed`].
pub trait ConfigTransactor {
    /// Applies the snapshot recorded as `state` to `device`.
    ///
    /// # Arguments
    /// * `device`: Name of the managed device.
    /// * `state`: Name of a state recorded for that device.
    ///
    /// # Returns
    /// [`TransitionOutcome::Success`] when the commit went through and the device
    /// matches the snapshot, [`TransitionOutcome::OutOfSync`] when it committed but
    /// still differs, and [`TransitionOutcome::TransactionFailed`] otherwise.
    fn transition_to(&mut self, device: &str, state: &str) -> TransitionOutcome;
}

impl<T: ConfigTransactor + ?Sized> ConfigTransactor for Box<T> {
    fn transition_to(&mut self, device: &str, state: &str) -> TransitionOutcome {
        (**self).transition_to(device, state)
    }
}

/// How long to wait for a helper's output pipes to close once it has exited.
/// A background process it left behind may hold them open much longer.
const OUTPUT_GRACE: Duration = Duration::from_millis(200);

/// Output of one finished helper command.
#[derive(Debug)]
struct CommandOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// Reads `pipe` to the end on its own thread. The thread exits once every
/// holder of the write end has closed it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<String>> {
    let mut pipe = pipe?;
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    Some(rx)
}

fn collect(output: Option<Receiver<String>>) -> String {
    output
        .and_then(|rx| rx.recv_timeout(OUTPUT_GRACE).ok())
        .unwrap_or_default()
}

/// A [`ConfigTransactor`] that shells out to two helper commands: one applying
/// a snapshot to the device, one comparing the device against its snapshot.
///
/// Every argument may contain the placeholders `{device}`, `{state}` and
/// `{snapshot}`; they are substituted before spawning.
#[derive(Debug)]
pub struct CommandTransactor {
    store: DirStateStore,
    apply_command: Vec<String>,
    compare_command: Vec<String>,
    timeout: Duration,
}

impl CommandTransactor {
    pub fn new(store: DirStateStore, settings: &TransactorSettings) -> Self {
        Self {
            store,
            apply_command: settings.apply_command.clone(),
            compare_command: settings.compare_command.clone(),
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }

    fn expand(template: &[String], device: &str, state: &str, snapshot: &Path) -> Vec<String> {
        let snapshot = snapshot.to_string_lossy();
        template
            .iter()
            .map(|arg| {
                arg.replace("{device}", device)
                    .replace("{state}", state)
                    .replace("{snapshot}", &snapshot)
            })
            .collect()
    }

    fn wait_with_timeout(&self, child: &mut Child) -> Result<ExitStatus, String> {
        let start_time = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if start_time.elapsed() > self.timeout {
                        warn!(timeout = ?self.timeout, "helper command timed out, killing");
                        if let Err(e) = child.kill() {
                            return Err(format!("Failed to kill timed-out process: {e}"));
                        }
                        let _ = child.wait();
                        return Err("timed out".to_string());
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(e) => return Err(format!("Error waiting for child: {e}")),
            }
        }
    }

    fn run(&self, argv: &[String]) -> Result<CommandOutput, String> {
        let Some((program, args)) = argv.split_first() else {
            return Err("command is not configured".to_string());
        };
        debug!(command = ?argv, "running helper command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("Failed to spawn command '{:?}': {}", argv, e))?;

        // Both pipes must be drained while polling or a full pipe blocks the child.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait_with_timeout(&mut child);
        let stdout = collect(stdout);
        let stderr = collect(stderr);
        match status {
            Ok(status) => Ok(CommandOutput {
                status,
                stdout,
                stderr,
            }),
            Err(e) if stderr.trim().is_empty() => Err(e),
            Err(e) => Err(format!("{e}: {}", stderr.trim())),
        }
    }
}

impl ConfigTransactor for CommandTransactor {
    fn transition_to(&mut self, device: &str, state: &str) -> TransitionOutcome {
        let snapshot = match self.store.snapshot_path(device, state) {
            Ok(path) => path,
            Err(e) => {
                warn!(device, state, error = %e, "cannot resolve snapshot");
                return TransitionOutcome::TransactionFailed;
            }
        };

        let apply = Self::expand(&self.apply_command, device, state, &snapshot);
        match self.run(&apply) {
            Ok(output) if output.status.success() => debug!(device, state, "committed"),
            Ok(output) => {
                warn!(
                    device,
                    state,
                    status = ?output.status,
                    stderr = output.stderr.trim(),
                    "apply command failed"
                );
                return TransitionOutcome::TransactionFailed;
            }
            Err(e) => {
                warn!(device, state, error = %e, "apply command failed");
                return TransitionOutcome::TransactionFailed;
            }
        }

        let compare = Self::expand(&self.compare_command, device, state, &snapshot);
        match self.run(&compare) {
            Ok(output) if output.status.success() => {
                let diff = output.stdout.trim();
                if diff.is_empty() {
                    debug!(device, state, "in sync");
                    TransitionOutcome::Success
                } else {
                    debug!(device, state, diff, "out of sync");
                    TransitionOutcome::OutOfSync
                }
            }
            Ok(output) => {
                warn!(
                    device,
                    state,
                    status = ?output.status,
                    stderr = output.stderr.trim(),
                    "compare command failed"
                );
                TransitionOutcome::TransactionFailed
            }
            Err(e) => {
                warn!(device, state, error = %e, "compare command failed");
                TransitionOutcome::TransactionFailed
            }
        }
    }
}
